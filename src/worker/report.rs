//! Output harvesting and the per-invocation event log

use super::InvocationError;
use crate::reducer::types::{Compound, Signature};
use crate::types::TicketRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Name of the NUL-delimited output report inside a work directory
pub const REPORT_FILE: &str = ".loom-report";
/// Name of the JSON-lines event log inside a work directory
pub const EVENT_LOG_FILE: &str = "report.jsonl";

/// Parse `name\0value\0` records and build one value per output slot
///
/// Simple outputs must report exactly one value; aggregate outputs any
/// number. Records for undeclared names are ignored.
pub fn harvest(bytes: &[u8], sign: &Signature) -> Result<Vec<Compound>, InvocationError> {
    let mut fields: Vec<&[u8]> = bytes.split(|b| *b == 0).collect();
    // A well-formed report ends with a NUL, leaving one empty trailing field
    if fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    if fields.len() % 2 != 0 {
        return Err(InvocationError::MalformedReport {
            reason: format!("odd number of fields ({})", fields.len()),
        });
    }

    let mut reported: HashMap<String, Vec<String>> = HashMap::new();
    for pair in fields.chunks(2) {
        let name = String::from_utf8_lossy(pair[0]).into_owned();
        let value = String::from_utf8_lossy(pair[1]).into_owned();
        reported.entry(name).or_default().push(value);
    }

    sign.outputs
        .iter()
        .map(|slot| {
            let values = reported.remove(&slot.name).unwrap_or_default();
            if !slot.aggregate {
                match values.len() {
                    0 => {
                        return Err(InvocationError::MissingOutput {
                            name: slot.name.clone(),
                        })
                    }
                    1 => {}
                    count => {
                        return Err(InvocationError::OutputCardinality {
                            name: slot.name.clone(),
                            count,
                        })
                    }
                }
            }
            Ok(Compound::strs(&values))
        })
        .collect()
}

/* ===================== Event log ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    Started {
        at: DateTime<Utc>,
        ticket: TicketRef,
        lang: String,
    },
    Finished {
        at: DateTime<Utc>,
        ticket: TicketRef,
        exit_code: Option<i32>,
        duration_ms: i64,
    },
    Harvested {
        at: DateTime<Utc>,
        ticket: TicketRef,
        outputs: usize,
    },
}

/// Append one event as a JSON line
pub async fn append_event(dir: &Path, event: &ReportEvent) -> Result<(), InvocationError> {
    let mut line = serde_json::to_string(event).map_err(|e| InvocationError::io(
        "serialize report event",
        std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    ))?;
    line.push('\n');

    let path = dir.join(EVENT_LOG_FILE);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|e| InvocationError::io("open event log", e))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| InvocationError::io("write event log", e))?;
    Ok(())
}
