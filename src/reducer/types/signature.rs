//! Callable signatures
//!
//! A signature lists output slots and parameter slots in declaration order.
//! The task slot (the callable itself) is implicit; it only shows up when it
//! joins a correlated group.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the implicit task parameter
pub const TASK_PARAM: &str = "task";

/// Output slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    /// Produces a whole list as one unit
    #[serde(default)]
    pub aggregate: bool,
}

/// Parameter slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ParamSlot {
    /// Enumerated value by value
    Simple { name: String },
    /// Bound as one indivisible list
    Aggregate { name: String },
    /// Enumerated in lock-step with the other members
    Correlated { names: Vec<String> },
}

impl ParamSlot {
    pub fn names(&self) -> Vec<&str> {
        match self {
            ParamSlot::Simple { name } | ParamSlot::Aggregate { name } => vec![name.as_str()],
            ParamSlot::Correlated { names } => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub outputs: Vec<Slot>,
    #[serde(default)]
    pub params: Vec<ParamSlot>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Slot {
            name: name.into(),
            aggregate: false,
        });
        self
    }

    pub fn aggregate_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(Slot {
            name: name.into(),
            aggregate: true,
        });
        self
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSlot::Simple { name: name.into() });
        self
    }

    pub fn aggregate_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSlot::Aggregate { name: name.into() });
        self
    }

    pub fn correlated<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.params.push(ParamSlot::Correlated {
            names: names.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Output slot selected by a 1-based channel
    pub fn output_slot(&self, channel: usize) -> Option<&Slot> {
        channel.checked_sub(1).and_then(|idx| self.outputs.get(idx))
    }

    /// The task slot belongs to a correlated group
    pub fn is_task_correlated(&self) -> bool {
        self.params.iter().any(|p| match p {
            ParamSlot::Correlated { names } => names.iter().any(|n| n == TASK_PARAM),
            _ => false,
        })
    }

    /// Declared parameter names, task excluded
    pub fn param_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .flat_map(ParamSlot::names)
            .filter(|n| *n != TASK_PARAM)
            .collect()
    }

    pub fn is_aggregate_param(&self, name: &str) -> bool {
        self.params
            .iter()
            .any(|p| matches!(p, ParamSlot::Aggregate { name: n } if n == name))
    }

    /// Signature with the given parameters removed
    ///
    /// A correlated group left with a single member degrades to a simple slot.
    pub fn without_params(&self, removed: &[&str]) -> Signature {
        let keep = |n: &String| !removed.contains(&n.as_str());
        let params = self
            .params
            .iter()
            .filter_map(|p| match p {
                ParamSlot::Simple { name } | ParamSlot::Aggregate { name } if !keep(name) => None,
                ParamSlot::Correlated { names } => {
                    let names: Vec<String> = names.iter().filter(|n| keep(n)).cloned().collect();
                    match names.len() {
                        0 => None,
                        1 => Some(ParamSlot::Simple {
                            name: names.into_iter().next().unwrap_or_default(),
                        }),
                        _ => Some(ParamSlot::Correlated { names }),
                    }
                }
                other => Some(other.clone()),
            })
            .collect();

        Signature {
            outputs: self.outputs.clone(),
            params,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: Vec<String> = self
            .outputs
            .iter()
            .map(|s| {
                if s.aggregate {
                    format!("<{}>", s.name)
                } else {
                    s.name.clone()
                }
            })
            .collect();
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match p {
                ParamSlot::Simple { name } => name.clone(),
                ParamSlot::Aggregate { name } => format!("<{}>", name),
                ParamSlot::Correlated { names } => format!("[{}]", names.join(" ")),
            })
            .collect();
        write!(f, "{} : {}", outputs.join(" "), params.join(" "))
    }
}
