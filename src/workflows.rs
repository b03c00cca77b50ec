//! Workflow documents
//!
//! A workflow is a JSON document holding global definitions and the targets
//! to reduce:
//!
//! ```json
//! {
//!   "definitions": { "greeting": [{ "t": "Str", "v": "hello" }] },
//!   "targets": [[{ "t": "Var", "name": "greeting" }]]
//! }
//! ```
//!
//! Loading hashes the file contents so runs can be tied to an exact version.

use crate::reducer::types::{Bindings, Compound};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("failed to read workflow {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("workflow {path} has no targets")]
    NoTargets { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Global scope of every query started from this document
    #[serde(default)]
    pub definitions: Bindings,
    pub targets: Vec<Compound>,
}

/// A loaded workflow and its fingerprint
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub name: String,
    pub path: PathBuf,
    /// Full SHA-256 of the file contents
    pub hash: String,
    /// First 8 hex digits of `hash`
    pub version: String,
    pub document: WorkflowDocument,
}

pub fn parse_workflow(source: &str) -> Result<WorkflowDocument, serde_json::Error> {
    serde_json::from_str(source)
}

/// Read, parse and fingerprint a workflow file
pub fn load_workflow(path: impl AsRef<Path>) -> Result<WorkflowFile, WorkflowError> {
    let path = path.as_ref().to_path_buf();
    let source = std::fs::read_to_string(&path).map_err(|source| WorkflowError::Read {
        path: path.clone(),
        source,
    })?;
    let document = parse_workflow(&source).map_err(|source| WorkflowError::Parse {
        path: path.clone(),
        source,
    })?;
    if document.targets.is_empty() {
        return Err(WorkflowError::NoTargets { path });
    }

    let hash = hash_source(&source);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string());

    Ok(WorkflowFile {
        name,
        version: hash[..8].to_string(),
        hash,
        path,
        document,
    })
}

pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
