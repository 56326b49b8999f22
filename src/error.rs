//! Error types shared by the resolver, validator and runner.
use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;

/// Why a firmware image was rejected before invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInvalidReason {
    NotGiven,
    NotFound,
    Unreadable(String),
    Empty,
    /// 1-based line number of the first bad record
    Malformed { line: usize, detail: String },
}

impl fmt::Display for FileInvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileInvalidReason::NotGiven => write!(f, "no HEX file given"),
            FileInvalidReason::NotFound => write!(f, "not found"),
            FileInvalidReason::Unreadable(err) => write!(f, "unreadable: {}", err),
            FileInvalidReason::Empty => write!(f, "empty file"),
            FileInvalidReason::Malformed { line, detail } => {
                write!(f, "malformed at line {}: {}", line, detail)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Firmware image missing or structurally broken
    #[error("HEX file {path} is invalid: {reason}")]
    FileInvalid {
        path: PathBuf,
        reason: FileInvalidReason,
    },

    /// No IPECMD executable at any of the searched locations
    #[error("IPECMD not found (searched: {})", display_paths(.searched))]
    ToolNotFound { searched: Vec<PathBuf> },

    /// Child was killed after running past its deadline
    #[error("IPECMD did not finish within {after:?}")]
    TimeoutExceeded {
        after: Duration,
        stdout: String,
        stderr: String,
    },

    /// Request rejected at the configuration boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Marker phrase table could not be parsed
    #[error("Invalid marker table: {0}")]
    MarkerTable(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no path or version given".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
