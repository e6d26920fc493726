use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::analyzer::Strategy;

/// Why a single source adapter could not produce a tree. Always recoverable:
/// the selector moves on to the next adapter.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{tool} could not be executed: {source}")]
    ToolUnavailable {
        tool: String,
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("{tool} did not finish within {after:?}")]
    TimedOut { tool: String, after: Duration },

    #[error("failed to parse {what}: {reason}")]
    ParseFailure { what: String, reason: String },

    #[error("{what} not found")]
    NotPresent { what: String },

    #[error("{what} task did not complete: {source}")]
    TaskFailed {
        what: String,
        source: tokio::task::JoinError,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn parse(what: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        SourceError::ParseFailure {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Module-level failure surfaced to the caller.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("project manifest {path:?} could not be read: {source}")]
    MissingManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("project manifest {path:?} is invalid: {source}")]
    InvalidManifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no dependency source succeeded for module {module}: {}", summarize(attempts))]
    Exhausted {
        module: String,
        attempts: Vec<(Strategy, SourceError)>,
    },
}

fn summarize(attempts: &[(Strategy, SourceError)]) -> String {
    attempts
        .iter()
        .map(|(strategy, err)| format!("{}: {}", strategy, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Recoverable inconsistency found while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Warning {
    /// `parent` lists `target`, but `target` never resolved to a package.
    DanglingReference { parent: String, target: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::DanglingReference { parent, target } => {
                write!(f, "{} requires {} which did not resolve; edge dropped", parent, target)
            }
        }
    }
}
