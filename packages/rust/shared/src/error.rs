//! Error types for the sitelinks workflow.
//!
//! Library crates use [`SitelinksError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::WorkflowStage;

/// Top-level error type for all sitelinks operations.
#[derive(Debug, thiserror::Error)]
pub enum SitelinksError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to the ads platform.
    #[error("network error: {0}")]
    Network(String),

    /// The ads platform answered with a non-success status.
    #[error("api error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Feed schema registration rejected or returned a mismatched schema.
    #[error("feed definition failed: {message}")]
    Definition { message: String },

    /// Feed item batch rejected or returned a mismatched id count.
    #[error("feed population failed: {message}")]
    Population { message: String },

    /// Placeholder field left unbound or mapping registration rejected.
    #[error("placeholder mapping failed: {message}")]
    Mapping { message: String },

    /// Matching expression or campaign association rejected.
    #[error("campaign association failed: {message}")]
    Association { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SitelinksError>;

impl SitelinksError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn definition(msg: impl Into<String>) -> Self {
        Self::Definition {
            message: msg.into(),
        }
    }

    pub fn population(msg: impl Into<String>) -> Self {
        Self::Population {
            message: msg.into(),
        }
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping {
            message: msg.into(),
        }
    }

    pub fn association(msg: impl Into<String>) -> Self {
        Self::Association {
            message: msg.into(),
        }
    }

    /// The workflow stage this error aborted, if it came from one.
    pub fn stage(&self) -> Option<WorkflowStage> {
        match self {
            Self::Definition { .. } => Some(WorkflowStage::Definition),
            Self::Population { .. } => Some(WorkflowStage::Population),
            Self::Mapping { .. } => Some(WorkflowStage::Mapping),
            Self::Association { .. } => Some(WorkflowStage::Association),
            _ => None,
        }
    }
}
