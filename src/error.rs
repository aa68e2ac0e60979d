//! Error taxonomy for a provisioning run.
//!
//! Record-level problems (unsafe names, orphaned parents) are not errors: they
//! are carried as data on the parsed batch and the assembled forest. Everything
//! here is fatal to the run that produced it.
use crate::namespace::ViewId;
use std::time::Duration;
use thiserror::Error;

/// A single namespace service call failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The requested view does not exist.
    #[error("view {0} not found")]
    NotFound(String),

    /// The service could not be reached or the exchange broke down.
    #[error("namespace request failed: {0}")]
    Transport(String),

    /// The service answered but refused the request.
    #[error("namespace rejected request: {0}")]
    Rejected(String),

    /// Local state could not be read or written.
    #[error("namespace state I/O error: {context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A response or state document did not have the expected shape.
    #[error("malformed namespace data: {0}")]
    Malformed(String),
}

impl BackendError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Fatal outcome of resolving one view.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A create was accepted but the view never became visible.
    #[error("view {name:?} ({view_id}) did not appear within {timeout:?} after creation")]
    Timeout {
        name: String,
        view_id: ViewId,
        timeout: Duration,
    },

    /// The namespace service rejected a call outright.
    #[error("namespace error while resolving {name:?}: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
}

impl ProvisionError {
    /// Name of the view whose resolution failed.
    pub fn name(&self) -> &str {
        match self {
            Self::Timeout { name, .. } | Self::Backend { name, .. } => name,
        }
    }
}

/// The input location does not refer to readable content.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input {location} is unavailable: {source}")]
    Unavailable {
        location: String,
        source: std::io::Error,
    },
}
