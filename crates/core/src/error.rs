use thiserror::Error;

use crate::ports::RemoteError;

/// Core synchronization errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Type of repository {repository} could not be loaded: {source}")]
    TypeResolution {
        repository: String,
        #[source]
        source: RemoteError,
    },

    #[error("Type of repository {repository} has not been resolved yet")]
    TypeNotResolved { repository: String },

    #[error("Could not find build provider for type {vcs_type}")]
    UnsupportedType { vcs_type: String },

    #[error("Synchronization was cancelled")]
    Cancelled,
}

impl CoreError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// True when the remote server could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<RemoteError> for CoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound { what } => Self::NotFound { what },
            RemoteError::Transport { message } => Self::Transport { message },
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
