//! Error types for migration runs
//!
//! Transport faults are split in two: a connection that could not be
//! established after every attempt is fatal (`Connection`), while a response
//! the service sent back is reported as `Status` and left to the caller to
//! classify. Read paths that tolerate absence downgrade `Status` to "nothing
//! found"; write paths propagate it and abort the run.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Migration error taxonomy
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to build {method} request for {url}: {source}")]
    RequestBuild {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("connection to {url} failed after {attempts} attempt(s): {source}")]
    Connection {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl MigrateError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// True for faults where the remote never produced a response.
    pub fn is_fatal_transport(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// True when the remote answered but rejected or failed the request.
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// HTTP status carried by the error, if the remote answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
