//! Realtime service errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type.
///
/// Background stream processors never surface these to a caller; they exist so
/// failures can be logged against a stable code.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The message is unparseable or missing required fields.
    #[error("code: malformed_input, description: {0}")]
    MalformedInput(String),

    /// No active configuration applies to the message.
    #[error("code: config_unavailable, description: {0}")]
    ConfigUnavailable(String),

    /// A store read or write failed.
    #[error("code: persistence_failure, description: {0}")]
    Persistence(String),

    /// A message could not be published.
    #[error("code: publish_failure, description: {0}")]
    Publish(String),

    /// A non recoverable internal error occurred.
    #[error("code: internal, description: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::ConfigUnavailable(_) => "config_unavailable",
            Self::Persistence(_) => "persistence_failure",
            Self::Publish(_) => "publish_failure",
            Self::Internal(_) => "internal",
        }
    }

    /// Wrap a store failure, keeping its context chain.
    #[must_use]
    pub fn persistence(err: &anyhow::Error) -> Self {
        Self::Persistence(chain(err))
    }

    /// Wrap a publisher failure, keeping its context chain.
    #[must_use]
    pub fn publish(err: &anyhow::Error) -> Self {
        Self::Publish(chain(err))
    }
}

fn chain(err: &anyhow::Error) -> String {
    err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let chain = chain(&err);

        // if type is Error, return it with the newly added context
        if let Some(inner) = err.downcast_ref::<Self>() {
            tracing::debug!("Error: {err}, caused by: {inner}");

            return match inner {
                Self::MalformedInput(_) => Self::MalformedInput(chain),
                Self::ConfigUnavailable(_) => Self::ConfigUnavailable(chain),
                Self::Persistence(_) => Self::Persistence(chain),
                Self::Publish(_) => Self::Publish(chain),
                Self::Internal(_) => Self::Internal(chain),
            };
        }

        // otherwise, return an Internal error
        Self::Internal(chain)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

#[macro_export]
macro_rules! malformed {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::MalformedInput(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::Error::MalformedInput(format!($err))
    };
}
