//! Unified error types for Amble.
//!
//! Errors split into two families. Primary writes (check-ins, safety events)
//! propagate their errors to the caller: a failed check-in must never look
//! like a successful one. Auxiliary work (coach alerts, pattern analysis,
//! phase history) is best-effort: failures are logged and swallowed so they
//! never block the check-in path.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Amble operations.
#[derive(Error, Debug)]
pub enum AmbleError {
    /// I/O errors from data file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Storage backend errors not tied to a single file (locks, constraints).
    #[error("store error: {message}")]
    Store { message: String },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Malformed or out-of-range check-in input, rejected before evaluation.
    #[error("invalid check-in: {message}")]
    InvalidCheckin { message: String },

    /// Violations of forward-only lifecycles (e.g. coach alert status).
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Coach alert not found in storage.
    #[error("coach alert not found: {id}")]
    AlertNotFound { id: u64 },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Coach notification dispatch errors.
    #[error("notify error: {message}")]
    Notify { message: String },
}

/// A specialized Result type for Amble operations.
pub type Result<T> = std::result::Result<T, AmbleError>;

impl AmbleError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a store backend error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid check-in error.
    pub fn invalid_checkin(message: impl Into<String>) -> Self {
        Self::InvalidCheckin {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create an alert not found error.
    pub fn alert_not_found(id: u64) -> Self {
        Self::AlertNotFound { id }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a notify error.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify {
            message: message.into(),
        }
    }

    /// Check if this error is the caller's fault rather than infrastructure.
    ///
    /// Rejected check-in fields, forward-only lifecycle violations and
    /// unknown alert ids count as input errors; storage, config and
    /// notification failures do not.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidCheckin { .. } | Self::InvalidState { .. } | Self::AlertNotFound { .. }
        )
    }
}

impl From<io::Error> for AmbleError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AmbleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for best-effort error handling on auxiliary paths.
///
/// Coach alerts, pattern analysis and phase history must never block a
/// check-in. These methods log the failure and carry on with a default or
/// a provided fallback.
pub trait BestEffort<T> {
    /// Log a warning on failure and return the default value.
    fn best_effort_default(self, context: &str) -> T
    where
        T: Default;

    /// Log a warning on failure and return the provided fallback.
    fn best_effort_with(self, context: &str, fallback: T) -> T;
}

impl<T> BestEffort<T> for Result<T> {
    fn best_effort_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (best-effort: using default)", context, err);
                T::default()
            }
        }
    }

    fn best_effort_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (best-effort: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the Amble CLI.
pub mod exit_codes {
    /// Exit code for success.
    pub const OK: i32 = 0;

    /// Exit code for infrastructure failures (storage, config, serialization).
    pub const ERROR: i32 = 1;

    /// Exit code clap uses for malformed invocations; reserved here so
    /// wrappers can rely on the mapping.
    pub const USAGE: i32 = 2;

    /// Exit code written by the panic handler.
    pub const CRASH: i32 = 3;
}
