//! Error types for the bootstrapper.
//!
//! [`ConfigError`] covers everything detected before the object store is
//! contacted. [`BootstrapError`] is what [`crate::Bootstrapper::run`] returns;
//! every variant is fatal and maps to a non-zero exit status.

use crate::admin::AdminError;
use crate::bootstrap::Step;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset or empty.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        name: &'static str,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The bucket name breaks the S3 naming rules.
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName {
        /// The rejected bucket name.
        name: String,
        /// The rule that was violated.
        reason: String,
    },
}

/// Fatal outcome of a bootstrap run.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The object store did not answer within the retry budget.
    #[error("object store not reachable after {attempts} attempts")]
    ConnectTimeout {
        /// Number of connection attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last_error: AdminError,
    },

    /// A provisioning step failed with a non-benign error.
    #[error("{step} failed")]
    Step {
        /// The step that failed.
        step: Step,
        /// The underlying admin error.
        #[source]
        source: AdminError,
    },

    /// The policy document could not be written to or read from disk.
    #[error("failed to stage policy document")]
    Staging(#[source] std::io::Error),
}

/// Convenience result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;
