//! The seam between the reconciliation logic and a concrete object store.
//!
//! Each method is a single probe or mutation. Benign conflicts come back as
//! dedicated [`AdminError`] variants ([`AdminError::AlreadyExists`],
//! [`AdminError::AlreadyAttached`]) so callers can tell them apart from real
//! failures without parsing messages.

use async_trait::async_trait;

use minio_bootstrap_auth::Credentials;

/// Failure of a single admin or S3 call.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// The service could not be reached (connection refused, DNS, timeout).
    #[error("object store unreachable: {0}")]
    Unreachable(String),

    /// The resource being created already exists.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        /// Resource kind, e.g. `bucket`.
        kind: &'static str,
        /// Resource name.
        name: String,
    },

    /// The policy is already attached to the identity.
    #[error("policy {policy:?} is already attached to {user:?}")]
    AlreadyAttached {
        /// Policy name.
        policy: String,
        /// Identity access key.
        user: String,
    },

    /// The service answered with an error.
    #[error("{code} (HTTP {status}): {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Service error code, e.g. `XMinioAdminNoSuchUser`.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The request could not be built or its payload sealed.
    #[error("invalid request: {0}")]
    Request(String),
}

impl AdminError {
    /// Whether this error reports an already-existing resource.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Administrative operations needed to provision a bucket, an identity and a
/// policy.
#[async_trait]
pub trait ObjectStoreAdmin: Send + Sync {
    /// Check that the service is reachable and accepts the admin credentials.
    async fn check_connection(&self) -> Result<(), AdminError>;

    /// Whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, AdminError>;

    /// Create `bucket`. Returns [`AdminError::AlreadyExists`] if it exists.
    async fn create_bucket(&self, bucket: &str) -> Result<(), AdminError>;

    /// Whether an identity with `access_key` exists.
    async fn user_exists(&self, access_key: &str) -> Result<bool, AdminError>;

    /// Create the identity, or reset its secret if it already exists.
    async fn put_user(&self, credentials: &Credentials) -> Result<(), AdminError>;

    /// Create or overwrite the named policy with `document`.
    async fn put_policy(&self, name: &str, document: &[u8]) -> Result<(), AdminError>;

    /// Attach policy `policy` to identity `user`.
    ///
    /// Returns [`AdminError::AlreadyAttached`] if the mapping is in place.
    async fn attach_policy(&self, policy: &str, user: &str) -> Result<(), AdminError>;

    /// Exercise `bucket` with the application identity: head the bucket,
    /// then write, read back and delete a probe object.
    async fn probe_access(&self, bucket: &str, credentials: &Credentials)
    -> Result<(), AdminError>;
}
