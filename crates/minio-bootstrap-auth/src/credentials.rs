//! Access key / secret key pairs.
//!
//! [`Credentials`] is used both for the admin identity that signs provisioning
//! calls and for the application identity being provisioned. The secret never
//! appears in `Debug` output or serialized configuration.

use std::fmt;

/// An access key / secret key pair.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::Credentials;
///
/// let creds = Credentials::new("app", "secret123");
/// assert_eq!(creds.access_key(), "app");
/// assert!(!format!("{creds:?}").contains("secret123"));
/// ```
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    access_key: String,
    #[serde(skip_serializing)]
    secret_key: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The public access key.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
