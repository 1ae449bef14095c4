//! Bucket-scoped access policy synthesis.
//!
//! The application identity gets exactly object-level get/put/delete and
//! bucket-level list/head on one bucket. No wildcard bucket, no admin
//! actions.

use serde::{Deserialize, Serialize};

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Actions granted to the application identity.
pub const BUCKET_ACTIONS: [&str; 5] = [
    "s3:GetObject",
    "s3:PutObject",
    "s3:DeleteObject",
    "s3:ListBucket",
    "s3:HeadBucket",
];

/// Name of the canned policy provisioned for `bucket`.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_core::policy::policy_name;
///
/// assert_eq!(policy_name("photos"), "app-policy-photos");
/// ```
#[must_use]
pub fn policy_name(bucket: &str) -> String {
    format!("app-policy-{bucket}")
}

/// ARN of the bucket itself.
#[must_use]
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// ARN matching every object in the bucket.
#[must_use]
pub fn objects_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}/*")
}

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the listed actions.
    Allow,
    /// Deny the listed actions.
    Deny,
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Allow or deny.
    pub effect: Effect,
    /// Action names, e.g. `s3:GetObject`.
    pub action: Vec<String>,
    /// Resource ARNs.
    pub resource: Vec<String>,
}

/// An AWS-style IAM policy document.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_core::PolicyDocument;
///
/// let doc = PolicyDocument::for_bucket("photos");
/// let json = String::from_utf8(doc.to_json().unwrap()).unwrap();
/// assert!(json.contains("arn:aws:s3:::photos/*"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version.
    pub version: String,
    /// Statements.
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// The least-privilege document for the application identity on `bucket`.
    #[must_use]
    pub fn for_bucket(bucket: &str) -> Self {
        Self {
            version: POLICY_VERSION.to_owned(),
            statement: vec![Statement {
                effect: Effect::Allow,
                action: BUCKET_ACTIONS.iter().map(|a| (*a).to_owned()).collect(),
                resource: vec![bucket_arn(bucket), objects_arn(bucket)],
            }],
        }
    }

    /// Pretty-printed JSON bytes, as uploaded to the object store.
    ///
    /// # Errors
    ///
    /// Returns a serialization error; this cannot happen for documents built
    /// by [`PolicyDocument::for_bucket`].
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Every resource ARN referenced by any statement.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .flat_map(|s| s.resource.iter().map(String::as_str))
    }

    /// Every action referenced by any statement.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .flat_map(|s| s.action.iter().map(String::as_str))
    }
}
