//! AWS Signature Version 4 request signing for the MinIO bootstrapper.
//!
//! MinIO authenticates both its S3 API and its admin REST API with SigV4
//! (service `s3`). The S3 calls go through `aws-sdk-s3`, which signs on its
//! own; the admin calls are plain HTTP requests and are signed here.
//!
//! # Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use minio_bootstrap_auth::{Credentials, SigningRequest, hash_payload, sign_request};
//!
//! let credentials = Credentials::new("minioadmin", "minioadmin");
//! let body = b"{}";
//! let payload_hash = hash_payload(body);
//! let request = SigningRequest {
//!     method: "PUT",
//!     path: "/minio/admin/v3/add-canned-policy",
//!     query: "name=app-policy-photos",
//!     headers: &[("host", "minio:9000")],
//!     payload_hash: &payload_hash,
//! };
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let signed = sign_request(&request, &credentials, "us-east-1", "s3", now);
//! assert!(signed.authorization.starts_with("AWS4-HMAC-SHA256 Credential=minioadmin/20240101/"));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - SigV4 canonical request construction
//! - [`credentials`] - Access/secret key pair with a redacting `Debug`
//! - [`error`] - Signing error types
//! - [`sigv4`] - Signing key derivation and `Authorization` header construction

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sigv4;

pub use credentials::Credentials;
pub use error::AuthError;
pub use sigv4::{SignedHeaders, SigningRequest, hash_payload, sign_request};
