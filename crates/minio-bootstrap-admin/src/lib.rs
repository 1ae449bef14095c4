//! MinIO client for the bootstrapper.
//!
//! [`MinioClient`] implements [`minio_bootstrap_core::ObjectStoreAdmin`] on
//! top of two APIs:
//!
//! - the S3 API, through `aws-sdk-s3`, for bucket existence, creation and the
//!   optional access probe;
//! - the MinIO admin REST API (`/minio/admin/v3`), through a SigV4-signed
//!   `reqwest` client, for identities and canned policies.
//!
//! # Modules
//!
//! - [`admin_api`] - Signed admin REST API client
//! - [`client`] - The [`MinioClient`] seam implementation
//! - [`crypto`] - Admin payload encryption (Argon2id + ChaCha20-Poly1305)
//! - [`error`] - Mapping of HTTP and SDK failures into `AdminError`
//! - [`s3`] - Bucket operations and the access probe

pub mod admin_api;
pub mod client;
pub mod crypto;
pub mod error;
pub mod s3;

#[cfg(test)]
mod test_server;

pub use admin_api::AdminApi;
pub use client::MinioClient;
