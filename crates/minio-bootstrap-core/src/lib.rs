//! Core building blocks of the MinIO bootstrapper.
//!
//! The bootstrapper brings an object store into a desired state: one bucket,
//! one application identity, and one least-privilege policy attached to that
//! identity. Every run re-derives the desired state from [`BootstrapConfig`]
//! and reconciles it against the live server through the
//! [`ObjectStoreAdmin`] seam, so repeated runs converge on the same result.
//!
//! # Modules
//!
//! - [`admin`] - The [`ObjectStoreAdmin`] trait and its error type
//! - [`bootstrap`] - The [`Bootstrapper`] state machine and its report
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Configuration and bootstrap error types
//! - [`policy`] - Bucket-scoped policy document synthesis
//! - [`retry`] - Bounded retry policy with an injectable clock
//! - [`staging`] - Transient on-disk copy of the policy document
//! - [`validation`] - Bucket name rules

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod policy;
pub mod retry;
pub mod staging;
pub mod validation;

pub use admin::{AdminError, ObjectStoreAdmin};
pub use bootstrap::{BootstrapReport, Bootstrapper, Step, StepOutcome};
pub use config::BootstrapConfig;
pub use error::{BootstrapError, ConfigError};
pub use minio_bootstrap_auth::Credentials;
pub use policy::PolicyDocument;
pub use retry::{Attempt, Clock, ManualClock, RetryError, RetryPolicy, TokioClock};
