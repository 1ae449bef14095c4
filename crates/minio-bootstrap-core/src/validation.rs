//! Bucket name rules.
//!
//! A bad bucket name is a configuration error: it is rejected before any
//! request reaches the object store. The rules follow the
//! [Amazon S3 naming rules](https://docs.aws.amazon.com/AmazonS3/latest/userguide/bucketnamingrules.html),
//! which MinIO enforces as well.

use std::net::Ipv4Addr;

use crate::error::ConfigError;

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Validate an S3 bucket name.
///
/// Rules:
/// - 3-63 characters long
/// - Only lowercase letters, numbers, hyphens, and dots
/// - Must start and end with a letter or number
/// - No consecutive dots (`..`)
/// - Not formatted as an IPv4 address (e.g. `192.168.0.1`)
/// - Must not start with `xn--`
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBucketName`] naming the first rule violated.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_core::validation::validate_bucket_name;
///
/// assert!(validate_bucket_name("photos").is_ok());
/// assert!(validate_bucket_name("Photos").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBucketName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };

    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
        return Err(invalid(&format!(
            "must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
        )));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "must only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }

    let alphanumeric = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let bytes = name.as_bytes();
    if !alphanumeric(bytes[0]) || !alphanumeric(bytes[bytes.len() - 1]) {
        return Err(invalid("must start and end with a letter or number"));
    }

    if name.contains("..") {
        return Err(invalid("must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("must not be formatted as an IP address"));
    }

    if name.starts_with("xn--") {
        return Err(invalid("must not start with 'xn--'"));
    }

    Ok(())
}
