//! Bucket operations and the access probe over the S3 API.

use std::time::Duration;

use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use minio_bootstrap_auth::Credentials;
use minio_bootstrap_core::AdminError;
use tracing::debug;

use crate::error::{from_sdk, sdk_status};

/// Key prefix for probe objects written by [`probe_access`].
pub const PROBE_PREFIX: &str = ".minio-bootstrap/";

const PROBE_BODY: &[u8] = b"minio-bootstrap access probe";

/// Region that takes no location constraint on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

/// Build a path-style S3 client for `endpoint` signing as `credentials`.
#[must_use]
pub fn s3_client(
    endpoint: &str,
    region: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> aws_sdk_s3::Client {
    let provider = aws_credential_types::Credentials::new(
        credentials.access_key(),
        credentials.secret_key(),
        None,
        None,
        "minio-bootstrap",
    );
    let timeouts = TimeoutConfig::builder()
        .connect_timeout(timeout)
        .operation_timeout(timeout)
        .build();

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .credentials_provider(provider)
        .endpoint_url(endpoint)
        .force_path_style(true)
        .timeout_config(timeouts)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// Whether `bucket` exists.
pub async fn bucket_exists(client: &aws_sdk_s3::Client, bucket: &str) -> Result<bool, AdminError> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(true),
        Err(e)
            if e.as_service_error().is_some_and(HeadBucketError::is_not_found)
                || sdk_status(&e) == Some(404) =>
        {
            Ok(false)
        }
        Err(e) => Err(from_sdk(&e)),
    }
}

/// Create `bucket`, with a location constraint outside the default region.
pub async fn create_bucket(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    region: &str,
) -> Result<(), AdminError> {
    let mut request = client.create_bucket().bucket(bucket);
    if let Some(configuration) = bucket_configuration(region) {
        request = request.create_bucket_configuration(configuration);
    }

    match request.send().await {
        Ok(_) => Ok(()),
        Err(e) if e.as_service_error().is_some_and(is_already_exists) => {
            Err(AdminError::AlreadyExists {
                kind: "bucket",
                name: bucket.to_owned(),
            })
        }
        Err(e) => Err(from_sdk(&e)),
    }
}

fn is_already_exists(err: &CreateBucketError) -> bool {
    err.is_bucket_already_owned_by_you() || err.is_bucket_already_exists()
}

fn bucket_configuration(region: &str) -> Option<CreateBucketConfiguration> {
    if region.is_empty() || region == DEFAULT_REGION {
        return None;
    }
    Some(
        CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build(),
    )
}

/// Key of a fresh probe object.
#[must_use]
pub fn probe_key() -> String {
    format!("{PROBE_PREFIX}probe-{}", uuid::Uuid::new_v4())
}

/// Head `bucket`, then write, read back and delete a probe object.
///
/// The probe object is deleted even when reading it back fails.
pub async fn probe_access(client: &aws_sdk_s3::Client, bucket: &str) -> Result<(), AdminError> {
    client
        .head_bucket()
        .bucket(bucket)
        .send()
        .await
        .map_err(|e| from_sdk(&e))?;

    let key = probe_key();
    client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(Bytes::from_static(PROBE_BODY)))
        .send()
        .await
        .map_err(|e| from_sdk(&e))?;
    debug!(bucket, key = %key, "wrote probe object");

    let read_back = read_object(client, bucket, &key).await;
    let deleted = client
        .delete_object()
        .bucket(bucket)
        .key(&key)
        .send()
        .await
        .map_err(|e| from_sdk(&e));

    let body = read_back?;
    deleted?;
    if body != PROBE_BODY {
        return Err(AdminError::Request(format!(
            "probe object {key} read back {} bytes, expected {}",
            body.len(),
            PROBE_BODY.len()
        )));
    }
    Ok(())
}

async fn read_object(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
) -> Result<Bytes, AdminError> {
    let output = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| from_sdk(&e))?;
    let body = output
        .body
        .collect()
        .await
        .map_err(|e| AdminError::Request(format!("failed to read probe object: {e}")))?;
    Ok(body.into_bytes())
}
