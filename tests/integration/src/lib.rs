//! Integration tests for minio-bootstrap.
//!
//! Most tests require a running MinIO server at `localhost:9000` with root
//! credentials `minioadmin`/`minioadmin`. They are marked `#[ignore]` so they
//! don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! docker run -d -p 9000:9000 minio/minio server /data
//! cargo test -p minio-bootstrap-integration -- --ignored
//! ```
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MINIO_TEST_HOST` | `localhost` |
//! | `MINIO_TEST_PORT` | `9000` |
//! | `MINIO_ROOT_USER` | `minioadmin` |
//! | `MINIO_ROOT_PASSWORD` | `minioadmin` |

use std::sync::Once;

use aws_sdk_s3::config::{BehaviorVersion, Credentials as SdkCredentials, Region};
use minio_bootstrap_core::{BootstrapConfig, Credentials};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// MinIO host under test.
#[must_use]
pub fn minio_host() -> String {
    env_or("MINIO_TEST_HOST", "localhost")
}

/// MinIO port under test.
#[must_use]
pub fn minio_port() -> u16 {
    env_or("MINIO_TEST_PORT", "9000").parse().unwrap_or(9000)
}

/// Endpoint URL of the server under test.
#[must_use]
pub fn endpoint_url() -> String {
    format!("http://{}:{}", minio_host(), minio_port())
}

/// Root credentials of the server under test.
#[must_use]
pub fn root_credentials() -> Credentials {
    Credentials::new(
        env_or("MINIO_ROOT_USER", "minioadmin"),
        env_or("MINIO_ROOT_PASSWORD", "minioadmin"),
    )
}

/// Create an S3 client signing as `credentials`.
#[must_use]
pub fn s3_client(credentials: &Credentials) -> aws_sdk_s3::Client {
    init_tracing();

    let creds = SdkCredentials::new(
        credentials.access_key(),
        credentials.secret_key(),
        None,
        None,
        "integration-test",
    );

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_owned()
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    format!("test-{prefix}-{}", unique_suffix())
}

/// Generate unique application credentials for a test.
#[must_use]
pub fn test_app_credentials(prefix: &str) -> Credentials {
    Credentials::new(
        format!("app-{prefix}-{}", unique_suffix()),
        format!("secret-{}", uuid::Uuid::new_v4().simple()),
    )
}

/// Bootstrap configuration targeting the server under test.
#[must_use]
pub fn test_config(bucket: &str, app: Credentials) -> BootstrapConfig {
    init_tracing();

    BootstrapConfig::builder()
        .bucket(bucket.to_owned())
        .app_credentials(app)
        .admin_credentials(root_credentials())
        .endpoint_host(minio_host())
        .endpoint_port(minio_port())
        .build()
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return;
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_admin;
mod test_bootstrap;
