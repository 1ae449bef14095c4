//! minio-bootstrap - brings a MinIO server into the state an application needs.
//!
//! Ensures that the configured bucket exists, that the application identity
//! exists, and that a policy granting that identity access to exactly that
//! bucket is attached. Every step probes before it mutates, so the binary is
//! safe to run on every deployment, typically as a one-shot container that
//! other services depend on.
//!
//! # Usage
//!
//! ```text
//! MINIO_BUCKET_NAME=photos MINIO_ACCESS_KEY=app MINIO_SECRET_KEY=secret123 \
//! MINIO_ROOT_USER=root MINIO_ROOT_PASSWORD=rootpass minio-bootstrap
//!
//! MINIO_BUCKET_NAME=photos minio-bootstrap --print-policy
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MINIO_BUCKET_NAME` | *(required)* | Target bucket |
//! | `MINIO_ACCESS_KEY` | *(required)* | Application identity access key |
//! | `MINIO_SECRET_KEY` | *(required)* | Application identity secret key |
//! | `MINIO_ENDPOINT_HOST` | `minio` | Object store hostname |
//! | `MINIO_ENDPOINT_PORT` | `9000` | Object store port |
//! | `MINIO_ADMIN_ACCESS_KEY` | `MINIO_ROOT_USER` | Admin access key |
//! | `MINIO_ADMIN_SECRET_KEY` | `MINIO_ROOT_PASSWORD` | Admin secret key |
//! | `MINIO_USE_TLS` | `false` | Connect over HTTPS |
//! | `MINIO_REGION` | `us-east-1` | Signing region and bucket location |
//! | `MINIO_CONNECT_ATTEMPTS` | `30` | Connection attempts before giving up |
//! | `MINIO_CONNECT_INTERVAL_SECS` | `3` | Pause between connection attempts |
//! | `MINIO_CONNECT_DEADLINE_SECS` | attempts x interval | Total time allowed for connecting |
//! | `MINIO_ROTATE_SECRET` | `false` | Reset the secret of an existing identity |
//! | `MINIO_VERIFY_ACCESS` | `false` | Exercise the bucket as the application identity |
//! | `MINIO_POLICY_DIR` | system temp dir | Where the transient policy file is written |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! # Exit Status
//!
//! `0` when every step completed, warnings included. `1` on invalid
//! configuration, when the server stays unreachable, or when a step fails.

use std::io::Write;

use anyhow::{Context, Result};
use minio_bootstrap_admin::MinioClient;
use minio_bootstrap_core::config::bucket_from_env;
use minio_bootstrap_core::{BootstrapConfig, Bootstrapper, PolicyDocument, TokioClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filter used when configuration cannot be loaded.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Whether the arguments ask for the policy document only.
fn wants_print_policy<I>(args: I) -> bool
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().skip(1).any(|a| a == "--print-policy")
}

/// The policy document for `bucket`, as written to the server.
fn render_policy(bucket: &str) -> Result<Vec<u8>> {
    let mut json = PolicyDocument::for_bucket(bucket)
        .to_json()
        .context("failed to serialize policy document")?;
    json.push(b'\n');
    Ok(json)
}

fn print_policy() -> Result<()> {
    let bucket = bucket_from_env().context("invalid configuration")?;
    let json = render_policy(&bucket)?;
    std::io::stdout()
        .write_all(&json)
        .context("failed to write policy document")
}

/// Build the configuration from `lookup`.
fn load_config<F>(lookup: F) -> Result<BootstrapConfig>
where
    F: Fn(&str) -> Option<String>,
{
    BootstrapConfig::from_lookup(lookup).context("invalid configuration")
}

async fn bootstrap(config: &BootstrapConfig) -> Result<()> {
    info!(version = VERSION, "starting minio-bootstrap");

    let client = MinioClient::new(config).context("failed to create MinIO client")?;
    let clock = TokioClock::new();
    let report = Bootstrapper::new(config, &client, &clock)
        .run()
        .await
        .context("bootstrap failed")?;

    for (step, outcome) in report.steps() {
        info!(%step, ?outcome, "step finished");
    }
    if report.has_warnings() {
        warn!("bootstrap finished with warnings");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if wants_print_policy(std::env::args()) {
        return print_policy();
    }

    let config = match load_config(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(DEFAULT_LOG_LEVEL)?;
            return Err(e);
        }
    };

    init_tracing(&config.log_level)?;
    bootstrap(&config).await
}
