//! Bootstrapper configuration.
//!
//! [`BootstrapConfig`] is built once at startup, from the process environment
//! via [`BootstrapConfig::from_env`] or from any lookup function via
//! [`BootstrapConfig::from_lookup`], and then passed by reference. Nothing
//! reads the environment after that point.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use typed_builder::TypedBuilder;

use minio_bootstrap_auth::Credentials;

use crate::error::ConfigError;
use crate::policy::policy_name;
use crate::retry::{DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::validation::validate_bucket_name;

const BUCKET_NAME: &str = "MINIO_BUCKET_NAME";
const ACCESS_KEY: &str = "MINIO_ACCESS_KEY";
const SECRET_KEY: &str = "MINIO_SECRET_KEY";
const ENDPOINT_HOST: &str = "MINIO_ENDPOINT_HOST";
const ENDPOINT_PORT: &str = "MINIO_ENDPOINT_PORT";
const ADMIN_ACCESS_KEY: &str = "MINIO_ADMIN_ACCESS_KEY";
const ADMIN_SECRET_KEY: &str = "MINIO_ADMIN_SECRET_KEY";
const ROOT_USER: &str = "MINIO_ROOT_USER";
const ROOT_PASSWORD: &str = "MINIO_ROOT_PASSWORD";
const USE_TLS: &str = "MINIO_USE_TLS";
const REGION: &str = "MINIO_REGION";
const CONNECT_ATTEMPTS: &str = "MINIO_CONNECT_ATTEMPTS";
const CONNECT_INTERVAL_SECS: &str = "MINIO_CONNECT_INTERVAL_SECS";
const CONNECT_DEADLINE_SECS: &str = "MINIO_CONNECT_DEADLINE_SECS";
const ROTATE_SECRET: &str = "MINIO_ROTATE_SECRET";
const VERIFY_ACCESS: &str = "MINIO_VERIFY_ACCESS";
const POLICY_DIR: &str = "MINIO_POLICY_DIR";
const LOG_LEVEL: &str = "LOG_LEVEL";

/// Everything a bootstrap run needs to know.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_core::{BootstrapConfig, Credentials};
///
/// let config = BootstrapConfig::builder()
///     .bucket("photos".into())
///     .app_credentials(Credentials::new("app", "secret123"))
///     .admin_credentials(Credentials::new("root", "rootpass"))
///     .build();
/// assert_eq!(config.endpoint_url(), "http://minio:9000");
/// assert_eq!(config.policy_name(), "app-policy-photos");
/// ```
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapConfig {
    /// Target bucket.
    pub bucket: String,

    /// Identity provisioned for the application.
    pub app_credentials: Credentials,

    /// Identity used to perform the provisioning.
    pub admin_credentials: Credentials,

    /// Object store hostname.
    #[builder(default = String::from("minio"))]
    pub endpoint_host: String,

    /// Object store port.
    #[builder(default = 9000)]
    pub endpoint_port: u16,

    /// Use `https` instead of `http`.
    #[builder(default = false)]
    pub use_tls: bool,

    /// Region used for request signing and bucket creation.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Retry budget for the initial connection. Bounded by a deadline of
    /// attempts x interval unless overridden.
    #[builder(default)]
    pub connect_retry: RetryPolicy,

    /// Reset the secret of an existing application identity.
    #[builder(default = false)]
    pub rotate_secret: bool,

    /// Exercise the bucket with the application identity after provisioning.
    #[builder(default = false)]
    pub verify_access: bool,

    /// Directory for the transient policy file. System temp dir when `None`.
    #[builder(default)]
    pub policy_dir: Option<PathBuf>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl BootstrapConfig {
    /// Load configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `MINIO_BUCKET_NAME` | *(required)* |
    /// | `MINIO_ACCESS_KEY` | *(required)* |
    /// | `MINIO_SECRET_KEY` | *(required)* |
    /// | `MINIO_ENDPOINT_HOST` | `minio` |
    /// | `MINIO_ENDPOINT_PORT` | `9000` |
    /// | `MINIO_ADMIN_ACCESS_KEY` | `MINIO_ROOT_USER` |
    /// | `MINIO_ADMIN_SECRET_KEY` | `MINIO_ROOT_PASSWORD` |
    /// | `MINIO_USE_TLS` | `false` |
    /// | `MINIO_REGION` | `us-east-1` |
    /// | `MINIO_CONNECT_ATTEMPTS` | `30` |
    /// | `MINIO_CONNECT_INTERVAL_SECS` | `3` |
    /// | `MINIO_CONNECT_DEADLINE_SECS` | attempts x interval |
    /// | `MINIO_ROTATE_SECRET` | `false` |
    /// | `MINIO_VERIFY_ACCESS` | `false` |
    /// | `MINIO_POLICY_DIR` | system temp dir |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// See [`BootstrapConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] listing every absent required value,
    /// [`ConfigError::InvalidValue`] for unparseable optional values, and
    /// [`ConfigError::InvalidBucketName`] for a bucket name S3 would reject.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let bucket = get(BUCKET_NAME);
        let access_key = get(ACCESS_KEY);
        let secret_key = get(SECRET_KEY);
        let admin_access_key = get(ADMIN_ACCESS_KEY).or_else(|| get(ROOT_USER));
        let admin_secret_key = get(ADMIN_SECRET_KEY).or_else(|| get(ROOT_PASSWORD));

        let mut missing = Vec::new();
        if bucket.is_none() {
            missing.push(BUCKET_NAME.to_owned());
        }
        if access_key.is_none() {
            missing.push(ACCESS_KEY.to_owned());
        }
        if secret_key.is_none() {
            missing.push(SECRET_KEY.to_owned());
        }
        if admin_access_key.is_none() {
            missing.push(format!("{ADMIN_ACCESS_KEY} (or {ROOT_USER})"));
        }
        if admin_secret_key.is_none() {
            missing.push(format!("{ADMIN_SECRET_KEY} (or {ROOT_PASSWORD})"));
        }

        let (
            Some(bucket),
            Some(access_key),
            Some(secret_key),
            Some(admin_access_key),
            Some(admin_secret_key),
        ) = (bucket, access_key, secret_key, admin_access_key, admin_secret_key)
        else {
            return Err(ConfigError::Missing(missing));
        };

        validate_bucket_name(&bucket)?;

        let max_attempts = parse_number(CONNECT_ATTEMPTS, get(CONNECT_ATTEMPTS))?
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let interval = parse_number(CONNECT_INTERVAL_SECS, get(CONNECT_INTERVAL_SECS))?
            .map_or(DEFAULT_INTERVAL, Duration::from_secs);
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: CONNECT_ATTEMPTS,
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        let mut connect_retry = RetryPolicy::bounded(max_attempts, interval);
        let deadline = parse_number::<u64>(CONNECT_DEADLINE_SECS, get(CONNECT_DEADLINE_SECS))?;
        if let Some(secs) = deadline {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    name: CONNECT_DEADLINE_SECS,
                    value: "0".to_owned(),
                    reason: "must be at least 1".to_owned(),
                });
            }
            connect_retry.deadline = Some(Duration::from_secs(secs));
        }

        Ok(Self {
            bucket,
            app_credentials: Credentials::new(access_key, secret_key),
            admin_credentials: Credentials::new(admin_access_key, admin_secret_key),
            endpoint_host: get(ENDPOINT_HOST).unwrap_or_else(|| "minio".to_owned()),
            endpoint_port: parse_number(ENDPOINT_PORT, get(ENDPOINT_PORT))?.unwrap_or(9000),
            use_tls: get(USE_TLS).is_some_and(|v| parse_bool(&v)),
            region: get(REGION).unwrap_or_else(|| "us-east-1".to_owned()),
            connect_retry,
            rotate_secret: get(ROTATE_SECRET).is_some_and(|v| parse_bool(&v)),
            verify_access: get(VERIFY_ACCESS).is_some_and(|v| parse_bool(&v)),
            policy_dir: get(POLICY_DIR).map(PathBuf::from),
            log_level: get(LOG_LEVEL).unwrap_or_else(|| "info".to_owned()),
        })
    }

    /// Base URL of the object store, e.g. `http://minio:9000`.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.endpoint_host, self.endpoint_port)
    }

    /// Name of the canned policy for the configured bucket.
    #[must_use]
    pub fn policy_name(&self) -> String {
        policy_name(&self.bucket)
    }
}

/// Read only the bucket name, for commands that never touch the network.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] or [`ConfigError::InvalidBucketName`].
pub fn bucket_from_env() -> Result<String, ConfigError> {
    let bucket = std::env::var(BUCKET_NAME)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::Missing(vec![BUCKET_NAME.to_owned()]))?;
    validate_bucket_name(&bucket)?;
    Ok(bucket)
}

fn parse_number<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name,
                value: v.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
