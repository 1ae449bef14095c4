//! [`ObjectStoreAdmin`] implementation for a live MinIO server.

use std::time::Duration;

use async_trait::async_trait;
use minio_bootstrap_auth::Credentials;
use minio_bootstrap_core::{AdminError, BootstrapConfig, ObjectStoreAdmin};
use tracing::debug;

use crate::admin_api::AdminApi;
use crate::s3;

/// Per-request timeout for admin and S3 calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// MinIO client combining the admin REST API with the S3 API.
///
/// Buckets are managed over S3 with the admin identity; identities and
/// policies over the admin API. The access probe builds a separate S3 client
/// for the application identity.
#[derive(Debug, Clone)]
pub struct MinioClient {
    admin: AdminApi,
    s3: aws_sdk_s3::Client,
    endpoint: String,
    region: String,
}

impl MinioClient {
    /// Create a client from the bootstrap configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Request`] if the endpoint URL is invalid.
    pub fn new(config: &BootstrapConfig) -> Result<Self, AdminError> {
        Self::connect(
            &config.endpoint_url(),
            &config.region,
            config.admin_credentials.clone(),
        )
    }

    /// Create a client for `endpoint` acting as `admin`.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Request`] if the endpoint URL is invalid.
    pub fn connect(endpoint: &str, region: &str, admin: Credentials) -> Result<Self, AdminError> {
        let s3 = s3::s3_client(endpoint, region, &admin, REQUEST_TIMEOUT);
        let admin = AdminApi::new(endpoint, admin, region, REQUEST_TIMEOUT)?;
        debug!(endpoint, region, "created MinIO client");

        Ok(Self {
            admin,
            s3,
            endpoint: endpoint.to_owned(),
            region: region.to_owned(),
        })
    }
}

#[async_trait]
impl ObjectStoreAdmin for MinioClient {
    async fn check_connection(&self) -> Result<(), AdminError> {
        self.admin.server_info().await
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, AdminError> {
        s3::bucket_exists(&self.s3, bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), AdminError> {
        s3::create_bucket(&self.s3, bucket, &self.region).await
    }

    async fn user_exists(&self, access_key: &str) -> Result<bool, AdminError> {
        self.admin.user_exists(access_key).await
    }

    async fn put_user(&self, credentials: &Credentials) -> Result<(), AdminError> {
        self.admin.add_user(credentials).await
    }

    async fn put_policy(&self, name: &str, document: &[u8]) -> Result<(), AdminError> {
        self.admin.add_canned_policy(name, document).await
    }

    async fn attach_policy(&self, policy: &str, user: &str) -> Result<(), AdminError> {
        self.admin.attach_policy(policy, user).await
    }

    async fn probe_access(
        &self,
        bucket: &str,
        credentials: &Credentials,
    ) -> Result<(), AdminError> {
        let client = s3::s3_client(&self.endpoint, &self.region, credentials, REQUEST_TIMEOUT);
        s3::probe_access(&client, bucket).await
    }
}
