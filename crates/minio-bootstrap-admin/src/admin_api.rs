//! Signed client for the MinIO admin REST API (`/minio/admin/v3`).
//!
//! Only the handful of calls the bootstrapper needs are covered. Requests are
//! signed with SigV4 under service `s3`; bodies that carry secrets are sealed
//! with [`crate::crypto::encrypt_data`] using the admin secret key.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use http::Method;
use minio_bootstrap_auth::canonical::encode_query;
use minio_bootstrap_auth::{Credentials, SigningRequest, hash_payload, sign_request};
use minio_bootstrap_core::AdminError;
use serde::Serialize;
use tracing::debug;

use crate::crypto::encrypt_data;
use crate::error::{NO_SUCH_USER, POLICY_ALREADY_APPLIED, from_reqwest, has_code, parse_admin_error};

/// Path prefix of the admin API.
pub const ADMIN_PREFIX: &str = "/minio/admin/v3";

/// SigV4 service name MinIO expects for admin requests.
const SERVICE: &str = "s3";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddUserRequest<'a> {
    secret_key: &'a str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct PolicyAssociationRequest<'a> {
    policies: [&'a str; 1],
    user: &'a str,
}

/// Admin API client bound to one endpoint and one admin identity.
#[derive(Debug, Clone)]
pub struct AdminApi {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    host: String,
    credentials: Credentials,
    region: String,
}

impl AdminApi {
    /// Create a client for `endpoint` (e.g. `http://minio:9000`).
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Request`] if the endpoint is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        credentials: Credentials,
        region: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AdminError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| AdminError::Request(format!("invalid endpoint {endpoint:?}: {e}")))?;
        let host = host_header(&endpoint)?;
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| from_reqwest(&e))?;

        Ok(Self {
            http,
            endpoint,
            host,
            credentials,
            region: region.into(),
        })
    }

    /// `GET info`: succeeds once the server is up and accepts the credentials.
    pub async fn server_info(&self) -> Result<(), AdminError> {
        self.send(Method::GET, "info", &[], Vec::new()).await?;
        Ok(())
    }

    /// `GET user-info`: whether the identity exists.
    pub async fn user_exists(&self, access_key: &str) -> Result<bool, AdminError> {
        match self
            .send(Method::GET, "user-info", &[("accessKey", access_key)], Vec::new())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if has_code(&e, NO_SUCH_USER) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `PUT add-user`: create the identity or reset its secret.
    pub async fn add_user(&self, credentials: &Credentials) -> Result<(), AdminError> {
        let body = serde_json::to_vec(&AddUserRequest {
            secret_key: credentials.secret_key(),
            status: "enabled",
        })
        .map_err(|e| AdminError::Request(e.to_string()))?;
        let sealed = encrypt_data(self.credentials.secret_key(), &body)?;

        self.send(
            Method::PUT,
            "add-user",
            &[("accessKey", credentials.access_key())],
            sealed,
        )
        .await?;
        Ok(())
    }

    /// `PUT add-canned-policy`: create or replace a named policy.
    pub async fn add_canned_policy(&self, name: &str, document: &[u8]) -> Result<(), AdminError> {
        match self
            .send(
                Method::PUT,
                "add-canned-policy",
                &[("name", name)],
                document.to_vec(),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(AdminError::Service { status: 409, .. }) => Err(AdminError::AlreadyExists {
                kind: "policy",
                name: name.to_owned(),
            }),
            Err(e) => Err(e),
        }
    }

    /// `POST idp/builtin/policy/attach`: map `policy` to identity `user`.
    pub async fn attach_policy(&self, policy: &str, user: &str) -> Result<(), AdminError> {
        let body = serde_json::to_vec(&PolicyAssociationRequest {
            policies: [policy],
            user,
        })
        .map_err(|e| AdminError::Request(e.to_string()))?;
        let sealed = encrypt_data(self.credentials.secret_key(), &body)?;

        match self
            .send(Method::POST, "idp/builtin/policy/attach", &[], sealed)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if has_code(&e, POLICY_ALREADY_APPLIED) => Err(AdminError::AlreadyAttached {
                policy: policy.to_owned(),
                user: user.to_owned(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        method: Method,
        operation: &str,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<Bytes, AdminError> {
        let path = format!("{ADMIN_PREFIX}/{operation}");
        let query = encode_query(query);
        let payload_hash = hash_payload(&body);

        let headers = [("host", self.host.as_str())];
        let request = SigningRequest {
            method: method.as_str(),
            path: &path,
            query: &query,
            headers: &headers,
            payload_hash: &payload_hash,
        };
        let signed = sign_request(&request, &self.credentials, &self.region, SERVICE, Utc::now());
        let signed_headers = signed
            .to_header_map()
            .map_err(|e| AdminError::Request(e.to_string()))?;

        let mut url = self.endpoint.clone();
        url.set_path(&path);
        url.set_query((!query.is_empty()).then_some(query.as_str()));

        debug!(%method, operation, "sending admin request");
        let response = self
            .http
            .request(method, url)
            .headers(signed_headers)
            .body(body)
            .send()
            .await
            .map_err(|e| from_reqwest(&e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| from_reqwest(&e))?;
        if status.is_success() {
            Ok(bytes)
        } else {
            debug!(operation, status = status.as_u16(), "admin request failed");
            Err(parse_admin_error(status.as_u16(), &bytes))
        }
    }
}

/// Value of the `Host` header the HTTP client will send for `url`.
fn host_header(url: &reqwest::Url) -> Result<String, AdminError> {
    let host = url
        .host_str()
        .ok_or_else(|| AdminError::Request(format!("endpoint {url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}
