//! AWS Signature Version 4 signing.
//!
//! The flow mirrors verification in reverse:
//!
//! 1. Add `x-amz-date` and `x-amz-content-sha256` to the signed header set.
//! 2. Build the canonical request and hash it.
//! 3. Build the string to sign from the timestamp and credential scope.
//! 4. Derive the signing key from the secret key and scope.
//! 5. Emit the `Authorization` header.
//!
//! The main entry point is [`sign_request`].

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::canonical::{CanonicalHeaders, build_canonical_request};
use crate::credentials::Credentials;
use crate::error::AuthError;

/// The only algorithm this implementation produces.
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

const AMZ_DATE: &str = "x-amz-date";
const AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

type HmacSha256 = Hmac<Sha256>;

/// The parts of an outgoing HTTP request that take part in the signature.
#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    /// HTTP method, e.g. `PUT`.
    pub method: &'a str,
    /// Request path, e.g. `/minio/admin/v3/add-user`.
    pub path: &'a str,
    /// Encoded query string without the leading `?`.
    pub query: &'a str,
    /// Extra headers to sign. Must include `host`.
    pub headers: &'a [(&'a str, &'a str)],
    /// Hex SHA-256 of the request body, see [`hash_payload`].
    pub payload_hash: &'a str,
}

/// Headers produced by [`sign_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value of the `Authorization` header.
    pub authorization: String,
    /// Value of the `x-amz-date` header (`YYYYMMDDTHHMMSSZ`).
    pub amz_date: String,
    /// Value of the `x-amz-content-sha256` header.
    pub content_sha256: String,
}

impl SignedHeaders {
    /// Convert into an [`HeaderMap`] ready to attach to an HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeaderValue`] if a value is not a valid
    /// header value.
    pub fn to_header_map(&self) -> Result<HeaderMap, AuthError> {
        let mut map = HeaderMap::with_capacity(3);
        map.insert(AUTHORIZATION, header_value("authorization", &self.authorization)?);
        map.insert(
            HeaderName::from_static(AMZ_DATE),
            header_value(AMZ_DATE, &self.amz_date)?,
        );
        map.insert(
            HeaderName::from_static(AMZ_CONTENT_SHA256),
            header_value(AMZ_CONTENT_SHA256, &self.content_sha256)?,
        );
        Ok(map)
    }
}

/// Sign a request with the given credentials.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use minio_bootstrap_auth::{Credentials, SigningRequest, hash_payload, sign_request};
///
/// let hash = hash_payload(b"");
/// let request = SigningRequest {
///     method: "GET",
///     path: "/minio/admin/v3/info",
///     query: "",
///     headers: &[("host", "localhost:9000")],
///     payload_hash: &hash,
/// };
/// let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// let signed = sign_request(&request, &Credentials::new("root", "rootpass"), "us-east-1", "s3", now);
/// assert_eq!(signed.amz_date, "20240301T120000Z");
/// ```
#[must_use]
pub fn sign_request(
    request: &SigningRequest<'_>,
    credentials: &Credentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut headers: Vec<(&str, &str)> = request.headers.to_vec();
    headers.push((AMZ_CONTENT_SHA256, request.payload_hash));
    headers.push((AMZ_DATE, &amz_date));

    let canonical_request = build_canonical_request(
        request.method,
        request.path,
        request.query,
        &headers,
        request.payload_hash,
    );
    trace!(canonical_request, "built canonical request");

    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let credential_scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = build_string_to_sign(&amz_date, &credential_scope, &canonical_hash);

    let signing_key = derive_signing_key(credentials.secret_key(), &date, region, service);
    let signature = compute_signature(&signing_key, &string_to_sign);

    let signed_names = CanonicalHeaders::new(&headers).signed_names();
    let authorization = format!(
        "{ALGORITHM} Credential={access_key}/{credential_scope}, SignedHeaders={signed_names}, Signature={signature}",
        access_key = credentials.access_key(),
    );

    SignedHeaders {
        authorization,
        amz_date,
        content_sha256: request.payload_hash.to_owned(),
    }
}

/// Build the SigV4 string to sign.
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Hex SHA-256 of a request body, the `x-amz-content-sha256` value.
///
/// # Examples
///
/// ```
/// use minio_bootstrap_auth::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeaderValue { name })
}
