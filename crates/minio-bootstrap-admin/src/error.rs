//! Translation of transport and service failures into [`AdminError`].

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use minio_bootstrap_core::AdminError;
use serde::Deserialize;

use crate::crypto::SealError;

/// Error code MinIO returns when an identity does not exist.
pub const NO_SUCH_USER: &str = "XMinioAdminNoSuchUser";

/// Error code MinIO returns when a policy mapping is already in place.
pub const POLICY_ALREADY_APPLIED: &str = "XMinioAdminPolicyChangeAlreadyApplied";

/// JSON error body of the admin API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Build an [`AdminError::Service`] from a failed admin API response.
///
/// Falls back to the raw body text when it is not the usual JSON error.
#[must_use]
pub fn parse_admin_error(status: u16, body: &[u8]) -> AdminError {
    match serde_json::from_slice::<AdminErrorBody>(body) {
        Ok(parsed) => AdminError::Service {
            status,
            code: parsed.code,
            message: parsed.message,
        },
        Err(_) => AdminError::Service {
            status,
            code: format!("HTTP{status}"),
            message: String::from_utf8_lossy(body).trim().to_owned(),
        },
    }
}

/// Whether `err` is a service error carrying `code`.
#[must_use]
pub fn has_code(err: &AdminError, code: &str) -> bool {
    matches!(err, AdminError::Service { code: c, .. } if c == code)
}

/// Map a reqwest transport failure.
pub(crate) fn from_reqwest(err: &reqwest::Error) -> AdminError {
    if err.is_connect() || err.is_timeout() {
        AdminError::Unreachable(err.to_string())
    } else {
        AdminError::Request(err.to_string())
    }
}

/// Map an `aws-sdk-s3` failure.
pub(crate) fn from_sdk<E>(err: &SdkError<E, HttpResponse>) -> AdminError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            AdminError::Unreachable(DisplayErrorContext(err).to_string())
        }
        SdkError::ServiceError(_) | SdkError::ResponseError(_) => {
            let status = sdk_status(err).unwrap_or_default();
            AdminError::Service {
                status,
                code: err
                    .code()
                    .map_or_else(|| format!("HTTP{status}"), ToOwned::to_owned),
                message: err.message().unwrap_or_default().to_owned(),
            }
        }
        _ => AdminError::Request(DisplayErrorContext(err).to_string()),
    }
}

/// HTTP status of the raw response behind an SDK error, if one was received.
pub(crate) fn sdk_status<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|raw| raw.status().as_u16())
}

impl From<SealError> for AdminError {
    fn from(err: SealError) -> Self {
        AdminError::Request(err.to_string())
    }
}
