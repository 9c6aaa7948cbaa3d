//! HTTP clients for Microsoft Graph and Azure Resource Manager.
//!
//! Both clients map responses through [`check_response`] so throttling,
//! authorization and validation failures surface as the same [`ApiError`]
//! variants regardless of the API surface.

pub mod arm;
pub mod graph;
pub mod models;

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ApiError;

pub use arm::ArmClient;
pub use graph::GraphClient;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_http_client() -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// `OData` / ARM error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Parse a `Retry-After` header given in seconds or as an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

/// A date already in the past means "retry now".
fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Pass successful responses through; turn everything else into an [`ApiError`].
pub async fn check_response(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            debug!(
                "{} answered HTTP {} (Retry-After {:?})",
                resource, status, retry_after
            );
            Err(ApiError::Throttled {
                status: status.as_u16(),
                retry_after,
            })
        }
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(resource.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!("{} failed: HTTP {} - {}", resource, status, body);
            let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error.code, envelope.error.message),
                // Raw non-envelope bodies stay in the log
                Err(_) => (status.to_string(), format!("HTTP {}", status.as_u16())),
            };
            Err(ApiError::Rejected {
                status: status.as_u16(),
                code,
                message,
            })
        }
    }
}
