//! Error types for the tenant-inventory tool.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Problems detected before any network call is made.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Missing setting `{name}`: {hint}")]
    MissingSetting {
        name: &'static str,
        hint: &'static str,
    },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Cannot prepare directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Authentication-related errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No credentials configured: {0}")]
    MissingCredentials(String),

    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Token response could not be read: {0}")]
    InvalidTokenResponse(String),

    #[error("User cancelled authentication")]
    UserCancelled,
}

/// API-related errors.
///
/// `Throttled` and `Network` are transient and retried by the fetcher; every
/// other variant is permanent.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Throttled or busy (HTTP {status})")]
    Throttled {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Not found (404): {0}")]
    NotFound(String),

    #[error("Request rejected (HTTP {status}): {code} - {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),
}

impl ApiError {
    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::Network(_))
    }

    /// Server-suggested wait, if the response carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseFailed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors raised by the retrying fetcher and paginator.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("RetryLimitExceeded: {operation} still failing after {attempts} attempts ({last})")]
    RetryLimitExceeded {
        operation: String,
        attempts: u32,
        last: ApiError,
    },

    #[error("PaginationLoopSuspected: {operation} stopped after {pages} pages at {link}")]
    PaginationLoopSuspected {
        operation: String,
        pages: usize,
        link: String,
    },

    #[error("Cancelled: {operation} interrupted before it completed")]
    Cancelled { operation: String },
}

impl FetchError {
    /// The underlying API error, if the failure came from the server.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::RetryLimitExceeded { last, .. } => Some(last),
            Self::PaginationLoopSuspected { .. } | Self::Cancelled { .. } => None,
        }
    }
}

/// Failures writing output files.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Returns a user-friendly message for display on the console.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Setup(_) => "The tool is not configured correctly.",
            Self::Auth(AuthError::UserCancelled) => "Sign-in was cancelled.",
            Self::Auth(_) => "Could not establish a session with the tenant.",
            Self::Api(ApiError::Unauthorized) => "Authentication expired or was rejected.",
            Self::Api(ApiError::Forbidden) => "Insufficient permissions for this operation.",
            Self::Fetch(FetchError::RetryLimitExceeded { .. }) => {
                "The service kept throttling requests."
            }
            Self::Fetch(FetchError::PaginationLoopSuspected { .. }) => {
                "The service returned a looping page sequence."
            }
            Self::Fetch(FetchError::Cancelled { .. }) => "The run was cancelled.",
            Self::Export(_) => "Results could not be written to disk.",
            _ => "An API request failed.",
        }
    }

    /// Suggested next step for the operator.
    pub fn remedy(&self) -> &str {
        match self {
            Self::Setup(_) => "Check config.toml and the AZURE_* environment variables.",
            Self::Auth(_) => {
                "Verify AZURE_CLIENT_ID / AZURE_CLIENT_SECRET or provide TENANT_ACCESS_TOKEN."
            }
            Self::Api(ApiError::Forbidden) => {
                "Grant the app registration the required API permissions and admin consent."
            }
            Self::Fetch(e) if matches!(e.api_error(), Some(ApiError::Forbidden)) => {
                "Grant the app registration the required API permissions and admin consent."
            }
            Self::Fetch(FetchError::RetryLimitExceeded { .. }) => {
                "Wait a few minutes and run again, or raise retry.max_retries."
            }
            Self::Export(_) => "Choose a writable output directory with --output-dir.",
            _ => "Check the run log for details and try again.",
        }
    }
}
