//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::{AppError, SetupError};
use crate::fetch::{PageLimits, RetryPolicy};

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Largest `$top` Microsoft Graph accepts on directory collections.
pub const GRAPH_MAX_PAGE_SIZE: u32 = 999;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub pagination: PaginationConfig,
    pub bulk: BulkConfig,
    pub logging: LoggingConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub tenant: String,
    #[serde(default)]
    pub client_id: String,
    pub authority: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub graph_base_url: String,
    pub management_base_url: String,
    pub subscriptions_api_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_seconds: u64,
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: u64,
}

fn default_max_delay_seconds() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub page_size: u32,
    pub max_pages: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkConfig {
    pub inter_request_delay_ms: u64,
    pub skip_already_disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty means the platform data directory.
    #[serde(default)]
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::embedded()?;

        if let Ok(tenant) = env::var("AZURE_TENANT_ID") {
            config.auth.tenant = tenant;
        }

        if let Ok(client_id) = env::var("AZURE_CLIENT_ID") {
            config.auth.client_id = client_id;
        }

        if let Ok(output_dir) = env::var("TENANT_INVENTORY_OUTPUT_DIR") {
            config.export.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            config.logging.level = log_level;
        }

        config.validate().map_err(AppError::from)?;

        Ok(config)
    }

    /// Parse the embedded defaults without overrides or validation.
    pub fn embedded() -> Result<Self> {
        toml::from_str(CONFIG_TOML).context("Failed to parse embedded config.toml")
    }

    /// Validate that required configuration is present and in range.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.auth.tenant.is_empty() || self.auth.tenant == "YOUR_TENANT_ID" {
            return Err(SetupError::MissingSetting {
                name: "tenant",
                hint: "Set AZURE_TENANT_ID or update auth.tenant in config.toml",
            });
        }

        if self.pagination.page_size == 0 {
            return Err(SetupError::InvalidSetting(
                "pagination.page_size must be > 0".to_string(),
            ));
        }

        if self.pagination.max_pages == 0 {
            return Err(SetupError::InvalidSetting(
                "pagination.max_pages must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy for the fetcher.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_secs(self.retry.base_delay_seconds),
            max_delay: Duration::from_secs(self.retry.max_delay_seconds),
        }
    }

    /// Page limits for Graph collections; page size is clamped to the Graph maximum.
    pub fn graph_page_limits(&self) -> PageLimits {
        PageLimits {
            page_size: self.pagination.page_size.min(GRAPH_MAX_PAGE_SIZE),
            max_pages: self.pagination.max_pages,
        }
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.bulk.inter_request_delay_ms)
    }

    /// Get the token URL for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.auth.authority.trim_end_matches('/'),
            self.auth.tenant
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::embedded().unwrap();
        config.auth.tenant = "contoso.onmicrosoft.com".into();
        config
    }

    #[test]
    fn test_config_parsing() {
        // Parses even though the placeholder tenant fails validation
        let result = toml::from_str::<Config>(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());
    }

    #[test]
    fn test_placeholder_tenant_rejected() {
        let config = Config::embedded().unwrap();
        assert!(matches!(
            config.validate(),
            Err(SetupError::MissingSetting { name: "tenant", .. })
        ));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = test_config();
        config.pagination.page_size = 0;
        assert!(matches!(
            config.validate(),
            Err(SetupError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert!(config.validate().is_ok());

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(10));
        assert_eq!(policy.max_delay, Duration::from_secs(300));
        assert_eq!(config.inter_request_delay(), Duration::from_millis(500));
        assert_eq!(config.graph_page_limits().max_pages, 10_000);
    }

    #[test]
    fn test_page_size_clamped() {
        let mut config = test_config();
        config.pagination.page_size = 5000;
        assert_eq!(config.graph_page_limits().page_size, GRAPH_MAX_PAGE_SIZE);
    }

    #[test]
    fn test_token_url() {
        let config = test_config();
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }
}
