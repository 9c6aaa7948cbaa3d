//! Azure Resource Manager client.
//!
//! Uses the Azure Resource Management API to list subscriptions.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_http_client, check_response};
use crate::auth::{SecureString, TenantContext};
use crate::error::ApiError;
use crate::fetch::Page;

/// ARM list envelope; `nextLink` already carries the api-version.
#[derive(Debug, Deserialize)]
struct ArmListResponse<T> {
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

/// Azure Resource Manager client bound to one session.
pub struct ArmClient {
    http_client: reqwest::Client,
    base_url: String,
    subscriptions_api_version: String,
    access_token: SecureString,
}

impl ArmClient {
    /// Create a new ARM client for `context`.
    pub fn new(
        base_url: &str,
        subscriptions_api_version: &str,
        context: &TenantContext,
    ) -> Result<Self> {
        Url::parse(base_url).context("Invalid management base URL")?;

        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            subscriptions_api_version: subscriptions_api_version.to_string(),
            access_token: context.access_token.clone(),
        })
    }

    /// First page URL for the subscription list.
    pub fn subscriptions_url(&self) -> String {
        format!(
            "{}/subscriptions?api-version={}",
            self.base_url, self.subscriptions_api_version
        )
    }

    /// Fetch one page of an ARM collection.
    pub async fn get_page<T: DeserializeOwned>(&self, url: String) -> Result<Page<T>, ApiError> {
        debug!("ARM GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.access_token.as_str())
            .send()
            .await?;
        let response = check_response(response, "GET subscriptions").await?;

        let body: ArmListResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        Ok(Page {
            records: body.value,
            next_link: body.next_link,
        })
    }
}
