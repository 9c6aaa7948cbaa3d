//! Microsoft Graph API client for directory users and organization info.

use anyhow::{ensure, Context, Result};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::models::{Organization, USER_SELECT};
use super::{build_http_client, check_response};
use crate::auth::{SecureString, TenantContext};
use crate::bulk::AccountMutator;
use crate::error::ApiError;
use crate::fetch::Page;
use crate::query::QuerySpec;

/// Paged collection envelope returned by Graph.
#[derive(Debug, Deserialize)]
struct ODataResponse<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Percent-encode query pairs; spaces become `%20`, which OData expects.
fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Microsoft Graph API client bound to one session.
pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: SecureString,
}

impl GraphClient {
    /// Create a new Graph client for `context`.
    pub fn new(base_url: &str, context: &TenantContext) -> Result<Self> {
        let parsed = Url::parse(base_url).context("Invalid Graph base URL")?;
        ensure!(
            !parsed.cannot_be_a_base(),
            "Graph base URL cannot carry paths: {}",
            base_url
        );

        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: context.access_token.clone(),
        })
    }

    /// First page URL for the users matching `query`.
    pub fn users_url(&self, query: &QuerySpec, page_size: u32) -> String {
        let mut params = vec![
            ("$select", USER_SELECT.join(",")),
            ("$top", page_size.to_string()),
        ];
        if let Some(filter) = query.user_filter() {
            // endswith() is an advanced query and needs $count plus ConsistencyLevel
            params.push(("$filter", filter));
            params.push(("$count", "true".to_string()));
        }
        format!("{}/users?{}", self.base_url, encode_query(&params))
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(user_id))
    }

    /// Attach auth and tracing headers, send, and map the status.
    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4();
        debug!("Graph {} (client-request-id {})", resource, request_id);

        let response = request
            .bearer_auth(self.access_token.as_str())
            .header("client-request-id", request_id.to_string())
            .header("ConsistencyLevel", "eventual")
            .send()
            .await?;

        check_response(response, resource).await
    }

    /// Fetch one page of a collection.
    pub async fn get_page<T: DeserializeOwned>(&self, url: String) -> Result<Page<T>, ApiError> {
        let response = self.send(self.http_client.get(&url), "GET page").await?;
        let body: ODataResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        Ok(Page {
            records: body.value,
            next_link: body.next_link,
        })
    }

    /// Fetch the tenant's organization object.
    pub async fn get_organization(&self) -> Result<Organization, ApiError> {
        let url = format!("{}/organization", self.base_url);
        let response = self
            .send(self.http_client.get(&url), "GET organization")
            .await?;

        let body: ODataResponse<Organization> = response
            .json()
            .await
            .map_err(|e| ApiError::ParseFailed(e.to_string()))?;

        body.value
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ParseFailed("No organization found".to_string()))
    }
}

impl AccountMutator for GraphClient {
    async fn disable_user(&self, user_id: &str) -> Result<(), ApiError> {
        let request = self
            .http_client
            .patch(self.user_url(user_id))
            .json(&serde_json::json!({ "accountEnabled": false }));
        self.send(request, &format!("PATCH users/{}", user_id))
            .await
            .map(|_| ())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        let request = self.http_client.delete(self.user_url(user_id));
        self.send(request, &format!("DELETE users/{}", user_id))
            .await
            .map(|_| ())
    }

    async fn revoke_sessions(&self, user_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/revokeSignInSessions", self.user_url(user_id));
        self.send(
            self.http_client.post(url),
            &format!("POST users/{}/revokeSignInSessions", user_id),
        )
        .await
        .map(|_| ())
    }
}
