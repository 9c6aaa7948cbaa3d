//! OAuth2 client-credentials grant against the Microsoft identity platform.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error};

use super::{ApiSurface, AuthProvider, SecureString, TenantContext};
use crate::config::Config;
use crate::error::AuthError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Signs in as a service principal with a client secret.
#[derive(Debug)]
pub struct ClientCredentialsProvider {
    client_id: String,
    client_secret: SecureString,
    tenant: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl ClientCredentialsProvider {
    /// Create a provider from configuration.
    pub fn new(config: &Config, client_secret: SecureString) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        Ok(Self {
            client_id: config.auth.client_id.clone(),
            client_secret,
            tenant: config.auth.tenant.clone(),
            token_url: config.token_url(),
            http_client,
        })
    }

    /// Exchange the client secret for a token scoped to `surface`.
    pub async fn request_token(&self, surface: ApiSurface) -> Result<TokenResponse, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", surface.scope()),
        ];

        debug!("Requesting {} token from {}", surface, self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            error!("Token request failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::TokenRequestFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))
    }
}

impl AuthProvider for ClientCredentialsProvider {
    async fn connect(&self, surface: ApiSurface) -> Result<TenantContext, AuthError> {
        let token = self.request_token(surface).await?;
        let access_token = SecureString::from(token.access_token);
        if access_token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "empty access_token".to_string(),
            ));
        }

        let acquired_at = Utc::now();
        let expires_at = i64::try_from(token.expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| acquired_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::InvalidTokenResponse(format!(
                    "expires_in {} is out of range",
                    token.expires_in
                ))
            })?;

        Ok(TenantContext {
            tenant: self.tenant.clone(),
            principal: self.client_id.clone(),
            surface,
            access_token,
            acquired_at,
            expires_at: Some(expires_at),
        })
    }
}

/// Token response from the identity platform.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::embedded().unwrap();
        config.auth.tenant = "contoso.onmicrosoft.com".into();
        config.auth.client_id = "app-123".into();
        config.auth.authority = server.uri();
        config
    }

    #[tokio::test]
    async fn test_connect_issues_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso.onmicrosoft.com/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "eyJ.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            &config_for(&server),
            SecureString::from("s3cret".to_string()),
        )
        .unwrap();

        let ctx = provider.connect(ApiSurface::Graph).await.unwrap();
        assert_eq!(ctx.access_token.as_str(), "eyJ.token");
        assert_eq!(ctx.principal, "app-123");
        assert!(ctx.expires_at.is_some());
        assert!(!ctx.is_expired());
    }

    #[tokio::test]
    async fn test_rejected_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            &config_for(&server),
            SecureString::from("wrong".to_string()),
        )
        .unwrap();

        let err = provider.connect(ApiSurface::ResourceManager).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRequestFailed(msg) if msg == "HTTP 401"));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "eyJ.token",
                "token_type": "Bearer",
                "expires_in": u64::MAX
            })))
            .mount(&server)
            .await;

        let provider = ClientCredentialsProvider::new(
            &config_for(&server),
            SecureString::from("s3cret".to_string()),
        )
        .unwrap();

        let err = provider.connect(ApiSurface::Graph).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidTokenResponse(msg) if msg.contains("out of range")));
    }
}
