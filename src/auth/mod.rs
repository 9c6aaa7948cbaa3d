//! Tenant authentication.
//!
//! An [`AuthProvider`] turns configured credentials into a [`TenantContext`]
//! for one API surface. Interactive sign-in is out of scope; sessions come
//! from a client-credentials exchange or from a token acquired elsewhere.

pub mod client_credentials;
pub mod secure;

use std::env;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::config::Config;
use crate::error::AuthError;

pub use client_credentials::ClientCredentialsProvider;
pub use secure::SecureString;

/// API surfaces a command may talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    Graph,
    ResourceManager,
}

impl ApiSurface {
    /// `.default` scope requested for the surface.
    pub fn scope(&self) -> &'static str {
        match self {
            Self::Graph => "https://graph.microsoft.com/.default",
            Self::ResourceManager => "https://management.azure.com/.default",
        }
    }

    /// Environment variable holding a pre-acquired token for the surface.
    pub fn token_env_var(&self) -> &'static str {
        match self {
            Self::Graph => "TENANT_ACCESS_TOKEN",
            Self::ResourceManager => "TENANT_ARM_ACCESS_TOKEN",
        }
    }
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph => f.write_str("Microsoft Graph"),
            Self::ResourceManager => f.write_str("Azure Resource Manager"),
        }
    }
}

/// An authenticated session against one tenant and API surface.
///
/// Held for the duration of a command and dropped at exit; never persisted.
#[derive(Debug, Clone)]
pub struct TenantContext {
    /// Tenant ID or domain the session was issued for.
    pub tenant: String,
    /// Authenticated principal (client ID or a label for externally issued tokens).
    pub principal: String,
    pub surface: ApiSurface,
    pub access_token: SecureString,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TenantContext {
    /// Whether the token is past (or within a minute of) its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expiry| expiry - Duration::minutes(1) <= Utc::now())
    }
}

/// Produces sessions for an API surface.
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    async fn connect(&self, surface: ApiSurface) -> Result<TenantContext, AuthError>;
}

/// Uses tokens acquired outside the tool, read from the environment.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    tenant: String,
    graph_token: Option<SecureString>,
    arm_token: Option<SecureString>,
}

impl StaticTokenProvider {
    pub fn new(
        tenant: impl Into<String>,
        graph_token: Option<SecureString>,
        arm_token: Option<SecureString>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            graph_token,
            arm_token,
        }
    }

    /// Read `TENANT_ACCESS_TOKEN` / `TENANT_ARM_ACCESS_TOKEN`; `None` when neither is set.
    pub fn from_env(tenant: &str) -> Option<Self> {
        let read = |surface: ApiSurface| {
            env::var(surface.token_env_var())
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecureString::from)
        };

        let graph_token = read(ApiSurface::Graph);
        let arm_token = read(ApiSurface::ResourceManager);

        if graph_token.is_none() && arm_token.is_none() {
            return None;
        }

        Some(Self::new(tenant, graph_token, arm_token))
    }
}

impl AuthProvider for StaticTokenProvider {
    async fn connect(&self, surface: ApiSurface) -> Result<TenantContext, AuthError> {
        let token = match surface {
            ApiSurface::Graph => self.graph_token.as_ref(),
            ApiSurface::ResourceManager => self.arm_token.as_ref(),
        }
        .ok_or_else(|| {
            AuthError::MissingCredentials(format!(
                "{} is not set for {}",
                surface.token_env_var(),
                surface
            ))
        })?;

        Ok(TenantContext {
            tenant: self.tenant.clone(),
            principal: "pre-acquired token".to_string(),
            surface,
            access_token: token.clone(),
            acquired_at: Utc::now(),
            expires_at: None,
        })
    }
}

/// The credential source picked from configuration and environment.
#[derive(Debug)]
pub enum Credentials {
    Static(StaticTokenProvider),
    ClientSecret(ClientCredentialsProvider),
}

impl Credentials {
    /// Pick a credential source: pre-acquired tokens win over a client secret.
    pub fn resolve(config: &Config) -> Result<Self, AuthError> {
        if let Some(provider) = StaticTokenProvider::from_env(&config.auth.tenant) {
            info!("Using pre-acquired access token(s) from the environment");
            return Ok(Self::Static(provider));
        }

        let secret = env::var("AZURE_CLIENT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecureString::from);

        match secret {
            Some(secret) if !config.auth.client_id.is_empty() => {
                info!("Using client credentials for {}", config.auth.client_id);
                Ok(Self::ClientSecret(ClientCredentialsProvider::new(
                    config, secret,
                )?))
            }
            _ => Err(AuthError::MissingCredentials(
                "set TENANT_ACCESS_TOKEN, or AZURE_CLIENT_ID and AZURE_CLIENT_SECRET".to_string(),
            )),
        }
    }
}

impl AuthProvider for Credentials {
    async fn connect(&self, surface: ApiSurface) -> Result<TenantContext, AuthError> {
        let context = match self {
            Self::Static(p) => p.connect(surface).await?,
            Self::ClientSecret(p) => p.connect(surface).await?,
        };

        info!(
            "Connected to {} for tenant {} as {}",
            context.surface, context.tenant, context.principal
        );
        Ok(context)
    }
}
