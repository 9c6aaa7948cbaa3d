//! Operator-supplied query parameters, validated before any request is made.

use crate::api::models::User;
use crate::error::SetupError;

/// What to fetch. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    domain: Option<String>,
    include_disabled: bool,
}

impl QuerySpec {
    /// Build a query for an optional domain suffix (`example.com` or `@example.com`).
    pub fn new(domain: Option<&str>, include_disabled: bool) -> Result<Self, SetupError> {
        let domain = domain
            .map(|d| d.trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty());

        if let Some(d) = &domain {
            let valid = d.contains('.')
                && !d.starts_with('.')
                && !d.ends_with('.')
                && d
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
            if !valid {
                return Err(SetupError::InvalidSetting(format!(
                    "`{}` is not a domain name",
                    d
                )));
            }
        }

        Ok(Self {
            domain,
            include_disabled,
        })
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn include_disabled(&self) -> bool {
        self.include_disabled
    }

    /// `$filter` expression for Graph `/users`, if any.
    pub fn user_filter(&self) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(domain) = &self.domain {
            clauses.push(format!("endswith(userPrincipalName,'@{}')", domain));
        }
        if !self.include_disabled {
            clauses.push("accountEnabled eq true".to_string());
        }

        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        }
    }

    /// Client-side check applied before destructive actions.
    pub fn matches(&self, user: &User) -> bool {
        let domain_ok = match &self.domain {
            Some(domain) => user
                .user_principal_name
                .as_deref()
                .map(|upn| upn.to_ascii_lowercase().ends_with(&format!("@{}", domain)))
                .unwrap_or(false),
            None => true,
        };
        domain_ok && (self.include_disabled || user.is_enabled())
    }

    /// Label used in file names: the domain, or the tenant when unfiltered.
    pub fn scope_label<'a>(&'a self, tenant: &'a str) -> &'a str {
        self.domain().unwrap_or(tenant)
    }
}
