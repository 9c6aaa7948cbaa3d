//! Typed records decoded at the API boundary.

use serde::{Deserialize, Serialize};

use crate::classify::AccountStatus;
use crate::export::{FlatRecord, Flatten};

/// Directory user from Microsoft Graph `/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Directory object ID.
    pub id: String,

    pub display_name: Option<String>,

    pub user_principal_name: Option<String>,

    pub mail: Option<String>,

    /// Email aliases, e.g. `SMTP:alice@contoso.com`.
    #[serde(default)]
    pub proxy_addresses: Vec<String>,

    pub account_enabled: Option<bool>,

    #[serde(default)]
    pub assigned_licenses: Vec<AssignedLicense>,

    pub department: Option<String>,

    pub job_title: Option<String>,

    /// `Member` or `Guest`.
    pub user_type: Option<String>,

    pub created_date_time: Option<String>,
}

impl User {
    /// UPN, falling back to the object ID.
    pub fn principal_name(&self) -> &str {
        self.user_principal_name.as_deref().unwrap_or(&self.id)
    }

    /// Accounts without an explicit flag are treated as enabled.
    pub fn is_enabled(&self) -> bool {
        self.account_enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedLicense {
    pub sku_id: String,
}

/// Fields requested from `/users`.
pub const USER_SELECT: &[&str] = &[
    "id",
    "displayName",
    "userPrincipalName",
    "mail",
    "proxyAddresses",
    "accountEnabled",
    "assignedLicenses",
    "department",
    "jobTitle",
    "userType",
    "createdDateTime",
];

/// A user together with the status assigned when its page arrived.
#[derive(Debug, Clone)]
pub struct ClassifiedUser {
    pub user: User,
    pub status: AccountStatus,
}

impl Flatten for ClassifiedUser {
    const COLUMNS: &'static [&'static str] = &[
        "Id",
        "DisplayName",
        "UserPrincipalName",
        "Mail",
        "ProxyAddresses",
        "AccountEnabled",
        "LicenseSkuIds",
        "Department",
        "JobTitle",
        "UserType",
        "CreatedDateTime",
        "AccountStatus",
    ];

    fn flatten(&self) -> FlatRecord {
        let user = &self.user;
        let skus: Vec<String> = user
            .assigned_licenses
            .iter()
            .map(|l| l.sku_id.clone())
            .collect();

        FlatRecord::new()
            .field("Id", &user.id)
            .opt("DisplayName", user.display_name.as_deref())
            .opt("UserPrincipalName", user.user_principal_name.as_deref())
            .opt("Mail", user.mail.as_deref())
            .list("ProxyAddresses", &user.proxy_addresses)
            .flag("AccountEnabled", user.account_enabled)
            .list("LicenseSkuIds", &skus)
            .opt("Department", user.department.as_deref())
            .opt("JobTitle", user.job_title.as_deref())
            .opt("UserType", user.user_type.as_deref())
            .opt("CreatedDateTime", user.created_date_time.as_deref())
            .field("AccountStatus", self.status.as_str())
    }
}

/// Azure subscription from ARM `/subscriptions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Subscription ID (GUID).
    pub subscription_id: String,

    pub display_name: String,

    /// Subscription state (e.g., "Enabled").
    pub state: String,

    pub tenant_id: Option<String>,

    #[serde(default)]
    pub subscription_policies: Option<SubscriptionPolicies>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPolicies {
    pub location_placement_id: Option<String>,
    pub quota_id: Option<String>,
    pub spending_limit: Option<String>,
}

impl Flatten for Subscription {
    const COLUMNS: &'static [&'static str] = &[
        "SubscriptionId",
        "DisplayName",
        "State",
        "TenantId",
        "QuotaId",
        "SpendingLimit",
    ];

    fn flatten(&self) -> FlatRecord {
        let policies = self.subscription_policies.as_ref();
        FlatRecord::new()
            .field("SubscriptionId", &self.subscription_id)
            .field("DisplayName", &self.display_name)
            .field("State", &self.state)
            .opt("TenantId", self.tenant_id.as_deref())
            .opt("QuotaId", policies.and_then(|p| p.quota_id.as_deref()))
            .opt(
                "SpendingLimit",
                policies.and_then(|p| p.spending_limit.as_deref()),
            )
    }
}

/// Organization from Microsoft Graph `/organization`.
///
/// Fields not modelled explicitly are kept in `other` so settings exports
/// carry the full object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Tenant ID.
    pub id: String,

    pub display_name: Option<String>,

    #[serde(default)]
    pub verified_domains: Vec<VerifiedDomain>,

    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Organization {
    /// Get the organization name or tenant ID.
    pub fn name_or_id(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.id.clone())
    }

    /// The default verified domain, if flagged.
    pub fn default_domain(&self) -> Option<&str> {
        self.verified_domains
            .iter()
            .find(|d| d.is_default == Some(true))
            .and_then(|d| d.name.as_deref())
    }
}

/// Verified domain info.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedDomain {
    pub name: Option<String>,
    pub is_default: Option<bool>,
    pub is_initial: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_decoding() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "displayName": "Alice",
            "userPrincipalName": "alice@example.com",
            "proxyAddresses": ["SMTP:alice@example.com", "smtp:al@example.com"],
            "accountEnabled": false,
            "assignedLicenses": [{"skuId": "sku-a", "disabledPlans": []}],
            "department": null
        }))
        .unwrap();

        assert_eq!(user.principal_name(), "alice@example.com");
        assert!(!user.is_enabled());
        assert_eq!(user.assigned_licenses[0].sku_id, "sku-a");
        assert!(user.job_title.is_none());
    }

    #[test]
    fn test_user_flatten_joins_lists() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "userPrincipalName": "alice@example.com",
            "proxyAddresses": ["SMTP:alice@example.com", "smtp:al@example.com"],
            "accountEnabled": true
        }))
        .unwrap();
        let record = ClassifiedUser {
            user,
            status: AccountStatus::EnabledUnlicensed,
        }
        .flatten();

        assert_eq!(
            record.get("ProxyAddresses"),
            Some("SMTP:alice@example.com;smtp:al@example.com")
        );
        assert_eq!(record.get("AccountEnabled"), Some("True"));
        assert_eq!(record.get("AccountStatus"), Some("EnabledUnlicensed"));
        assert_eq!(record.get("Department"), Some(""));
        assert_eq!(
            record.names().collect::<Vec<_>>(),
            ClassifiedUser::COLUMNS.to_vec()
        );
    }

    #[test]
    fn test_subscription_columns_match_fields() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "subscriptionId": "sub-1",
            "displayName": "Production",
            "state": "Enabled"
        }))
        .unwrap();

        let record = subscription.flatten();
        assert_eq!(
            record.names().collect::<Vec<_>>(),
            Subscription::COLUMNS.to_vec()
        );
        assert_eq!(record.get("QuotaId"), Some(""));
    }

    #[test]
    fn test_organization_keeps_unmodelled_fields() {
        let org: Organization = serde_json::from_value(serde_json::json!({
            "id": "tenant-1",
            "displayName": "Contoso",
            "verifiedDomains": [
                {"name": "contoso.onmicrosoft.com", "isDefault": false, "isInitial": true},
                {"name": "contoso.com", "isDefault": true, "isInitial": false}
            ],
            "countryLetterCode": "NO"
        }))
        .unwrap();

        assert_eq!(org.name_or_id(), "Contoso");
        assert_eq!(org.default_domain(), Some("contoso.com"));

        let back = serde_json::to_value(&org).unwrap();
        assert_eq!(back["countryLetterCode"], "NO");
    }
}
