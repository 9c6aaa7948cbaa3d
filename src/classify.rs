//! Account status heuristic.
//!
//! Labels an account from four facts: whether it is enabled, whether it holds
//! a license, and whether the two profile-completeness fields (department and
//! job title for directory users) are blank. This is a heuristic, not ground
//! truth.

use std::fmt;

use serde::Serialize;

use crate::api::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountStatus {
    EnabledUser,
    EnabledUnlicensed,
    SharedMailboxProbable,
    DeactivatedUser,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnabledUser => "EnabledUser",
            Self::EnabledUnlicensed => "EnabledUnlicensed",
            Self::SharedMailboxProbable => "SharedMailboxProbable",
            Self::DeactivatedUser => "DeactivatedUser",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an account.
///
/// A disabled account is `SharedMailboxProbable` only when it is unlicensed
/// and both profile fields are blank; any other disabled account is
/// `DeactivatedUser`.
pub fn classify_account(
    enabled: bool,
    has_license: bool,
    first_field_blank: bool,
    second_field_blank: bool,
) -> AccountStatus {
    match (enabled, has_license) {
        (true, false) => AccountStatus::EnabledUnlicensed,
        (true, true) => AccountStatus::EnabledUser,
        (false, false) if first_field_blank && second_field_blank => {
            AccountStatus::SharedMailboxProbable
        }
        (false, _) => AccountStatus::DeactivatedUser,
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Classify a directory user using department and job title as profile fields.
pub fn classify_user(user: &User) -> AccountStatus {
    classify_account(
        user.is_enabled(),
        !user.assigned_licenses.is_empty(),
        is_blank(user.department.as_deref()),
        is_blank(user.job_title.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use AccountStatus::*;

    #[test]
    fn test_all_sixteen_combinations() {
        // (enabled, has_license, first_blank, second_blank) -> label
        let cases = [
            ((false, false, false, false), DeactivatedUser),
            ((false, false, false, true), DeactivatedUser),
            ((false, false, true, false), DeactivatedUser),
            ((false, false, true, true), SharedMailboxProbable),
            ((false, true, false, false), DeactivatedUser),
            ((false, true, false, true), DeactivatedUser),
            ((false, true, true, false), DeactivatedUser),
            ((false, true, true, true), DeactivatedUser),
            ((true, false, false, false), EnabledUnlicensed),
            ((true, false, false, true), EnabledUnlicensed),
            ((true, false, true, false), EnabledUnlicensed),
            ((true, false, true, true), EnabledUnlicensed),
            ((true, true, false, false), EnabledUser),
            ((true, true, false, true), EnabledUser),
            ((true, true, true, false), EnabledUser),
            ((true, true, true, true), EnabledUser),
        ];

        assert_eq!(cases.len(), 16);
        for ((enabled, licensed, first, second), expected) in cases {
            assert_eq!(
                classify_account(enabled, licensed, first, second),
                expected,
                "enabled={} licensed={} first_blank={} second_blank={}",
                enabled,
                licensed,
                first,
                second
            );
        }
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify_account(false, false, true, true), SharedMailboxProbable);
        }
    }

    #[test]
    fn test_classify_user_treats_whitespace_as_blank() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "accountEnabled": false,
            "department": "  ",
            "assignedLicenses": []
        }))
        .unwrap();
        assert_eq!(classify_user(&user), SharedMailboxProbable);

        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u2",
            "accountEnabled": false,
            "jobTitle": "Engineer"
        }))
        .unwrap();
        assert_eq!(classify_user(&user), DeactivatedUser);
    }

    #[test]
    fn test_missing_enabled_flag_counts_as_enabled() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u3",
            "assignedLicenses": [{"skuId": "sku"}]
        }))
        .unwrap();
        assert_eq!(classify_user(&user), EnabledUser);
    }
}
