//! Storage permission model.
//!
//! Permissions are the developer-facing verbs collected during the
//! walkthrough. Provider actions are the S3 IAM verbs the template emits.
//! `List` is never asked for directly: it is implied by `Read` and inserted
//! during normalization, so every consumer downstream of [`normalize`] can
//! rely on `Read => List`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A developer-facing access verb for the storage resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Permission {
    /// All verbs offered during the walkthrough, in prompt order.
    pub const ALL: [Permission; 5] = [
        Permission::Create,
        Permission::Read,
        Permission::Update,
        Permission::Delete,
        Permission::List,
    ];

    /// The S3 IAM actions this permission grants.
    pub fn provider_actions(self) -> &'static [ProviderAction] {
        match self {
            Permission::Create | Permission::Update => &[ProviderAction::PutObject],
            Permission::Read => &[ProviderAction::GetObject],
            Permission::Delete => &[ProviderAction::DeleteObject],
            Permission::List => &[ProviderAction::ListBucket],
        }
    }
}

/// An S3 IAM action verb as it appears in policy documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProviderAction {
    PutObject,
    GetObject,
    ListBucket,
    DeleteObject,
}

impl ProviderAction {
    /// The wire form used in policy statements and parameter values.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderAction::PutObject => "s3:PutObject",
            ProviderAction::GetObject => "s3:GetObject",
            ProviderAction::ListBucket => "s3:ListBucket",
            ProviderAction::DeleteObject => "s3:DeleteObject",
        }
    }
}

/// Insert `List` wherever `Read` is present. Idempotent.
pub fn normalize(permissions: &BTreeSet<Permission>) -> BTreeSet<Permission> {
    let mut out = permissions.clone();
    if out.contains(&Permission::Read) {
        out.insert(Permission::List);
    }
    out
}

/// Map a permission set to its deduplicated provider actions, in stable
/// permission order.
pub fn provider_actions(permissions: &BTreeSet<Permission>) -> Vec<ProviderAction> {
    let mut out = Vec::new();
    for permission in permissions {
        for action in permission.provider_actions() {
            if !out.contains(action) {
                out.push(*action);
            }
        }
    }
    out
}

/// Render a permission set as the comma-joined provider-action string used
/// in resolved parameters.
pub fn joined_provider_actions(permissions: &BTreeSet<Permission>) -> String {
    provider_actions(permissions)
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(permissions: &[Permission]) -> BTreeSet<Permission> {
        permissions.iter().copied().collect()
    }

    #[test]
    fn test_normalize_inserts_list_for_read() {
        let normalized = normalize(&set(&[Permission::Read]));
        assert!(normalized.contains(&Permission::List));
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(&set(&[Permission::Create, Permission::Read]));
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_leaves_non_read_sets_alone() {
        let normalized = normalize(&set(&[Permission::Create, Permission::Delete]));
        assert!(!normalized.contains(&Permission::List));
    }

    #[test]
    fn test_provider_action_mapping() {
        assert_eq!(
            Permission::Create.provider_actions(),
            &[ProviderAction::PutObject]
        );
        assert_eq!(
            Permission::Update.provider_actions(),
            &[ProviderAction::PutObject]
        );
        assert_eq!(
            Permission::Read.provider_actions(),
            &[ProviderAction::GetObject]
        );
        assert_eq!(
            Permission::List.provider_actions(),
            &[ProviderAction::ListBucket]
        );
        assert_eq!(
            Permission::Delete.provider_actions(),
            &[ProviderAction::DeleteObject]
        );
    }

    #[test]
    fn test_provider_actions_deduplicate_put_object() {
        let actions = provider_actions(&set(&[Permission::Create, Permission::Update]));
        assert_eq!(actions, vec![ProviderAction::PutObject]);
    }

    #[test]
    fn test_joined_provider_actions() {
        let joined = joined_provider_actions(&normalize(&set(&[
            Permission::Create,
            Permission::Read,
        ])));
        assert_eq!(joined, "s3:PutObject,s3:GetObject,s3:ListBucket");
    }

    #[test]
    fn test_serde_wire_form() {
        let json = serde_json::to_string(&Permission::Create).unwrap();
        assert_eq!(json, "\"CREATE\"");
        let parsed: Permission = serde_json::from_str("\"LIST\"").unwrap();
        assert_eq!(parsed, Permission::List);
    }
}
