//! The persisted answer record for a storage resource.
//!
//! `StorageUserInputs` is the single source of truth the build pipeline
//! consumes. It is collected by the walkthrough, validated before every
//! save, and normalized (`Read => List`) on every load and save path.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::permission::{self, Permission};

/// Who may access the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Authenticated users only.
    #[serde(rename = "auth")]
    AuthOnly,
    /// Authenticated and guest (unauthenticated) users.
    #[serde(rename = "authAndGuest")]
    AuthAndGuest,
}

/// Optional Lambda trigger attached to the bucket.
///
/// Serialized as the function name, or the literal `"NONE"` when absent,
/// matching the on-disk state format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerFunction {
    None,
    Function(String),
}

impl TriggerFunction {
    pub fn is_none(&self) -> bool {
        matches!(self, TriggerFunction::None)
    }

    /// The function name, if a trigger is configured.
    pub fn name(&self) -> Option<&str> {
        match self {
            TriggerFunction::None => None,
            TriggerFunction::Function(name) => Some(name),
        }
    }
}

impl From<String> for TriggerFunction {
    fn from(value: String) -> Self {
        if value == "NONE" {
            TriggerFunction::None
        } else {
            TriggerFunction::Function(value)
        }
    }
}

impl From<TriggerFunction> for String {
    fn from(value: TriggerFunction) -> Self {
        match value {
            TriggerFunction::None => "NONE".to_string(),
            TriggerFunction::Function(name) => name,
        }
    }
}

/// Everything the developer decided about the storage resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUserInputs {
    /// Logical resource name, used for directory and template naming.
    pub resource_name: String,

    /// Physical bucket name prefix (the environment suffix is applied in
    /// the template).
    pub bucket_name: String,

    /// Short token namespacing the generated policy names.
    pub policy_id: String,

    /// Who may access the bucket.
    pub storage_access: AccessMode,

    /// Permissions for authenticated users.
    #[serde(default)]
    pub auth_access: BTreeSet<Permission>,

    /// Permissions for guest users. Must be empty under [`AccessMode::AuthOnly`].
    #[serde(default)]
    pub guest_access: BTreeSet<Permission>,

    /// Cognito user-pool groups with per-group access, in prompt order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_list: Vec<String>,

    /// Per-group permission sets. Keys must match `group_list` exactly.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub group_permissions: BTreeMap<String, BTreeSet<Permission>>,

    /// Optional Lambda trigger.
    #[serde(default)]
    pub trigger_function: TriggerFunction,
}

impl Default for TriggerFunction {
    fn default() -> Self {
        TriggerFunction::None
    }
}

impl StorageUserInputs {
    /// Validate the record's invariants. Called before every save and at
    /// the head of every build.
    pub fn validate(&self) -> Result<()> {
        if self.resource_name.is_empty() {
            return Err(Error::validation("resource name must not be empty"));
        }
        if !self.resource_name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::validation(format!(
                "resource name '{}' must be alphanumeric",
                self.resource_name
            )));
        }
        if self.bucket_name.len() < 3 || self.bucket_name.len() > 47 {
            return Err(Error::validation(format!(
                "bucket name '{}' must be between 3 and 47 characters",
                self.bucket_name
            )));
        }
        if !self
            .bucket_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::validation(format!(
                "bucket name '{}' may only contain lowercase letters, digits, and hyphens",
                self.bucket_name
            )));
        }
        if self.storage_access == AccessMode::AuthOnly && !self.guest_access.is_empty() {
            return Err(Error::validation(
                "guest permissions are set but access mode is auth-only",
            ));
        }
        let listed: BTreeSet<&String> = self.group_list.iter().collect();
        if listed.len() != self.group_list.len() {
            return Err(Error::validation("group list contains duplicates"));
        }
        let keyed: BTreeSet<&String> = self.group_permissions.keys().collect();
        if listed != keyed {
            return Err(Error::validation(
                "group list and group permissions are out of sync",
            ));
        }
        Ok(())
    }

    /// Apply `Read => List` normalization to every permission set.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.auth_access = permission::normalize(&self.auth_access);
        out.guest_access = permission::normalize(&self.guest_access);
        out.group_permissions = self
            .group_permissions
            .iter()
            .map(|(group, permissions)| (group.clone(), permission::normalize(permissions)))
            .collect();
        out
    }

    /// Whether any group-level access is configured.
    pub fn has_groups(&self) -> bool {
        !self.group_list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StorageUserInputs {
        StorageUserInputs {
            resource_name: "s3abc123".to_string(),
            bucket_name: "myapp-bucket".to_string(),
            policy_id: "ab12cd34".to_string(),
            storage_access: AccessMode::AuthAndGuest,
            auth_access: [Permission::Create, Permission::Read].into_iter().collect(),
            guest_access: [Permission::Read].into_iter().collect(),
            group_list: Vec::new(),
            group_permissions: BTreeMap::new(),
            trigger_function: TriggerFunction::None,
        }
    }

    #[test]
    fn test_valid_inputs_pass() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_guest_permissions_rejected_under_auth_only() {
        let mut inputs = sample();
        inputs.storage_access = AccessMode::AuthOnly;
        let err = inputs.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_bucket_name_charset_enforced() {
        let mut inputs = sample();
        inputs.bucket_name = "MyApp_Bucket".to_string();
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn test_bucket_name_length_enforced() {
        let mut inputs = sample();
        inputs.bucket_name = "ab".to_string();
        assert!(inputs.validate().is_err());
        inputs.bucket_name = "a".repeat(48);
        assert!(inputs.validate().is_err());
        inputs.bucket_name = "a".repeat(47);
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_group_list_must_match_permission_keys() {
        let mut inputs = sample();
        inputs.group_list = vec!["admins".to_string()];
        assert!(inputs.validate().is_err());

        inputs
            .group_permissions
            .insert("admins".to_string(), [Permission::Read].into_iter().collect());
        assert!(inputs.validate().is_ok());

        // Order of the list does not matter, only membership.
        inputs.group_list = vec!["editors".to_string(), "admins".to_string()];
        inputs
            .group_permissions
            .insert("editors".to_string(), [Permission::Create].into_iter().collect());
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_normalized_applies_read_implies_list_everywhere() {
        let mut inputs = sample();
        inputs.group_list = vec!["admins".to_string()];
        inputs
            .group_permissions
            .insert("admins".to_string(), [Permission::Read].into_iter().collect());

        let normalized = inputs.normalized();
        assert!(normalized.auth_access.contains(&Permission::List));
        assert!(normalized.guest_access.contains(&Permission::List));
        assert!(normalized.group_permissions["admins"].contains(&Permission::List));
    }

    #[test]
    fn test_trigger_function_wire_form() {
        let none = serde_json::to_string(&TriggerFunction::None).unwrap();
        assert_eq!(none, "\"NONE\"");

        let named =
            serde_json::to_string(&TriggerFunction::Function("resize".to_string())).unwrap();
        assert_eq!(named, "\"resize\"");

        let parsed: TriggerFunction = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(parsed, TriggerFunction::None);
        let parsed: TriggerFunction = serde_json::from_str("\"resize\"").unwrap();
        assert_eq!(parsed, TriggerFunction::Function("resize".to_string()));
    }

    #[test]
    fn test_inputs_round_trip() {
        let inputs = sample();
        let json = serde_json::to_string_pretty(&inputs).unwrap();
        let back: StorageUserInputs = serde_json::from_str(&json).unwrap();
        assert_eq!(inputs, back);
    }
}
