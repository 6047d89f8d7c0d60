//! Resolved template parameters (`parameters.json`).
//!
//! Each permission parameter carries either a comma-joined list of S3
//! actions or the `DISALLOW` sentinel; the template turns each one into a
//! `Fn::Not(Fn::Equals(.., DISALLOW))` condition gating the matching
//! policy resource.

use serde::Serialize;
use std::collections::BTreeSet;

use stratus_core::inputs::{AccessMode, StorageUserInputs};
use stratus_core::permission::{self, Permission};
use stratus_core::template::Expr;

/// Sentinel meaning "do not create the gated policy".
pub const DISALLOW: &str = "DISALLOW";
/// Sentinel meaning "create the gated read/list policy".
pub const ALLOW: &str = "ALLOW";
/// Sentinel for absent values (environment, trigger, policy-name defaults).
pub const NONE_SENTINEL: &str = "NONE";

/// Template parameter names, shared between the parameter file and the
/// template builder.
pub mod names {
    pub const ENV: &str = "env";
    pub const BUCKET_NAME: &str = "bucketName";
    pub const AUTH_ROLE_NAME: &str = "authRoleName";
    pub const UNAUTH_ROLE_NAME: &str = "unauthRoleName";
    pub const PUBLIC_POLICY: &str = "s3PublicPolicy";
    pub const PROTECTED_POLICY: &str = "s3ProtectedPolicy";
    pub const PRIVATE_POLICY: &str = "s3PrivatePolicy";
    pub const UPLOADS_POLICY: &str = "s3UploadsPolicy";
    pub const READ_POLICY: &str = "s3ReadPolicy";
    pub const AUTH_POLICY_NAME: &str = "authPolicyName";
    pub const UNAUTH_POLICY_NAME: &str = "unauthPolicyName";
    pub const AUTH_PUBLIC: &str = "s3PermissionsAuthenticatedPublic";
    pub const AUTH_PROTECTED: &str = "s3PermissionsAuthenticatedProtected";
    pub const AUTH_PRIVATE: &str = "s3PermissionsAuthenticatedPrivate";
    pub const AUTH_UPLOADS: &str = "s3PermissionsAuthenticatedUploads";
    pub const GUEST_PUBLIC: &str = "s3PermissionsGuestPublic";
    pub const GUEST_UPLOADS: &str = "s3PermissionsGuestUploads";
    pub const AUTH_ALLOW_LIST: &str = "AuthenticatedAllowList";
    pub const GUEST_ALLOW_LIST: &str = "GuestAllowList";
    pub const SELECTED_AUTH_PERMISSIONS: &str = "selectedAuthenticatedPermissions";
    pub const SELECTED_GUEST_PERMISSIONS: &str = "selectedGuestPermissions";
    pub const TRIGGER_FUNCTION: &str = "triggerFunction";
}

/// Policy names namespaced by the resource's policy id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyNames {
    pub private: String,
    pub protected: String,
    pub public: String,
    pub read: String,
    pub uploads: String,
    pub auth: String,
    pub unauth: String,
}

impl PolicyNames {
    pub fn from_policy_id(policy_id: &str) -> Self {
        PolicyNames {
            private: format!("Private_policy_{policy_id}"),
            protected: format!("Protected_policy_{policy_id}"),
            public: format!("Public_policy_{policy_id}"),
            read: format!("read_policy_{policy_id}"),
            uploads: format!("Uploads_policy_{policy_id}"),
            auth: format!("s3_amplify_{policy_id}"),
            unauth: format!("s3_amplify_{policy_id}"),
        }
    }
}

/// The fully computed `parameters.json` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParameters {
    pub bucket_name: String,
    pub selected_authenticated_permissions: Vec<String>,
    pub selected_guest_permissions: Vec<String>,
    pub auth_role_name: Expr,
    pub unauth_role_name: Expr,
    pub s3_private_policy: String,
    pub s3_protected_policy: String,
    pub s3_public_policy: String,
    pub s3_read_policy: String,
    pub s3_uploads_policy: String,
    pub auth_policy_name: String,
    pub unauth_policy_name: String,
    pub s3_permissions_authenticated_public: String,
    pub s3_permissions_authenticated_protected: String,
    pub s3_permissions_authenticated_private: String,
    pub s3_permissions_authenticated_uploads: String,
    pub s3_permissions_guest_public: String,
    pub s3_permissions_guest_uploads: String,
    #[serde(rename = "AuthenticatedAllowList")]
    pub authenticated_allow_list: String,
    #[serde(rename = "GuestAllowList")]
    pub guest_allow_list: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_function: Option<String>,
}

impl ResolvedParameters {
    /// Compute the parameter document from a normalized answer record.
    pub fn from_inputs(inputs: &StorageUserInputs) -> Self {
        let names = PolicyNames::from_policy_id(&inputs.policy_id);
        let guest_enabled = inputs.storage_access == AccessMode::AuthAndGuest;
        let guest = if guest_enabled {
            inputs.guest_access.clone()
        } else {
            BTreeSet::new()
        };

        ResolvedParameters {
            bucket_name: inputs.bucket_name.clone(),
            selected_authenticated_permissions: selected_actions(&inputs.auth_access),
            selected_guest_permissions: selected_actions(&guest),
            auth_role_name: Expr::reference("AuthRoleName"),
            unauth_role_name: Expr::reference("UnauthRoleName"),
            s3_private_policy: names.private,
            s3_protected_policy: names.protected,
            s3_public_policy: names.public,
            s3_read_policy: names.read,
            s3_uploads_policy: names.uploads,
            auth_policy_name: names.auth,
            unauth_policy_name: names.unauth,
            s3_permissions_authenticated_public: object_permission_value(&inputs.auth_access),
            s3_permissions_authenticated_protected: object_permission_value(&inputs.auth_access),
            s3_permissions_authenticated_private: object_permission_value(&inputs.auth_access),
            s3_permissions_authenticated_uploads: uploads_permission_value(&inputs.auth_access),
            s3_permissions_guest_public: object_permission_value(&guest),
            s3_permissions_guest_uploads: uploads_permission_value(&guest),
            authenticated_allow_list: allow_list_value(&inputs.auth_access),
            guest_allow_list: allow_list_value(&guest),
            trigger_function: inputs.trigger_function.name().map(str::to_string),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

/// All provider actions for the selected permission set, in stable order.
fn selected_actions(permissions: &BTreeSet<Permission>) -> Vec<String> {
    permission::provider_actions(permissions)
        .iter()
        .map(|a| a.as_str().to_string())
        .collect()
}

/// The public, protected, and private path policies are all-or-nothing:
/// they materialize only when the full create/read/delete target is
/// configured, and then grant exactly the target's actions.
const OBJECT_TARGET: [Permission; 3] = [Permission::Create, Permission::Read, Permission::Delete];

/// The uploads path policy requires `Create` and grants `PutObject`.
const UPLOADS_TARGET: [Permission; 1] = [Permission::Create];

fn object_permission_value(permissions: &BTreeSet<Permission>) -> String {
    target_subset_value(permissions, &OBJECT_TARGET)
}

fn uploads_permission_value(permissions: &BTreeSet<Permission>) -> String {
    target_subset_value(permissions, &UPLOADS_TARGET)
}

/// The target's joined provider actions iff the target is a subset of the
/// configured permissions, else `DISALLOW`.
fn target_subset_value(configured: &BTreeSet<Permission>, target: &[Permission]) -> String {
    if target.iter().all(|p| configured.contains(p)) {
        let target: BTreeSet<Permission> = target.iter().copied().collect();
        permission::joined_provider_actions(&target)
    } else {
        DISALLOW.to_string()
    }
}

/// Read/list policies are gated on `List` membership.
fn allow_list_value(permissions: &BTreeSet<Permission>) -> String {
    if permissions.contains(&Permission::List) {
        ALLOW.to_string()
    } else {
        DISALLOW.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use stratus_core::inputs::TriggerFunction;

    fn inputs(
        access: AccessMode,
        auth: &[Permission],
        guest: &[Permission],
    ) -> StorageUserInputs {
        StorageUserInputs {
            resource_name: "s3abc123".to_string(),
            bucket_name: "myapp-bucket".to_string(),
            policy_id: "ab12cd34".to_string(),
            storage_access: access,
            auth_access: auth.iter().copied().collect(),
            guest_access: guest.iter().copied().collect(),
            group_list: Vec::new(),
            group_permissions: BTreeMap::new(),
            trigger_function: TriggerFunction::None,
        }
        .normalized()
    }

    #[test]
    fn test_policy_names_are_namespaced_by_policy_id() {
        let names = PolicyNames::from_policy_id("ab12cd34");
        assert_eq!(names.private, "Private_policy_ab12cd34");
        assert_eq!(names.read, "read_policy_ab12cd34");
        assert_eq!(names.auth, "s3_amplify_ab12cd34");
        assert_eq!(names.auth, names.unauth);
    }

    #[test]
    fn test_full_crud_auth_permissions() {
        let params = ResolvedParameters::from_inputs(&inputs(
            AccessMode::AuthOnly,
            &[
                Permission::Create,
                Permission::Read,
                Permission::Update,
                Permission::Delete,
            ],
            &[],
        ));

        assert_eq!(
            params.s3_permissions_authenticated_public,
            "s3:PutObject,s3:GetObject,s3:DeleteObject"
        );
        assert_eq!(params.s3_permissions_authenticated_uploads, "s3:PutObject");
        assert_eq!(params.authenticated_allow_list, ALLOW);
        assert_eq!(params.s3_permissions_guest_public, DISALLOW);
        assert_eq!(params.guest_allow_list, DISALLOW);
        assert!(params.selected_guest_permissions.is_empty());
    }

    #[test]
    fn test_read_only_auth_gets_read_policy_only() {
        let params =
            ResolvedParameters::from_inputs(&inputs(AccessMode::AuthOnly, &[Permission::Read], &[]));

        // The path policies are all-or-nothing against their target set.
        assert_eq!(params.s3_permissions_authenticated_public, DISALLOW);
        assert_eq!(params.s3_permissions_authenticated_uploads, DISALLOW);
        // Read implies List after normalization, so the read policy is on.
        assert_eq!(params.authenticated_allow_list, ALLOW);
        assert_eq!(
            params.selected_authenticated_permissions,
            vec!["s3:GetObject", "s3:ListBucket"]
        );
    }

    #[test]
    fn test_partial_auth_set_disallows_path_policies() {
        let params = ResolvedParameters::from_inputs(&inputs(
            AccessMode::AuthOnly,
            &[Permission::Create, Permission::Read],
            &[],
        ));

        // Create and read without delete fall short of the target set.
        assert_eq!(params.s3_permissions_authenticated_public, DISALLOW);
        assert_eq!(params.s3_permissions_authenticated_protected, DISALLOW);
        assert_eq!(params.s3_permissions_authenticated_private, DISALLOW);
        assert_eq!(params.s3_permissions_authenticated_uploads, "s3:PutObject");
    }

    #[test]
    fn test_read_only_guest_public_is_disallowed() {
        let params = ResolvedParameters::from_inputs(&inputs(
            AccessMode::AuthAndGuest,
            &[Permission::Create, Permission::Read],
            &[Permission::Read],
        ));

        assert_eq!(params.s3_permissions_guest_public, DISALLOW);
        assert_eq!(params.s3_permissions_guest_uploads, DISALLOW);
        assert_eq!(params.guest_allow_list, ALLOW);
        assert_eq!(
            params.selected_guest_permissions,
            vec!["s3:GetObject", "s3:ListBucket"]
        );
    }

    #[test]
    fn test_full_target_guest_set_grants_path_policies() {
        let params = ResolvedParameters::from_inputs(&inputs(
            AccessMode::AuthAndGuest,
            &[Permission::Create, Permission::Read, Permission::Delete],
            &[Permission::Create, Permission::Read, Permission::Delete],
        ));

        assert_eq!(
            params.s3_permissions_guest_public,
            "s3:PutObject,s3:GetObject,s3:DeleteObject"
        );
        assert_eq!(params.s3_permissions_guest_uploads, "s3:PutObject");
    }

    #[test]
    fn test_role_names_are_refs() {
        let params =
            ResolvedParameters::from_inputs(&inputs(AccessMode::AuthOnly, &[Permission::Read], &[]));
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value["authRoleName"],
            serde_json::json!({"Ref": "AuthRoleName"})
        );
        assert_eq!(
            value["unauthRoleName"],
            serde_json::json!({"Ref": "UnauthRoleName"})
        );
    }

    #[test]
    fn test_trigger_name_is_omitted_when_absent() {
        let params =
            ResolvedParameters::from_inputs(&inputs(AccessMode::AuthOnly, &[Permission::Read], &[]));
        let value = serde_json::to_value(&params).unwrap();
        assert!(value.get("triggerFunction").is_none());

        let mut with_trigger = inputs(AccessMode::AuthOnly, &[Permission::Read], &[]);
        with_trigger.trigger_function = TriggerFunction::Function("resize".to_string());
        let value =
            serde_json::to_value(ResolvedParameters::from_inputs(&with_trigger)).unwrap();
        assert_eq!(value["triggerFunction"], "resize");
    }
}
