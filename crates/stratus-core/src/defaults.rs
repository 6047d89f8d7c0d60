//! Default answers for the storage walkthrough.
//!
//! Defaults are deterministic given the project name and an injected seed;
//! entropy is never generated inside the computation, so tests can pin it.

use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::inputs::{AccessMode, StorageUserInputs, TriggerFunction};
use crate::permission::Permission;

/// Bucket names are capped well below the S3 limit to leave room for the
/// environment suffix appended in the template.
pub const BUCKET_NAME_MAX_LEN: usize = 47;

/// Entropy injected into default resource and bucket names.
#[derive(Debug, Clone)]
pub struct DefaultsSeed {
    /// Short token: first uuid segment, 8 hex chars.
    pub short_id: String,
    /// Longer token mixed into the bucket name: uuid hex without dashes.
    pub bucket_entropy: String,
}

impl DefaultsSeed {
    /// Fresh random seed.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        DefaultsSeed {
            short_id: id[..8].to_string(),
            bucket_entropy: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Fixed seed, for tests and replays.
    pub fn fixed(short_id: impl Into<String>, bucket_entropy: impl Into<String>) -> Self {
        DefaultsSeed {
            short_id: short_id.into(),
            bucket_entropy: bucket_entropy.into(),
        }
    }
}

/// Permissions preselected for authenticated users.
pub fn default_auth_permissions() -> BTreeSet<Permission> {
    [Permission::Create, Permission::Read, Permission::List]
        .into_iter()
        .collect()
}

/// Permissions preselected for guest users when guest access is enabled.
pub fn default_guest_permissions() -> BTreeSet<Permission> {
    [Permission::Read, Permission::List].into_iter().collect()
}

/// Compute the default answer record for a new storage resource.
pub fn storage_defaults(project_name: &str, seed: &DefaultsSeed) -> StorageUserInputs {
    let mut bucket_name = format!("{}{}", sanitize(project_name), seed.bucket_entropy);
    bucket_name.truncate(BUCKET_NAME_MAX_LEN);

    StorageUserInputs {
        resource_name: format!("s3{}", seed.short_id),
        bucket_name,
        policy_id: seed.short_id.clone(),
        storage_access: AccessMode::AuthOnly,
        auth_access: default_auth_permissions(),
        guest_access: BTreeSet::new(),
        group_list: Vec::new(),
        group_permissions: BTreeMap::new(),
        trigger_function: TriggerFunction::None,
    }
}

/// Lower-case the project name and drop everything a bucket name cannot hold.
fn sanitize(project_name: &str) -> String {
    project_name
        .chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
