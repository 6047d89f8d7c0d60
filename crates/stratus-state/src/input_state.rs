//! Versioned persistence for the storage answer record.
//!
//! `cli-inputs.json` wraps [`StorageUserInputs`] in a schema-versioned
//! envelope. Loading a file with an older version fails with
//! `SchemaMismatch` until `migrate` rewrites it; saving validates and
//! normalizes first and stages writes atomically, so a failed save never
//! leaves a partial file behind.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use stratus_core::inputs::{AccessMode, StorageUserInputs, TriggerFunction};
use stratus_core::permission::Permission;
use stratus_core::{Error, Result};

use crate::project::{write_atomic, ProjectPaths};

/// Current schema version of `cli-inputs.json`.
pub const SCHEMA_VERSION: u32 = 1;

/// On-disk envelope around the answer record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFile {
    schema_version: u32,
    inputs: StorageUserInputs,
}

/// Handle to one resource's persisted state.
#[derive(Debug, Clone)]
pub struct UserInputState<'a> {
    paths: &'a ProjectPaths,
    resource_name: String,
}

impl<'a> UserInputState<'a> {
    pub fn new(paths: &'a ProjectPaths, resource_name: impl Into<String>) -> Self {
        UserInputState {
            paths,
            resource_name: resource_name.into(),
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Whether a current-schema state file exists for this resource.
    pub fn exists(&self) -> bool {
        self.paths.cli_inputs_file(&self.resource_name).is_file()
    }

    /// Whether a pre-migration parameter file exists for this resource.
    pub fn legacy_exists(&self) -> bool {
        self.paths
            .legacy_parameters_file(&self.resource_name)
            .is_file()
    }

    /// Load and normalize the answer record.
    pub fn load(&self) -> Result<StorageUserInputs> {
        let path = self.paths.cli_inputs_file(&self.resource_name);
        let content = fs::read_to_string(&path).map_err(|_| {
            Error::not_found(format!(
                "state file for storage resource '{}'",
                self.resource_name
            ))
        })?;
        let file: StateFile = serde_json::from_str(&content)?;
        if file.schema_version != SCHEMA_VERSION {
            return Err(Error::schema_mismatch(
                &self.resource_name,
                file.schema_version,
                SCHEMA_VERSION,
            ));
        }
        Ok(file.inputs.normalized())
    }

    /// Validate, normalize, and persist the answer record.
    ///
    /// Nothing is written when validation fails.
    pub fn save(&self, inputs: &StorageUserInputs) -> Result<()> {
        inputs.validate()?;
        let file = StateFile {
            schema_version: SCHEMA_VERSION,
            inputs: inputs.normalized(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.paths.cli_inputs_file(&self.resource_name), &bytes)?;
        tracing::debug!(resource = %self.resource_name, "saved storage state");
        Ok(())
    }

    /// Delete the resource directory, state and build artifacts included.
    pub fn remove(&self) -> Result<()> {
        let dir = self.paths.storage_resource_dir(&self.resource_name);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Migrate a pre-versioned `parameters.json` into the current schema.
    ///
    /// Idempotent: when a current-schema state file already exists, it is
    /// returned unchanged and nothing is rewritten. The legacy file is
    /// removed after a successful migration.
    pub fn migrate(&self, fallback_policy_id: &str) -> Result<StorageUserInputs> {
        if self.exists() {
            return self.load();
        }
        let legacy_path = self.paths.legacy_parameters_file(&self.resource_name);
        let content = fs::read_to_string(&legacy_path).map_err(|_| {
            Error::not_found(format!(
                "nothing to migrate for storage resource '{}'",
                self.resource_name
            ))
        })?;
        let legacy: LegacyParameters = serde_json::from_str(&content)?;
        let inputs = legacy.into_inputs(&self.resource_name, fallback_policy_id)?;

        self.save(&inputs)?;
        fs::remove_file(&legacy_path)?;
        tracing::info!(resource = %self.resource_name, "migrated legacy parameters to versioned state");
        Ok(inputs)
    }
}

/// List the storage resources that have a state or legacy file on disk.
pub fn list_resources(paths: &ProjectPaths) -> Result<Vec<String>> {
    let storage_dir = paths.backend_dir().join("storage");
    if !storage_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(&storage_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Pre-versioning parameter file shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyParameters {
    bucket_name: String,
    #[serde(default)]
    auth_policy_name: Option<String>,
    #[serde(default)]
    selected_authenticated_permissions: Vec<String>,
    #[serde(default)]
    selected_guest_permissions: Vec<String>,
    #[serde(default)]
    trigger_function: Option<String>,
}

impl LegacyParameters {
    fn into_inputs(
        self,
        resource_name: &str,
        fallback_policy_id: &str,
    ) -> Result<StorageUserInputs> {
        let auth_access = permissions_from_actions(&self.selected_authenticated_permissions)?;
        let guest_access = permissions_from_actions(&self.selected_guest_permissions)?;
        let storage_access = if guest_access.is_empty() {
            AccessMode::AuthOnly
        } else {
            AccessMode::AuthAndGuest
        };

        // Recover the policy id from the legacy auth policy name when it
        // carries one, so generated policy names stay stable across the
        // migration.
        let policy_id = self
            .auth_policy_name
            .as_deref()
            .and_then(|name| name.strip_prefix("s3_amplify_"))
            .filter(|id| !id.is_empty())
            .unwrap_or(fallback_policy_id)
            .to_string();

        let trigger_function = match self.trigger_function {
            None => TriggerFunction::None,
            Some(name) => TriggerFunction::from(name),
        };

        let inputs = StorageUserInputs {
            resource_name: resource_name.to_string(),
            bucket_name: self.bucket_name,
            policy_id,
            storage_access,
            auth_access,
            guest_access,
            group_list: Vec::new(),
            group_permissions: BTreeMap::new(),
            trigger_function,
        };
        Ok(inputs.normalized())
    }
}

/// Invert the provider-action mapping used by the legacy parameter files.
fn permissions_from_actions(actions: &[String]) -> Result<BTreeSet<Permission>> {
    let mut out = BTreeSet::new();
    for action in actions {
        match action.as_str() {
            // The legacy files cannot distinguish create from update; both
            // verbs map onto PutObject, so the grant is preserved as both.
            "s3:PutObject" => {
                out.insert(Permission::Create);
                out.insert(Permission::Update);
            }
            "s3:GetObject" => {
                out.insert(Permission::Read);
            }
            "s3:ListBucket" => {
                out.insert(Permission::List);
            }
            "s3:DeleteObject" => {
                out.insert(Permission::Delete);
            }
            other => {
                return Err(Error::validation(format!(
                    "unrecognized action '{other}' in legacy parameters"
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_inputs() -> StorageUserInputs {
        StorageUserInputs {
            resource_name: "s3abc123".to_string(),
            bucket_name: "myapp-bucket".to_string(),
            policy_id: "ab12cd34".to_string(),
            storage_access: AccessMode::AuthOnly,
            auth_access: [Permission::Create, Permission::Read].into_iter().collect(),
            guest_access: BTreeSet::new(),
            group_list: Vec::new(),
            group_permissions: BTreeMap::new(),
            trigger_function: TriggerFunction::None,
        }
    }

    #[test]
    fn test_save_load_round_trip_modulo_normalization() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");

        let inputs = sample_inputs();
        state.save(&inputs).unwrap();
        let loaded = state.load().unwrap();

        assert_eq!(loaded, inputs.normalized());
        assert!(loaded.auth_access.contains(&Permission::List));
    }

    #[test]
    fn test_invalid_inputs_write_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");

        let mut inputs = sample_inputs();
        inputs.guest_access.insert(Permission::Read);
        assert!(state.save(&inputs).is_err());
        assert!(!state.exists());
    }

    #[test]
    fn test_load_missing_state_is_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");

        assert!(matches!(state.load().unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_future_schema_version_is_a_mismatch() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");
        state.save(&sample_inputs()).unwrap();

        let path = paths.cli_inputs_file("s3abc123");
        let rewritten = fs::read_to_string(&path)
            .unwrap()
            .replace("\"schemaVersion\": 1", "\"schemaVersion\": 9");
        fs::write(&path, rewritten).unwrap();

        assert!(matches!(
            state.load().unwrap_err(),
            Error::SchemaMismatch { found: 9, .. }
        ));
    }

    #[test]
    fn test_migrate_legacy_parameters() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");

        let legacy = serde_json::json!({
            "bucketName": "myapp-bucket",
            "authPolicyName": "s3_amplify_ff00ff00",
            "selectedAuthenticatedPermissions": ["s3:PutObject", "s3:GetObject", "s3:ListBucket"],
            "selectedGuestPermissions": ["s3:GetObject", "s3:ListBucket"],
        });
        write_atomic(
            &paths.legacy_parameters_file("s3abc123"),
            &serde_json::to_vec_pretty(&legacy).unwrap(),
        )
        .unwrap();

        let migrated = state.migrate("fallback1").unwrap();
        assert_eq!(migrated.policy_id, "ff00ff00");
        assert_eq!(migrated.storage_access, AccessMode::AuthAndGuest);
        assert!(migrated.auth_access.contains(&Permission::Create));
        assert!(migrated.auth_access.contains(&Permission::Update));
        assert!(migrated.guest_access.contains(&Permission::List));

        // Legacy file is gone, versioned state is in place.
        assert!(!state.legacy_exists());
        assert!(state.exists());
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");
        state.save(&sample_inputs()).unwrap();

        let before = fs::read(paths.cli_inputs_file("s3abc123")).unwrap();
        let migrated = state.migrate("fallback1").unwrap();
        let after = fs::read(paths.cli_inputs_file("s3abc123")).unwrap();

        assert_eq!(migrated, sample_inputs().normalized());
        assert_eq!(before, after);
    }

    #[test]
    fn test_migrate_with_nothing_to_do_is_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");
        assert!(matches!(
            state.migrate("fallback1").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_list_resources() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        assert!(list_resources(&paths).unwrap().is_empty());

        UserInputState::new(&paths, "s3abc123")
            .save(&sample_inputs())
            .unwrap();
        assert_eq!(list_resources(&paths).unwrap(), vec!["s3abc123"]);
    }
}
