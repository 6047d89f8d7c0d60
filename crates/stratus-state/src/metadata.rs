//! Project-wide resource metadata (`backend-config.json`).
//!
//! The file maps category name to resource name to a metadata entry. The
//! build pipeline only ever touches the `dependsOn` list of the resource it
//! owns; entries belonging to other categories pass through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use stratus_core::{DependencyEdge, Error, Result};

use crate::project::{write_atomic, ProjectPaths};

/// Metadata entry for one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    /// Provider service backing the resource (e.g. `S3`).
    pub service: String,

    /// Provider plugin that builds and deploys the resource.
    pub provider_plugin: String,

    /// Cross-resource dependencies referenced by the rendered template.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependencyEdge>,

    /// When this resource's artifacts were last built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build_timestamp: Option<DateTime<Utc>>,

    /// Fields owned by other tooling, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResourceEntry {
    /// A fresh S3 storage entry.
    pub fn s3() -> Self {
        ResourceEntry {
            service: "S3".to_string(),
            provider_plugin: "cloudformation".to_string(),
            depends_on: Vec::new(),
            last_build_timestamp: None,
            extra: BTreeMap::new(),
        }
    }
}

/// The whole `backend-config.json` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendConfig {
    categories: BTreeMap<String, BTreeMap<String, ResourceEntry>>,
}

impl BackendConfig {
    /// Load the metadata file; a missing file is an empty document.
    pub fn load(paths: &ProjectPaths) -> Result<Self> {
        let path = paths.backend_config_file();
        if !path.is_file() {
            return Ok(BackendConfig::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the metadata file atomically.
    pub fn save(&self, paths: &ProjectPaths) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(&paths.backend_config_file(), &bytes)
    }

    /// Look up one resource's entry.
    pub fn get(&self, category: &str, resource_name: &str) -> Option<&ResourceEntry> {
        self.categories.get(category)?.get(resource_name)
    }

    /// Insert or replace a resource entry, keeping an existing entry's
    /// `dependsOn` and timestamp when one is already present.
    pub fn upsert(&mut self, category: &str, resource_name: &str, entry: ResourceEntry) {
        let resources = self.categories.entry(category.to_string()).or_default();
        match resources.get_mut(resource_name) {
            Some(existing) => {
                existing.service = entry.service;
                existing.provider_plugin = entry.provider_plugin;
            }
            None => {
                resources.insert(resource_name.to_string(), entry);
            }
        }
    }

    /// Replace the `dependsOn` list of one resource. The resource must
    /// already have an entry.
    pub fn set_depends_on(
        &mut self,
        category: &str,
        resource_name: &str,
        depends_on: Vec<DependencyEdge>,
    ) -> Result<()> {
        let entry = self
            .categories
            .get_mut(category)
            .and_then(|resources| resources.get_mut(resource_name))
            .ok_or_else(|| {
                Error::not_found(format!("metadata entry for {category}/{resource_name}"))
            })?;
        entry.depends_on = depends_on;
        Ok(())
    }

    /// Stamp the build time of one resource.
    pub fn touch_build_timestamp(
        &mut self,
        category: &str,
        resource_name: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self
            .categories
            .get_mut(category)
            .and_then(|resources| resources.get_mut(resource_name))
            .ok_or_else(|| {
                Error::not_found(format!("metadata entry for {category}/{resource_name}"))
            })?;
        entry.last_build_timestamp = Some(at);
        Ok(())
    }

    /// Remove one resource's entry; empty categories are pruned.
    pub fn remove(&mut self, category: &str, resource_name: &str) -> Option<ResourceEntry> {
        let resources = self.categories.get_mut(category)?;
        let removed = resources.remove(resource_name);
        if resources.is_empty() {
            self.categories.remove(category);
        }
        removed
    }

    /// Resource names configured under one category, in name order.
    pub fn resources_in(&self, category: &str) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|resources| resources.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn edge(resource: &str, attribute: &str) -> DependencyEdge {
        DependencyEdge {
            category: "auth".to_string(),
            resource_name: resource.to_string(),
            attributes: vec![attribute.to_string()],
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let config = BackendConfig::load(&paths).unwrap();
        assert!(config.resources_in("storage").is_empty());
    }

    #[test]
    fn test_upsert_set_depends_on_round_trip() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());

        let mut config = BackendConfig::load(&paths).unwrap();
        config.upsert("storage", "s3abc", ResourceEntry::s3());
        config
            .set_depends_on("storage", "s3abc", vec![edge("authdemo", "UserPoolId")])
            .unwrap();
        config.save(&paths).unwrap();

        let reloaded = BackendConfig::load(&paths).unwrap();
        let entry = reloaded.get("storage", "s3abc").unwrap();
        assert_eq!(entry.service, "S3");
        assert_eq!(entry.depends_on, vec![edge("authdemo", "UserPoolId")]);
    }

    #[test]
    fn test_upsert_preserves_existing_depends_on() {
        let mut config = BackendConfig::default();
        config.upsert("storage", "s3abc", ResourceEntry::s3());
        config
            .set_depends_on("storage", "s3abc", vec![edge("authdemo", "UserPoolId")])
            .unwrap();

        config.upsert("storage", "s3abc", ResourceEntry::s3());
        assert_eq!(
            config.get("storage", "s3abc").unwrap().depends_on,
            vec![edge("authdemo", "UserPoolId")]
        );
    }

    #[test]
    fn test_set_depends_on_requires_existing_entry() {
        let mut config = BackendConfig::default();
        assert!(config
            .set_depends_on("storage", "s3abc", Vec::new())
            .is_err());
    }

    #[test]
    fn test_other_category_fields_pass_through() {
        let raw = serde_json::json!({
            "auth": {
                "authdemo": {
                    "service": "Cognito",
                    "providerPlugin": "cloudformation",
                    "frontendAuthConfig": { "socialProviders": [] }
                }
            }
        });
        let mut config: BackendConfig = serde_json::from_value(raw.clone()).unwrap();
        config.upsert("storage", "s3abc", ResourceEntry::s3());
        config.remove("storage", "s3abc");

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_remove_prunes_empty_category() {
        let mut config = BackendConfig::default();
        config.upsert("storage", "s3abc", ResourceEntry::s3());
        assert!(config.remove("storage", "s3abc").is_some());
        assert!(config.resources_in("storage").is_empty());
        assert_eq!(serde_json::to_value(&config).unwrap(), serde_json::json!({}));
    }
}
