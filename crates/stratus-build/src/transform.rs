//! Stack transform: one state record in, three artifacts out.
//!
//! Phases run in a fixed order: load, validate, compute parameters, build
//! the template, apply overrides, persist. The build artifacts are staged
//! to temp files first and renamed last, so a failure partway through
//! leaves the previous artifacts intact.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use stratus_core::template::Template;
use stratus_core::{DependencyCollector, DependencyEdge, Error, Result};
use stratus_state::{BackendConfig, ProjectPaths, ResourceEntry, UserInputState};

use crate::builder::TemplateBuilder;
use crate::params::ResolvedParameters;
use crate::resolve::{DependencyResolver, TemplateOverride};

/// Result of a successful transform.
#[derive(Debug)]
pub struct TransformOutput {
    pub template: Template,
    pub parameters: ResolvedParameters,
    pub depends_on: Vec<DependencyEdge>,
}

/// Runs the build pipeline for one storage resource.
pub struct StackTransform<'a> {
    paths: &'a ProjectPaths,
    resource_name: String,
    resolver: &'a dyn DependencyResolver,
    override_hook: &'a dyn TemplateOverride,
}

impl<'a> StackTransform<'a> {
    pub fn new(
        paths: &'a ProjectPaths,
        resource_name: impl Into<String>,
        resolver: &'a dyn DependencyResolver,
        override_hook: &'a dyn TemplateOverride,
    ) -> Self {
        StackTransform {
            paths,
            resource_name: resource_name.into(),
            resolver,
            override_hook,
        }
    }

    pub fn run(&self) -> Result<TransformOutput> {
        let state = UserInputState::new(self.paths, &self.resource_name);
        let inputs = state.load()?;
        inputs.validate()?;

        let parameters = ResolvedParameters::from_inputs(&inputs);
        let built = TemplateBuilder::new(&inputs, self.resolver).build()?;
        let mut template = built.template;
        self.override_hook.apply(&mut template)?;

        let backend_config = self.updated_metadata(&built.depends_on)?;
        self.persist(&template, &parameters, &backend_config)?;

        tracing::info!(resource = %self.resource_name, "built storage stack artifacts");
        Ok(TransformOutput {
            template,
            parameters,
            depends_on: built.depends_on,
        })
    }

    /// Stage all three artifacts, then rename them into place. Either the
    /// template, the parameters, and the metadata all land, or none do.
    fn persist(
        &self,
        template: &Template,
        parameters: &ResolvedParameters,
        backend_config: &BackendConfig,
    ) -> Result<()> {
        let template_path = self.paths.template_file(&self.resource_name);
        let parameters_path = self.paths.parameters_file(&self.resource_name);
        let config_path = self.paths.backend_config_file();

        let staged_template = stage(&template_path, &template.to_json_pretty()?)?;
        let staged_parameters = stage(&parameters_path, &parameters.to_json_pretty()?)?;
        let staged_config = stage(&config_path, &serde_json::to_vec_pretty(backend_config)?)?;

        fs::rename(&staged_template, &template_path)?;
        fs::rename(&staged_parameters, &parameters_path)?;
        fs::rename(&staged_config, &config_path)?;
        Ok(())
    }

    /// Compute the updated metadata document in memory; everything outside
    /// this resource's entry passes through untouched.
    fn updated_metadata(&self, depends_on: &[DependencyEdge]) -> Result<BackendConfig> {
        let mut config = BackendConfig::load(self.paths)?;
        config.upsert("storage", &self.resource_name, ResourceEntry::s3());

        let previous = config
            .get("storage", &self.resource_name)
            .map(|entry| entry.depends_on.clone())
            .unwrap_or_default();
        let diff = DependencyCollector::diff(&previous, depends_on);
        if !diff.is_empty() {
            tracing::debug!(
                resource = %self.resource_name,
                added = diff.added.len(),
                removed = diff.removed.len(),
                "dependency edges changed"
            );
        }

        config.set_depends_on("storage", &self.resource_name, depends_on.to_vec())?;
        config.touch_build_timestamp("storage", &self.resource_name, Utc::now())?;
        Ok(config)
    }
}

fn stage(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let parent = target
        .parent()
        .ok_or_else(|| Error::validation(format!("path {} has no parent", target.display())))?;
    fs::create_dir_all(parent)?;
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("invalid file name in {}", target.display())))?;
    let staged = parent.join(format!(".{file_name}.tmp"));
    fs::write(&staged, bytes)?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use stratus_core::inputs::{AccessMode, StorageUserInputs, TriggerFunction};
    use stratus_core::template::{Expr, Output};
    use stratus_core::Permission;
    use tempfile::TempDir;

    use crate::resolve::{NoOverride, StaticResolver};

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

    fn resolver() -> StaticResolver {
        StaticResolver {
            auth_resource: Some("authdemo".to_string()),
            groups: Vec::new(),
            functions: vec!["resize".to_string()],
        }
    }

    #[test]
    fn test_transform_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        UserInputState::new(&paths, "s3abc123")
            .save(&sample_inputs())
            .unwrap();

        let resolver = resolver();
        let transform = StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride);
        let out = transform.run().unwrap();

        assert!(paths.template_file("s3abc123").is_file());
        assert!(paths.parameters_file("s3abc123").is_file());

        let template: serde_json::Value =
            serde_json::from_slice(&fs::read(paths.template_file("s3abc123")).unwrap()).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");

        let config = BackendConfig::load(&paths).unwrap();
        let entry = config.get("storage", "s3abc123").unwrap();
        assert_eq!(entry.depends_on, out.depends_on);
        assert!(entry.last_build_timestamp.is_some());
    }

    #[test]
    fn test_transform_without_state_fails_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let resolver = resolver();
        let transform = StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride);

        assert!(matches!(transform.run().unwrap_err(), Error::NotFound(_)));
        assert!(!paths.template_file("s3abc123").exists());
        assert!(!paths.backend_config_file().exists());
    }

    #[test]
    fn test_override_hook_runs_on_the_built_template() {
        struct AddOutput;
        impl TemplateOverride for AddOutput {
            fn apply(&self, template: &mut Template) -> Result<()> {
                template.add_output(
                    "Stamp",
                    Output {
                        value: Expr::str("override"),
                        description: None,
                    },
                );
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        UserInputState::new(&paths, "s3abc123")
            .save(&sample_inputs())
            .unwrap();

        let resolver = resolver();
        let transform = StackTransform::new(&paths, "s3abc123", &resolver, &AddOutput);
        let out = transform.run().unwrap();
        assert!(out.template.outputs.contains_key("Stamp"));

        let template: serde_json::Value =
            serde_json::from_slice(&fs::read(paths.template_file("s3abc123")).unwrap()).unwrap();
        assert_eq!(template["Outputs"]["Stamp"]["Value"], "override");
    }

    #[test]
    fn test_transform_leaves_state_file_untouched() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        UserInputState::new(&paths, "s3abc123")
            .save(&sample_inputs())
            .unwrap();
        let before = fs::read(paths.cli_inputs_file("s3abc123")).unwrap();

        let resolver = resolver();
        StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride)
            .run()
            .unwrap();

        let after = fs::read(paths.cli_inputs_file("s3abc123")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unreadable_metadata_aborts_before_any_artifact_lands() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        UserInputState::new(&paths, "s3abc123")
            .save(&sample_inputs())
            .unwrap();
        fs::write(paths.backend_config_file(), b"not json").unwrap();

        let resolver = resolver();
        let transform = StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride);
        assert!(transform.run().is_err());
        assert!(!paths.template_file("s3abc123").exists());
        assert!(!paths.parameters_file("s3abc123").exists());
        assert_eq!(fs::read(paths.backend_config_file()).unwrap(), b"not json");
    }

    #[test]
    fn test_metadata_tracks_trigger_removal() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let state = UserInputState::new(&paths, "s3abc123");
        let resolver = resolver();

        let mut with_trigger = sample_inputs();
        with_trigger.trigger_function = TriggerFunction::Function("resize".to_string());
        state.save(&with_trigger).unwrap();
        StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride)
            .run()
            .unwrap();
        let config = BackendConfig::load(&paths).unwrap();
        assert_eq!(config.get("storage", "s3abc123").unwrap().depends_on.len(), 1);

        state.save(&sample_inputs()).unwrap();
        StackTransform::new(&paths, "s3abc123", &resolver, &NoOverride)
            .run()
            .unwrap();
        let config = BackendConfig::load(&paths).unwrap();
        assert!(config.get("storage", "s3abc123").unwrap().depends_on.is_empty());
    }
}
