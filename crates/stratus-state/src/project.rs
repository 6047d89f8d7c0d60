//! Project configuration (`stratus.yaml`) and layout paths.
//!
//! Every command starts by locating the project root: the nearest ancestor
//! directory containing `stratus.yaml`. All generated artifacts live under
//! `<root>/stratus/backend/`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stratus_core::{Error, Result};

/// File name of the project configuration at the project root.
pub const PROJECT_CONFIG_FILE: &str = "stratus.yaml";

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, seeds default resource and bucket names.
    pub name: String,

    /// Default environment label shown in `status` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ProjectConfig {
    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::validation(format!("invalid {PROJECT_CONFIG_FILE}: {e}")))
    }

    /// Load the configuration from a project root directory.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_CONFIG_FILE);
        let content = fs::read_to_string(&path).map_err(|_| {
            Error::not_found(format!(
                "{} in {}; run stratus inside a project directory",
                PROJECT_CONFIG_FILE,
                root.display()
            ))
        })?;
        Self::from_yaml(&content)
    }
}

/// Find the project root by walking up from `start`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        if current.join(PROJECT_CONFIG_FILE).is_file() {
            return Ok(current.to_path_buf());
        }
        dir = current.parent();
    }
    Err(Error::not_found(format!(
        "{PROJECT_CONFIG_FILE}; run stratus inside a project directory"
    )))
}

/// Resolved filesystem layout for one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectPaths { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/stratus/backend`
    pub fn backend_dir(&self) -> PathBuf {
        self.root.join("stratus").join("backend")
    }

    /// `<root>/stratus/backend/backend-config.json`
    pub fn backend_config_file(&self) -> PathBuf {
        self.backend_dir().join("backend-config.json")
    }

    /// `<root>/stratus/backend/storage/<resource>`
    pub fn storage_resource_dir(&self, resource_name: &str) -> PathBuf {
        self.backend_dir().join("storage").join(resource_name)
    }

    /// The versioned answer record for one resource.
    pub fn cli_inputs_file(&self, resource_name: &str) -> PathBuf {
        self.storage_resource_dir(resource_name).join("cli-inputs.json")
    }

    /// Pre-migration parameter file, read only by `migrate`.
    pub fn legacy_parameters_file(&self, resource_name: &str) -> PathBuf {
        self.storage_resource_dir(resource_name).join("parameters.json")
    }

    /// Build output directory for one resource.
    pub fn build_dir(&self, resource_name: &str) -> PathBuf {
        self.storage_resource_dir(resource_name).join("build")
    }

    /// Rendered CloudFormation template.
    pub fn template_file(&self, resource_name: &str) -> PathBuf {
        self.build_dir(resource_name)
            .join("cloudformation-template.json")
    }

    /// Resolved parameters for the template.
    pub fn parameters_file(&self, resource_name: &str) -> PathBuf {
        self.build_dir(resource_name).join("parameters.json")
    }
}

/// Write `bytes` to `path` atomically: stage to a sibling temp file, then
/// rename over the target. Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::validation(format!("path {} has no parent", path.display())))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::validation(format!("invalid file name in {}", path.display())))?;
    let staged = parent.join(format!(".{file_name}.tmp"));

    fs::write(&staged, bytes)?;
    fs::rename(&staged, path)?;
    Ok(())
}
