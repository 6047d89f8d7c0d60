//! Cross-resource lookup collaborators.
//!
//! The builder never inspects other categories directly; everything it
//! needs from the rest of the project comes through [`DependencyResolver`],
//! and template post-processing goes through [`TemplateOverride`]. Both are
//! injected, so tests substitute fixed fakes.

use stratus_core::template::Template;
use stratus_core::Result;
use stratus_state::BackendConfig;

/// Resolves identifiers of resources owned by other categories.
pub trait DependencyResolver {
    /// Name of the project's auth resource, if one is configured.
    fn auth_resource(&self) -> Option<String>;

    /// User-pool group names defined on the auth resource, in declared order.
    fn user_pool_groups(&self) -> Vec<String>;

    /// Names of the project's Lambda functions.
    fn functions(&self) -> Vec<String>;
}

/// Post-build hook over the rendered template.
pub trait TemplateOverride {
    fn apply(&self, template: &mut Template) -> Result<()>;
}

/// The default hook: leave the template as built.
#[derive(Debug, Default)]
pub struct NoOverride;

impl TemplateOverride for NoOverride {
    fn apply(&self, _template: &mut Template) -> Result<()> {
        Ok(())
    }
}

/// Resolver backed by the project metadata file.
///
/// Group names are read from the auth entry's `groups` field when other
/// tooling has recorded them there.
#[derive(Debug)]
pub struct MetadataResolver {
    auth_resource: Option<String>,
    groups: Vec<String>,
    functions: Vec<String>,
}

impl MetadataResolver {
    pub fn from_backend_config(config: &BackendConfig) -> Self {
        let auth_resource = config
            .resources_in("auth")
            .first()
            .map(|name| name.to_string());
        let groups = auth_resource
            .as_deref()
            .and_then(|name| config.get("auth", name))
            .and_then(|entry| entry.extra.get("groups"))
            .and_then(|value| value.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let functions = config
            .resources_in("function")
            .into_iter()
            .map(str::to_string)
            .collect();
        MetadataResolver {
            auth_resource,
            groups,
            functions,
        }
    }
}

impl DependencyResolver for MetadataResolver {
    fn auth_resource(&self) -> Option<String> {
        self.auth_resource.clone()
    }

    fn user_pool_groups(&self) -> Vec<String> {
        self.groups.clone()
    }

    fn functions(&self) -> Vec<String> {
        self.functions.clone()
    }
}

/// Fixed resolver for tests and scripted runs.
#[derive(Debug, Default)]
pub struct StaticResolver {
    pub auth_resource: Option<String>,
    pub groups: Vec<String>,
    pub functions: Vec<String>,
}

impl DependencyResolver for StaticResolver {
    fn auth_resource(&self) -> Option<String> {
        self.auth_resource.clone()
    }

    fn user_pool_groups(&self) -> Vec<String> {
        self.groups.clone()
    }

    fn functions(&self) -> Vec<String> {
        self.functions.clone()
    }
}
