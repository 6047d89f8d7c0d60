//! `stratus add storage`

use anyhow::{bail, Context, Result};

use stratus_build::resolve::{MetadataResolver, NoOverride};
use stratus_build::transform::StackTransform;
use stratus_core::defaults::{storage_defaults, DefaultsSeed};
use stratus_state::{list_resources, BackendConfig, ProjectConfig, ProjectPaths, UserInputState};

use crate::prompter::Prompter;
use crate::walkthrough::add_walkthrough;

pub fn run_add(
    prompter: &mut dyn Prompter,
    paths: &ProjectPaths,
    project: &ProjectConfig,
) -> Result<()> {
    let existing = list_resources(paths)?;
    if let Some(name) = existing.first() {
        bail!("storage resource '{name}' is already created; run `stratus update storage` to change it");
    }

    let backend_config = BackendConfig::load(paths)?;
    let resolver = MetadataResolver::from_backend_config(&backend_config);

    let seed = DefaultsSeed::generate();
    let defaults = storage_defaults(&project.name, &seed);
    let inputs = add_walkthrough(prompter, defaults, &resolver)
        .context("storage walkthrough failed")?;

    UserInputState::new(paths, &inputs.resource_name).save(&inputs)?;
    StackTransform::new(paths, &inputs.resource_name, &resolver, &NoOverride)
        .run()
        .context("failed to build storage stack")?;

    println!("Successfully added storage resource '{}'", inputs.resource_name);
    Ok(())
}
