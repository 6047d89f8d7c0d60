//! `stratus update storage`

use anyhow::{bail, Context, Result};

use stratus_build::resolve::{MetadataResolver, NoOverride};
use stratus_build::transform::StackTransform;
use stratus_core::defaults::DefaultsSeed;
use stratus_state::{list_resources, BackendConfig, ProjectPaths, UserInputState};

use crate::prompter::Prompter;
use crate::walkthrough::update_walkthrough;

pub fn run_update(prompter: &mut dyn Prompter, paths: &ProjectPaths) -> Result<()> {
    let resources = list_resources(paths)?;
    let Some(resource_name) = resources.first() else {
        bail!("no storage resource to update; run `stratus add storage` first");
    };
    let state = UserInputState::new(paths, resource_name);

    // Pre-versioned state can be carried forward here, with consent.
    if !state.exists() && state.legacy_exists() {
        let migrate = prompter.confirm(
            "This resource uses a pre-versioned state file. Migrate it now?",
            true,
        )?;
        if !migrate {
            bail!("cannot update un-migrated state; run `stratus migrate storage` when ready");
        }
        let seed = DefaultsSeed::generate();
        state.migrate(&seed.short_id)?;
    }

    let current = state.load()?;
    let backend_config = BackendConfig::load(paths)?;
    let resolver = MetadataResolver::from_backend_config(&backend_config);

    let inputs = update_walkthrough(prompter, current, &resolver)
        .context("storage walkthrough failed")?;

    state.save(&inputs)?;
    StackTransform::new(paths, resource_name, &resolver, &NoOverride)
        .run()
        .context("failed to build storage stack")?;

    println!("Successfully updated storage resource '{resource_name}'");
    Ok(())
}
