//! `stratus migrate storage`

use anyhow::Result;

use stratus_core::defaults::DefaultsSeed;
use stratus_state::{list_resources, ProjectPaths, UserInputState};

use crate::prompter::Prompter;

pub fn run_migrate(prompter: &mut dyn Prompter, paths: &ProjectPaths, force: bool) -> Result<()> {
    let resources = list_resources(paths)?;
    let mut migrated = 0usize;

    for resource_name in &resources {
        let state = UserInputState::new(paths, resource_name);
        if state.exists() || !state.legacy_exists() {
            continue;
        }
        if !force {
            let confirmed = prompter.confirm(
                &format!("Migrate storage resource '{resource_name}' to versioned state?"),
                true,
            )?;
            if !confirmed {
                println!("Skipped '{resource_name}'");
                continue;
            }
        }
        let seed = DefaultsSeed::generate();
        state.migrate(&seed.short_id)?;
        println!("Migrated '{resource_name}'");
        migrated += 1;
    }

    if migrated == 0 {
        println!("Nothing to migrate");
    }
    Ok(())
}
