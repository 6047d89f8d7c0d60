//! `stratus status storage`

use anyhow::Result;

use stratus_state::{list_resources, BackendConfig, ProjectPaths, UserInputState};

pub fn run_status(paths: &ProjectPaths) -> Result<()> {
    let resources = list_resources(paths)?;
    if resources.is_empty() {
        println!("No storage resources configured");
        return Ok(());
    }

    let backend_config = BackendConfig::load(paths)?;
    for resource_name in &resources {
        let state = UserInputState::new(paths, resource_name);
        let note = if !state.exists() && state.legacy_exists() {
            " (needs migration; run `stratus migrate storage`)"
        } else {
            ""
        };
        println!("storage/{resource_name}{note}");

        if let Some(entry) = backend_config.get("storage", resource_name) {
            println!("  service: {}", entry.service);
            for edge in &entry.depends_on {
                println!(
                    "  depends on: {}/{} [{}]",
                    edge.category,
                    edge.resource_name,
                    edge.attributes.join(", ")
                );
            }
            if let Some(at) = entry.last_build_timestamp {
                println!("  last built: {}", at.to_rfc3339());
            }
        }
    }
    Ok(())
}
