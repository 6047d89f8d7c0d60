//! `stratus remove storage`

use anyhow::{bail, Result};

use stratus_state::{list_resources, BackendConfig, ProjectPaths, UserInputState};

use crate::prompter::Prompter;

pub fn run_remove(prompter: &mut dyn Prompter, paths: &ProjectPaths, yes: bool) -> Result<()> {
    let resources = list_resources(paths)?;
    let Some(resource_name) = resources.first() else {
        bail!("no storage resource to remove");
    };

    if !yes {
        let confirmed = prompter.confirm(
            &format!("Delete storage resource '{resource_name}' and its local artifacts?"),
            false,
        )?;
        if !confirmed {
            println!("Removal cancelled");
            return Ok(());
        }
    }

    UserInputState::new(paths, resource_name).remove()?;
    let mut backend_config = BackendConfig::load(paths)?;
    if backend_config.remove("storage", resource_name).is_some() {
        backend_config.save(paths)?;
    }

    println!("Removed storage resource '{resource_name}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use stratus_core::inputs::{AccessMode, StorageUserInputs, TriggerFunction};
    use stratus_core::Permission;
    use stratus_state::ResourceEntry;
    use tempfile::TempDir;

    use crate::prompter::{ScriptedAnswer, ScriptedPrompter};

    fn seed(paths: &ProjectPaths) {
        let inputs = StorageUserInputs {
            resource_name: "s3demo".to_string(),
            bucket_name: "demo-bucket".to_string(),
            policy_id: "ab12cd34".to_string(),
            storage_access: AccessMode::AuthOnly,
            auth_access: [Permission::Read].into_iter().collect(),
            guest_access: BTreeSet::new(),
            group_list: Vec::new(),
            group_permissions: BTreeMap::new(),
            trigger_function: TriggerFunction::None,
        };
        UserInputState::new(paths, "s3demo").save(&inputs).unwrap();
        let mut config = BackendConfig::default();
        config.upsert("storage", "s3demo", ResourceEntry::s3());
        config.save(paths).unwrap();
    }

    #[test]
    fn test_remove_deletes_state_and_metadata() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        seed(&paths);

        let mut prompter = ScriptedPrompter::new(vec![ScriptedAnswer::Confirm(true)]);
        run_remove(&mut prompter, &paths, false).unwrap();

        assert!(!paths.cli_inputs_file("s3demo").exists());
        assert!(BackendConfig::load(&paths)
            .unwrap()
            .get("storage", "s3demo")
            .is_none());
    }

    #[test]
    fn test_remove_cancelled_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        seed(&paths);

        let mut prompter = ScriptedPrompter::new(vec![ScriptedAnswer::Confirm(false)]);
        run_remove(&mut prompter, &paths, false).unwrap();

        assert!(paths.cli_inputs_file("s3demo").is_file());
    }

    #[test]
    fn test_remove_with_yes_skips_the_prompt() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        seed(&paths);

        let mut prompter = ScriptedPrompter::new(Vec::new());
        run_remove(&mut prompter, &paths, true).unwrap();
        assert!(!paths.cli_inputs_file("s3demo").exists());
    }

    #[test]
    fn test_remove_without_resource_fails() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        let mut prompter = ScriptedPrompter::new(Vec::new());
        assert!(run_remove(&mut prompter, &paths, true).is_err());
    }
}
