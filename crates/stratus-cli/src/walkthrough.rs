//! Interactive question flows for the storage category.
//!
//! Both flows end with a validated, normalized [`StorageUserInputs`]; the
//! caller persists it and runs the transform. All terminal interaction
//! goes through the injected [`Prompter`].

use std::collections::{BTreeMap, BTreeSet};

use stratus_build::resolve::DependencyResolver;
use stratus_build::trigger::{self, TriggerEvent, TriggerPlan, WalkthroughFlow};
use stratus_core::inputs::{AccessMode, StorageUserInputs, TriggerFunction};
use stratus_core::{Error, Permission, Result};

use crate::prompter::Prompter;

const PERMISSION_OPTIONS: [(&str, Permission); 4] = [
    ("create", Permission::Create),
    ("update", Permission::Update),
    ("read", Permission::Read),
    ("delete", Permission::Delete),
];

/// Collect answers for a brand-new storage resource.
pub fn add_walkthrough(
    prompter: &mut dyn Prompter,
    defaults: StorageUserInputs,
    resolver: &dyn DependencyResolver,
) -> Result<StorageUserInputs> {
    let mut inputs = defaults;

    inputs.resource_name = prompter.input(
        "Provide a friendly name for your resource",
        &inputs.resource_name,
    )?;
    inputs.bucket_name = prompter.input("Provide bucket name", &inputs.bucket_name)?;

    ask_access(prompter, &mut inputs, resolver)?;
    ask_trigger(prompter, &mut inputs, resolver, WalkthroughFlow::Add)?;

    let inputs = inputs.normalized();
    inputs.validate()?;
    Ok(inputs)
}

/// Re-walk an existing resource; names are fixed, everything else can change.
pub fn update_walkthrough(
    prompter: &mut dyn Prompter,
    current: StorageUserInputs,
    resolver: &dyn DependencyResolver,
) -> Result<StorageUserInputs> {
    let mut inputs = current;

    ask_access(prompter, &mut inputs, resolver)?;
    ask_trigger(prompter, &mut inputs, resolver, WalkthroughFlow::Update)?;

    let inputs = inputs.normalized();
    inputs.validate()?;
    Ok(inputs)
}

/// Who gets access, and with which permissions. When user-pool groups
/// exist, access can be restricted to groups; picking a single side clears
/// the other side's permissions.
fn ask_access(
    prompter: &mut dyn Prompter,
    inputs: &mut StorageUserInputs,
    resolver: &dyn DependencyResolver,
) -> Result<()> {
    let groups = resolver.user_pool_groups();
    let restriction = if groups.is_empty() {
        0
    } else {
        prompter.select(
            "Restrict access by?",
            &["Auth/Guest users", "Individual groups", "Both"],
            if inputs.has_groups() { 1 } else { 0 },
        )?
    };
    let ask_auth_guest = restriction == 0 || restriction == 2;
    let ask_groups = restriction == 1 || restriction == 2;

    if ask_auth_guest {
        let mode = prompter.select(
            "Who should have access?",
            &["Auth users only", "Auth and guest users"],
            match inputs.storage_access {
                AccessMode::AuthOnly => 0,
                AccessMode::AuthAndGuest => 1,
            },
        )?;
        inputs.storage_access = if mode == 0 {
            AccessMode::AuthOnly
        } else {
            AccessMode::AuthAndGuest
        };

        inputs.auth_access = ask_permissions(
            prompter,
            "What kind of access do you want for authenticated users?",
            &inputs.auth_access,
        )?;
        inputs.guest_access = match inputs.storage_access {
            AccessMode::AuthOnly => BTreeSet::new(),
            AccessMode::AuthAndGuest => ask_permissions(
                prompter,
                "What kind of access do you want for guest users?",
                &inputs.guest_access,
            )?,
        };
    } else {
        inputs.storage_access = AccessMode::AuthOnly;
        inputs.auth_access = BTreeSet::new();
        inputs.guest_access = BTreeSet::new();
    }

    if ask_groups {
        let options: Vec<&str> = groups.iter().map(String::as_str).collect();
        let preselected: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| inputs.group_list.contains(g))
            .map(|(i, _)| i)
            .collect();
        let picked =
            prompter.multi_select("Select groups", &options, &preselected)?;
        if picked.is_empty() {
            return Err(Error::validation("select at least one group"));
        }

        let mut group_list = Vec::new();
        let mut group_permissions = BTreeMap::new();
        for index in picked {
            let group = groups[index].clone();
            let current = inputs
                .group_permissions
                .get(&group)
                .cloned()
                .unwrap_or_default();
            let permissions = ask_permissions(
                prompter,
                &format!("What kind of access do you want for {group} users?"),
                &current,
            )?;
            group_list.push(group.clone());
            group_permissions.insert(group, permissions);
        }
        inputs.group_list = group_list;
        inputs.group_permissions = group_permissions;
    } else {
        inputs.group_list = Vec::new();
        inputs.group_permissions = BTreeMap::new();
    }

    Ok(())
}

/// Multi-select over the four askable verbs; `list` is implied by `read`
/// and never offered directly.
fn ask_permissions(
    prompter: &mut dyn Prompter,
    message: &str,
    current: &BTreeSet<Permission>,
) -> Result<BTreeSet<Permission>> {
    let options: Vec<&str> = PERMISSION_OPTIONS.iter().map(|(label, _)| *label).collect();
    let preselected: Vec<usize> = PERMISSION_OPTIONS
        .iter()
        .enumerate()
        .filter(|(_, (_, p))| current.contains(p))
        .map(|(i, _)| i)
        .collect();

    let picked = prompter.multi_select(message, &options, &preselected)?;
    if picked.is_empty() {
        return Err(Error::validation("select at least one permission"));
    }
    Ok(picked
        .into_iter()
        .map(|i| PERMISSION_OPTIONS[i].1)
        .collect())
}

fn ask_trigger(
    prompter: &mut dyn Prompter,
    inputs: &mut StorageUserInputs,
    resolver: &dyn DependencyResolver,
    flow: WalkthroughFlow,
) -> Result<()> {
    let event = match flow {
        WalkthroughFlow::Add => {
            if !prompter.confirm("Do you want to add a Lambda trigger for your S3 bucket?", false)? {
                return Ok(());
            }
            trigger::classify(flow, &inputs.trigger_function)?
        }
        WalkthroughFlow::Update | WalkthroughFlow::Remove => {
            let choice = prompter.select(
                "Lambda trigger",
                &["Keep current setting", "Attach or replace", "Remove"],
                0,
            )?;
            match choice {
                0 => return Ok(()),
                1 => trigger::classify(WalkthroughFlow::Update, &inputs.trigger_function)?,
                _ => trigger::classify(WalkthroughFlow::Remove, &inputs.trigger_function)?,
            }
        }
    };

    match event {
        TriggerEvent::AddNew | TriggerEvent::Replace { .. } => {
            match trigger::selection_plan(resolver.functions()) {
                TriggerPlan::CreateNew => {
                    return Err(Error::validation(
                        "no Lambda functions exist in this project; add one first, then attach it",
                    ));
                }
                TriggerPlan::Choose(functions) => {
                    let options: Vec<&str> = functions.iter().map(String::as_str).collect();
                    let index =
                        prompter.select("Select the function to trigger", &options, 0)?;
                    inputs.trigger_function = TriggerFunction::Function(functions[index].clone());
                }
            }
        }
        TriggerEvent::Delete { .. } | TriggerEvent::NoOp => {
            inputs.trigger_function = TriggerFunction::None;
        }
    }
    Ok(())
}
