//! Trigger reconciliation state machine.
//!
//! Classification is pure: the walkthrough flow plus the currently stored
//! trigger determine the event. Interactive choices (pick an existing
//! function or scaffold a new one) are expressed as a returned plan the CLI
//! resolves through its prompter.

use stratus_core::inputs::TriggerFunction;
use stratus_core::{Error, Result};

/// Which walkthrough invoked the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkthroughFlow {
    Add,
    Update,
    Remove,
}

/// What should happen to the trigger wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Attach a trigger where none exists.
    AddNew,
    /// Swap in a newly chosen trigger. `previous` is the stored function,
    /// if one was set.
    Replace { previous: Option<String> },
    /// Detach the stored trigger.
    Delete { previous: String },
    /// Nothing to do.
    NoOp,
}

/// How the CLI should obtain the function for `AddNew`/`Replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPlan {
    /// No Lambda functions exist in the project; a new one must be
    /// scaffolded.
    CreateNew,
    /// Let the developer pick one of the existing functions or opt to
    /// scaffold a new one.
    Choose(Vec<String>),
}

/// Classify the trigger event for a flow against the stored trigger.
pub fn classify(flow: WalkthroughFlow, existing: &TriggerFunction) -> Result<TriggerEvent> {
    match (flow, existing) {
        (WalkthroughFlow::Add, TriggerFunction::Function(name)) => Err(Error::already_configured(
            format!("trigger function '{name}'; run update to change it"),
        )),
        (WalkthroughFlow::Add, TriggerFunction::None) => Ok(TriggerEvent::AddNew),
        // The update flow always classifies as a replacement, whether or
        // not a trigger is currently stored.
        (WalkthroughFlow::Update, existing) => Ok(TriggerEvent::Replace {
            previous: existing.name().map(str::to_string),
        }),
        (WalkthroughFlow::Remove, TriggerFunction::Function(name)) => Ok(TriggerEvent::Delete {
            previous: name.clone(),
        }),
        (WalkthroughFlow::Remove, TriggerFunction::None) => Ok(TriggerEvent::NoOp),
    }
}

/// Plan the interactive selection for an `AddNew` or `Replace` event.
pub fn selection_plan(available_functions: Vec<String>) -> TriggerPlan {
    if available_functions.is_empty() {
        TriggerPlan::CreateNew
    } else {
        TriggerPlan::Choose(available_functions)
    }
}
