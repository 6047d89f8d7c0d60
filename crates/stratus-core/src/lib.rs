//! Core data model for Stratus.
//!
//! This crate holds the types shared by every other workspace member: the
//! permission model, the persisted user-input record, the typed
//! CloudFormation template model, dependency edges, walkthrough defaults,
//! and the workspace-wide error taxonomy. It performs no I/O beyond what
//! `serde` needs.

pub mod defaults;
pub mod dependency;
pub mod error;
pub mod inputs;
pub mod permission;
pub mod template;

pub use defaults::{storage_defaults, DefaultsSeed};
pub use dependency::{DependencyCollector, DependencyDiff, DependencyEdge};
pub use error::{Error, Result};
pub use inputs::{AccessMode, StorageUserInputs, TriggerFunction};
pub use permission::{Permission, ProviderAction};
pub use template::{Expr, Template};
