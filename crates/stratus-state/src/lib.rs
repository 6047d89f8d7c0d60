//! Local project state for Stratus.
//!
//! Three concerns live here: the project configuration and filesystem
//! layout (`project`), the versioned per-resource answer record
//! (`input_state`), and the project-wide resource metadata (`metadata`).
//! All writes go through an atomic stage-then-rename helper.

pub mod input_state;
pub mod metadata;
pub mod project;

pub use input_state::{list_resources, UserInputState, SCHEMA_VERSION};
pub use metadata::{BackendConfig, ResourceEntry};
pub use project::{find_project_root, write_atomic, ProjectConfig, ProjectPaths};
