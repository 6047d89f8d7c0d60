//! Command implementations behind the clap dispatch.

pub mod add;
pub mod migrate;
pub mod remove;
pub mod status;
pub mod update;
