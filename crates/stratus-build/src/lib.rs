//! Build pipeline for Stratus storage resources.
//!
//! `params` computes the resolved parameter file, `builder` renders the
//! CloudFormation template while collecting dependency edges, `trigger`
//! classifies trigger reconciliation events, and `transform` runs the whole
//! pipeline and persists the artifacts.

pub mod builder;
pub mod params;
pub mod resolve;
pub mod transform;
pub mod trigger;

pub use builder::{BuildOutput, TemplateBuilder};
pub use params::{PolicyNames, ResolvedParameters, ALLOW, DISALLOW, NONE_SENTINEL};
pub use resolve::{
    DependencyResolver, MetadataResolver, NoOverride, StaticResolver, TemplateOverride,
};
pub use transform::{StackTransform, TransformOutput};
pub use trigger::{classify, selection_plan, TriggerEvent, TriggerPlan, WalkthroughFlow};
