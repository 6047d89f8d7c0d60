//! Cross-resource dependency edges.
//!
//! Every external `Ref` the template builder emits is recorded here, so the
//! `dependsOn` metadata stays in lockstep with what the template actually
//! references.

use serde::{Deserialize, Serialize};

/// A dependency on another resource's exported attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Owning category of the referenced resource (e.g. `auth`, `function`).
    pub category: String,
    /// Resource name within that category.
    pub resource_name: String,
    /// Attributes of that resource the template references.
    pub attributes: Vec<String>,
}

/// Attribute-level difference between two edge sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyDiff {
    pub added: Vec<DependencyEdge>,
    pub removed: Vec<DependencyEdge>,
}

impl DependencyDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Collects dependency edges during a template build.
///
/// Edges are kept in first-recorded order; recording the same attribute
/// twice is a no-op. Attributes for the same resource merge into one edge.
#[derive(Debug, Clone, Default)]
pub struct DependencyCollector {
    edges: Vec<DependencyEdge>,
}

impl DependencyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one referenced attribute of another resource.
    pub fn record(&mut self, category: &str, resource_name: &str, attribute: &str) {
        if let Some(edge) = self
            .edges
            .iter_mut()
            .find(|e| e.category == category && e.resource_name == resource_name)
        {
            if !edge.attributes.iter().any(|a| a == attribute) {
                edge.attributes.push(attribute.to_string());
            }
            return;
        }
        self.edges.push(DependencyEdge {
            category: category.to_string(),
            resource_name: resource_name.to_string(),
            attributes: vec![attribute.to_string()],
        });
    }

    /// The collected edges, in first-recorded order.
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Consume the collector, yielding the edge list.
    pub fn into_edges(self) -> Vec<DependencyEdge> {
        self.edges
    }

    /// Attribute-level diff between a previous edge set and a new one.
    pub fn diff(old: &[DependencyEdge], new: &[DependencyEdge]) -> DependencyDiff {
        DependencyDiff {
            added: subtract(new, old),
            removed: subtract(old, new),
        }
    }
}

/// Edges (with attributes) present in `left` but not in `right`.
fn subtract(left: &[DependencyEdge], right: &[DependencyEdge]) -> Vec<DependencyEdge> {
    let mut out = Vec::new();
    for edge in left {
        let counterpart = right
            .iter()
            .find(|e| e.category == edge.category && e.resource_name == edge.resource_name);
        let missing: Vec<String> = match counterpart {
            None => edge.attributes.clone(),
            Some(other) => edge
                .attributes
                .iter()
                .filter(|a| !other.attributes.contains(a))
                .cloned()
                .collect(),
        };
        if !missing.is_empty() {
            out.push(DependencyEdge {
                category: edge.category.clone(),
                resource_name: edge.resource_name.clone(),
                attributes: missing,
            });
        }
    }
    out
}
