//! Architecture graph types: nodes, edges, feature areas, integrations

pub mod builder;

pub use builder::build_graph;

use crate::core::{CrudOp, HttpMethod};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kind discriminator for architecture nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Feature,
    Integration,
    RouteGroup,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Feature => "feature",
            NodeKind::Integration => "integration",
            NodeKind::RouteGroup => "route_group",
        }
    }
}

/// One node in the architecture graph.
///
/// Ids are deterministic functions of (kind, normalized label, parent id);
/// unchanged source yields identical ids across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub metadata: BTreeMap<String, String>,
}

/// Kind discriminator for directed edges. Multi-edges of different kinds
/// between the same pair are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Route group → feature containment
    Contains,
    /// Feature → integration dependency
    DependsOn,
    /// Feature ↔ feature link through a shared integration
    SharedIntegration,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::DependsOn => "depends_on",
            EdgeKind::SharedIntegration => "shared_integration",
        }
    }
}

/// One directed edge in the architecture graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: Option<String>,
}

/// Route documentation owned by a feature area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDoc {
    pub path: String,
    pub method: HttpMethod,
    pub operation: Option<CrudOp>,
    pub auth_required: bool,
    pub handler_refs: Vec<String>,
    pub summary: Option<String>,
}

/// A logical grouping of routes sharing a business capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureArea {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Routes in declaration order; the order feeds CUJ token sequences
    pub routes: Vec<RouteDoc>,
    pub operations: BTreeSet<CrudOp>,
    /// A feature requires auth if any of its routes does
    pub auth_required: bool,
    pub integrations: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl FeatureArea {
    pub fn has_full_crud(&self) -> bool {
        self.operations.len() == 4
    }
}

/// External dependency categories, assigned from a fixed keyword table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    HttpClient,
    Sdk,
    Database,
    MessageQueue,
    Storage,
    AuthProvider,
    Webhook,
    /// Explicit fallback when no keyword matches
    Unknown,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::HttpClient => "http_client",
            IntegrationType::Sdk => "sdk",
            IntegrationType::Database => "database",
            IntegrationType::MessageQueue => "message_queue",
            IntegrationType::Storage => "storage",
            IntegrationType::AuthProvider => "auth_provider",
            IntegrationType::Webhook => "webhook",
            IntegrationType::Unknown => "unknown",
        }
    }
}

/// An external dependency detected from code signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub name: String,
    pub kind: IntegrationType,
    pub package: Option<String>,
    pub env_vars: BTreeSet<String>,
    pub connected_features: BTreeSet<String>,
    pub detected_from: String,
}

/// The assembled architecture graph for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureGraph {
    pub nodes: Vec<ArchitectureNode>,
    pub edges: Vec<ArchitectureEdge>,
    pub features: Vec<FeatureArea>,
    pub integrations: Vec<Integration>,
}

impl ArchitectureGraph {
    pub fn feature(&self, id: &str) -> Option<&FeatureArea> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Component identifiers present in this graph (features and
    /// integrations). Recommendations may only reference these.
    pub fn component_ids(&self) -> BTreeSet<String> {
        self.features
            .iter()
            .map(|f| f.id.clone())
            .chain(self.integrations.iter().map(|i| i.id.clone()))
            .collect()
    }

    /// Ordered pairs of features connected through a shared integration.
    ///
    /// Edge direction is authoritative for cross-feature journey ordering;
    /// feature declaration order is the tie-break when both features merely
    /// depend on the same integration.
    pub fn linked_feature_pairs(&self) -> Vec<(String, String)> {
        let order: BTreeMap<&str, usize> = self
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.as_str(), i))
            .collect();
        let mut pairs = Vec::new();
        let mut seen = BTreeSet::new();
        for integration in &self.integrations {
            let connected: Vec<&String> = integration.connected_features.iter().collect();
            for a in &connected {
                for b in &connected {
                    if a == b {
                        continue;
                    }
                    let (first, second) =
                        match (order.get(a.as_str()), order.get(b.as_str())) {
                            (Some(ia), Some(ib)) if ia < ib => (a, b),
                            (Some(_), Some(_)) => continue,
                            _ => continue,
                        };
                    if seen.insert((first.to_string(), second.to_string())) {
                        pairs.push((first.to_string(), second.to_string()));
                    }
                }
            }
        }
        pairs
    }
}
