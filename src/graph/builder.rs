//! Assembles routes, features, and integration signals into the
//! architecture graph.
//!
//! All classification is table-driven: HTTP verb × final-segment shape for
//! CRUD operations, and a fixed keyword table for integration types. Node
//! and edge ids are deterministic hashes of semantic content so rebuilding
//! from unchanged input yields identical ids.

use super::{
    ArchitectureEdge, ArchitectureGraph, ArchitectureNode, EdgeKind, FeatureArea, Integration,
    IntegrationType, NodeKind, RouteDoc,
};
use crate::core::{
    content_id, normalize_label, CrudOp, Diagnostic, DiagnosticKind, HttpMethod,
    IntegrationSignal, RouteDescriptor,
};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Graph build output: the graph plus any consistency diagnostics
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub graph: ArchitectureGraph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Shape of a route's final path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentShape {
    /// Path parameter like `{id}` or `:id`
    Param,
    /// Literal segment, treated as a collection noun
    Collection,
}

fn final_segment_shape(path: &str) -> SegmentShape {
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if last.starts_with('{') || last.starts_with(':') || last.starts_with('<') {
        SegmentShape::Param
    } else {
        SegmentShape::Collection
    }
}

/// Fixed verb × segment-shape lookup; never inferred per request.
pub fn classify_operation(method: HttpMethod, path: &str) -> Option<CrudOp> {
    match (method, final_segment_shape(path)) {
        (HttpMethod::Post, SegmentShape::Collection) => Some(CrudOp::Create),
        (HttpMethod::Post, SegmentShape::Param) => Some(CrudOp::Update),
        (HttpMethod::Get, _) | (HttpMethod::Head, _) => Some(CrudOp::Read),
        (HttpMethod::Put, _) | (HttpMethod::Patch, _) => Some(CrudOp::Update),
        (HttpMethod::Delete, _) => Some(CrudOp::Delete),
        (HttpMethod::Options, _) => None,
    }
}

/// Keyword → integration type table. First match wins; order matters for
/// names like "redis-queue".
const TYPE_KEYWORDS: &[(&str, IntegrationType)] = &[
    ("webhook", IntegrationType::Webhook),
    ("queue", IntegrationType::MessageQueue),
    ("redis", IntegrationType::MessageQueue),
    ("kafka", IntegrationType::MessageQueue),
    ("rabbit", IntegrationType::MessageQueue),
    ("amqp", IntegrationType::MessageQueue),
    ("celery", IntegrationType::MessageQueue),
    ("sqs", IntegrationType::MessageQueue),
    ("postgres", IntegrationType::Database),
    ("mysql", IntegrationType::Database),
    ("sqlite", IntegrationType::Database),
    ("mongo", IntegrationType::Database),
    ("database", IntegrationType::Database),
    ("sqlalchemy", IntegrationType::Database),
    ("sql", IntegrationType::Database),
    ("db", IntegrationType::Database),
    ("elasticsearch", IntegrationType::Database),
    ("auth", IntegrationType::AuthProvider),
    ("jwt", IntegrationType::AuthProvider),
    ("jose", IntegrationType::AuthProvider),
    ("oauth", IntegrationType::AuthProvider),
    ("bcrypt", IntegrationType::AuthProvider),
    ("passlib", IntegrationType::AuthProvider),
    ("stripe", IntegrationType::Sdk),
    ("twilio", IntegrationType::Sdk),
    ("sendgrid", IntegrationType::Sdk),
    ("sentry", IntegrationType::Sdk),
    ("firebase", IntegrationType::Sdk),
    ("boto", IntegrationType::Sdk),
    ("aws", IntegrationType::Sdk),
    ("sdk", IntegrationType::Sdk),
    ("http", IntegrationType::HttpClient),
    ("requests", IntegrationType::HttpClient),
    ("axios", IntegrationType::HttpClient),
    ("fetch", IntegrationType::HttpClient),
];

/// Storage-like keywords consulted only as a fallback when the main table
/// has no match.
const STORAGE_KEYWORDS: &[&str] = &["s3", "storage", "minio", "blob", "bucket", "file"];

/// Assign an integration type from its name and package via the fixed
/// keyword tables. Unmatched names fall back to `Storage` only when a
/// storage-like keyword is present, else stay `Unknown`.
pub fn classify_integration(name: &str, package: Option<&str>) -> IntegrationType {
    let haystack = format!(
        "{} {}",
        name.to_ascii_lowercase(),
        package.unwrap_or("").to_ascii_lowercase()
    );
    for (keyword, kind) in TYPE_KEYWORDS {
        if haystack.contains(keyword) {
            return *kind;
        }
    }
    for keyword in STORAGE_KEYWORDS {
        if haystack.contains(keyword) {
            return IntegrationType::Storage;
        }
    }
    IntegrationType::Unknown
}

/// First meaningful path segment used for grouping and route-group nodes.
fn extract_prefix(path: &str) -> String {
    for segment in path.trim_matches('/').split('/') {
        if segment.is_empty() || segment == "api" || is_version_segment(segment) {
            continue;
        }
        if segment.starts_with('{') || segment.starts_with(':') {
            break;
        }
        return segment.to_string();
    }
    "root".to_string()
}

fn is_version_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(chars.next(), Some('v')) && chars.clone().count() > 0 && chars.all(|c| c.is_ascii_digit())
}

fn grouping_key(route: &RouteDescriptor) -> String {
    if let Some(label) = route.feature_label.as_deref() {
        if !label.trim().is_empty() {
            return normalize_label(label);
        }
    }
    if let Some(tag) = route.tags.first() {
        if !tag.trim().is_empty() {
            return normalize_label(tag);
        }
    }
    normalize_label(&extract_prefix(&route.path))
}

fn display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the architecture graph from analyzer output.
pub fn build_graph(routes: &[RouteDescriptor], signals: &[IntegrationSignal]) -> GraphBuild {
    let features = group_features(routes);
    let mut integrations = detect_integrations(signals);
    let features = connect_integrations(features, &mut integrations);

    let (nodes, edges) = assemble_nodes_and_edges(&features, &integrations, routes);
    let mut build = GraphBuild {
        graph: ArchitectureGraph {
            nodes,
            edges,
            features,
            integrations,
        },
        diagnostics: Vec::new(),
    };
    validate_edges(&mut build);
    build
}

/// Group routes into feature areas by declared label (duplicate labels are
/// merged, not duplicated), preserving declaration order within a feature.
fn group_features(routes: &[RouteDescriptor]) -> Vec<FeatureArea> {
    let mut grouped: BTreeMap<String, Vec<&RouteDescriptor>> = BTreeMap::new();
    for route in routes {
        grouped.entry(grouping_key(route)).or_default().push(route);
    }

    grouped
        .into_iter()
        .map(|(slug, members)| {
            let route_docs: Vec<RouteDoc> = members
                .iter()
                .map(|r| RouteDoc {
                    path: r.path.clone(),
                    method: r.method,
                    operation: classify_operation(r.method, &r.path),
                    auth_required: r.auth_required,
                    handler_refs: r.handler_refs.clone(),
                    summary: r.summary.clone(),
                })
                .collect();

            let operations: BTreeSet<CrudOp> =
                route_docs.iter().filter_map(|r| r.operation).collect();
            let auth_required = route_docs.iter().any(|r| r.auth_required);
            let tags: BTreeSet<String> = members
                .iter()
                .flat_map(|r| r.tags.iter().cloned())
                .collect();
            let name = display_name(&slug);

            FeatureArea {
                id: slug.clone(),
                description: format!("Routes grouped under '{name}'."),
                name,
                routes: route_docs,
                operations,
                auth_required,
                integrations: BTreeSet::new(),
                tags,
            }
        })
        .collect()
}

/// Deduplicate integration signals by normalized name, merging packages and
/// environment variables, and assign a type from the keyword tables.
fn detect_integrations(signals: &[IntegrationSignal]) -> Vec<Integration> {
    let mut merged: BTreeMap<String, Integration> = BTreeMap::new();
    for signal in signals {
        let slug = normalize_label(&signal.name);
        let entry = merged.entry(slug.clone()).or_insert_with(|| Integration {
            id: slug.clone(),
            name: signal.name.clone(),
            kind: classify_integration(&signal.name, signal.package.as_deref()),
            package: None,
            env_vars: BTreeSet::new(),
            connected_features: BTreeSet::new(),
            detected_from: signal.source.clone(),
        });
        if entry.package.is_none() {
            entry.package = signal.package.clone();
            // A package can carry a keyword the bare name lacked.
            if entry.kind == IntegrationType::Unknown {
                entry.kind = classify_integration(&entry.name, entry.package.as_deref());
            }
        }
        entry.env_vars.extend(signal.env_vars.iter().cloned());
    }
    merged.into_values().collect()
}

/// Connect features to integrations through handler package references.
fn connect_integrations(
    mut features: Vec<FeatureArea>,
    integrations: &mut [Integration],
) -> Vec<FeatureArea> {
    for feature in &mut features {
        for integration in integrations.iter_mut() {
            let referenced = feature.routes.iter().any(|route| {
                route.handler_refs.iter().any(|reference| {
                    integration
                        .package
                        .as_deref()
                        .is_some_and(|pkg| reference.as_str() == pkg)
                        || normalize_label(reference) == integration.id
                })
            });
            if referenced {
                feature.integrations.insert(integration.id.clone());
                integration.connected_features.insert(feature.id.clone());
            }
        }
    }
    features
}

fn node_id(kind: NodeKind, label: &str, parent: &str) -> String {
    content_id(
        match kind {
            NodeKind::Feature => "feat",
            NodeKind::Integration => "int",
            NodeKind::RouteGroup => "rg",
        },
        &[kind.as_str(), &normalize_label(label), parent],
    )
}

fn edge_id(kind: EdgeKind, source: &str, target: &str) -> String {
    content_id("edge", &[kind.as_str(), source, target])
}

fn assemble_nodes_and_edges(
    features: &[FeatureArea],
    integrations: &[Integration],
    routes: &[RouteDescriptor],
) -> (Vec<ArchitectureNode>, Vec<ArchitectureEdge>) {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut feature_nodes: BTreeMap<String, String> = BTreeMap::new();

    for feature in features {
        let id = node_id(NodeKind::Feature, &feature.id, "");
        let mut metadata = BTreeMap::new();
        metadata.insert("route_count".to_string(), feature.routes.len().to_string());
        metadata.insert(
            "crud_operations".to_string(),
            feature
                .operations
                .iter()
                .map(|op| op.as_str())
                .collect::<Vec<_>>()
                .join(","),
        );
        metadata.insert(
            "auth_required".to_string(),
            feature.auth_required.to_string(),
        );
        feature_nodes.insert(feature.id.clone(), id.clone());
        nodes.push(ArchitectureNode {
            id,
            label: feature.name.clone(),
            kind: NodeKind::Feature,
            metadata,
        });
    }

    for integration in integrations {
        let id = node_id(NodeKind::Integration, &integration.id, "");
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "integration_type".to_string(),
            integration.kind.as_str().to_string(),
        );
        if let Some(package) = &integration.package {
            metadata.insert("package".to_string(), package.clone());
        }
        nodes.push(ArchitectureNode {
            id: id.clone(),
            label: integration.name.clone(),
            kind: NodeKind::Integration,
            metadata,
        });

        for feature_id in &integration.connected_features {
            if let Some(source) = feature_nodes.get(feature_id) {
                edges.push(ArchitectureEdge {
                    id: edge_id(EdgeKind::DependsOn, source, &id),
                    source: source.clone(),
                    target: id.clone(),
                    kind: EdgeKind::DependsOn,
                    label: Some(integration.kind.as_str().to_string()),
                });
            }
        }
    }

    // Route-group nodes by first meaningful prefix, contained features below.
    let mut group_members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for route in routes {
        let prefix = extract_prefix(&route.path);
        group_members
            .entry(prefix)
            .or_default()
            .insert(grouping_key(route));
    }
    for (prefix, members) in &group_members {
        let group_node = node_id(NodeKind::RouteGroup, prefix, "");
        let mut metadata = BTreeMap::new();
        metadata.insert("feature_count".to_string(), members.len().to_string());
        nodes.push(ArchitectureNode {
            id: group_node.clone(),
            label: format!("/{prefix}"),
            kind: NodeKind::RouteGroup,
            metadata,
        });
        for feature_id in members {
            if let Some(target) = feature_nodes.get(feature_id) {
                edges.push(ArchitectureEdge {
                    id: edge_id(EdgeKind::Contains, &group_node, target),
                    source: group_node.clone(),
                    target: target.clone(),
                    kind: EdgeKind::Contains,
                    label: None,
                });
            }
        }
    }

    (nodes, edges)
}

/// Drop edges whose endpoints are missing from the node set, recording a
/// diagnostic per drop. The build continues either way.
pub fn validate_edges(build: &mut GraphBuild) {
    let node_ids: BTreeSet<&str> = build.graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut kept = Vec::with_capacity(build.graph.edges.len());
    for edge in build.graph.edges.drain(..) {
        if node_ids.contains(edge.source.as_str()) && node_ids.contains(edge.target.as_str()) {
            kept.push(edge);
        } else {
            debug!("dropping dangling edge {}", edge.id);
            build.diagnostics.push(Diagnostic::new(
                DiagnosticKind::GraphInconsistency,
                format!(
                    "edge {} ({} -> {}) references a missing node and was dropped",
                    edge.id, edge.source, edge.target
                ),
            ));
        }
    }
    build.graph.edges = kept;
}
