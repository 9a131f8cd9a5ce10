// Export modules for library usage
pub mod config;
pub mod core;
pub mod coverage;
pub mod cuj;
pub mod evidence;
pub mod graph;
pub mod pipeline;
pub mod recommend;
pub mod risk;
pub mod store;

// Re-export commonly used types
pub use crate::core::{
    CrudOp, Diagnostic, DiagnosticKind, Error, HttpMethod, IntegrationSignal, Result,
    RouteDescriptor, Severity,
};

pub use crate::config::RiskmapConfig;

pub use crate::evidence::{
    normalize_evidence, CoverageKind, CoverageRecord, EvidenceSet, FindingRecord,
    RawCoverageRecord, RawFindingRecord,
};

pub use crate::graph::{
    build_graph, ArchitectureEdge, ArchitectureGraph, ArchitectureNode, EdgeKind, FeatureArea,
    Integration, IntegrationType, NodeKind, RouteDoc,
};

pub use crate::cuj::{synthesize_cujs, CujStep, DiscoveredCuj};

pub use crate::coverage::{aggregate_coverage, associate_cujs, CoverageView, MergedCoverage};

pub use crate::risk::{
    summarize, RiskBand, RiskDistribution, RiskRecord, RiskScorer, RiskSummary,
};

pub use crate::recommend::{generate_recommendations, RecommendationRecord};

pub use crate::pipeline::{Pipeline, RunCounts, RunInput, RunMetrics, RunSnapshot};

pub use crate::store::{RunStore, TrendPoint};
