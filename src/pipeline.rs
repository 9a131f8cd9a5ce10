//! The evidence-to-risk pipeline.
//!
//! One invocation processes one run: the evidence normalizer and graph
//! builder execute independently (and in parallel), then the journey
//! synthesizer, coverage aggregator, risk scorer, and recommendation
//! generator run as a strict dependency chain. Every stage is a pure
//! function of its inputs, so re-running an evidence snapshot reproduces
//! the same derived records.

use crate::config::RiskmapConfig;
use crate::core::{Diagnostic, Error, IntegrationSignal, Result, RouteDescriptor};
use crate::coverage::{aggregate_coverage, associate_cujs, CoverageView};
use crate::cuj::{synthesize_cujs, DiscoveredCuj};
use crate::evidence::{normalize_evidence, EvidenceSet, RawCoverageRecord, RawFindingRecord};
use crate::graph::{build_graph, ArchitectureGraph};
use crate::recommend::{generate_recommendations, link_recommendations, RecommendationRecord};
use crate::risk::{summarize, RiskBand, RiskRecord, RiskScorer, RiskSummary};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the collectors hand us for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInput {
    pub run_id: String,
    pub routes: Vec<RouteDescriptor>,
    pub integration_signals: Vec<IntegrationSignal>,
    pub coverage: Vec<RawCoverageRecord>,
    pub findings: Vec<RawFindingRecord>,
}

/// Record counts per entity kind, manifest-style
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub nodes: usize,
    pub edges: usize,
    pub features: usize,
    pub integrations: usize,
    pub cujs: usize,
    pub coverage_components: usize,
    pub findings: usize,
    pub risks: usize,
    pub recommendations: usize,
}

/// Run-level metrics exposed for trend comparison across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub average_risk_score: f64,
    /// Components banded critical or high
    pub high_risk_count: usize,
    pub overall_coverage: Option<f64>,
}

/// The immutable snapshot boundary: one coherent evidence collection and
/// everything derived from it. Finalized once, never mutated; a later run
/// supersedes it under a new run id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub graph: ArchitectureGraph,
    pub evidence: EvidenceSet,
    pub cujs: Vec<DiscoveredCuj>,
    pub coverage: CoverageView,
    pub risks: Vec<RiskRecord>,
    pub recommendations: Vec<RecommendationRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub counts: RunCounts,
    pub metrics: RunMetrics,
}

impl RunSnapshot {
    pub fn summary(&self) -> RiskSummary {
        summarize(&self.risks)
    }

    /// Render each entity kind as a JSON Lines string, keyed by kind.
    ///
    /// The core performs no file I/O; callers persist these at the store
    /// boundary.
    pub fn to_jsonl(&self) -> Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        out.insert("nodes".to_string(), to_jsonl_lines(&self.graph.nodes)?);
        out.insert("edges".to_string(), to_jsonl_lines(&self.graph.edges)?);
        out.insert("features".to_string(), to_jsonl_lines(&self.graph.features)?);
        out.insert(
            "integrations".to_string(),
            to_jsonl_lines(&self.graph.integrations)?,
        );
        out.insert("cujs".to_string(), to_jsonl_lines(&self.cujs)?);
        let merged: Vec<_> = self.coverage.components.values().collect();
        out.insert("coverage".to_string(), to_jsonl_lines(&merged)?);
        out.insert("findings".to_string(), to_jsonl_lines(&self.evidence.findings)?);
        out.insert("risks".to_string(), to_jsonl_lines(&self.risks)?);
        out.insert(
            "recommendations".to_string(),
            to_jsonl_lines(&self.recommendations)?,
        );
        out.insert("diagnostics".to_string(), to_jsonl_lines(&self.diagnostics)?);
        Ok(out)
    }
}

fn to_jsonl_lines<T: Serialize>(records: &[T]) -> Result<String> {
    let mut lines = String::new();
    for record in records {
        lines.push_str(&serde_json::to_string(record)?);
        lines.push('\n');
    }
    Ok(lines)
}

/// Executes the evidence-to-risk pipeline for one run at a time
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RiskmapConfig,
}

impl Pipeline {
    pub fn new(config: RiskmapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskmapConfig {
        &self.config
    }

    /// Run the full pipeline over one evidence snapshot.
    ///
    /// Fails only when there is nothing at all to score; sparse evidence
    /// lowers confidence and surfaces diagnostics instead.
    pub fn execute(&self, input: RunInput) -> Result<RunSnapshot> {
        if input.run_id.trim().is_empty() {
            return Err(Error::validation("run_id must not be empty"));
        }
        info!("executing pipeline for run {}", input.run_id);

        // The two upstream stages are independent: each writes only its own
        // output collection.
        let (normalized, graph_build) = rayon::join(
            || normalize_evidence(&input.coverage, &input.findings),
            || build_graph(&input.routes, &input.integration_signals),
        );

        if normalized.evidence.is_empty() && input.routes.is_empty() {
            return Err(Error::EmptyRun {
                run_id: input.run_id,
            });
        }

        let mut diagnostics = normalized.diagnostics;
        diagnostics.extend(graph_build.diagnostics);
        let graph = graph_build.graph;
        let evidence = normalized.evidence;

        // Strict dependency chain from here on.
        let cujs = synthesize_cujs(&graph);
        debug!("synthesized {} journeys", cujs.len());

        let view = aggregate_coverage(&evidence.coverage, self.config.coverage_target);
        let (cujs, view, coverage_diags) = associate_cujs(&cujs, &view);
        diagnostics.extend(coverage_diags);

        let scorer = RiskScorer::new(
            self.config.coverage_target,
            self.config.low_confidence_cutoff,
        );
        let scored = scorer.score_components(&graph, &view, &evidence, &cujs);
        diagnostics.extend(scored.diagnostics);

        let batch =
            generate_recommendations(&scored.records, &graph, self.config.recommendation_threshold);
        diagnostics.extend(batch.diagnostics);
        let risks = link_recommendations(&scored.records, &batch.records);

        let summary = summarize(&risks);
        let metrics = RunMetrics {
            average_risk_score: summary.average_score,
            high_risk_count: risks
                .iter()
                .filter(|r| matches!(r.band, RiskBand::Critical | RiskBand::High))
                .count(),
            overall_coverage: view.overall,
        };
        let counts = RunCounts {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            features: graph.features.len(),
            integrations: graph.integrations.len(),
            cujs: cujs.len(),
            coverage_components: view.components.len(),
            findings: evidence.findings.len(),
            risks: risks.len(),
            recommendations: batch.records.len(),
        };
        info!(
            "run {} finalized: {} risks, {} recommendations, {} diagnostics",
            input.run_id,
            counts.risks,
            counts.recommendations,
            diagnostics.len()
        );

        Ok(RunSnapshot {
            run_id: input.run_id,
            created_at: Utc::now(),
            graph,
            evidence,
            cujs,
            coverage: view,
            risks,
            recommendations: batch.records,
            diagnostics,
            counts,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HttpMethod;

    fn route(method: HttpMethod, path: &str) -> RouteDescriptor {
        RouteDescriptor {
            path: path.to_string(),
            method,
            feature_label: None,
            tags: vec![],
            auth_required: false,
            handler_refs: vec![],
            summary: None,
        }
    }

    fn sample_input(run_id: &str) -> RunInput {
        RunInput {
            run_id: run_id.to_string(),
            routes: vec![
                route(HttpMethod::Post, "/pets"),
                route(HttpMethod::Get, "/pets/{id}"),
                route(HttpMethod::Put, "/pets/{id}"),
                route(HttpMethod::Delete, "/pets/{id}"),
            ],
            integration_signals: vec![],
            coverage: vec![RawCoverageRecord {
                tool: "pytest-cov".to_string(),
                kind: Some("unit".to_string()),
                component: "pets".to_string(),
                value: 0.55,
                total_statements: Some(200),
                covered_statements: Some(110),
                collected_at: None,
            }],
            findings: vec![RawFindingRecord {
                tool: "bandit".to_string(),
                severity: "high".to_string(),
                component: "pets".to_string(),
                message: "eval used".to_string(),
                code: Some("B307".to_string()),
                line: Some(42),
                tags: vec![],
                collected_at: None,
            }],
        }
    }

    #[test]
    fn empty_run_fails_outright() {
        let pipeline = Pipeline::default();
        let err = pipeline
            .execute(RunInput {
                run_id: "run-empty".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::EmptyRun { .. }));
    }

    #[test]
    fn sparse_evidence_degrades_not_fails() {
        let pipeline = Pipeline::default();
        let input = RunInput {
            run_id: "run-sparse".to_string(),
            routes: vec![route(HttpMethod::Get, "/pets")],
            ..Default::default()
        };
        let snapshot = pipeline.execute(input).unwrap();
        assert_eq!(snapshot.risks.len(), 1);
        assert!(snapshot.risks[0].confidence < 1.0);
        assert!(!snapshot.diagnostics.is_empty());
    }

    #[test]
    fn snapshot_carries_counts_and_metrics() {
        let pipeline = Pipeline::default();
        let snapshot = pipeline.execute(sample_input("run-1")).unwrap();
        assert_eq!(snapshot.counts.features, 1);
        assert_eq!(snapshot.counts.findings, 1);
        assert_eq!(snapshot.counts.risks, snapshot.risks.len());
        assert!(snapshot.metrics.overall_coverage.is_some());
        assert!(snapshot.metrics.average_risk_score > 0.0);
    }

    #[test]
    fn jsonl_export_covers_every_entity_kind() {
        let pipeline = Pipeline::default();
        let snapshot = pipeline.execute(sample_input("run-1")).unwrap();
        let files = snapshot.to_jsonl().unwrap();
        for kind in [
            "nodes",
            "edges",
            "features",
            "integrations",
            "cujs",
            "coverage",
            "findings",
            "risks",
            "recommendations",
            "diagnostics",
        ] {
            assert!(files.contains_key(kind), "missing {kind}");
        }
        assert_eq!(
            files["risks"].trim().lines().count(),
            snapshot.risks.len()
        );
    }
}
