//! Maps risk factors to prioritized, de-duplicated remediation actions.
//!
//! Each factor above the configured threshold looks up a fixed remediation
//! template. Identical (component, template) pairs are merged into one
//! record with combined evidence references, and no recommendation may
//! reference a component absent from the current run's graph.

use crate::core::{content_id, Diagnostic, DiagnosticKind};
use crate::graph::ArchitectureGraph;
use crate::risk::{
    RiskBand, RiskRecord, COVERAGE_GAP_FACTOR, COVERAGE_GAP_MAX, CUJ_EXPOSURE_FACTOR,
    CUJ_EXPOSURE_PER_JOURNEY, FINDING_SEVERITY_FACTOR,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One remediation action derived from risk factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub component: String,
    /// Band of the originating risk record
    pub priority: RiskBand,
    pub summary: String,
    pub details: String,
    pub evidence_refs: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Generation output: records plus referential-integrity diagnostics
#[derive(Debug, Clone, Default)]
pub struct RecommendationBatch {
    pub records: Vec<RecommendationRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Fixed factor → remediation template table.
fn remediation_template(factor: &str, component: &str, contribution: f64) -> Option<(String, String)> {
    match factor {
        COVERAGE_GAP_FACTOR => {
            let gap = contribution / COVERAGE_GAP_MAX;
            Some((
                format!("Increase test coverage for {component}"),
                format!(
                    "Coverage for {component} is {gap:.0}% below target; \
                     add tests for its least-covered paths first.",
                    gap = gap * 100.0
                ),
            ))
        }
        FINDING_SEVERITY_FACTOR => Some((
            format!("Resolve outstanding scan findings for {component}"),
            format!(
                "Scan findings contribute {contribution:.1} risk points to {component}; \
                 triage the highest-severity findings first."
            ),
        )),
        CUJ_EXPOSURE_FACTOR => {
            let journeys = (contribution / CUJ_EXPOSURE_PER_JOURNEY).round() as u64;
            Some((
                format!("Strengthen critical journeys through {component}"),
                format!(
                    "{journeys} weak (low-confidence or under-covered) user journey(s) \
                     pass through {component}; add journey-level tests."
                ),
            ))
        }
        _ => None,
    }
}

/// Generate recommendations from scored risks.
///
/// `threshold` is the minimum factor contribution (in score points) that
/// produces an action.
pub fn generate_recommendations(
    risks: &[RiskRecord],
    graph: &ArchitectureGraph,
    threshold: f64,
) -> RecommendationBatch {
    let graph_components = graph.component_ids();
    let mut batch = RecommendationBatch::default();
    // De-dup key: (component, factor). Overlapping contributions merge.
    let mut merged: BTreeMap<(String, String), RecommendationRecord> = BTreeMap::new();

    for risk in risks {
        for (factor, contribution) in &risk.factors {
            if *contribution < threshold {
                continue;
            }
            let Some((summary, details)) =
                remediation_template(factor, &risk.component, *contribution)
            else {
                continue;
            };

            if !graph_components.contains(&risk.component) {
                batch.diagnostics.push(Diagnostic::for_component(
                    DiagnosticKind::GraphInconsistency,
                    risk.component.clone(),
                    format!(
                        "suppressed '{factor}' recommendation: component absent from the run's graph"
                    ),
                ));
                continue;
            }

            let key = (risk.component.clone(), factor.clone());
            match merged.get_mut(&key) {
                Some(existing) => {
                    for reference in &risk.evidence_refs {
                        if !existing.evidence_refs.contains(reference) {
                            existing.evidence_refs.push(reference.clone());
                        }
                    }
                    // Most severe originating band wins.
                    if risk.band < existing.priority {
                        existing.priority = risk.band;
                    }
                }
                None => {
                    let mut metadata = BTreeMap::new();
                    metadata.insert("factor".to_string(), factor.clone());
                    metadata.insert("contribution".to_string(), format!("{contribution:.3}"));
                    metadata.insert("score".to_string(), format!("{:.3}", risk.score));
                    merged.insert(
                        key,
                        RecommendationRecord {
                            id: content_id("rec", &[&risk.component, factor]),
                            component: risk.component.clone(),
                            priority: risk.band,
                            summary,
                            details,
                            evidence_refs: risk.evidence_refs.clone(),
                            metadata,
                            created_at: risk.created_at,
                        },
                    );
                }
            }
        }
    }

    let mut records: Vec<RecommendationRecord> = merged.into_values().collect();
    // Most urgent first; id keeps equal-priority order stable.
    records.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    batch.records = records;
    batch
}

/// Link generated recommendation ids back onto their originating risk
/// records, returning new records (risk records are never mutated in place
/// once a run finalizes).
pub fn link_recommendations(
    risks: &[RiskRecord],
    recommendations: &[RecommendationRecord],
) -> Vec<RiskRecord> {
    risks
        .iter()
        .map(|risk| {
            let mut updated = risk.clone();
            updated.recommendations = recommendations
                .iter()
                .filter(|rec| rec.component == risk.component)
                .map(|rec| rec.id.clone())
                .collect();
            updated
        })
        .collect()
}
