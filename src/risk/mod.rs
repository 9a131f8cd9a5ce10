//! Explainable risk scoring.
//!
//! Every score is the clamped sum of its factor map; there is no hidden
//! adjustment. For identical evidence the score, band, and factor map are
//! bit-identical across runs — a portability contract shared with
//! downstream dashboards.

use crate::core::{content_id, Diagnostic, DiagnosticKind, Severity};
use crate::coverage::CoverageView;
use crate::cuj::DiscoveredCuj;
use crate::evidence::EvidenceSet;
use crate::graph::ArchitectureGraph;
use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Linear coverage-gap factor ceiling
pub const COVERAGE_GAP_MAX: f64 = 40.0;
/// Finding-severity factor ceiling
pub const FINDING_SEVERITY_MAX: f64 = 40.0;
/// Journey-exposure factor ceiling
pub const CUJ_EXPOSURE_MAX: f64 = 20.0;
/// Points per weak journey touching a component
pub const CUJ_EXPOSURE_PER_JOURNEY: f64 = 5.0;

pub const COVERAGE_GAP_FACTOR: &str = "coverage_gap_factor";
pub const FINDING_SEVERITY_FACTOR: &str = "finding_severity_factor";
pub const CUJ_EXPOSURE_FACTOR: &str = "cuj_exposure_factor";

/// Points contributed by one finding of the given severity.
pub fn severity_points(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 15.0,
        Severity::High => 8.0,
        Severity::Medium => 3.0,
        Severity::Low => 1.0,
    }
}

/// Qualitative severity bucket derived from the numeric score.
///
/// Thresholds are fixed and boundary-exact: dashboards interoperate on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskBand::Critical
        } else if score >= 55.0 {
            RiskBand::High
        } else if score >= 30.0 {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Critical => "critical",
            RiskBand::High => "high",
            RiskBand::Medium => "medium",
            RiskBand::Low => "low",
        }
    }
}

/// Computed risk for one component within one run.
///
/// Superseded, never updated in place, across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub id: String,
    pub component: String,
    /// Clamped to [0, 100]; fully explained by `factors`
    pub score: f64,
    pub band: RiskBand,
    /// Independent qualitative label fed by scan tools (worst finding)
    pub severity: Severity,
    /// Proportion of expected evidence kinds actually present
    pub confidence: f64,
    pub title: String,
    pub description: String,
    pub factors: BTreeMap<String, f64>,
    pub evidence_refs: Vec<String>,
    /// Recommendation ids derived from this record, linked at finalization
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Scoring output: records plus degradation diagnostics
#[derive(Debug, Clone, Default)]
pub struct ScoredRisks {
    pub records: Vec<RiskRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-band counts over a run's risk records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub total_components: usize,
}

/// Run-level risk summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub top_risks: Vector<RiskRecord>,
    pub distribution: RiskDistribution,
    pub average_score: f64,
}

/// Computes the weighted, explainable risk score per component.
pub struct RiskScorer {
    pub coverage_target: f64,
    pub low_confidence_cutoff: f64,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            coverage_target: 0.8,
            low_confidence_cutoff: 0.7,
        }
    }
}

impl RiskScorer {
    pub fn new(coverage_target: f64, low_confidence_cutoff: f64) -> Self {
        Self {
            coverage_target,
            low_confidence_cutoff,
        }
    }

    /// Score every component in the union of graph features and evidence
    /// components. Components with sparse evidence are flagged via lowered
    /// confidence and a diagnostic, never dropped.
    pub fn score_components(
        &self,
        graph: &ArchitectureGraph,
        coverage: &CoverageView,
        evidence: &EvidenceSet,
        cujs: &[DiscoveredCuj],
    ) -> ScoredRisks {
        let mut components: BTreeSet<String> =
            graph.features.iter().map(|f| f.id.clone()).collect();
        components.extend(evidence.components());
        components.extend(coverage.components.keys().cloned());

        let mut out = ScoredRisks::default();
        for component in components {
            let (record, diagnostics) = self.score_component(&component, coverage, evidence, cujs);
            out.records.push(record);
            out.diagnostics.extend(diagnostics);
        }
        out
    }

    fn score_component(
        &self,
        component: &str,
        coverage: &CoverageView,
        evidence: &EvidenceSet,
        cujs: &[DiscoveredCuj],
    ) -> (RiskRecord, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut evidence_refs = Vec::new();

        // Coverage gap: 0-40 points, linear in the gap.
        let merged = coverage.components.get(component);
        let coverage_gap = match merged {
            Some(m) => {
                evidence_refs.push(m.record.id.clone());
                m.gap * COVERAGE_GAP_MAX
            }
            None => 0.0,
        };

        // Finding severity: fixed per-severity points, capped.
        let mut finding_points = 0.0;
        let mut worst: Option<Severity> = None;
        let mut have_findings = false;
        for finding in evidence.findings_for(component) {
            have_findings = true;
            finding_points += severity_points(finding.severity);
            worst = Some(worst.map_or(finding.severity, |w| w.max(finding.severity)));
            evidence_refs.push(finding.id.clone());
        }
        let finding_severity = finding_points.min(FINDING_SEVERITY_MAX);

        // Journey exposure: points per weak journey touching the component.
        // A journey with no coverage data counts as weak; its weakest link
        // is unknown.
        let mut weak_journeys = 0usize;
        let mut touches_any_cuj = false;
        for cuj in cujs {
            if !cuj.feature_ids.contains(component) {
                continue;
            }
            touches_any_cuj = true;
            let low_confidence = cuj.confidence < self.low_confidence_cutoff;
            let low_coverage = cuj.coverage.map_or(true, |c| c < self.coverage_target);
            if low_confidence || low_coverage {
                weak_journeys += 1;
                evidence_refs.push(cuj.id.clone());
            }
        }
        let cuj_exposure =
            (weak_journeys as f64 * CUJ_EXPOSURE_PER_JOURNEY).min(CUJ_EXPOSURE_MAX);

        let mut factors = BTreeMap::new();
        factors.insert(COVERAGE_GAP_FACTOR.to_string(), coverage_gap);
        factors.insert(FINDING_SEVERITY_FACTOR.to_string(), finding_severity);
        factors.insert(CUJ_EXPOSURE_FACTOR.to_string(), cuj_exposure);

        let score = factors.values().sum::<f64>().clamp(0.0, 100.0);
        let band = RiskBand::from_score(score);
        let severity = worst.unwrap_or(Severity::Low);

        // Confidence: proportion of expected evidence kinds present.
        let present = [merged.is_some(), have_findings, touches_any_cuj]
            .iter()
            .filter(|p| **p)
            .count();
        let confidence = present as f64 / 3.0;

        if merged.is_none() {
            diagnostics.push(Diagnostic::for_component(
                DiagnosticKind::MissingEvidence,
                component,
                "no coverage evidence; confidence lowered",
            ));
        }
        if !have_findings && merged.is_none() && !touches_any_cuj {
            diagnostics.push(Diagnostic::for_component(
                DiagnosticKind::MissingEvidence,
                component,
                "no evidence of any kind for this component",
            ));
        }
        if score == 0.0 {
            diagnostics.push(Diagnostic::for_component(
                DiagnosticKind::ScoringDegenerate,
                component,
                "all factors resolved to zero; emitting zero-score record",
            ));
        }

        let record = RiskRecord {
            id: content_id("rsk", &[component]),
            component: component.to_string(),
            score,
            band,
            severity,
            confidence,
            title: format!("{component} risk ({})", severity.as_str()),
            description:
                "Risk score derived from coverage gaps, scan findings, and journey exposure."
                    .to_string(),
            factors,
            evidence_refs,
            recommendations: Vec::new(),
            created_at: Utc::now(),
        };
        (record, diagnostics)
    }
}

/// Summarize scored records for the run manifest and trend series.
pub fn summarize(records: &[RiskRecord]) -> RiskSummary {
    let mut distribution = RiskDistribution {
        total_components: records.len(),
        ..Default::default()
    };
    for record in records {
        match record.band {
            RiskBand::Critical => distribution.critical_count += 1,
            RiskBand::High => distribution.high_count += 1,
            RiskBand::Medium => distribution.medium_count += 1,
            RiskBand::Low => distribution.low_count += 1,
        }
    }

    let average_score = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64
    };

    let mut sorted: Vec<RiskRecord> = records.to_vec();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.component.cmp(&b.component))
    });

    RiskSummary {
        top_risks: sorted.into_iter().take(10).collect(),
        distribution,
        average_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::aggregate_coverage;
    use crate::evidence::{normalize_evidence, RawCoverageRecord, RawFindingRecord};
    use proptest::prelude::*;

    fn coverage_view(component: &str, value: f64) -> CoverageView {
        let raw = RawCoverageRecord {
            tool: "pytest-cov".to_string(),
            kind: Some("unit".to_string()),
            component: component.to_string(),
            value,
            total_statements: Some(100),
            covered_statements: Some((value * 100.0) as u64),
            collected_at: None,
        };
        let normalized = normalize_evidence(&[raw], &[]);
        aggregate_coverage(&normalized.evidence.coverage, 0.8)
    }

    fn finding(component: &str, severity: &str) -> RawFindingRecord {
        RawFindingRecord {
            tool: "scanner".to_string(),
            severity: severity.to_string(),
            component: component.to_string(),
            message: format!("{severity} issue"),
            code: None,
            line: None,
            tags: vec![],
            collected_at: None,
        }
    }

    #[test]
    fn band_boundaries_are_exact() {
        assert_eq!(RiskBand::from_score(80.0), RiskBand::Critical);
        assert_eq!(RiskBand::from_score(79.999), RiskBand::High);
        assert_eq!(RiskBand::from_score(55.0), RiskBand::High);
        assert_eq!(RiskBand::from_score(54.999), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(30.0), RiskBand::Medium);
        assert_eq!(RiskBand::from_score(29.999), RiskBand::Low);
    }

    #[test]
    fn score_equals_sum_of_factors() {
        let view = coverage_view("pets", 0.55);
        let findings = vec![finding("pets", "high"), finding("pets", "medium")];
        let normalized = normalize_evidence(&[], &findings);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &view,
            &EvidenceSet {
                coverage: vec![],
                findings: normalized.evidence.findings,
            },
            &[],
        );
        let record = &scored.records[0];
        let factor_sum: f64 = record.factors.values().sum();
        assert_eq!(record.score, factor_sum.clamp(0.0, 100.0));
        // gap ~0.25 * 40 = ~10; high 8 + medium 3 = 11
        let expected_gap_factor = view.gap_for("pets").unwrap() * COVERAGE_GAP_MAX;
        assert_eq!(record.factors[COVERAGE_GAP_FACTOR], expected_gap_factor);
        assert!((record.factors[COVERAGE_GAP_FACTOR] - 10.0).abs() < 1e-9);
        assert_eq!(record.factors[FINDING_SEVERITY_FACTOR], 11.0);
    }

    #[test]
    fn finding_factor_caps_at_forty() {
        let findings: Vec<RawFindingRecord> =
            (0..5).map(|i| {
                let mut f = finding("pets", "critical");
                f.line = Some(i);
                f
            }).collect();
        let normalized = normalize_evidence(&[], &findings);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &CoverageView::default(),
            &normalized.evidence,
            &[],
        );
        assert_eq!(
            scored.records[0].factors[FINDING_SEVERITY_FACTOR],
            FINDING_SEVERITY_MAX
        );
    }

    #[test]
    fn zero_factor_component_is_emitted_not_suppressed() {
        let view = coverage_view("pets", 0.9);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &view,
            &EvidenceSet::default(),
            &[],
        );
        // Coverage above target, no findings, no journeys: score 0, band low.
        let record = &scored.records[0];
        assert_eq!(record.score, 0.0);
        assert_eq!(record.band, RiskBand::Low);
        assert!(scored
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ScoringDegenerate));
    }

    #[test]
    fn confidence_reflects_present_evidence_kinds() {
        let view = coverage_view("pets", 0.5);
        let normalized = normalize_evidence(&[], &[finding("pets", "low")]);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &view,
            &normalized.evidence,
            &[],
        );
        // Coverage and findings present, no journey data: 2 of 3.
        assert!((scored.records[0].confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn worst_finding_drives_severity_label() {
        let findings = vec![finding("pets", "low"), finding("pets", "critical")];
        let normalized = normalize_evidence(&[], &findings);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &CoverageView::default(),
            &normalized.evidence,
            &[],
        );
        assert_eq!(scored.records[0].severity, Severity::Critical);
    }

    #[test]
    fn summary_distribution_counts_bands() {
        let view = coverage_view("pets", 0.0);
        let findings: Vec<RawFindingRecord> = (0..3)
            .map(|i| {
                let mut f = finding("pets", "critical");
                f.line = Some(i);
                f
            })
            .collect();
        let normalized = normalize_evidence(&[], &findings);
        let scorer = RiskScorer::default();
        let scored = scorer.score_components(
            &ArchitectureGraph::default(),
            &view,
            &normalized.evidence,
            &[],
        );
        let summary = summarize(&scored.records);
        // gap 0.8*40 = 32, findings 45 capped at 40 => 72 => high
        assert_eq!(summary.distribution.high_count, 1);
        assert_eq!(summary.distribution.total_components, 1);
        assert!(summary.average_score > 0.0);
    }

    proptest! {
        /// Widening the coverage gap never lowers the score.
        #[test]
        fn score_is_monotone_in_coverage_gap(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (low_cov, high_cov) = if a <= b { (a, b) } else { (b, a) };
            let scorer = RiskScorer::default();
            let score_for = |value: f64| {
                let view = coverage_view("pets", value);
                let scored = scorer.score_components(
                    &ArchitectureGraph::default(),
                    &view,
                    &EvidenceSet::default(),
                    &[],
                );
                scored.records[0].score
            };
            // Lower coverage means a wider gap and therefore >= score.
            prop_assert!(score_for(low_cov) >= score_for(high_cov));
        }

        /// More findings never lower the severity factor.
        #[test]
        fn finding_factor_is_monotone(n in 0usize..12) {
            let make = |count: usize| {
                let findings: Vec<RawFindingRecord> = (0..count)
                    .map(|i| {
                        let mut f = finding("pets", "medium");
                        f.line = Some(i as u32);
                        f
                    })
                    .collect();
                let normalized = normalize_evidence(&[], &findings);
                let scorer = RiskScorer::default();
                let scored = scorer.score_components(
                    &ArchitectureGraph::default(),
                    &CoverageView::default(),
                    &normalized.evidence,
                    &[],
                );
                scored.records.first().map(|r| r.factors[FINDING_SEVERITY_FACTOR]).unwrap_or(0.0)
            };
            prop_assert!(make(n + 1) >= make(n));
        }
    }
}
