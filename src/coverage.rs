//! Coverage aggregation: reconciles per-component records from multiple
//! tools into one view, computes gap-to-target, and attaches coverage to
//! discovered journeys.
//!
//! Merge rules: records of the same kind are combined with a
//! statement-count-weighted mean; across kinds the maximum wins (any form
//! of exercising counts as partial evidence), with every contributing
//! source kept in `sources` for transparency.

use crate::core::{content_id, Diagnostic, DiagnosticKind};
use crate::cuj::DiscoveredCuj;
use crate::evidence::{CoverageKind, CoverageRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reconciled coverage for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCoverage {
    pub record: CoverageRecord,
    /// max(0, target − value)
    pub gap: f64,
}

/// Reconciled coverage across all components in a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageView {
    pub target: f64,
    pub components: BTreeMap<String, MergedCoverage>,
    /// Statement-weighted mean across components, when any coverage exists
    pub overall: Option<f64>,
}

impl CoverageView {
    pub fn value_for(&self, component: &str) -> Option<f64> {
        self.components.get(component).map(|m| m.record.value)
    }

    pub fn gap_for(&self, component: &str) -> Option<f64> {
        self.components.get(component).map(|m| m.gap)
    }
}

/// Merge all records of one kind for one component with a weighted mean.
/// Weight is the statement count when available, else 1.
fn merge_same_kind(records: &[&CoverageRecord]) -> CoverageRecord {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut total_statements = 0u64;
    let mut covered_statements = 0u64;
    let mut have_counts = false;
    let mut sources: Vec<String> = Vec::new();
    let mut latest = records[0].collected_at;

    for record in records {
        let weight = record.total_statements.map(|t| t as f64).unwrap_or(1.0);
        weighted_sum += record.value * weight;
        weight_total += weight;
        if let (Some(total), Some(covered)) =
            (record.total_statements, record.covered_statements)
        {
            total_statements += total;
            covered_statements += covered;
            have_counts = true;
        }
        for source in &record.sources {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }
        if record.collected_at > latest {
            latest = record.collected_at;
        }
    }

    let value = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };

    CoverageRecord {
        id: content_id(
            "cov",
            &[
                &records[0].component,
                records[0].kind.as_str(),
                "merged",
            ],
        ),
        kind: records[0].kind,
        component: records[0].component.clone(),
        value,
        total_statements: have_counts.then_some(total_statements),
        covered_statements: have_counts.then_some(covered_statements),
        sources,
        linked_cujs: Vec::new(),
        collected_at: latest,
    }
}

/// Pick the winning per-kind record across kinds: highest value; ties break
/// to the more specific record (higher statement count), then the most
/// recent timestamp.
fn pick_across_kinds(per_kind: Vec<CoverageRecord>) -> CoverageRecord {
    let mut all_sources: Vec<String> = Vec::new();
    for record in &per_kind {
        for source in &record.sources {
            if !all_sources.contains(source) {
                all_sources.push(source.clone());
            }
        }
        let kind_label = record.kind.as_str().to_string();
        if !all_sources.contains(&kind_label) {
            all_sources.push(kind_label);
        }
    }

    let mut winner = per_kind
        .into_iter()
        .max_by(|a, b| {
            a.value
                .partial_cmp(&b.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    a.total_statements
                        .unwrap_or(0)
                        .cmp(&b.total_statements.unwrap_or(0))
                })
                .then_with(|| a.collected_at.cmp(&b.collected_at))
        })
        .expect("pick_across_kinds called with at least one record");

    winner.id = content_id("cov", &[&winner.component, "merged"]);
    winner.sources = all_sources;
    winner
}

/// Reconcile all coverage records into one view with gap-to-target.
pub fn aggregate_coverage(records: &[CoverageRecord], target: f64) -> CoverageView {
    let mut by_component: BTreeMap<&str, BTreeMap<CoverageKind, Vec<&CoverageRecord>>> =
        BTreeMap::new();
    for record in records {
        by_component
            .entry(record.component.as_str())
            .or_default()
            .entry(record.kind)
            .or_default()
            .push(record);
    }

    let mut components = BTreeMap::new();
    for (component, kinds) in by_component {
        let per_kind: Vec<CoverageRecord> =
            kinds.values().map(|group| merge_same_kind(group)).collect();
        let merged = pick_across_kinds(per_kind);
        let gap = (target - merged.value).max(0.0);
        debug!("merged coverage for {component}: {:.3} (gap {gap:.3})", merged.value);
        components.insert(component.to_string(), MergedCoverage { record: merged, gap });
    }

    let overall = if components.is_empty() {
        None
    } else {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for merged in components.values() {
            let weight = merged
                .record
                .total_statements
                .map(|t| t as f64)
                .unwrap_or(1.0);
            weighted_sum += merged.record.value * weight;
            weight_total += weight;
        }
        (weight_total > 0.0).then(|| weighted_sum / weight_total)
    };

    CoverageView {
        target,
        components,
        overall,
    }
}

/// Attach journey coverage (the minimum across touched components: a
/// journey is only as covered as its weakest link) and back-link journeys
/// onto the merged records. Returns new values; inputs stay untouched.
pub fn associate_cujs(
    cujs: &[DiscoveredCuj],
    view: &CoverageView,
) -> (Vec<DiscoveredCuj>, CoverageView, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut linked: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let updated: Vec<DiscoveredCuj> = cujs
        .iter()
        .map(|cuj| {
            let mut weakest: Option<f64> = None;
            let mut missing = false;
            for feature_id in &cuj.feature_ids {
                match view.value_for(feature_id) {
                    Some(value) => {
                        weakest = Some(weakest.map_or(value, |w: f64| w.min(value)));
                        linked
                            .entry(feature_id.clone())
                            .or_default()
                            .push(cuj.id.clone());
                    }
                    None => missing = true,
                }
            }
            if missing {
                diagnostics.push(Diagnostic::for_component(
                    DiagnosticKind::MissingEvidence,
                    cuj.feature_ids.iter().cloned().collect::<Vec<_>>().join(","),
                    format!("journey '{}' touches components without coverage", cuj.name),
                ));
            }
            let mut updated = cuj.clone();
            // Partial coverage knowledge does not pretend to be complete.
            updated.coverage = if missing { None } else { weakest };
            updated
        })
        .collect();

    let mut new_view = view.clone();
    for (component, cuj_ids) in linked {
        if let Some(merged) = new_view.components.get_mut(&component) {
            merged.record.linked_cujs = cuj_ids;
        }
    }

    (updated, new_view, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn record(
        component: &str,
        kind: CoverageKind,
        value: f64,
        statements: Option<(u64, u64)>,
    ) -> CoverageRecord {
        CoverageRecord {
            id: format!("cov-test-{component}-{}", kind.as_str()),
            kind,
            component: component.to_string(),
            value,
            total_statements: statements.map(|(t, _)| t),
            covered_statements: statements.map(|(_, c)| c),
            sources: vec![format!("{}-tool", kind.as_str())],
            linked_cujs: vec![],
            collected_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn gap_is_exact_against_target() {
        let view = aggregate_coverage(
            &[record("pets", CoverageKind::Unit, 0.55, None)],
            0.8,
        );
        assert_eq!(view.gap_for("pets"), Some(0.25));
    }

    #[test]
    fn same_kind_records_use_weighted_mean() {
        let records = vec![
            record("pets", CoverageKind::Unit, 0.5, Some((100, 50))),
            record("pets", CoverageKind::Unit, 0.8, Some((300, 240))),
        ];
        let view = aggregate_coverage(&records, 0.8);
        // (0.5*100 + 0.8*300) / 400 = 0.725
        let value = view.value_for("pets").unwrap();
        assert!((value - 0.725).abs() < 1e-9);
    }

    #[test]
    fn cross_kind_merge_keeps_maximum_and_annotates_sources() {
        let records = vec![
            record("pets", CoverageKind::Unit, 0.4, Some((100, 40))),
            record("pets", CoverageKind::Contract, 0.6, None),
        ];
        let view = aggregate_coverage(&records, 0.8);
        let merged = &view.components["pets"];
        assert_eq!(merged.record.value, 0.6);
        assert!(merged.record.sources.contains(&"unit".to_string()));
        assert!(merged.record.sources.contains(&"contract".to_string()));
        assert!(merged.record.sources.contains(&"unit-tool".to_string()));
    }

    #[test]
    fn cross_kind_value_tie_prefers_higher_statement_count() {
        let sparse = record("pets", CoverageKind::Contract, 0.6, None);
        let specific = record("pets", CoverageKind::Unit, 0.6, Some((500, 300)));
        let view = aggregate_coverage(&[sparse, specific], 0.8);
        let merged = &view.components["pets"];
        assert_eq!(merged.record.kind, CoverageKind::Unit);
        assert_eq!(merged.record.total_statements, Some(500));
    }

    #[test]
    fn journey_coverage_is_weakest_link() {
        let records = vec![
            record("orders", CoverageKind::Unit, 0.9, None),
            record("shipments", CoverageKind::Unit, 0.3, None),
        ];
        let view = aggregate_coverage(&records, 0.8);
        let cuj = DiscoveredCuj {
            id: "cuj-test".to_string(),
            name: "Handoff".to_string(),
            description: String::new(),
            pattern: "cross_feature_handoff".to_string(),
            steps: vec![],
            feature_ids: BTreeSet::from(["orders".to_string(), "shipments".to_string()]),
            confidence: 1.0,
            coverage: None,
        };
        let (cujs, view, diagnostics) = associate_cujs(&[cuj], &view);
        assert_eq!(cujs[0].coverage, Some(0.3));
        assert!(diagnostics.is_empty());
        assert_eq!(
            view.components["orders"].record.linked_cujs,
            vec!["cuj-test".to_string()]
        );
    }

    #[test]
    fn missing_component_coverage_yields_diagnostic_not_failure() {
        let view = aggregate_coverage(&[], 0.8);
        let cuj = DiscoveredCuj {
            id: "cuj-test".to_string(),
            name: "Pets CRUD".to_string(),
            description: String::new(),
            pattern: "crud_lifecycle".to_string(),
            steps: vec![],
            feature_ids: BTreeSet::from(["pets".to_string()]),
            confidence: 1.0,
            coverage: None,
        };
        let (cujs, _, diagnostics) = associate_cujs(&[cuj], &view);
        assert_eq!(cujs[0].coverage, None);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingEvidence);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let records = vec![
            record("a", CoverageKind::Unit, 0.5, Some((10, 5))),
            record("b", CoverageKind::Contract, 0.9, None),
            record("a", CoverageKind::EndToEnd, 0.2, None),
        ];
        let x = aggregate_coverage(&records, 0.8);
        let y = aggregate_coverage(&records, 0.8);
        assert_eq!(x, y);
    }
}
