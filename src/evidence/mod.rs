//! Normalized evidence records and the collector-output normalizer.
//!
//! Collectors (coverage tools, contract-test runners, scanners) are black
//! boxes that hand us loosely shaped records. This module validates those
//! shapes into the uniform record set the rest of the pipeline consumes.
//! Malformed records are dropped with a diagnostic, never propagated.

use crate::core::{content_id, Diagnostic, DiagnosticKind, Severity};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of exercising a coverage record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageKind {
    Unit,
    Integration,
    Contract,
    EndToEnd,
    /// Fallback for tool types we have no table entry for
    Unknown,
}

impl CoverageKind {
    /// Fixed label-to-kind table with an explicit fallback case.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "unit" => CoverageKind::Unit,
            "integration" => CoverageKind::Integration,
            "contract" | "contract_test" => CoverageKind::Contract,
            "e2e" | "end_to_end" | "endtoend" => CoverageKind::EndToEnd,
            _ => CoverageKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageKind::Unit => "unit",
            CoverageKind::Integration => "integration",
            CoverageKind::Contract => "contract",
            CoverageKind::EndToEnd => "e2e",
            CoverageKind::Unknown => "unknown",
        }
    }
}

/// Coverage metric for one component from one tool run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub id: String,
    pub kind: CoverageKind,
    pub component: String,
    /// Covered fraction in [0, 1]
    pub value: f64,
    pub total_statements: Option<u64>,
    pub covered_statements: Option<u64>,
    /// Contributing tools/types, for merge transparency
    pub sources: Vec<String>,
    pub linked_cujs: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

/// Normalized lint/security/contract-test finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    pub id: String,
    pub tool: String,
    pub severity: Severity,
    pub component: String,
    pub message: String,
    pub code: Option<String>,
    pub line: Option<u32>,
    pub tags: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

/// Raw coverage output as handed over by a collector, prior to validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCoverageRecord {
    pub tool: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub component: String,
    pub value: f64,
    #[serde(default)]
    pub total_statements: Option<u64>,
    #[serde(default)]
    pub covered_statements: Option<u64>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// Raw finding output as handed over by a collector, prior to validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFindingRecord {
    pub tool: String,
    pub severity: String,
    pub component: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// The uniform evidence record set keyed by component identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSet {
    pub coverage: Vec<CoverageRecord>,
    pub findings: Vec<FindingRecord>,
}

impl EvidenceSet {
    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty() && self.findings.is_empty()
    }

    /// All component identifiers any evidence refers to, in stable order.
    pub fn components(&self) -> BTreeSet<String> {
        self.coverage
            .iter()
            .map(|r| r.component.clone())
            .chain(self.findings.iter().map(|r| r.component.clone()))
            .collect()
    }

    pub fn findings_for<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a FindingRecord> {
        self.findings
            .iter()
            .filter(move |f| f.component == component)
    }
}

/// Result of normalization: the validated set plus drop diagnostics
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvidence {
    pub evidence: EvidenceSet,
    pub diagnostics: Vec<Diagnostic>,
}

/// Validate raw collector records into the uniform evidence set.
///
/// Absent evidence is fine (sparse input lowers confidence downstream);
/// malformed evidence is dropped here with a `MalformedEvidence` diagnostic.
pub fn normalize_evidence(
    coverage: &[RawCoverageRecord],
    findings: &[RawFindingRecord],
) -> NormalizedEvidence {
    let mut out = NormalizedEvidence::default();

    for raw in coverage {
        match validate_coverage(raw) {
            Ok(record) => out.evidence.coverage.push(record),
            Err(reason) => {
                debug!("dropping coverage record from {}: {reason}", raw.tool);
                out.diagnostics.push(Diagnostic::for_component(
                    DiagnosticKind::MalformedEvidence,
                    raw.component.clone(),
                    format!("coverage record from '{}' dropped: {reason}", raw.tool),
                ));
            }
        }
    }

    for raw in findings {
        match validate_finding(raw) {
            Ok(record) => out.evidence.findings.push(record),
            Err(reason) => {
                debug!("dropping finding from {}: {reason}", raw.tool);
                out.diagnostics.push(Diagnostic::for_component(
                    DiagnosticKind::MalformedEvidence,
                    raw.component.clone(),
                    format!("finding from '{}' dropped: {reason}", raw.tool),
                ));
            }
        }
    }

    out
}

fn validate_coverage(raw: &RawCoverageRecord) -> std::result::Result<CoverageRecord, String> {
    if raw.component.trim().is_empty() {
        return Err("empty component id".to_string());
    }
    if !raw.value.is_finite() || !(0.0..=1.0).contains(&raw.value) {
        return Err(format!("value {} outside [0, 1]", raw.value));
    }
    if let (Some(covered), Some(total)) = (raw.covered_statements, raw.total_statements) {
        if covered > total {
            return Err(format!(
                "covered statements {covered} exceed total {total}"
            ));
        }
    }

    let kind = raw
        .kind
        .as_deref()
        .map(CoverageKind::parse)
        .unwrap_or(CoverageKind::Unknown);
    let collected_at = raw.collected_at.unwrap_or_else(Utc::now);

    Ok(CoverageRecord {
        id: content_id(
            "cov",
            &[&raw.component, &raw.tool, kind.as_str()],
        ),
        kind,
        component: raw.component.trim().to_string(),
        value: raw.value,
        total_statements: raw.total_statements,
        covered_statements: raw.covered_statements,
        sources: vec![raw.tool.clone()],
        linked_cujs: Vec::new(),
        collected_at,
    })
}

fn validate_finding(raw: &RawFindingRecord) -> std::result::Result<FindingRecord, String> {
    if raw.component.trim().is_empty() {
        return Err("empty component id".to_string());
    }
    if raw.message.trim().is_empty() {
        return Err("empty message".to_string());
    }
    let severity = Severity::parse(&raw.severity)
        .ok_or_else(|| format!("unrecognized severity '{}'", raw.severity))?;

    let line = raw.line.map(|l| l.to_string()).unwrap_or_default();
    Ok(FindingRecord {
        id: content_id(
            "fnd",
            &[
                &raw.tool,
                &raw.component,
                severity.as_str(),
                &raw.message,
                &line,
            ],
        ),
        tool: raw.tool.clone(),
        severity,
        component: raw.component.trim().to_string(),
        message: raw.message.clone(),
        code: raw.code.clone(),
        line: raw.line,
        tags: raw.tags.clone(),
        collected_at: raw.collected_at.unwrap_or_else(Utc::now),
    })
}
