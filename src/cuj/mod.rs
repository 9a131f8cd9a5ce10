//! Critical user journey synthesis.
//!
//! Journeys are pattern-matched from feature route sequences against an
//! ordered template library, producing named, confidence-scored records.

pub mod matcher;
pub mod templates;

pub use matcher::synthesize_cujs;
pub use templates::{template_library, JourneyTemplate, TemplateToken, TokenKind};

use crate::core::HttpMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One step in a discovered journey
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CujStep {
    pub order: u32,
    pub action: String,
    pub route: Option<String>,
    pub method: Option<HttpMethod>,
}

/// A synthesized critical user journey.
///
/// Produced once per matched pattern instance per run; never mutated after
/// creation. A later run supersedes it with a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredCuj {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Name of the template that matched
    pub pattern: String,
    pub steps: Vec<CujStep>,
    pub feature_ids: BTreeSet<String>,
    /// Match confidence in [0, 1]
    pub confidence: f64,
    /// Minimum coverage among touched components, attached by the
    /// coverage aggregator; `None` until coverage is associated
    pub coverage: Option<f64>,
}
