//! Shared error types and run-level diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for riskmap operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// No evidence of any kind was supplied, so there is nothing to score
    #[error("Run {run_id} has no evidence of any kind: nothing to score")]
    EmptyRun { run_id: String },

    /// A run id was inserted twice; finalized runs are append-only
    #[error("Run {0} is already finalized; the run store is append-only")]
    DuplicateRun(String),

    /// A run id was requested that the store has never seen
    #[error("Unknown run id: {0}")]
    UnknownRun(String),

    /// Wrapped external errors
    #[error(transparent)]
    External(#[from] anyhow::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a non-fatal degradation recorded against a run.
///
/// Nothing in the core fails outright for one component's bad evidence;
/// drops and degradations surface here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A component has no coverage or no findings; lowers confidence only
    MissingEvidence,
    /// A collector record failed shape validation and was dropped
    MalformedEvidence,
    /// An edge referenced a node absent from the node set and was dropped
    GraphInconsistency,
    /// Every factor resolved to zero; the record is still emitted at score 0
    ScoringDegenerate,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingEvidence => "missing_evidence",
            DiagnosticKind::MalformedEvidence => "malformed_evidence",
            DiagnosticKind::GraphInconsistency => "graph_inconsistency",
            DiagnosticKind::ScoringDegenerate => "scoring_degenerate",
        }
    }
}

/// One run-level diagnostic surfaced to downstream consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Component the diagnostic is about, when one applies
    pub component: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            component: None,
            message: message.into(),
        }
    }

    pub fn for_component(
        kind: DiagnosticKind,
        component: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            component: Some(component.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(component) => write!(f, "[{}] {}: {}", self.kind.as_str(), component, self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}
