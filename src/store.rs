//! Append-only run store.
//!
//! Each run is an immutable snapshot keyed by run id. Completed runs are
//! never mutated, which makes concurrent readers safe and keeps historical
//! runs independently queryable for trend computation.

use crate::core::{Error, Result};
use crate::pipeline::RunSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One point in the cross-run trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub average_risk_score: f64,
    pub high_risk_count: usize,
    pub overall_coverage: Option<f64>,
}

/// In-process append-only view over finalized runs
#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<BTreeMap<String, Arc<RunSnapshot>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized run. Re-inserting an existing run id is an
    /// error: records are superseded by new runs, never overwritten.
    pub fn insert(&self, snapshot: RunSnapshot) -> Result<Arc<RunSnapshot>> {
        let mut runs = self.runs.write();
        if runs.contains_key(&snapshot.run_id) {
            return Err(Error::DuplicateRun(snapshot.run_id));
        }
        let snapshot = Arc::new(snapshot);
        runs.insert(snapshot.run_id.clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn get(&self, run_id: &str) -> Result<Arc<RunSnapshot>> {
        self.runs
            .read()
            .get(run_id)
            .cloned()
            .ok_or_else(|| Error::UnknownRun(run_id.to_string()))
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.runs.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }

    /// Trend series across all finalized runs, ordered by creation time
    /// (run id as tie-break).
    pub fn trend_series(&self) -> Vec<TrendPoint> {
        let runs = self.runs.read();
        let mut points: Vec<TrendPoint> = runs
            .values()
            .map(|snapshot| TrendPoint {
                run_id: snapshot.run_id.clone(),
                created_at: snapshot.created_at,
                average_risk_score: snapshot.metrics.average_risk_score,
                high_risk_count: snapshot.metrics.high_risk_count,
                overall_coverage: snapshot.metrics.overall_coverage,
            })
            .collect();
        points.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        points
    }
}
