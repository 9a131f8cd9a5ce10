//! Core types shared by every pipeline stage

pub mod errors;
pub mod ids;
pub mod types;

pub use errors::{Diagnostic, DiagnosticKind, Error, Result};
pub use ids::{content_id, normalize_label};
pub use types::{CrudOp, HttpMethod, IntegrationSignal, RouteDescriptor, Severity};
