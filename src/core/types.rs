//! Common type definitions used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity levels for normalized scan findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a collector-supplied severity label, case-insensitively.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "critical" | "blocker" => Some(Severity::Critical),
            "high" | "error" => Some(Severity::High),
            "medium" | "moderate" | "warning" => Some(Severity::Medium),
            "low" | "info" | "minor" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP methods recognized by the route classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD operation kinds derived from route shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudOp {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudOp::Create => "create",
            CrudOp::Read => "read",
            CrudOp::Update => "update",
            CrudOp::Delete => "delete",
        }
    }

    /// Verb used when rendering a journey step action.
    pub fn action_verb(&self) -> &'static str {
        match self {
            CrudOp::Create => "Create",
            CrudOp::Read => "Read",
            CrudOp::Update => "Update",
            CrudOp::Delete => "Delete",
        }
    }
}

impl fmt::Display for CrudOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One route discovered by the upstream static analyzer.
///
/// The analyzer is a black box; this is the fixed record shape it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub method: HttpMethod,
    /// Feature/module label declared at the route's definition site, if any.
    #[serde(default)]
    pub feature_label: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub auth_required: bool,
    /// Package names referenced by the route's handler body.
    #[serde(default)]
    pub handler_refs: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// An integration signal extracted by the upstream analyzer
/// (import, environment variable access, or package manifest entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSignal {
    pub name: String,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub env_vars: Vec<String>,
    /// Where the signal was detected: "import", "env", "package_manifest", ...
    #[serde(default)]
    pub source: String,
}
