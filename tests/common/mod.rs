//! Shared fixture builders for integration tests.
#![allow(dead_code)]

use riskmap::{
    HttpMethod, IntegrationSignal, RawCoverageRecord, RawFindingRecord, RouteDescriptor, RunInput,
};

pub fn route(method: HttpMethod, path: &str) -> RouteDescriptor {
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

pub fn auth_route(method: HttpMethod, path: &str) -> RouteDescriptor {
    RouteDescriptor {
        auth_required: true,
        ..route(method, path)
    }
}

pub fn crud_routes(resource: &str) -> Vec<RouteDescriptor> {
    vec![
        route(HttpMethod::Post, &format!("/{resource}")),
        route(HttpMethod::Get, &format!("/{resource}/{{id}}")),
        route(HttpMethod::Put, &format!("/{resource}/{{id}}")),
        route(HttpMethod::Delete, &format!("/{resource}/{{id}}")),
    ]
}

pub fn coverage(component: &str, kind: &str, value: f64) -> RawCoverageRecord {
    RawCoverageRecord {
        tool: format!("{kind}-tool"),
        kind: Some(kind.to_string()),
        component: component.to_string(),
        value,
        total_statements: Some(100),
        covered_statements: Some((value * 100.0) as u64),
        collected_at: None,
    }
}

pub fn finding(component: &str, severity: &str, message: &str) -> RawFindingRecord {
    RawFindingRecord {
        tool: "scanner".to_string(),
        severity: severity.to_string(),
        component: component.to_string(),
        message: message.to_string(),
        code: None,
        line: None,
        tags: vec![],
        collected_at: None,
    }
}

pub fn signal(name: &str, package: &str) -> IntegrationSignal {
    IntegrationSignal {
        name: name.to_string(),
        package: Some(package.to_string()),
        env_vars: vec![],
        source: "import".to_string(),
    }
}

/// A petstore-flavored run with coverage and one finding.
pub fn petstore_input(run_id: &str) -> RunInput {
    RunInput {
        run_id: run_id.to_string(),
        routes: crud_routes("pets"),
        integration_signals: vec![signal("PostgreSQL", "asyncpg")],
        coverage: vec![
            coverage("pets", "unit", 0.55),
            coverage("pets", "contract", 0.4),
        ],
        findings: vec![finding("pets", "high", "unsanitized query parameter")],
    }
}
