//! Greedy subsequence matching of journey templates against route
//! token sequences.

use super::templates::{template_library, JourneyTemplate, TokenKind};
use super::{CujStep, DiscoveredCuj};
use crate::core::{content_id, CrudOp, HttpMethod};
use crate::graph::{ArchitectureGraph, FeatureArea};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One route rendered as a matchable token
#[derive(Debug, Clone)]
struct RouteToken {
    op: Option<CrudOp>,
    auth: bool,
    path: String,
    method: HttpMethod,
    feature_id: String,
    feature_name: String,
}

fn feature_tokens(feature: &FeatureArea) -> Vec<RouteToken> {
    feature
        .routes
        .iter()
        .map(|route| RouteToken {
            op: route.operation,
            auth: route.auth_required,
            path: route.path.clone(),
            method: route.method,
            feature_id: feature.id.clone(),
            feature_name: feature.name.clone(),
        })
        .collect()
}

fn token_matches(kind: TokenKind, token: &RouteToken) -> bool {
    match kind {
        TokenKind::Op(op) => token.op == Some(op),
        TokenKind::Auth => token.auth,
    }
}

#[derive(Debug)]
struct TemplateMatch<'a> {
    /// Indices into the token sequence, one per matched template token
    matched: Vec<(usize, TokenKind)>,
    unmatched_optional: usize,
    tokens: &'a [RouteToken],
}

/// Greedy in-order subsequence match. Every required token must match;
/// optional tokens may be skipped at a confidence cost.
fn match_template<'a>(
    template: &JourneyTemplate,
    tokens: &'a [RouteToken],
) -> Option<TemplateMatch<'a>> {
    let mut matched = Vec::with_capacity(template.tokens.len());
    let mut unmatched_optional = 0usize;
    let mut pos = 0usize;

    for step in &template.tokens {
        let found = tokens[pos..]
            .iter()
            .position(|t| token_matches(step.kind, t))
            .map(|offset| pos + offset);
        match found {
            Some(index) => {
                matched.push((index, step.kind));
                pos = index + 1;
            }
            None if step.optional => unmatched_optional += 1,
            None => return None,
        }
    }

    Some(TemplateMatch {
        matched,
        unmatched_optional,
        tokens,
    })
}

/// Confidence = matched/total, lowered by 0.1 per unmatched optional step.
fn confidence(template: &JourneyTemplate, m: &TemplateMatch<'_>) -> f64 {
    let total = template.tokens.len() as f64;
    let matched = m.matched.len() as f64;
    let raw = matched / total - 0.1 * m.unmatched_optional as f64;
    raw.max(0.0)
}

fn step_action(kind: TokenKind, token: &RouteToken) -> String {
    match kind {
        TokenKind::Op(op) => {
            format!("{} {}", op.action_verb(), token.feature_name.to_lowercase())
        }
        TokenKind::Auth => "Authenticate".to_string(),
    }
}

fn build_cuj(template: &JourneyTemplate, m: &TemplateMatch<'_>) -> DiscoveredCuj {
    let steps: Vec<CujStep> = m
        .matched
        .iter()
        .enumerate()
        .map(|(i, (index, kind))| {
            let token = &m.tokens[*index];
            CujStep {
                order: (i + 1) as u32,
                action: step_action(*kind, token),
                route: Some(token.path.clone()),
                method: Some(token.method),
            }
        })
        .collect();

    let feature_ids: BTreeSet<String> = m
        .matched
        .iter()
        .map(|(index, _)| m.tokens[*index].feature_id.clone())
        .collect();
    let feature_names: Vec<String> = {
        let mut names: Vec<String> = Vec::new();
        for (index, _) in &m.matched {
            let name = &m.tokens[*index].feature_name;
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    };

    let name = if feature_names.len() > 1 {
        format!("{}: {}", template.display_name, feature_names.join(" to "))
    } else {
        format!(
            "{} {}",
            feature_names.first().cloned().unwrap_or_default(),
            template.display_name
        )
    };

    let features_key = feature_ids.iter().cloned().collect::<Vec<_>>().join(",");
    let routes_key = steps
        .iter()
        .filter_map(|s| s.route.clone())
        .collect::<Vec<_>>()
        .join(",");
    let conf = confidence(template, m);

    DiscoveredCuj {
        id: content_id("cuj", &[template.name, &features_key, &routes_key]),
        name,
        description: template.description.to_string(),
        pattern: template.name.to_string(),
        steps,
        feature_ids,
        confidence: conf,
        coverage: None,
    }
}

/// Key identifying the exact route subsequence a match consumed. Two
/// templates matching the same subsequence are tie-broken, not both kept.
fn subsequence_key(m: &TemplateMatch<'_>) -> String {
    m.matched
        .iter()
        .map(|(index, _)| {
            let t = &m.tokens[*index];
            format!("{} {}", t.method, t.path)
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// Synthesize journeys for every feature and every integration-linked
/// feature pair. Output is sorted by confidence (descending), then id.
pub fn synthesize_cujs(graph: &ArchitectureGraph) -> Vec<DiscoveredCuj> {
    // (subsequence key, library index, cuj)
    let mut candidates: Vec<(String, usize, DiscoveredCuj)> = Vec::new();

    for feature in &graph.features {
        let tokens = feature_tokens(feature);
        if tokens.is_empty() {
            continue;
        }
        for (index, template) in template_library().iter().enumerate() {
            if template.cross_feature {
                continue;
            }
            if let Some(m) = match_template(template, &tokens) {
                candidates.push((subsequence_key(&m), index, build_cuj(template, &m)));
            }
        }
    }

    // Cross-feature journeys over integration-linked pairs, upstream tokens
    // first. The match must actually span both features.
    for (upstream, downstream) in graph.linked_feature_pairs() {
        let (Some(a), Some(b)) = (graph.feature(&upstream), graph.feature(&downstream)) else {
            continue;
        };
        let mut combined = feature_tokens(a);
        combined.extend(feature_tokens(b));
        for (index, template) in template_library().iter().enumerate() {
            if !template.cross_feature {
                continue;
            }
            if let Some(m) = match_template(template, &combined) {
                let cuj = build_cuj(template, &m);
                if cuj.feature_ids.len() >= 2 {
                    candidates.push((subsequence_key(&m), index, cuj));
                }
            }
        }
    }

    // Same-subsequence tie break: higher confidence wins; on an exact tie
    // the template declared earlier in the library wins.
    candidates.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| {
                b.2.confidence
                    .partial_cmp(&a.2.confidence)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.1.cmp(&b.1))
    });
    candidates.dedup_by(|a, b| a.0 == b.0);

    let mut cujs: Vec<DiscoveredCuj> = candidates.into_iter().map(|(_, _, cuj)| cuj).collect();
    cujs.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    cujs
}
