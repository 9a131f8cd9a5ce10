//! The ordered journey template library.
//!
//! Each template is a sequence of tokens over (CRUD operation, auth) route
//! properties. Library order is part of the contract: on an exact
//! confidence tie between two templates matching the same route
//! subsequence, the earlier template wins.

use crate::core::CrudOp;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// What a template token matches against a route token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Matches a route classified as this CRUD operation
    Op(CrudOp),
    /// Matches any auth-gated route
    Auth,
}

/// One token in a journey template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateToken {
    pub kind: TokenKind,
    /// Optional tokens may go unmatched; each unmatched one lowers the
    /// journey confidence by 0.1
    pub optional: bool,
}

impl TemplateToken {
    const fn required(kind: TokenKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    const fn optional(kind: TokenKind) -> Self {
        Self {
            kind,
            optional: true,
        }
    }
}

/// A named journey pattern over route tokens
#[derive(Debug, Clone)]
pub struct JourneyTemplate {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub tokens: Vec<TemplateToken>,
    /// Cross-feature templates match over combined token sequences of
    /// integration-linked feature pairs and must span both features
    pub cross_feature: bool,
}

static LIBRARY: Lazy<Vec<JourneyTemplate>> = Lazy::new(|| {
    vec![
        JourneyTemplate {
            name: "crud_lifecycle",
            display_name: "CRUD Lifecycle",
            description: "Full create-read-update-delete lifecycle on one resource.",
            tokens: vec![
                TemplateToken::required(TokenKind::Op(CrudOp::Create)),
                TemplateToken::required(TokenKind::Op(CrudOp::Read)),
                TemplateToken::required(TokenKind::Op(CrudOp::Update)),
                TemplateToken::required(TokenKind::Op(CrudOp::Delete)),
            ],
            cross_feature: false,
        },
        JourneyTemplate {
            name: "create_read",
            display_name: "Create and Read",
            description: "Create a resource, read it back, optionally revise it.",
            tokens: vec![
                TemplateToken::required(TokenKind::Op(CrudOp::Create)),
                TemplateToken::required(TokenKind::Op(CrudOp::Read)),
                TemplateToken::optional(TokenKind::Op(CrudOp::Update)),
            ],
            cross_feature: false,
        },
        JourneyTemplate {
            name: "gated_read",
            display_name: "Gated Content Access",
            description: "Authenticate, then read protected content.",
            tokens: vec![
                TemplateToken::required(TokenKind::Auth),
                TemplateToken::required(TokenKind::Op(CrudOp::Read)),
            ],
            cross_feature: false,
        },
        JourneyTemplate {
            name: "cross_feature_handoff",
            display_name: "Cross-Feature Handoff",
            description: "Create in one feature, read the result in a connected feature.",
            tokens: vec![
                TemplateToken::required(TokenKind::Op(CrudOp::Create)),
                TemplateToken::required(TokenKind::Op(CrudOp::Read)),
            ],
            cross_feature: true,
        },
    ]
});

/// The template library in declaration order.
pub fn template_library() -> &'static [JourneyTemplate] {
    &LIBRARY
}
