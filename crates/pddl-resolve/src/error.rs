//! Fatal resolver errors.
//!
//! These report an inconsistency between the recognizer and the resolver:
//! a node kind the resolver does not know, a known kind where it cannot
//! occur, or a node missing a mandatory child. Problems in the user's
//! input are never fatal; they go to the [`Diagnostics`](pddl_ast::Diagnostics)
//! collector instead.

use pddl_ast::{NodeKind, SyntaxNode};
use thiserror::Error;

/// Resolver result type
pub type Result<T> = std::result::Result<T, FatalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("{line}:{column}: unknown syntax node kind {raw}")]
    UnknownKind { raw: u16, line: u32, column: u32 },

    #[error("{line}:{column}: {found} is not valid as {context}")]
    Unexpected {
        found: &'static str,
        context: &'static str,
        line: u32,
        column: u32,
    },

    #[error("{line}:{column}: {kind} node is missing its {what}")]
    MissingChild {
        kind: &'static str,
        what: &'static str,
        line: u32,
        column: u32,
    },
}

impl FatalError {
    pub(crate) fn unexpected(node: &SyntaxNode, context: &'static str) -> Self {
        FatalError::Unexpected {
            found: node.kind().map_or("unknown node", NodeKind::name),
            context,
            line: node.line(),
            column: node.column(),
        }
    }

    pub(crate) fn missing(node: &SyntaxNode, what: &'static str) -> Self {
        FatalError::MissingChild {
            kind: node.kind().map_or("unknown", NodeKind::name),
            what,
            line: node.line(),
            column: node.column(),
        }
    }
}

/// Classify a node, failing on discriminants outside the contract.
pub(crate) fn kind_of(node: &SyntaxNode) -> Result<NodeKind> {
    node.kind().ok_or(FatalError::UnknownKind {
        raw: node.kind,
        line: node.line(),
        column: node.column(),
    })
}

/// Child `index`, or a missing-child failure naming `what`.
pub(crate) fn child<'n>(node: &'n SyntaxNode, index: usize, what: &'static str) -> Result<&'n SyntaxNode> {
    node.child(index).ok_or_else(|| FatalError::missing(node, what))
}
