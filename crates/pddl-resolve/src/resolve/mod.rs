//! Semantic construction.
//!
//! Turns syntax nodes into [`PddlObject`]s. Each entry point owns one
//! [`SemanticContext`] for the duration of a construction and reports
//! problems in the input to the caller's [`Diagnostics`]; only
//! inconsistencies in the tree itself end a construction early.
//!
//! # Design
//!
//! - domains resolve in two passes so bodies may reference formulas
//!   declared later in the file
//! - problems share the domain's tables and copy them on first write
//! - preferences are turned into counters and effects while resolving;
//!   [`link`] finishes the rest through [`PddlObject::preprocess`]

mod conditions;
mod constraints;
mod context;
mod declarations;
mod domain;
mod durative;
mod effects;
mod link;
mod numeric;
mod problem;
mod scope;
mod terms;

pub use context::{SemanticContext, Site};
pub use domain::resolve_domain;
pub use link::link;
pub use problem::resolve_problem;
pub use scope::{Lookup, ScopeStack};

use crate::error::Result;
use enumset::EnumSet;
use pddl_ast::expr::{ArithOp, UnaryOp};
use pddl_ast::{
    Diagnostics, Expression, ExpressionCategory, NodeKind, PddlObject, Requirement, SyntaxNode,
    Variable, VariableKind,
};
use tracing::trace;

/// Resolve a standalone expression of the given category.
///
/// `variables` are in scope for the whole expression. Without a domain
/// the expression may only use constants, variables and arithmetic, and
/// every accepted requirement counts as declared.
pub fn resolve_expression(
    node: &SyntaxNode,
    category: ExpressionCategory,
    variables: &[Variable],
    domain: Option<&PddlObject>,
    accepted: EnumSet<Requirement>,
    diagnostics: &mut Diagnostics,
) -> Result<Expression> {
    let object = match domain {
        Some(domain) => PddlObject::problem("expression", "", domain),
        None => {
            let mut object = PddlObject::domain("expression", "");
            for requirement in accepted {
                object.requirements.add(requirement);
            }
            object
        }
    };
    let mut ctx = SemanticContext::new(object, domain, diagnostics, accepted);
    ctx.push_scope(variables, node.span);
    ctx.durative = variables
        .iter()
        .any(|v| matches!(v.kind, VariableKind::Duration));

    let resolved = match category {
        ExpressionCategory::Logical => conditions::condition(&mut ctx, node).map(Expression::Logical),
        ExpressionCategory::Numeric => {
            numeric::numeric(&mut ctx, &numeric_position(node)).map(Expression::Numeric)
        }
        ExpressionCategory::Term => {
            terms::term(&mut ctx, &numeric_position(node)).map(Expression::Term)
        }
        ExpressionCategory::Effect => effects::effect(&mut ctx, node).map(Expression::Effect),
        ExpressionCategory::Constraint => {
            constraints::constraint(&mut ctx, node, true).map(Expression::Constraint)
        }
    };
    ctx.scopes.pop();
    domain::check_violated_refs(&mut ctx);
    trace!(?category, "expression resolved");
    resolved
}

/// Standalone expressions are recognized in logical position; an
/// application at the top is a function term or arithmetic there.
fn numeric_position(node: &SyntaxNode) -> SyntaxNode {
    let mut node = node.clone();
    if !node.is(NodeKind::Atom) {
        return node;
    }
    let head = node.child(0).map(|h| h.image().to_string()).unwrap_or_default();
    if ArithOp::from_symbol(&head).is_some() || UnaryOp::from_symbol(&head).is_some() {
        node.children.remove(0);
        node.kind = NodeKind::Arithmetic.raw();
        node.image = Some(head);
    } else {
        node.kind = NodeKind::FunctionTerm.raw();
    }
    node
}
