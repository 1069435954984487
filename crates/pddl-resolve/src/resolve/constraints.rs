//! Trajectory constraints: PDDL3 modal operators and TLPlan temporal ones.

use super::conditions::{condition, preference_parts};
use super::context::{SemanticContext, Site};
use super::declarations::{expect, typed_variables};
use super::numeric::number;
use crate::error::{child, kind_of, Result};
use pddl_ast::expr::{ModalOp, TemporalOp};
use pddl_ast::model::{PreferenceBody, PreferenceInstance, PreferenceSite};
use pddl_ast::{ConstraintExp, ErrorKind, LogicalExp, NodeKind, Requirement, SyntaxNode};

/// Resolve a `:constraints` section.
pub fn constraints(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<ConstraintExp> {
    expect(node, NodeKind::Constraints, "a constraints section")?;
    ctx.require(Requirement::Constraints, node.span, "a constraints section");
    constraint(ctx, child(node, 0, "constraint")?, true)
}

/// Whether a node is constraint-shaped rather than a state formula.
fn is_constraint(node: &SyntaxNode) -> bool {
    match node.kind() {
        Some(NodeKind::Modal | NodeKind::Preference) => true,
        Some(NodeKind::Timed) => node.image() == "at-end",
        Some(NodeKind::And) => node.children.iter().any(is_constraint),
        Some(NodeKind::Forall) => node.child(1).is_some_and(is_constraint),
        _ => false,
    }
}

/// Resolve one trajectory constraint.
///
/// At the top of a section a bare state formula is an error; as the operand
/// of a temporal operator it is wrapped as [`ConstraintExp::Holds`].
pub fn constraint(ctx: &mut SemanticContext, node: &SyntaxNode, top: bool) -> Result<ConstraintExp> {
    if !top && !is_constraint(node) {
        return Ok(ConstraintExp::Holds(state_formula(ctx, node)?));
    }
    match kind_of(node)? {
        NodeKind::And => {
            let parts = node
                .children
                .iter()
                .map(|c| constraint(ctx, c, top))
                .collect::<Result<Vec<_>>>()?;
            Ok(ConstraintExp::conjoin(parts))
        }
        NodeKind::Forall => {
            let vars = typed_variables(ctx, child(node, 0, "quantified variables")?)?;
            let body_node = child(node, 1, "quantified constraint")?;
            ctx.push_quantified(&vars, node.span);
            let body = constraint(ctx, body_node, top);
            ctx.scopes.pop();
            Ok(ConstraintExp::Forall {
                vars,
                body: Box::new(body?),
            })
        }
        NodeKind::Preference => preference(ctx, node),
        NodeKind::Modal => modal(ctx, node),
        NodeKind::Timed if node.image() == "at-end" => Ok(ConstraintExp::Modal {
            op: ModalOp::AtEnd,
            times: Vec::new(),
            args: vec![state_formula(ctx, child(node, 0, "at end operand")?)?],
        }),
        _ => {
            ctx.error(
                ErrorKind::Misplaced,
                node.span,
                "a trajectory constraint needs a modal operator (always, sometime, at end, ...)",
            );
            Ok(ConstraintExp::Holds(state_formula(ctx, node)?))
        }
    }
}

/// A state formula inside a constraint.
fn state_formula(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    let saved = std::mem::replace(&mut ctx.site, Site::Constraint);
    let formula = condition(ctx, node);
    ctx.site = saved;
    formula
}

fn modal(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<ConstraintExp> {
    let keyword = node.image();
    if let Some(op) = TemporalOp::from_keyword(keyword) {
        ctx.require(Requirement::Tlplan, node.span, "a temporal operator");
        if node.children.len() != op.operands() {
            ctx.error(
                ErrorKind::SignatureMismatch,
                node.span,
                format!("'{keyword}' takes {} operand(s)", op.operands()),
            );
        }
        let args = node
            .children
            .iter()
            .map(|c| constraint(ctx, c, false))
            .collect::<Result<Vec<_>>>()?;
        return Ok(ConstraintExp::Temporal { op, args });
    }

    let Some(op) = ModalOp::from_keyword(keyword) else {
        ctx.error(
            ErrorKind::Syntax,
            node.span,
            format!("unknown modal operator '{keyword}'"),
        );
        return Ok(ConstraintExp::True);
    };
    if node.children.len() != op.times() + op.operands() {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            format!(
                "'{keyword}' takes {} time bound(s) and {} formula(s)",
                op.times(),
                op.operands()
            ),
        );
        return Ok(ConstraintExp::True);
    }
    let (bounds, operands) = node.children.split_at(op.times());
    let mut times = Vec::with_capacity(bounds.len());
    for bound in bounds {
        if bound.is(NodeKind::Number) {
            times.push(number(ctx, bound));
        } else {
            ctx.error(
                ErrorKind::TypeMismatch,
                bound.span,
                format!("'{keyword}' expects a numeric time bound"),
            );
            times.push(0.0);
        }
    }
    let args = operands
        .iter()
        .map(|o| state_formula(ctx, o))
        .collect::<Result<Vec<_>>>()?;
    Ok(ConstraintExp::Modal { op, times, args })
}

/// A constraint preference; kept in the tree and recorded for
/// `is-violated`.
fn preference(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<ConstraintExp> {
    ctx.require(Requirement::Preferences, node.span, "'preference'");
    let (name, body_node) = preference_parts(ctx, node)?;
    if ctx.in_preference {
        ctx.error(ErrorKind::Misplaced, node.span, "preferences cannot be nested");
        return constraint(ctx, body_node, true);
    }
    ctx.in_preference = true;
    let body = constraint(ctx, body_node, true);
    ctx.in_preference = false;
    let body = body?;

    ctx.object.preferences.record(PreferenceInstance {
        name: name.clone(),
        site: PreferenceSite::Constraint,
        body: PreferenceBody::Constraint(body.clone()),
        context: ctx.scopes.quantified(),
    });
    Ok(ConstraintExp::Preference {
        name,
        body: Box::new(body),
    })
}
