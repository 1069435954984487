//! Effects of instantaneous actions, and the untimed pieces of durative
//! ones.

use super::conditions::{condition, single};
use super::context::{SemanticContext, Site};
use super::declarations::typed_variables;
use super::numeric::numeric;
use super::terms::{check_args, target, term};
use crate::error::{child, kind_of, Result};
use pddl_ast::expr::AssignOp;
use pddl_ast::model::FormulaClass;
use pddl_ast::{Effect, ErrorKind, LogicalExp, NodeKind, Requirement, SyntaxNode};

/// Resolve an effect.
pub fn effect(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Effect> {
    match kind_of(node)? {
        NodeKind::And => {
            let parts = node
                .children
                .iter()
                .map(|c| effect(ctx, c))
                .collect::<Result<Vec<_>>>()?;
            Ok(Effect::conjoin(parts))
        }
        NodeKind::Atom => Ok(literal(ctx, node, true)?.unwrap_or_else(|| Effect::And(Vec::new()))),
        NodeKind::Not => {
            let operand = single(ctx, node, "not")?;
            if !operand.is(NodeKind::Atom) {
                ctx.error(
                    ErrorKind::TypeMismatch,
                    operand.span,
                    "only an atom can be deleted by an effect",
                );
                return Ok(Effect::And(Vec::new()));
            }
            Ok(literal(ctx, operand, false)?.unwrap_or_else(|| Effect::And(Vec::new())))
        }
        NodeKind::Forall => {
            ctx.require(
                Requirement::ConditionalEffects,
                node.span,
                "'forall' in an effect",
            );
            let vars = typed_variables(ctx, child(node, 0, "quantified variables")?)?;
            let body_node = child(node, 1, "quantified effect")?;
            ctx.push_quantified(&vars, node.span);
            let body = effect(ctx, body_node);
            ctx.scopes.pop();
            Ok(Effect::Forall {
                vars,
                body: Box::new(body?),
            })
        }
        NodeKind::When => {
            ctx.require(Requirement::ConditionalEffects, node.span, "'when'");
            let [guard, then] = node.children.as_slice() else {
                ctx.error(
                    ErrorKind::SignatureMismatch,
                    node.span,
                    "'when' takes a condition and an effect",
                );
                return Ok(Effect::And(Vec::new()));
            };
            let condition = guard_condition(ctx, guard)?;
            Ok(Effect::When {
                condition,
                effect: Box::new(effect(ctx, then)?),
            })
        }
        NodeKind::Assignment => assignment(ctx, node),
        NodeKind::Timed => {
            ctx.error(
                ErrorKind::Misplaced,
                node.span,
                format!(
                    "'{}' is only allowed in durative action effects",
                    node.image().replace('-', " ")
                ),
            );
            effect(ctx, child(node, 0, "timed effect")?)
        }
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("expected an effect, found a {}", other.name()),
            );
            Ok(Effect::And(Vec::new()))
        }
    }
}

/// A `when` guard; preferences are not allowed there.
pub(crate) fn guard_condition(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    let saved = std::mem::replace(&mut ctx.site, Site::Body);
    let guard = condition(ctx, node);
    ctx.site = saved;
    guard
}

/// Add or delete effect of an atom.
fn literal(ctx: &mut SemanticContext, node: &SyntaxNode, add: bool) -> Result<Option<Effect>> {
    let name = child(node, 0, "predicate name")?.image();
    let Some(target) = target(ctx, name) else {
        ctx.error(
            ErrorKind::UndefinedName,
            node.span,
            format!("undefined predicate '{name}'"),
        );
        return Ok(None);
    };
    if target.class != FormulaClass::Predicate {
        ctx.error(
            ErrorKind::WrongKind,
            node.span,
            format!("'{name}' is a {}, expected a predicate", target.describe),
        );
        return Ok(None);
    }
    if !target.settable {
        ctx.error(
            ErrorKind::WrongKind,
            node.span,
            format!("{} '{name}' cannot be changed by an effect", target.describe),
        );
        return Ok(None);
    }
    let args = check_args(ctx, &target, &node.children[1..], node.span)?;
    Ok(Some(if add {
        Effect::add(target.name, args)
    } else {
        Effect::delete(target.name, args)
    }))
}

/// `assign`, `increase`, `decrease`, `scale-up`, `scale-down`.
///
/// An assignment whose value mentions `#t` is a continuous effect.
fn assignment(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Effect> {
    let empty = Effect::And(Vec::new());
    let Some(op) = AssignOp::from_keyword(node.image()) else {
        ctx.error(
            ErrorKind::Syntax,
            node.span,
            format!("unknown assignment '{}'", node.image()),
        );
        return Ok(empty);
    };
    let [fluent, value] = node.children.as_slice() else {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            format!("'{}' takes a function and a value", op.keyword()),
        );
        return Ok(empty);
    };
    let (name, arg_nodes) = match kind_of(fluent)? {
        NodeKind::FunctionTerm => (child(fluent, 0, "function name")?.image(), &fluent.children[1..]),
        NodeKind::Name => (fluent.image(), &[][..]),
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                fluent.span,
                format!("cannot assign to a {}", other.name()),
            );
            return Ok(empty);
        }
    };

    let Some(target) = target(ctx, name) else {
        ctx.error(
            ErrorKind::UndefinedName,
            fluent.span,
            format!("undefined function '{name}'"),
        );
        return Ok(empty);
    };
    if !target.settable || target.class == FormulaClass::Predicate {
        ctx.error(
            ErrorKind::WrongKind,
            fluent.span,
            format!("'{name}' is a {}, it cannot be assigned", target.describe),
        );
        return Ok(empty);
    }
    let args = check_args(ctx, &target, arg_nodes, fluent.span)?;

    if target.class == FormulaClass::Object {
        ctx.require(Requirement::ObjectFluents, node.span, "an object assignment");
        if op != AssignOp::Assign {
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("'{}' on object function '{name}'", op.keyword()),
            );
        }
        return Ok(Effect::Object {
            name: target.name,
            args,
            value: term(ctx, value)?,
        });
    }

    ctx.require(Requirement::NumericFluents, node.span, "a numeric assignment");
    ctx.saw_time = false;
    let value = numeric(ctx, value)?;
    if std::mem::take(&mut ctx.saw_time) {
        if !matches!(op, AssignOp::Increase | AssignOp::Decrease) {
            ctx.error(
                ErrorKind::Unsupported,
                node.span,
                "a continuous effect must increase or decrease",
            );
        }
        return Ok(Effect::Continuous {
            op,
            name: target.name,
            args,
            value,
        });
    }
    Ok(Effect::Numeric {
        op,
        name: target.name,
        args,
        value,
    })
}
