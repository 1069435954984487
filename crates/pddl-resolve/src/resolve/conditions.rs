//! Logical conditions: preconditions, goals, derived and defined bodies.
//!
//! Preferences are resolved here too. What a `preference` turns into
//! depends on the [`Site`] it was written at; see [`preference`].

use super::context::{SemanticContext, Site};
use super::declarations::typed_variables;
use super::numeric::numeric;
use super::terms::{application, term};
use crate::error::{child, kind_of, Result};
use pddl_ast::expr::{CompareOp, LocalValue, TimeSpec, VariableClass};
use pddl_ast::model::{
    violation_effect, FormulaClass, OverallPreference, PreferenceBody, PreferenceInstance,
    PreferenceSite,
};
use pddl_ast::{ErrorKind, LogicalExp, NodeKind, Requirement, SyntaxNode, Variable};

/// Resolve a condition.
pub fn condition(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    match kind_of(node)? {
        NodeKind::And => {
            let parts = node
                .children
                .iter()
                .map(|c| condition(ctx, c))
                .collect::<Result<Vec<_>>>()?;
            Ok(LogicalExp::conjoin(parts))
        }
        NodeKind::Or => {
            ctx.require(Requirement::DisjunctivePreconditions, node.span, "'or'");
            let parts = node
                .children
                .iter()
                .map(|c| condition(ctx, c))
                .collect::<Result<Vec<_>>>()?;
            Ok(LogicalExp::Or(parts))
        }
        NodeKind::Not => {
            let operand = single(ctx, node, "not")?;
            // `(not (= ...))` is plain :equality usage
            if !operand.is(NodeKind::Comparison) {
                ctx.require(Requirement::NegativePreconditions, node.span, "'not' in a condition");
            }
            Ok(condition(ctx, operand)?.negate())
        }
        NodeKind::Imply => {
            ctx.require(Requirement::DisjunctivePreconditions, node.span, "'imply'");
            if node.children.len() != 2 {
                ctx.error(
                    ErrorKind::SignatureMismatch,
                    node.span,
                    "'imply' takes two operands",
                );
                return Ok(LogicalExp::True);
            }
            let cond = condition(ctx, &node.children[0])?;
            let then = condition(ctx, &node.children[1])?;
            Ok(LogicalExp::Imply(Box::new(cond), Box::new(then)))
        }
        NodeKind::Exists => {
            ctx.require(Requirement::ExistentialPreconditions, node.span, "'exists'");
            let (vars, body) = quantified(ctx, node)?;
            Ok(LogicalExp::Exists {
                vars,
                body: Box::new(body),
            })
        }
        NodeKind::Forall => {
            ctx.require(
                Requirement::UniversalPreconditions,
                node.span,
                "'forall' in a condition",
            );
            let (vars, body) = quantified(ctx, node)?;
            // a body of preferences only leaves nothing to check
            if body == LogicalExp::True {
                return Ok(LogicalExp::True);
            }
            Ok(LogicalExp::Forall {
                vars,
                body: Box::new(body),
            })
        }
        NodeKind::Atom => atom(ctx, node),
        NodeKind::Comparison => comparison(ctx, node),
        NodeKind::Preference => preference(ctx, node),
        NodeKind::LocalAssign => local_assign(ctx, node),
        NodeKind::GoalModality => {
            ctx.require(Requirement::Tlplan, node.span, "the goal modality");
            let operand = single(ctx, node, "goal")?;
            let saved = std::mem::replace(&mut ctx.site, Site::Body);
            let body = condition(ctx, operand);
            ctx.site = saved;
            Ok(LogicalExp::Goal(Box::new(body?)))
        }
        NodeKind::Variable => {
            let var = ctx.variable(node.image(), VariableClass::Boolean, node.span);
            Ok(LogicalExp::Variable(var))
        }
        NodeKind::Timed => {
            ctx.error(
                ErrorKind::Misplaced,
                node.span,
                format!(
                    "'{}' is only allowed in durative action conditions",
                    node.image().replace('-', " ")
                ),
            );
            condition(ctx, child(node, 0, "timed body")?)
        }
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("expected a condition, found a {}", other.name()),
            );
            Ok(LogicalExp::True)
        }
    }
}

/// The only operand of a unary form; reports any other count.
pub(crate) fn single<'n>(
    ctx: &mut SemanticContext,
    node: &'n SyntaxNode,
    what: &str,
) -> Result<&'n SyntaxNode> {
    if node.children.len() != 1 {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            format!("'{what}' takes one operand, got {}", node.children.len()),
        );
    }
    child(node, 0, "operand")
}

/// Variables and body of an `exists`/`forall` condition.
fn quantified(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<(Vec<Variable>, LogicalExp)> {
    let vars = typed_variables(ctx, child(node, 0, "quantified variables")?)?;
    let body_node = child(node, 1, "quantified body")?;
    ctx.push_quantified(&vars, node.span);
    let body = condition(ctx, body_node);
    ctx.scopes.pop();
    Ok((vars, body?))
}

fn atom(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    Ok(match application(ctx, node, FormulaClass::Predicate)? {
        Some((target, args)) if target.defined => {
            ctx.require(Requirement::Tlplan, node.span, "a defined predicate");
            LogicalExp::Defined {
                name: target.name,
                args,
            }
        }
        Some((target, args)) => LogicalExp::atom(target.name, args),
        None => LogicalExp::True,
    })
}

/// Whether an operand of `=` is numeric rather than an object term.
pub(crate) fn is_numeric(ctx: &SemanticContext, node: &SyntaxNode) -> bool {
    match node.kind() {
        Some(NodeKind::Number | NodeKind::Arithmetic | NodeKind::IsViolated) => true,
        Some(NodeKind::Name) => node.image() == "total-time",
        Some(NodeKind::Variable) => {
            node.image() == "#t"
                || ctx
                    .scopes
                    .get(node.image())
                    .is_some_and(|v| v.class() == VariableClass::Numeric)
        }
        Some(NodeKind::FunctionTerm) => node.child(0).is_some_and(|name| {
            ctx.formula(name.image())
                .is_some_and(|f| f.class() == FormulaClass::Numeric)
        }),
        _ => false,
    }
}

fn comparison(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    let Some(op) = CompareOp::from_symbol(node.image()) else {
        ctx.error(
            ErrorKind::Syntax,
            node.span,
            format!("unknown comparison '{}'", node.image()),
        );
        return Ok(LogicalExp::True);
    };
    let [left, right] = node.children.as_slice() else {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            format!("'{}' takes two operands", op.symbol()),
        );
        return Ok(LogicalExp::True);
    };

    if op == CompareOp::Eq && !is_numeric(ctx, left) && !is_numeric(ctx, right) {
        ctx.require(Requirement::Equality, node.span, "'=' on objects");
        let left = term(ctx, left)?;
        let right = term(ctx, right)?;
        return Ok(LogicalExp::Equal(left, right));
    }

    ctx.require(Requirement::NumericFluents, node.span, "a numeric comparison");
    Ok(LogicalExp::Compare {
        op,
        left: numeric(ctx, left)?,
        right: numeric(ctx, right)?,
    })
}

fn local_assign(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    ctx.require(Requirement::Tlplan, node.span, "':='");
    let target = child(node, 0, "assigned variable")?;
    let value = child(node, 1, "assigned value")?;
    let Some(var) = ctx.scopes.get(target.image()).cloned() else {
        ctx.error(
            ErrorKind::UndefinedName,
            target.span,
            format!("variable {} is not bound here", target.image()),
        );
        return Ok(LogicalExp::True);
    };
    if !var.is_local() {
        ctx.error(
            ErrorKind::WrongKind,
            target.span,
            format!("only local variables can be assigned, {} is a parameter", var.name),
        );
        return Ok(LogicalExp::True);
    }
    let value = match var.class() {
        VariableClass::Numeric => LocalValue::Numeric(numeric(ctx, value)?),
        VariableClass::Object => LocalValue::Term(term(ctx, value)?),
        VariableClass::Boolean => {
            LocalValue::Logical(Box::new(condition(ctx, &as_condition(value))?))
        }
    };
    Ok(LogicalExp::Assign { var, value })
}

/// Operands of `:=` are recognized in numeric position; a predicate
/// application there arrives as a function term.
fn as_condition(node: &SyntaxNode) -> SyntaxNode {
    let mut node = node.clone();
    if node.is(NodeKind::FunctionTerm) {
        node.kind = NodeKind::Atom.raw();
    }
    node
}

/// Resolve a `preference`.
///
/// - in an action precondition: recorded, the action gets an effect
///   counting violations, the preference itself becomes `true`
/// - in an `over all` durative condition: recorded and left pending until
///   preprocessing wires it into the action's effects
/// - in a goal: recorded and replaced by `true`
/// - anywhere else: an error
pub fn preference(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<LogicalExp> {
    ctx.require(Requirement::Preferences, node.span, "'preference'");
    let (name, body_node) = preference_parts(ctx, node)?;
    if ctx.in_preference {
        ctx.error(ErrorKind::Misplaced, node.span, "preferences cannot be nested");
        return condition(ctx, body_node);
    }

    ctx.in_preference = true;
    let body = condition(ctx, body_node);
    ctx.in_preference = false;
    let body = body?;
    let context = ctx.scopes.quantified();

    let site = match &ctx.site {
        Site::Precondition {
            action,
            at: Some(TimeSpec::OverAll),
        } => Some(PreferenceSite::OverAll {
            action: action.clone(),
        }),
        Site::Precondition { action, .. } => Some(PreferenceSite::Precondition {
            action: action.clone(),
        }),
        Site::Goal => Some(PreferenceSite::Goal),
        Site::Constraint | Site::Body => None,
    };
    let Some(site) = site else {
        ctx.error(
            ErrorKind::Misplaced,
            node.span,
            "a preference may only appear in a precondition, a goal or a constraint",
        );
        return Ok(body);
    };
    ctx.object.preferences.record(PreferenceInstance {
        name: name.clone(),
        site: site.clone(),
        body: PreferenceBody::Condition(body.clone()),
        context: context.clone(),
    });

    match site {
        PreferenceSite::OverAll { .. } => ctx.pending_overall.push(OverallPreference {
            name,
            condition: body,
            context,
        }),
        PreferenceSite::Precondition { .. } => {
            let (counter, created) = ctx.object.preferences.ensure_counter(&name);
            if created {
                ctx.declare_counter(&counter);
            }
            let at = match &ctx.site {
                Site::Precondition { at, .. } => *at,
                _ => None,
            };
            ctx.pending_effects
                .push((at, violation_effect(&counter, body, context)));
        }
        PreferenceSite::Goal | PreferenceSite::Constraint => {}
    }
    Ok(LogicalExp::True)
}

/// Name and body of a preference node; unnamed ones get a fresh name.
pub(crate) fn preference_parts<'n>(
    ctx: &mut SemanticContext,
    node: &'n SyntaxNode,
) -> Result<(String, &'n SyntaxNode)> {
    match node.children.as_slice() {
        [name, body] if name.is(NodeKind::Name) => Ok((name.image().to_string(), body)),
        _ => {
            let body = child(node, 0, "preference body")?;
            Ok((format!("unnamed@{}", ctx.fresh()), body))
        }
    }
}
