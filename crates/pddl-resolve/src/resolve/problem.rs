//! Problem construction against an already resolved domain.

use super::conditions::{condition, single};
use super::constraints::constraints;
use super::context::{SemanticContext, Site};
use super::declarations::{self, expect};
use super::domain::check_violated_refs;
use super::numeric::{number, numeric};
use super::terms::{application, term};
use crate::error::{child, kind_of, FatalError, Result};
use enumset::EnumSet;
use pddl_ast::expr::Optimization;
use pddl_ast::model::{FormulaClass, InitElement};
use pddl_ast::{
    ConstraintExp, Diagnostics, ErrorKind, GroundAtom, Metric, NodeKind, PddlObject, Requirement,
    SyntaxNode, Term,
};
use tracing::debug;

/// Resolve a `Problem` node against `domain`.
///
/// The result is a partial problem: it shares the domain's types and
/// formulas but carries no actions until [`link`](super::link) merges them.
pub fn resolve_problem(
    node: &SyntaxNode,
    domain: &PddlObject,
    file: &str,
    accepted: EnumSet<Requirement>,
    diagnostics: &mut Diagnostics,
) -> Result<PddlObject> {
    expect(node, NodeKind::Problem, "a problem definition")?;
    let name = child(node, 0, "problem name")?.image();
    let mut object = PddlObject::problem(name, file, domain);
    object.span = node.span;
    let mut ctx = SemanticContext::new(object, Some(domain), diagnostics, accepted);
    let sections = &node.children[1..];

    // requirements and objects first so the rest can see them
    for section in sections {
        match kind_of(section)? {
            NodeKind::Requirements => declarations::requirements(&mut ctx, section)?,
            NodeKind::Objects => declarations::constants(&mut ctx, section)?,
            _ => {}
        }
    }

    for section in sections {
        match kind_of(section)? {
            NodeKind::ProblemDomain => {
                let reference = child(section, 0, "domain name")?.image();
                ctx.object.domain_name = reference.to_string();
            }
            NodeKind::Requirements | NodeKind::Objects => {}
            NodeKind::Init => {
                for element in &section.children {
                    if let Some(element) = init_element(&mut ctx, element)? {
                        ctx.object.init.push(element);
                    }
                }
            }
            NodeKind::Goal => {
                ctx.site = Site::Goal;
                let goal = condition(&mut ctx, child(section, 0, "goal")?);
                ctx.site = Site::Body;
                ctx.object.goal = Some(goal?);
            }
            NodeKind::Constraints => {
                let constraint = constraints(&mut ctx, section)?;
                let existing = std::mem::replace(&mut ctx.object.constraints, ConstraintExp::True);
                ctx.object.constraints = ConstraintExp::conjoin([existing, constraint]);
            }
            NodeKind::Metric => {
                let metric = metric(&mut ctx, section)?;
                ctx.object.metric = Some(metric);
            }
            _ => return Err(FatalError::unexpected(section, "a problem section")),
        }
    }
    check_violated_refs(&mut ctx);

    let object = ctx.finish();
    debug!(
        problem = %object.name,
        domain = %object.domain_name,
        objects = object.constants.len(),
        init = object.init.len(),
        "problem resolved"
    );
    Ok(object)
}

fn metric(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Metric> {
    let direction = Optimization::from_keyword(node.image()).unwrap_or(Optimization::Minimize);
    let exp = numeric(ctx, child(node, 0, "metric expression")?)?;
    Ok(Metric { direction, exp })
}

// === Initial state ===

fn init_element(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Option<InitElement>> {
    match kind_of(node)? {
        NodeKind::Atom => Ok(fact(ctx, node)?.map(InitElement::Fact)),
        NodeKind::Not => {
            let operand = single(ctx, node, "not")?;
            if !operand.is(NodeKind::Atom) {
                ctx.error(
                    ErrorKind::TypeMismatch,
                    operand.span,
                    "only an atom can be negated in the initial state",
                );
                return Ok(None);
            }
            Ok(fact(ctx, operand)?.map(InitElement::NegatedFact))
        }
        NodeKind::Comparison if node.image() == "=" => fluent_value(ctx, node),
        NodeKind::TimedLiteral => {
            ctx.require(
                Requirement::TimedInitialLiterals,
                node.span,
                "a timed initial literal",
            );
            let time = child(node, 0, "literal time")?;
            let at = number(ctx, time);
            let literal = child(node, 1, "timed literal")?;
            if literal.is(NodeKind::TimedLiteral) {
                ctx.error(
                    ErrorKind::Misplaced,
                    literal.span,
                    "timed literals cannot be nested",
                );
                return Ok(None);
            }
            Ok(init_element(ctx, literal)?.map(|literal| InitElement::Timed {
                at,
                literal: Box::new(literal),
            }))
        }
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("a {} cannot appear in the initial state", other.name()),
            );
            Ok(None)
        }
    }
}

/// A ground application of a settable formula of the given class.
fn ground(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    class: FormulaClass,
) -> Result<Option<GroundAtom>> {
    let Some((target, args)) = application(ctx, node, class)? else {
        return Ok(None);
    };
    if !target.settable {
        ctx.error(
            ErrorKind::WrongKind,
            node.span,
            format!(
                "{} '{}' cannot appear in the initial state",
                target.describe, target.name
            ),
        );
        return Ok(None);
    }
    let atom = GroundAtom::from_terms(&target.name, &args);
    if atom.is_none() && !args.iter().any(|a| matches!(a, Term::Undefined)) {
        ctx.error(
            ErrorKind::TypeMismatch,
            node.span,
            format!("initial fact '{}' is not ground", target.name),
        );
    }
    Ok(atom)
}

fn fact(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Option<GroundAtom>> {
    ground(ctx, node, FormulaClass::Predicate)
}

/// `(= (f ...) value)` for numeric and object fluents.
fn fluent_value(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Option<InitElement>> {
    let [fluent, value] = node.children.as_slice() else {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            "'=' takes a function and a value",
        );
        return Ok(None);
    };
    // a nullary fluent may be written without parentheses
    let fluent = match kind_of(fluent)? {
        NodeKind::FunctionTerm => fluent.clone(),
        NodeKind::Name => SyntaxNode::new(NodeKind::FunctionTerm, fluent.span, vec![fluent.clone()]),
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                fluent.span,
                format!("expected a function in the initial state, found a {}", other.name()),
            );
            return Ok(None);
        }
    };
    let class = child(&fluent, 0, "function name")
        .ok()
        .and_then(|name| ctx.formula(name.image()))
        .map_or(FormulaClass::Numeric, |f| f.class());

    match class {
        FormulaClass::Object => {
            let Some(atom) = ground(ctx, &fluent, FormulaClass::Object)? else {
                return Ok(None);
            };
            match term(ctx, value)? {
                Term::Constant(constant) => Ok(Some(InitElement::Object {
                    fluent: atom,
                    value: constant,
                })),
                Term::Undefined => Ok(None),
                _ => {
                    ctx.error(
                        ErrorKind::TypeMismatch,
                        value.span,
                        "an object function must be set to an object",
                    );
                    Ok(None)
                }
            }
        }
        FormulaClass::Numeric | FormulaClass::Predicate => {
            let atom = ground(ctx, &fluent, FormulaClass::Numeric)?;
            if !value.is(NodeKind::Number) {
                ctx.error(
                    ErrorKind::TypeMismatch,
                    value.span,
                    "a numeric function must be set to a number",
                );
                return Ok(None);
            }
            let value = number(ctx, value);
            Ok(atom.map(|fluent| InitElement::Numeric { fluent, value }))
        }
    }
}
