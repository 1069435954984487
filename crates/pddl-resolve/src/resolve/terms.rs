//! Object terms and formula applications.

use super::context::SemanticContext;
use crate::error::{child, kind_of, Result};
use pddl_ast::expr::VariableClass;
use pddl_ast::model::{FormulaClass, RootFormula};
use pddl_ast::{ErrorKind, NodeKind, Requirement, Span, SyntaxNode, Term, TypeSetId, Variable};

/// The declared formula an application refers to.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub name: String,
    pub class: FormulaClass,
    /// TLPlan defined predicate or function
    pub defined: bool,
    pub describe: &'static str,
    /// Plain predicate or fluent that effects may change
    pub settable: bool,
    pub params: Vec<Variable>,
    /// Result type set of object functions
    pub result: Option<TypeSetId>,
}

pub(crate) fn target(ctx: &SemanticContext, name: &str) -> Option<Target> {
    let formula = ctx.formula(name)?;
    Some(Target {
        name: name.to_string(),
        class: formula.class(),
        defined: formula.is_defined(),
        describe: formula.describe(),
        settable: matches!(
            formula,
            RootFormula::Predicate(_)
                | RootFormula::NumericFluent(_)
                | RootFormula::ObjectFluent { .. }
        ),
        params: formula.signature().params.clone(),
        result: match formula {
            RootFormula::ObjectFluent { result, .. } => Some(*result),
            _ => None,
        },
    })
}

/// Resolve an `Atom` or `FunctionTerm` against the formula table.
///
/// Reports an undefined name, a formula of another class, or arguments that
/// do not match the signature. Returns `None` when there is no usable
/// target; the caller substitutes a placeholder.
pub(crate) fn application(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    expected: FormulaClass,
) -> Result<Option<(Target, Vec<Term>)>> {
    let name = child(node, 0, "formula name")?.image();
    let arg_nodes = &node.children[1..];
    let Some(target) = target(ctx, name) else {
        let what = match expected {
            FormulaClass::Predicate => "predicate",
            FormulaClass::Numeric | FormulaClass::Object => "function",
        };
        ctx.error(
            ErrorKind::UndefinedName,
            node.span,
            format!("undefined {what} '{name}'"),
        );
        // still resolve the arguments so their own errors surface
        args(ctx, arg_nodes)?;
        return Ok(None);
    };
    if target.class != expected {
        ctx.error(
            ErrorKind::WrongKind,
            node.span,
            format!("'{name}' is a {}, expected a {expected}", target.describe),
        );
        args(ctx, arg_nodes)?;
        return Ok(None);
    }
    let terms = check_args(ctx, &target, arg_nodes, node.span)?;
    Ok(Some((target, terms)))
}

/// Resolve arguments and check them against the target's parameters.
pub(crate) fn check_args(
    ctx: &mut SemanticContext,
    target: &Target,
    nodes: &[SyntaxNode],
    span: Span,
) -> Result<Vec<Term>> {
    let terms = args(ctx, nodes)?;
    if terms.len() != target.params.len() {
        ctx.error(
            ErrorKind::SignatureMismatch,
            span,
            format!(
                "'{}' takes {} argument(s), got {}",
                target.name,
                target.params.len(),
                terms.len()
            ),
        );
        return Ok(terms);
    }
    for (index, (term, param)) in terms.iter().zip(&target.params).enumerate() {
        let Some(types) = term.types() else {
            continue;
        };
        if !ctx.lattice().is_compatible(types, param.types()) {
            let message = format!(
                "argument {} of '{}' is {}, expected {}",
                index + 1,
                target.name,
                ctx.lattice().render(types),
                ctx.lattice().render(param.types())
            );
            ctx.error(ErrorKind::SignatureMismatch, nodes[index].span, message);
        }
    }
    Ok(terms)
}

pub(crate) fn args(ctx: &mut SemanticContext, nodes: &[SyntaxNode]) -> Result<Vec<Term>> {
    nodes.iter().map(|n| term(ctx, n)).collect()
}

/// Resolve an object-valued term.
pub fn term(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Term> {
    match kind_of(node)? {
        NodeKind::Name => Ok(named(ctx, node)),
        NodeKind::Variable => {
            let var = ctx.variable(node.image(), VariableClass::Object, node.span);
            Ok(Term::Variable(var))
        }
        NodeKind::FunctionTerm => {
            ctx.require(
                Requirement::ObjectFluents,
                node.span,
                "an object function term",
            );
            Ok(match application(ctx, node, FormulaClass::Object)? {
                Some((target, args)) => Term::Fluent {
                    name: target.name,
                    args,
                    types: target.result.unwrap_or(TypeSetId::OBJECT),
                },
                None => Term::Undefined,
            })
        }
        other => {
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("expected an object term, found a {}", other.name()),
            );
            Ok(Term::Undefined)
        }
    }
}

/// A bare name: a constant, `undefined`, or a nullary object function
/// written without parentheses.
fn named(ctx: &mut SemanticContext, node: &SyntaxNode) -> Term {
    let name = node.image();
    if let Some(constant) = ctx.constant(name) {
        return Term::Constant(constant.clone());
    }
    if name == "undefined" {
        return Term::Undefined;
    }
    if let Some(target) = target(ctx, name) {
        if target.class == FormulaClass::Object && target.params.is_empty() {
            return Term::Fluent {
                name: target.name,
                args: Vec::new(),
                types: target.result.unwrap_or(TypeSetId::OBJECT),
            };
        }
    }
    ctx.error(
        ErrorKind::UndefinedName,
        node.span,
        format!("undefined constant '{name}'"),
    );
    Term::Undefined
}
