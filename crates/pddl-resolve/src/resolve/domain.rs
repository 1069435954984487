//! Domain construction.
//!
//! Sections are resolved in two passes. The first declares everything that
//! may be referenced before its definition: requirements, types, constants,
//! predicates, functions and the signatures of derived and defined
//! formulas. The second resolves bodies in source order, so a derived
//! predicate may use one declared further down.

use super::conditions::condition;
use super::constraints::constraints;
use super::context::{SemanticContext, Site};
use super::declarations::{
    self, declare_formula, expect, local_variables, signature, typed_variables,
};
use super::durative::durative_action;
use super::effects::effect;
use super::numeric::numeric;
use crate::error::{child, kind_of, FatalError, Result};
use enumset::EnumSet;
use pddl_ast::model::{Action, ActionDef, RootFormula, Signature};
use pddl_ast::{
    ConstraintExp, Diagnostics, Effect, ErrorKind, LogicalExp, NodeKind, NumericExp, PddlObject,
    Requirement, SyntaxNode, Variable,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Resolve a `Domain` node.
pub fn resolve_domain(
    node: &SyntaxNode,
    file: &str,
    accepted: EnumSet<Requirement>,
    diagnostics: &mut Diagnostics,
) -> Result<PddlObject> {
    expect(node, NodeKind::Domain, "a domain definition")?;
    let name = child(node, 0, "domain name")?.image();
    let mut object = PddlObject::domain(name, file);
    object.span = node.span;
    let mut ctx = SemanticContext::new(object, None, diagnostics, accepted);
    let sections = &node.children[1..];

    declare(&mut ctx, sections)?;
    let mut derived = HashSet::new();
    for section in sections {
        match kind_of(section)? {
            NodeKind::Derived => derived_rule(&mut ctx, section, &mut derived)?,
            NodeKind::DefinedPredicate | NodeKind::DefinedFunction => {
                defined_body(&mut ctx, section)?
            }
            NodeKind::Action => {
                let action = action(&mut ctx, section)?;
                add_action(&mut ctx, ActionDef::Simple(action));
            }
            NodeKind::DurativeAction => {
                let action = durative_action(&mut ctx, section)?;
                add_action(&mut ctx, ActionDef::Durative(action));
            }
            NodeKind::Constraints => {
                let constraint = constraints(&mut ctx, section)?;
                let existing = std::mem::replace(&mut ctx.object.constraints, ConstraintExp::True);
                ctx.object.constraints = ConstraintExp::conjoin([existing, constraint]);
            }
            _ => {}
        }
    }
    check_violated_refs(&mut ctx);

    let object = ctx.finish();
    debug!(
        domain = %object.name,
        types = object.lattice.user_type_count(),
        formulas = object.formulas.len(),
        actions = object.actions.len(),
        "domain resolved"
    );
    Ok(object)
}

/// First pass: everything that can be referenced.
fn declare(ctx: &mut SemanticContext, sections: &[SyntaxNode]) -> Result<()> {
    let of = |kind: NodeKind| sections.iter().filter(move |s| s.is(kind));

    let mut declared = false;
    for section in of(NodeKind::Requirements) {
        declarations::requirements(ctx, section)?;
        declared = true;
    }
    if !declared {
        ctx.object.requirements.add(Requirement::Strips);
    }
    for section in of(NodeKind::Types) {
        declarations::types(ctx, section)?;
    }
    for section in of(NodeKind::Constants) {
        declarations::constants(ctx, section)?;
    }

    for section in sections {
        match kind_of(section)? {
            NodeKind::Predicates => declarations::predicates(ctx, section)?,
            NodeKind::Functions => declarations::functions(ctx, section)?,
            NodeKind::Derived => {
                ctx.require(
                    Requirement::DerivedPredicates,
                    section.span,
                    "a derived predicate",
                );
                derived_signature(ctx, section)?;
            }
            NodeKind::DefinedPredicate | NodeKind::DefinedFunction => {
                defined_signature(ctx, section)?;
            }
            NodeKind::Requirements
            | NodeKind::Types
            | NodeKind::Constants
            | NodeKind::Action
            | NodeKind::DurativeAction
            | NodeKind::Constraints => {}
            _ => return Err(FatalError::unexpected(section, "a domain section")),
        }
    }
    Ok(())
}

// === Derived predicates ===

/// Declare the head of a derived rule.
///
/// A head also listed under `:predicates` turns that predicate into a
/// derived one; later rules for the same head only check the arity.
fn derived_signature(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    let head = signature(ctx, child(node, 0, "derived head")?)?;
    match ctx.formula(&head.name).cloned() {
        None => {
            declare_formula(
                ctx,
                RootFormula::Derived {
                    signature: head,
                    body: LogicalExp::False,
                },
            );
        }
        Some(RootFormula::Predicate(declared)) => {
            check_arity(ctx, &head, &declared);
            ctx.insert_formula(RootFormula::Derived {
                signature: declared,
                body: LogicalExp::False,
            });
        }
        Some(RootFormula::Derived { signature, .. }) => check_arity(ctx, &head, &signature),
        Some(other) => ctx.error(
            ErrorKind::WrongKind,
            head.span,
            format!(
                "'{}' is a {}, it cannot be derived",
                head.name,
                other.describe()
            ),
        ),
    }
    Ok(())
}

fn check_arity(ctx: &mut SemanticContext, head: &Signature, declared: &Signature) {
    if head.arity() != declared.arity() {
        ctx.error(
            ErrorKind::SignatureMismatch,
            head.span,
            format!(
                "derived rule for '{}' has {} parameter(s), the predicate has {}",
                head.name,
                head.arity(),
                declared.arity()
            ),
        );
    }
}

/// Resolve one derived rule and merge it into the predicate's body.
///
/// Later rules are renamed to the parameters of the declared head and
/// joined with `or`.
fn derived_rule(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    seen: &mut HashSet<String>,
) -> Result<()> {
    let head = child(node, 0, "derived head")?;
    let name = child(head, 0, "derived name")?.image().to_string();
    let Some(RootFormula::Derived { signature: declared, .. }) = ctx.formula(&name).cloned() else {
        return Ok(());
    };
    // parameter names as written in this rule
    let own: Vec<String> = head.children[1..]
        .iter()
        .flat_map(|group| group.children.iter())
        .filter(|n| n.is(NodeKind::Variable))
        .map(|n| n.image().to_string())
        .collect();
    let params: Vec<Variable> = own
        .iter()
        .zip(&declared.params)
        .map(|(name, param)| param.renamed(name.clone()))
        .collect();

    ctx.push_scope(&params, node.span);
    let body = condition(ctx, child(node, 1, "derived body")?);
    ctx.scopes.pop();
    let body = body?;

    let mapping: HashMap<String, String> = params
        .iter()
        .zip(&declared.params)
        .map(|(own, declared)| (own.name.clone(), declared.name.clone()))
        .collect();
    let body = body.standardize(&mapping);

    let merged = if seen.insert(name.clone()) {
        body
    } else {
        let previous = match ctx.formula(&name) {
            Some(RootFormula::Derived { body, .. }) => body.clone(),
            _ => LogicalExp::False,
        };
        match previous {
            LogicalExp::Or(mut rules) => {
                rules.push(body);
                LogicalExp::Or(rules)
            }
            single => LogicalExp::Or(vec![single, body]),
        }
    };
    trace!(derived = %name, "derived rule merged");
    ctx.insert_formula(RootFormula::Derived {
        signature: declared,
        body: merged,
    });
    Ok(())
}

// === Defined formulas ===

fn defined_signature(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    ctx.require(Requirement::Tlplan, node.span, "a defined formula");
    let head = signature(ctx, child(node, 0, "defined head")?)?;
    let formula = if node.is(NodeKind::DefinedPredicate) {
        RootFormula::DefinedPredicate {
            signature: head,
            locals: Vec::new(),
            body: LogicalExp::True,
        }
    } else {
        RootFormula::DefinedFunction {
            signature: head,
            locals: Vec::new(),
            body: LogicalExp::True,
            result: NumericExp::Number(0.0),
        }
    };
    declare_formula(ctx, formula);
    Ok(())
}

/// Resolve the locals, body and result of a defined formula.
fn defined_body(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    let head = child(node, 0, "defined head")?;
    let name = child(head, 0, "defined name")?.image().to_string();
    let signature = match ctx.formula(&name) {
        Some(
            RootFormula::DefinedPredicate { signature, .. }
            | RootFormula::DefinedFunction { signature, .. },
        ) => signature.clone(),
        // clashed with another declaration, already reported
        _ => return Ok(()),
    };

    let mut rest = &node.children[1..];
    let locals = match rest.first() {
        Some(first) if first.is(NodeKind::LocalVars) => {
            rest = &rest[1..];
            local_variables(ctx, first)?
        }
        _ => Vec::new(),
    };
    let body_node = rest
        .first()
        .ok_or_else(|| FatalError::missing(node, "defined body"))?;

    ctx.push_scope(&signature.params, node.span);
    ctx.push_scope(&locals, node.span);
    let resolved = defined_parts(ctx, node, body_node, rest.get(1));
    ctx.scopes.pop();
    ctx.scopes.pop();
    let (body, result) = resolved?;

    let formula = match result {
        None => RootFormula::DefinedPredicate {
            signature,
            locals,
            body,
        },
        Some(result) => RootFormula::DefinedFunction {
            signature,
            locals,
            body,
            result,
        },
    };
    trace!(defined = %name, "defined formula resolved");
    ctx.insert_formula(formula);
    Ok(())
}

fn defined_parts(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    body: &SyntaxNode,
    result: Option<&SyntaxNode>,
) -> Result<(LogicalExp, Option<NumericExp>)> {
    let body = condition(ctx, body)?;
    if !node.is(NodeKind::DefinedFunction) {
        return Ok((body, None));
    }
    let result = result.ok_or_else(|| FatalError::missing(node, "defined function result"))?;
    Ok((body, Some(numeric(ctx, result)?)))
}

// === Actions ===

/// Resolve an instantaneous `:action`.
fn action(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Action> {
    let name = child(node, 0, "action name")?.image().to_string();
    let params = typed_variables(ctx, child(node, 1, "parameters")?)?;

    ctx.push_scope(&params, node.span);
    let built = action_parts(ctx, node, &name);
    ctx.site = Site::Body;
    ctx.scopes.pop();
    let (precondition, effect) = built?;

    let violations = std::mem::take(&mut ctx.pending_effects)
        .into_iter()
        .map(|(_, effect)| effect);
    let effect = Effect::conjoin(std::iter::once(effect).chain(violations));
    trace!(action = %name, params = params.len(), "action built");
    Ok(Action {
        name,
        params,
        precondition,
        effect,
        span: node.span,
    })
}

fn action_parts(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    name: &str,
) -> Result<(LogicalExp, Effect)> {
    let mut precondition = LogicalExp::True;
    let mut effects = Effect::And(Vec::new());
    for part in &node.children[2..] {
        match kind_of(part)? {
            NodeKind::Precondition => {
                ctx.site = Site::Precondition {
                    action: name.to_string(),
                    at: None,
                };
                precondition = condition(ctx, child(part, 0, "precondition")?)?;
                ctx.site = Site::Body;
            }
            NodeKind::Effect => effects = effect(ctx, child(part, 0, "effect")?)?,
            _ => return Err(FatalError::unexpected(part, "an action")),
        }
    }
    Ok((precondition, effects))
}

fn add_action(ctx: &mut SemanticContext, action: ActionDef) {
    let name = action.name().to_string();
    if let Some(first) = ctx.object.actions.get(&name).map(ActionDef::span) {
        ctx.duplicate("action", &name, action.span(), first);
        return;
    }
    Arc::make_mut(&mut ctx.object.actions).insert(name, action);
}

/// Report `is-violated` references to preferences that do not exist.
pub(crate) fn check_violated_refs(ctx: &mut SemanticContext) {
    for (name, span) in std::mem::take(&mut ctx.violated_refs) {
        let known = ctx.object.preferences.contains(&name)
            || ctx.domain.is_some_and(|d| d.preferences.contains(&name));
        if !known {
            ctx.error(
                ErrorKind::UndefinedName,
                span,
                format!("no preference named '{name}'"),
            );
        }
    }
}
