//! Requirements, types, constants, typed variable lists and formula
//! signatures.

use super::context::SemanticContext;
use crate::error::{child, kind_of, FatalError, Result};
use pddl_ast::model::{ConstantDecl, RootFormula, Signature};
use pddl_ast::{
    Constant, ErrorKind, NodeKind, Requirement, Span, SyntaxNode, TypeError, TypeSetId, Variable,
    VariableKind,
};
use tracing::trace;

/// Add the keys of a `:requirements` section.
pub fn requirements(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    expect(node, NodeKind::Requirements, "a requirements section")?;
    for key in &node.children {
        expect(key, NodeKind::RequireKey, "a requirement key")?;
        match Requirement::from_key(key.image()) {
            Some(requirement) if ctx.accepted.contains(requirement) => {
                ctx.object.requirements.add(requirement);
            }
            Some(requirement) => ctx.error(
                ErrorKind::UnsupportedRequirement,
                key.span,
                format!("requirement {requirement} is not accepted here"),
            ),
            None => ctx.error(
                ErrorKind::UnsupportedRequirement,
                key.span,
                format!("unknown requirement '{}'", key.image()),
            ),
        }
    }
    ctx.object.explicit_requirements = true;
    Ok(())
}

/// Declare the types of a `:types` section.
pub fn types(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    expect(node, NodeKind::Types, "a types section")?;
    ctx.require(Requirement::Typing, node.span, "declaring types");

    for group in &node.children {
        let (items, spec) = split_group(group)?;
        let parents: Vec<&str> = match spec {
            Some(spec) => spec.children.iter().map(SyntaxNode::image).collect(),
            None => Vec::new(),
        };
        for item in items {
            if !item.is(NodeKind::Name) {
                ctx.error(
                    ErrorKind::Syntax,
                    item.span,
                    format!("expected a type name, found {}", item.image()),
                );
                continue;
            }
            match ctx.lattice_mut().declare(item.image(), &parents) {
                Ok(_) => trace!(name = item.image(), ?parents, "type declared"),
                Err(error) => report_type_error(ctx, error, item.span),
            }
        }
    }
    Ok(())
}

pub(crate) fn report_type_error(ctx: &mut SemanticContext, error: TypeError, span: Span) {
    let kind = match &error {
        TypeError::Reserved(_) | TypeError::Redeclared(_) => ErrorKind::DuplicateName,
        TypeError::Undeclared(_) => ErrorKind::UnknownType,
        TypeError::Cycle { .. } => ErrorKind::CyclicType,
        TypeError::NumberInUnion | TypeError::EmptyUnion => ErrorKind::TypeMismatch,
    };
    ctx.error(kind, span, error.to_string());
}

/// Type set named by an optional `TypeSpec`; `{object}` when absent or
/// invalid.
pub(crate) fn type_set(ctx: &mut SemanticContext, spec: Option<&SyntaxNode>) -> TypeSetId {
    let Some(spec) = spec else {
        return TypeSetId::OBJECT;
    };
    if spec.image() == "either" {
        ctx.require(Requirement::Typing, spec.span, "'either'");
    }
    let names: Vec<&str> = spec.children.iter().map(SyntaxNode::image).collect();
    match ctx.lattice_mut().type_set(&names) {
        Ok(set) => set,
        Err(error) => {
            report_type_error(ctx, error, spec.span);
            TypeSetId::OBJECT
        }
    }
}

/// Items and optional type of a `TypedGroup`.
pub(crate) fn split_group(group: &SyntaxNode) -> Result<(&[SyntaxNode], Option<&SyntaxNode>)> {
    expect(group, NodeKind::TypedGroup, "a typed group")?;
    Ok(match group.children.split_last() {
        Some((last, items)) if last.is(NodeKind::TypeSpec) => (items, Some(last)),
        _ => (&group.children[..], None),
    })
}

/// Object variables of a `Parameters` node (or any typed variable list).
pub fn typed_variables(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Vec<Variable>> {
    let mut vars: Vec<Variable> = Vec::new();
    for group in &node.children {
        let (items, spec) = split_group(group)?;
        if let Some(spec) = spec {
            ctx.require(Requirement::Typing, spec.span, "a typed variable list");
        }
        let types = type_set(ctx, spec);
        for item in items {
            if !item.is(NodeKind::Variable) {
                ctx.error(
                    ErrorKind::Syntax,
                    item.span,
                    format!("expected a variable, found '{}'", item.image()),
                );
                continue;
            }
            if spec.is_none() && ctx.object.requirements.contains(Requirement::Typing) {
                ctx.warning(
                    ErrorKind::UntypedVariable,
                    item.span,
                    format!("{} has no type, assuming object", item.image()),
                );
            }
            if vars.iter().any(|v| v.name == item.image()) {
                ctx.error(
                    ErrorKind::DuplicateName,
                    item.span,
                    format!("variable {} appears twice in this list", item.image()),
                );
                continue;
            }
            vars.push(Variable::object(item.image(), types));
        }
    }
    Ok(vars)
}

/// TLPlan local variables: `number` and `boolean` name value locals,
/// other types object locals; untyped locals are numeric.
pub fn local_variables(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Vec<Variable>> {
    expect(node, NodeKind::LocalVars, "a local variable list")?;
    ctx.require(Requirement::Tlplan, node.span, "local variables");
    let mut vars = Vec::new();
    for group in &node.children {
        let (items, spec) = split_group(group)?;
        let single = spec
            .filter(|s| s.image() != "either" && s.children.len() == 1)
            .map(SyntaxNode::image);
        let kind = match single {
            None if spec.is_none() => VariableKind::NumericLocal,
            Some("number") => VariableKind::NumericLocal,
            Some("boolean") => VariableKind::BooleanLocal,
            _ => VariableKind::ObjectLocal(type_set(ctx, spec)),
        };
        for item in items {
            if item.is(NodeKind::Variable) {
                vars.push(Variable::new(item.image(), kind));
            } else {
                ctx.error(
                    ErrorKind::Syntax,
                    item.span,
                    format!("expected a variable, found '{}'", item.image()),
                );
            }
        }
    }
    Ok(vars)
}

/// Declare the constants of `:constants` or `:objects`.
pub fn constants(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    let what = match kind_of(node)? {
        NodeKind::Constants => "constant",
        NodeKind::Objects => "object",
        _ => return Err(FatalError::unexpected(node, "a constants section")),
    };
    for group in &node.children {
        let (items, spec) = split_group(group)?;
        if let Some(spec) = spec {
            ctx.require(Requirement::Typing, spec.span, "a typed constant list");
        }
        let types = type_set(ctx, spec);
        for item in items {
            if !item.is(NodeKind::Name) {
                ctx.error(
                    ErrorKind::Syntax,
                    item.span,
                    format!("expected a {what} name, found {}", item.image()),
                );
                continue;
            }
            let name = item.image();
            if let Some(first) = ctx.object.constants.get(name).map(|d| d.span) {
                ctx.duplicate(what, name, item.span, first);
                continue;
            }
            let file = ctx.diagnostics.file().to_string();
            ctx.object.constants.insert(
                name.to_string(),
                ConstantDecl {
                    constant: Constant::new(name, types),
                    span: item.span,
                    file,
                },
            );
            trace!(name, what, "constant declared");
        }
    }
    Ok(())
}

/// Signature of an `AtomicSkeleton`.
pub fn signature(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<Signature> {
    expect(node, NodeKind::AtomicSkeleton, "a formula skeleton")?;
    let name = child(node, 0, "name")?;
    let params = Parameters(&node.children[1..]);
    let params = params.resolve(ctx)?;
    Ok(Signature::new(name.image(), params, node.span))
}

/// Typed groups of a skeleton, resolved like a parameter list.
struct Parameters<'n>(&'n [SyntaxNode]);

impl Parameters<'_> {
    fn resolve(&self, ctx: &mut SemanticContext) -> Result<Vec<Variable>> {
        let list = SyntaxNode::new(NodeKind::Parameters, Span::default(), self.0.to_vec());
        typed_variables(ctx, &list)
    }
}

/// Register a formula, reporting a name clash with any existing one.
pub(crate) fn declare_formula(ctx: &mut SemanticContext, formula: RootFormula) {
    let name = formula.name().to_string();
    if let Some(first) = ctx.formula(&name).map(|f| f.signature().span) {
        let span = formula.signature().span;
        ctx.duplicate("formula", &name, span, first);
        return;
    }
    trace!(name = %name, kind = formula.describe(), "formula declared");
    ctx.insert_formula(formula);
}

/// Declare the predicates of a `:predicates` section.
pub fn predicates(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    expect(node, NodeKind::Predicates, "a predicates section")?;
    for skeleton in &node.children {
        let signature = signature(ctx, skeleton)?;
        declare_formula(ctx, RootFormula::Predicate(signature));
    }
    Ok(())
}

/// Declare the functions of a `:functions` section.
///
/// Untyped and `number` functions are numeric fluents; functions of an
/// object type are object fluents.
pub fn functions(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<()> {
    expect(node, NodeKind::Functions, "a functions section")?;
    for group in &node.children {
        expect(group, NodeKind::FunctionGroup, "a function group")?;
        let (skeletons, spec) = match group.children.split_last() {
            Some((last, rest)) if last.is(NodeKind::TypeSpec) => (rest, Some(last)),
            _ => (&group.children[..], None),
        };
        let numeric = spec.map_or(true, |s| {
            s.image() != "either" && s.children.iter().all(|n| n.image() == "number")
        });

        let result = if numeric {
            None
        } else {
            ctx.require(Requirement::ObjectFluents, group.span, "object-valued functions");
            Some(type_set(ctx, spec))
        };
        if numeric {
            ctx.require_any(
                Requirement::NumericFluents | Requirement::ActionCosts,
                group.span,
                "numeric functions",
            );
        }

        for skeleton in skeletons {
            let signature = signature(ctx, skeleton)?;
            let formula = match result {
                None => RootFormula::NumericFluent(signature),
                Some(result) => RootFormula::ObjectFluent { signature, result },
            };
            declare_formula(ctx, formula);
        }
    }
    Ok(())
}

/// Fail unless `node` has the given kind.
pub(crate) fn expect(node: &SyntaxNode, kind: NodeKind, context: &'static str) -> Result<()> {
    if kind_of(node)? == kind {
        Ok(())
    } else {
        Err(FatalError::unexpected(node, context))
    }
}
