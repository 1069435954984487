//! Numeric expressions.

use super::context::SemanticContext;
use super::terms::application;
use crate::error::{child, kind_of, Result};
use pddl_ast::expr::{ArithOp, UnaryOp, VariableClass};
use pddl_ast::model::FormulaClass;
use pddl_ast::{ErrorKind, NodeKind, NumericExp, Requirement, SyntaxNode, Variable};

/// Value of a `Number` leaf; reports and yields 0 for a malformed one.
pub(crate) fn number(ctx: &mut SemanticContext, node: &SyntaxNode) -> f64 {
    match node.image().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            ctx.error(
                ErrorKind::Syntax,
                node.span,
                format!("'{}' is not a finite number", node.image()),
            );
            0.0
        }
    }
}

/// Resolve a numeric expression.
pub fn numeric(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<NumericExp> {
    match kind_of(node)? {
        NodeKind::Number => Ok(NumericExp::Number(number(ctx, node))),
        NodeKind::Variable if node.image() == "#t" => Ok(time(ctx, node)),
        NodeKind::Variable => {
            let var = ctx.variable(node.image(), VariableClass::Numeric, node.span);
            Ok(NumericExp::Variable(var))
        }
        NodeKind::Name if node.image() == "total-time" => Ok(NumericExp::TotalTime),
        // a nullary fluent may be written without parentheses
        NodeKind::Name if names_function(ctx, node.image()) => {
            let term = SyntaxNode::new(NodeKind::FunctionTerm, node.span, vec![node.clone()]);
            function(ctx, &term)
        }
        NodeKind::FunctionTerm => function(ctx, node),
        NodeKind::Arithmetic => arithmetic(ctx, node),
        NodeKind::IsViolated => {
            ctx.require(Requirement::Preferences, node.span, "is-violated");
            let name = child(node, 0, "preference name")?;
            ctx.violated_refs
                .push((name.image().to_string(), name.span));
            Ok(NumericExp::IsViolated(name.image().to_string()))
        }
        other => {
            let found = match other {
                NodeKind::Name => format!("'{}'", node.image()),
                _ => format!("a {}", other.name()),
            };
            ctx.error(
                ErrorKind::TypeMismatch,
                node.span,
                format!("expected a numeric expression, found {found}"),
            );
            Ok(NumericExp::Number(0.0))
        }
    }
}

fn names_function(ctx: &SemanticContext, name: &str) -> bool {
    ctx.formula(name)
        .is_some_and(|f| f.class() == FormulaClass::Numeric)
}

/// `#t`, only meaningful inside durative action effects.
fn time(ctx: &mut SemanticContext, node: &SyntaxNode) -> NumericExp {
    ctx.require(Requirement::ContinuousEffects, node.span, "#t");
    if !ctx.durative {
        ctx.error(
            ErrorKind::Misplaced,
            node.span,
            "#t may only appear in the effects of a durative action",
        );
    }
    ctx.saw_time = true;
    NumericExp::Variable(Variable::time())
}

fn function(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<NumericExp> {
    let name = child(node, 0, "function name")?.image();
    if name == "total-time" && node.children.len() == 1 && ctx.formula(name).is_none() {
        return Ok(NumericExp::TotalTime);
    }
    Ok(match application(ctx, node, FormulaClass::Numeric)? {
        Some((target, args)) if target.defined => {
            ctx.require(Requirement::Tlplan, node.span, "a defined function");
            NumericExp::Defined {
                name: target.name,
                args,
            }
        }
        Some((target, args)) => NumericExp::fluent(target.name, args),
        None => NumericExp::Number(0.0),
    })
}

fn arithmetic(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<NumericExp> {
    let symbol = node.image();
    let args = node
        .children
        .iter()
        .map(|c| numeric(ctx, c))
        .collect::<Result<Vec<_>>>()?;

    if let Some(op) = UnaryOp::from_symbol(symbol) {
        let mut args = args;
        if args.len() != 1 {
            ctx.error(
                ErrorKind::SignatureMismatch,
                node.span,
                format!("'{symbol}' takes one operand, got {}", args.len()),
            );
        }
        let arg = if args.is_empty() {
            NumericExp::Number(0.0)
        } else {
            args.swap_remove(0)
        };
        return Ok(NumericExp::Unary {
            op,
            arg: Box::new(arg),
        });
    }

    let Some(op) = ArithOp::from_symbol(symbol) else {
        ctx.error(
            ErrorKind::Syntax,
            node.span,
            format!("unknown arithmetic operator '{symbol}'"),
        );
        return Ok(NumericExp::Number(0.0));
    };
    let fixed_arity = matches!(op, ArithOp::Mod | ArithOp::Pow);
    if args.is_empty() || (fixed_arity && args.len() != 2) {
        ctx.error(
            ErrorKind::SignatureMismatch,
            node.span,
            format!("wrong number of operands for '{symbol}'"),
        );
    }
    Ok(NumericExp::nary(op, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pddl_ast::model::{RootFormula, Signature};
    use pddl_ast::{Diagnostics, PddlObject, Span};

    fn leaf(kind: NodeKind, image: &str) -> SyntaxNode {
        SyntaxNode::leaf(kind, image, Span::at(1, 1))
    }

    fn node(kind: NodeKind, image: &str, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::with_image(kind, image, Span::at(1, 1), children)
    }

    fn domain() -> PddlObject {
        let mut domain = PddlObject::domain("d", "d.pddl");
        domain.requirements.add(Requirement::NumericFluents);
        std::sync::Arc::make_mut(&mut domain.formulas).insert(
            "fuel".into(),
            RootFormula::NumericFluent(Signature::new("fuel", Vec::new(), Span::default())),
        );
        domain
    }

    #[test]
    fn test_unary_minus_and_functions() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = SemanticContext::new(domain(), None, &mut diagnostics, Default::default());

        let fuel = SyntaxNode::new(
            NodeKind::FunctionTerm,
            Span::at(1, 1),
            vec![leaf(NodeKind::Name, "fuel")],
        );
        let minus = node(NodeKind::Arithmetic, "-", vec![fuel]);
        let exp = numeric(&mut ctx, &minus).unwrap();
        assert_eq!(
            exp,
            NumericExp::nary(ArithOp::Sub, vec![NumericExp::fluent("fuel", Vec::new())])
        );

        let sqrt = node(NodeKind::Arithmetic, "sqrt", vec![leaf(NodeKind::Number, "4")]);
        assert!(matches!(
            numeric(&mut ctx, &sqrt).unwrap(),
            NumericExp::Unary { op: UnaryOp::Sqrt, .. }
        ));
        drop(ctx);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.messages());
    }

    #[test]
    fn test_time_outside_durative_effect() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = SemanticContext::new(domain(), None, &mut diagnostics, Default::default());
        numeric(&mut ctx, &leaf(NodeKind::Variable, "#t")).unwrap();
        assert!(ctx.saw_time);
        drop(ctx);
        let kinds: Vec<ErrorKind> = diagnostics.errors().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::MissingRequirement, ErrorKind::Misplaced]);
    }

    #[test]
    fn test_predicate_in_numeric_position() {
        let mut object = domain();
        std::sync::Arc::make_mut(&mut object.formulas).insert(
            "ready".into(),
            RootFormula::Predicate(Signature::new("ready", Vec::new(), Span::default())),
        );
        let mut diagnostics = Diagnostics::new();
        let mut ctx = SemanticContext::new(object, None, &mut diagnostics, Default::default());
        let term = SyntaxNode::new(
            NodeKind::FunctionTerm,
            Span::at(2, 4),
            vec![leaf(NodeKind::Name, "ready")],
        );
        assert_eq!(numeric(&mut ctx, &term).unwrap(), NumericExp::Number(0.0));
        drop(ctx);
        let error = diagnostics.errors().next().unwrap();
        assert_eq!(error.kind, ErrorKind::WrongKind);
        assert!(error.message.contains("'ready' is a predicate"));
    }
}
