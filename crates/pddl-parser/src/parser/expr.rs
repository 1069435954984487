//! Expression recognizer.
//!
//! Every parenthesized form is dispatched on its head. Reserved heads
//! (connectives, quantifiers, operators, modal keywords) get their own node
//! kind; anything else is an application. Whether an application is a
//! predicate atom or a function term depends on where it occurs, which is
//! the only context the recognizer tracks.

use super::{typed, ParseError, TokenStream};
use pddl_ast::{NodeKind, SyntaxNode};
use pddl_lexer::Token;

/// Where an expression occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Position {
    /// Conditions, effects, constraints: applications are atoms
    Logical,
    /// Operands of numeric operators: applications are function terms
    Numeric,
}

const ASSIGN_OPS: &[&str] = &["assign", "increase", "decrease", "scale-up", "scale-down"];

const MODAL_OPS: &[&str] = &[
    "always",
    "sometime",
    "within",
    "at-most-once",
    "sometime-after",
    "sometime-before",
    "always-within",
    "hold-during",
    "hold-after",
    "next",
    "eventually",
    "until",
    "release",
];

/// Named arithmetic functions, recognized in numeric position only.
const ARITH_FUNCTIONS: &[&str] = &[
    "min", "max", "mod", "sqrt", "abs", "log", "exp", "round", "int", "floor", "ceiling",
];

pub(super) fn parse_expr(
    stream: &mut TokenStream,
    position: Position,
) -> Result<SyntaxNode, ParseError> {
    let span = stream.current_span();
    match stream.peek() {
        Some(Token::LParen) => parse_list(stream, position),
        Some(Token::Name(name)) => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span))
        }
        Some(Token::Variable(name)) => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Variable, name.as_ref(), span))
        }
        Some(Token::Time) => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Variable, "#t", span))
        }
        Some(token @ Token::Number(_)) => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Number, token.to_string(), span))
        }
        other => Err(ParseError::unexpected_token(other, "in expression", span)),
    }
}

/// Operands up to (not including) the closing `)`.
pub(super) fn operands(
    stream: &mut TokenStream,
    position: Position,
) -> Result<Vec<SyntaxNode>, ParseError> {
    let mut out = Vec::new();
    while !stream.at_end() && !stream.check(&Token::RParen) {
        out.push(parse_expr(stream, position)?);
    }
    Ok(out)
}

fn parse_list(stream: &mut TokenStream, position: Position) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::LParen)?;

    let (kind, image, children) = match stream.peek() {
        // `()` is the empty conjunction
        Some(Token::RParen) => (NodeKind::And, None, Vec::new()),
        Some(Token::Name(head)) => parse_named(stream, head.as_ref(), position)?,
        Some(token) if token.operator().is_some() => parse_operator(stream, token)?,
        other => {
            return Err(ParseError::unexpected_token(
                other,
                "at the start of an expression",
                stream.current_span(),
            ))
        }
    };

    stream.expect(Token::RParen)?;
    let span = stream.span_from(start);
    Ok(match image {
        Some(image) => SyntaxNode::with_image(kind, image, span, children),
        None => SyntaxNode::new(kind, span, children),
    })
}

type Shape = (NodeKind, Option<String>, Vec<SyntaxNode>);

fn parse_named(
    stream: &mut TokenStream,
    head: &str,
    position: Position,
) -> Result<Shape, ParseError> {
    let head_span = stream.current_span();
    match head {
        "and" | "or" | "not" | "imply" | "when" => {
            stream.advance();
            let kind = match head {
                "and" => NodeKind::And,
                "or" => NodeKind::Or,
                "not" => NodeKind::Not,
                "imply" => NodeKind::Imply,
                _ => NodeKind::When,
            };
            Ok((kind, None, operands(stream, Position::Logical)?))
        }
        "exists" | "forall" => {
            stream.advance();
            let kind = if head == "exists" {
                NodeKind::Exists
            } else {
                NodeKind::Forall
            };
            let params = typed::parse_typed_list(stream, NodeKind::Parameters)?;
            let body = parse_expr(stream, Position::Logical)?;
            Ok((kind, None, vec![params, body]))
        }
        "preference" => {
            stream.advance();
            let mut children = Vec::new();
            if let Some(Token::Name(name)) = stream.peek() {
                children.push(SyntaxNode::leaf(
                    NodeKind::Name,
                    name.as_ref(),
                    stream.current_span(),
                ));
                stream.advance();
            }
            children.push(parse_expr(stream, Position::Logical)?);
            Ok((NodeKind::Preference, None, children))
        }
        "at" if is_time_point(stream) => {
            stream.advance();
            let image = match stream.advance() {
                Some(Token::Name(point)) if point.as_ref() == "start" => "at-start",
                _ => "at-end",
            };
            let body = parse_expr(stream, Position::Logical)?;
            Ok((NodeKind::Timed, Some(image.to_string()), vec![body]))
        }
        "at" if matches!(stream.peek_nth(1), Some(Token::Number(_))) => {
            stream.advance();
            let time = parse_expr(stream, Position::Numeric)?;
            let literal = parse_expr(stream, Position::Logical)?;
            Ok((NodeKind::TimedLiteral, None, vec![time, literal]))
        }
        "over" if matches!(stream.peek_nth(1), Some(Token::Name(n)) if n.as_ref() == "all") => {
            stream.advance();
            stream.advance();
            let body = parse_expr(stream, Position::Logical)?;
            Ok((NodeKind::Timed, Some("over-all".to_string()), vec![body]))
        }
        "is-violated" => {
            stream.advance();
            match stream.peek() {
                Some(Token::Name(name)) => {
                    let node = SyntaxNode::leaf(NodeKind::Name, name.as_ref(), stream.current_span());
                    stream.advance();
                    Ok((NodeKind::IsViolated, None, vec![node]))
                }
                other => Err(ParseError::unexpected_token(
                    other,
                    "where a preference name was expected",
                    stream.current_span(),
                )),
            }
        }
        "goal" => {
            stream.advance();
            Ok((NodeKind::GoalModality, None, operands(stream, Position::Logical)?))
        }
        _ if ASSIGN_OPS.contains(&head) => {
            stream.advance();
            Ok((
                NodeKind::Assignment,
                Some(head.to_string()),
                operands(stream, Position::Numeric)?,
            ))
        }
        _ if MODAL_OPS.contains(&head) => {
            stream.advance();
            Ok((
                NodeKind::Modal,
                Some(head.to_string()),
                operands(stream, Position::Logical)?,
            ))
        }
        _ if position == Position::Numeric && ARITH_FUNCTIONS.contains(&head) => {
            stream.advance();
            Ok((
                NodeKind::Arithmetic,
                Some(head.to_string()),
                operands(stream, Position::Numeric)?,
            ))
        }
        _ => {
            stream.advance();
            let kind = match position {
                Position::Logical => NodeKind::Atom,
                Position::Numeric => NodeKind::FunctionTerm,
            };
            let mut children = vec![SyntaxNode::leaf(NodeKind::Name, head, head_span)];
            children.extend(operands(stream, Position::Numeric)?);
            Ok((kind, None, children))
        }
    }
}

/// `at start (` or `at end (`, as opposed to an `at` predicate.
fn is_time_point(stream: &TokenStream) -> bool {
    matches!(stream.peek_nth(1), Some(Token::Name(p)) if p.as_ref() == "start" || p.as_ref() == "end")
        && matches!(stream.peek_nth(2), Some(Token::LParen))
}

fn parse_operator(stream: &mut TokenStream, token: &Token) -> Result<Shape, ParseError> {
    let image = token.operator().unwrap_or_default().to_string();
    stream.advance();
    match token {
        Token::Lt | Token::Le | Token::Eq | Token::Ge | Token::Gt => Ok((
            NodeKind::Comparison,
            Some(image),
            operands(stream, Position::Numeric)?,
        )),
        Token::Assign => Ok((
            NodeKind::LocalAssign,
            None,
            operands(stream, Position::Numeric)?,
        )),
        _ => Ok((
            NodeKind::Arithmetic,
            Some(image),
            operands(stream, Position::Numeric)?,
        )),
    }
}
