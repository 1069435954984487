//! `(define ...)` forms and their sections.
//!
//! An error inside a section is recorded and the whole section is skipped,
//! so one malformed action does not hide problems in the rest of the file.

use super::expr::{operands, parse_expr, Position};
use super::typed::{parse_skeleton, parse_type_spec, parse_typed_list, typed_groups};
use super::{ParseError, TokenStream};
use pddl_ast::{NodeKind, Span, SyntaxNode};
use pddl_lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Definition {
    Domain,
    Problem,
}

/// All top-level definitions in the stream.
pub(super) fn parse_definitions(
    stream: &mut TokenStream,
) -> Result<Vec<SyntaxNode>, Vec<ParseError>> {
    let mut nodes = Vec::new();
    let mut errors = Vec::new();

    while !stream.at_end() {
        match parse_definition(stream, &mut errors) {
            Ok(node) => nodes.push(node),
            Err(error) => {
                // The enclosing structure is unknown past a broken header.
                errors.push(error);
                break;
            }
        }
    }

    if errors.is_empty() {
        Ok(nodes)
    } else {
        Err(errors)
    }
}

fn parse_definition(
    stream: &mut TokenStream,
    errors: &mut Vec<ParseError>,
) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::LParen)?;
    expect_name(stream, Some("define"))?;

    stream.expect(Token::LParen)?;
    let head_span = stream.current_span();
    let definition = match stream.advance() {
        Some(Token::Name(head)) if head.as_ref() == "domain" => Definition::Domain,
        Some(Token::Name(head)) if head.as_ref() == "problem" => Definition::Problem,
        other => {
            return Err(ParseError::unexpected_token(
                other,
                "where 'domain' or 'problem' was expected",
                head_span,
            ))
        }
    };
    let name = expect_name(stream, None)?;
    stream.expect(Token::RParen)?;

    let mut children = vec![name];
    while !stream.at_end() && !stream.check(&Token::RParen) {
        let section_start = stream.current_pos();
        let parsed = match definition {
            Definition::Domain => parse_domain_section(stream),
            Definition::Problem => parse_problem_section(stream),
        };
        match parsed {
            Ok(node) => children.push(node),
            Err(error) => {
                errors.push(error);
                stream.seek(section_start);
                match stream.advance() {
                    Some(Token::LParen) => stream.skip_balanced(),
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }
    stream.expect(Token::RParen)?;

    let kind = match definition {
        Definition::Domain => NodeKind::Domain,
        Definition::Problem => NodeKind::Problem,
    };
    Ok(SyntaxNode::new(kind, stream.span_from(start), children))
}

/// Open a section: `(` followed by its keyword, which is returned.
fn section_keyword(stream: &mut TokenStream) -> Result<(String, Span), ParseError> {
    stream.expect(Token::LParen)?;
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Keyword(keyword)) => Ok((keyword.to_string(), span)),
        other => Err(ParseError::unexpected_token(
            other,
            "where a section keyword was expected",
            span,
        )),
    }
}

fn parse_domain_section(stream: &mut TokenStream) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    let (keyword, keyword_span) = section_keyword(stream)?;

    let (kind, children) = match keyword.as_str() {
        ":requirements" => (NodeKind::Requirements, requirement_keys(stream)?),
        ":types" => (NodeKind::Types, typed_groups(stream)?),
        ":constants" => (NodeKind::Constants, typed_groups(stream)?),
        ":predicates" => {
            let mut skeletons = Vec::new();
            while stream.check(&Token::LParen) {
                skeletons.push(parse_skeleton(stream)?);
            }
            (NodeKind::Predicates, skeletons)
        }
        ":functions" => (NodeKind::Functions, function_groups(stream)?),
        ":constraints" => (
            NodeKind::Constraints,
            vec![parse_expr(stream, Position::Logical)?],
        ),
        ":action" => (NodeKind::Action, action_body(stream)?),
        ":durative-action" => (NodeKind::DurativeAction, durative_body(stream, start)?),
        ":derived" => {
            let skeleton = parse_skeleton(stream)?;
            let body = parse_expr(stream, Position::Logical)?;
            (NodeKind::Derived, vec![skeleton, body])
        }
        ":defined-predicate" => (NodeKind::DefinedPredicate, defined_body(stream, false)?),
        ":defined-function" => (NodeKind::DefinedFunction, defined_body(stream, true)?),
        other => {
            return Err(ParseError::invalid_syntax(
                format!("unknown domain section '{other}'"),
                keyword_span,
            ))
        }
    };

    stream.expect(Token::RParen)?;
    Ok(SyntaxNode::new(kind, stream.span_from(start), children))
}

fn parse_problem_section(stream: &mut TokenStream) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    let (keyword, keyword_span) = section_keyword(stream)?;

    let node = match keyword.as_str() {
        ":domain" => {
            let name = expect_name(stream, None)?;
            stream.expect(Token::RParen)?;
            return Ok(SyntaxNode::new(
                NodeKind::ProblemDomain,
                stream.span_from(start),
                vec![name],
            ));
        }
        ":requirements" => (NodeKind::Requirements, None, requirement_keys(stream)?),
        ":objects" => (NodeKind::Objects, None, typed_groups(stream)?),
        ":init" => (NodeKind::Init, None, operands(stream, Position::Logical)?),
        ":goal" => (
            NodeKind::Goal,
            None,
            vec![parse_expr(stream, Position::Logical)?],
        ),
        ":constraints" => (
            NodeKind::Constraints,
            None,
            vec![parse_expr(stream, Position::Logical)?],
        ),
        ":metric" => {
            let direction = expect_name(stream, None)?;
            if !matches!(direction.image(), "minimize" | "maximize") {
                return Err(ParseError::invalid_syntax(
                    format!(
                        "metric direction must be 'minimize' or 'maximize', found '{}'",
                        direction.image()
                    ),
                    direction.span,
                ));
            }
            let expression = parse_expr(stream, Position::Numeric)?;
            (
                NodeKind::Metric,
                Some(direction.image().to_string()),
                vec![expression],
            )
        }
        other => {
            return Err(ParseError::invalid_syntax(
                format!("unknown problem section '{other}'"),
                keyword_span,
            ))
        }
    };

    stream.expect(Token::RParen)?;
    let span = stream.span_from(start);
    Ok(match node {
        (kind, Some(image), children) => SyntaxNode::with_image(kind, image, span, children),
        (kind, None, children) => SyntaxNode::new(kind, span, children),
    })
}

fn requirement_keys(stream: &mut TokenStream) -> Result<Vec<SyntaxNode>, ParseError> {
    let mut keys = Vec::new();
    loop {
        let span = stream.current_span();
        match stream.peek() {
            Some(Token::Keyword(key)) => {
                keys.push(SyntaxNode::leaf(NodeKind::RequireKey, key.as_ref(), span));
                stream.advance();
            }
            Some(Token::RParen) | None => return Ok(keys),
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "where a requirement key was expected",
                    span,
                ))
            }
        }
    }
}

/// `(f ?x) (g) - number (h)` as function groups.
fn function_groups(stream: &mut TokenStream) -> Result<Vec<SyntaxNode>, ParseError> {
    let mut groups = Vec::new();
    let mut skeletons = Vec::new();
    let mut group_start = stream.current_pos();

    loop {
        let span = stream.current_span();
        match stream.peek() {
            Some(Token::LParen) => skeletons.push(parse_skeleton(stream)?),
            Some(Token::Minus) if !skeletons.is_empty() => {
                stream.advance();
                skeletons.push(parse_type_spec(stream)?);
                groups.push(SyntaxNode::new(
                    NodeKind::FunctionGroup,
                    stream.span_from(group_start),
                    std::mem::take(&mut skeletons),
                ));
                group_start = stream.current_pos();
            }
            Some(Token::RParen) | None => break,
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "in function declarations",
                    span,
                ))
            }
        }
    }

    if !skeletons.is_empty() {
        groups.push(SyntaxNode::new(
            NodeKind::FunctionGroup,
            stream.span_from(group_start),
            skeletons,
        ));
    }
    Ok(groups)
}

/// Keyword/value pairs of an action, in any order.
struct ActionParts {
    parameters: Option<SyntaxNode>,
    duration: Option<SyntaxNode>,
    precondition: Option<SyntaxNode>,
    condition: Option<SyntaxNode>,
    effect: Option<SyntaxNode>,
}

fn action_parts(stream: &mut TokenStream, durative: bool) -> Result<ActionParts, ParseError> {
    let mut parts = ActionParts {
        parameters: None,
        duration: None,
        precondition: None,
        condition: None,
        effect: None,
    };

    while !stream.at_end() && !stream.check(&Token::RParen) {
        let start = stream.current_pos();
        let span = stream.current_span();
        let keyword = match stream.advance() {
            Some(Token::Keyword(keyword)) => keyword.clone(),
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "where an action keyword was expected",
                    span,
                ))
            }
        };

        let (slot, kind) = match (keyword.as_ref(), durative) {
            (":parameters", _) => {
                parts.parameters = Some(parse_typed_list(stream, NodeKind::Parameters)?);
                continue;
            }
            (":precondition", false) => (&mut parts.precondition, NodeKind::Precondition),
            (":condition", true) => (&mut parts.condition, NodeKind::Condition),
            (":duration", true) => (&mut parts.duration, NodeKind::Duration),
            (":effect", _) => (&mut parts.effect, NodeKind::Effect),
            (other, _) => {
                return Err(ParseError::invalid_syntax(
                    format!("unexpected '{other}' in action definition"),
                    span,
                ))
            }
        };
        let body = parse_expr(stream, Position::Logical)?;
        *slot = Some(SyntaxNode::new(kind, stream.span_from(start), vec![body]));
    }
    Ok(parts)
}

/// Action name followed by its parts; an absent `:parameters` is empty.
fn action_head(stream: &mut TokenStream) -> Result<(SyntaxNode, SyntaxNode), ParseError> {
    let name = expect_name(stream, None)?;
    let parameters = SyntaxNode::new(NodeKind::Parameters, name.span, Vec::new());
    Ok((name, parameters))
}

fn action_body(stream: &mut TokenStream) -> Result<Vec<SyntaxNode>, ParseError> {
    let (name, empty) = action_head(stream)?;
    let parts = action_parts(stream, false)?;
    let mut children = vec![name, parts.parameters.unwrap_or(empty)];
    children.extend(parts.precondition);
    children.extend(parts.effect);
    Ok(children)
}

fn durative_body(stream: &mut TokenStream, start: usize) -> Result<Vec<SyntaxNode>, ParseError> {
    let (name, empty) = action_head(stream)?;
    let parts = action_parts(stream, true)?;
    let Some(duration) = parts.duration else {
        return Err(ParseError::invalid_syntax(
            format!("durative action '{}' has no :duration", name.image()),
            stream.span_from(start),
        ));
    };
    let mut children = vec![name, parts.parameters.unwrap_or(empty), duration];
    children.extend(parts.condition);
    children.extend(parts.effect);
    Ok(children)
}

/// Skeleton, optional `(:local-vars ...)`, body and, for functions, the
/// numeric result expression.
fn defined_body(stream: &mut TokenStream, function: bool) -> Result<Vec<SyntaxNode>, ParseError> {
    let mut children = vec![parse_skeleton(stream)?];

    if stream.check(&Token::LParen)
        && matches!(stream.peek_nth(1), Some(Token::Keyword(k)) if k.as_ref() == ":local-vars")
    {
        let start = stream.current_pos();
        stream.advance();
        stream.advance();
        let groups = typed_groups(stream)?;
        stream.expect(Token::RParen)?;
        children.push(SyntaxNode::new(
            NodeKind::LocalVars,
            stream.span_from(start),
            groups,
        ));
    }

    children.push(parse_expr(stream, Position::Logical)?);
    if function {
        children.push(parse_expr(stream, Position::Numeric)?);
    }
    Ok(children)
}

/// A name token, optionally a specific one.
fn expect_name(stream: &mut TokenStream, expected: Option<&str>) -> Result<SyntaxNode, ParseError> {
    let span = stream.current_span();
    match (stream.peek(), expected) {
        (Some(Token::Name(name)), None) => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span))
        }
        (Some(Token::Name(name)), Some(wanted)) if name.as_ref() == wanted => {
            stream.advance();
            Ok(SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span))
        }
        (found, Some(wanted)) => Err(ParseError::unexpected_token(
            found,
            &format!("where '{wanted}' was expected"),
            span,
        )),
        (found, None) => Err(ParseError::unexpected_token(
            found,
            "where a name was expected",
            span,
        )),
    }
}
