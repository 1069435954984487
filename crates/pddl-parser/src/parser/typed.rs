//! Typed lists, type specifications and atomic skeletons.

use super::{ParseError, TokenStream};
use pddl_ast::{NodeKind, SyntaxNode};
use pddl_lexer::Token;

/// `( item* [- type] ... )` as `kind[TypedGroup*]`.
pub(super) fn parse_typed_list(
    stream: &mut TokenStream,
    kind: NodeKind,
) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::LParen)?;
    let groups = typed_groups(stream)?;
    stream.expect(Token::RParen)?;
    Ok(SyntaxNode::new(kind, stream.span_from(start), groups))
}

/// Typed groups up to (not including) the closing `)`.
///
/// `a b - t c` yields two groups: `[a, b, TypeSpec(t)]` and the untyped `[c]`.
pub(super) fn typed_groups(stream: &mut TokenStream) -> Result<Vec<SyntaxNode>, ParseError> {
    let mut groups = Vec::new();
    let mut items = Vec::new();
    let mut group_start = stream.current_pos();

    loop {
        let span = stream.current_span();
        match stream.peek() {
            None | Some(Token::RParen) => break,
            Some(Token::Name(name)) => {
                items.push(SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span));
                stream.advance();
            }
            Some(Token::Variable(name)) => {
                items.push(SyntaxNode::leaf(NodeKind::Variable, name.as_ref(), span));
                stream.advance();
            }
            Some(Token::Minus) => {
                if items.is_empty() {
                    return Err(ParseError::invalid_syntax(
                        "type given without names to apply it to",
                        span,
                    ));
                }
                stream.advance();
                items.push(parse_type_spec(stream)?);
                groups.push(SyntaxNode::new(
                    NodeKind::TypedGroup,
                    stream.span_from(group_start),
                    std::mem::take(&mut items),
                ));
                group_start = stream.current_pos();
            }
            other => {
                return Err(ParseError::unexpected_token(other, "in typed list", span));
            }
        }
    }

    if !items.is_empty() {
        groups.push(SyntaxNode::new(
            NodeKind::TypedGroup,
            stream.span_from(group_start),
            items,
        ));
    }
    Ok(groups)
}

/// `name` or `(either name+)`.
pub(super) fn parse_type_spec(stream: &mut TokenStream) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    let span = stream.current_span();
    match stream.peek() {
        Some(Token::Name(name)) => {
            stream.advance();
            let leaf = SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span);
            Ok(SyntaxNode::new(NodeKind::TypeSpec, span, vec![leaf]))
        }
        Some(Token::LParen) => {
            stream.advance();
            match stream.advance() {
                Some(Token::Name(head)) if head.as_ref() == "either" => {}
                other => {
                    return Err(ParseError::unexpected_token(
                        other,
                        "where 'either' was expected",
                        stream.span_from(start),
                    ))
                }
            }
            let mut members = Vec::new();
            while let Some(Token::Name(name)) = stream.peek() {
                members.push(SyntaxNode::leaf(
                    NodeKind::Name,
                    name.as_ref(),
                    stream.current_span(),
                ));
                stream.advance();
            }
            stream.expect(Token::RParen)?;
            if members.is_empty() {
                return Err(ParseError::invalid_syntax(
                    "'either' needs at least one type",
                    stream.span_from(start),
                ));
            }
            Ok(SyntaxNode::with_image(
                NodeKind::TypeSpec,
                "either",
                stream.span_from(start),
                members,
            ))
        }
        other => Err(ParseError::unexpected_token(
            other,
            "where a type was expected",
            span,
        )),
    }
}

/// `(name typed-groups)`.
pub(super) fn parse_skeleton(stream: &mut TokenStream) -> Result<SyntaxNode, ParseError> {
    let start = stream.current_pos();
    stream.expect(Token::LParen)?;
    let span = stream.current_span();
    let name = match stream.advance() {
        Some(Token::Name(name)) => SyntaxNode::leaf(NodeKind::Name, name.as_ref(), span),
        other => {
            return Err(ParseError::unexpected_token(
                other,
                "where a predicate or function name was expected",
                span,
            ))
        }
    };
    let mut children = vec![name];
    children.extend(typed_groups(stream)?);
    stream.expect(Token::RParen)?;
    Ok(SyntaxNode::new(
        NodeKind::AtomicSkeleton,
        stream.span_from(start),
        children,
    ))
}
