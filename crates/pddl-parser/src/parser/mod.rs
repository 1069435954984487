//! Recursive descent recognizer producing [`SyntaxNode`] trees.
//!
//! The recognizer checks shape only: parenthesization, section keywords,
//! typed-list structure. Names are not looked up and requirements are not
//! consulted; both belong to the resolver, which receives the node tree
//! described in [`pddl_ast::syntax`].
//!
//! # Design
//!
//! - Input is the token vector from `pddl_lexer`, each token paired with
//!   its byte range
//! - One error per malformed section; the section is skipped and parsing
//!   resumes at the next one
//! - An error in a `(define ...)` header stops the file

mod error;
mod expr;
mod sections;
mod stream;
mod typed;

pub use error::{ParseError, ParseErrorKind};

use expr::Position;
use pddl_ast::{SourceFile, SyntaxNode};
use pddl_lexer::Token;
use std::ops::Range;
use stream::TokenStream;
use tracing::trace;

/// Recognize every `(define ...)` form in a lexed file.
pub fn parse_file(
    tokens: &[(Token, Range<usize>)],
    file: &SourceFile,
    file_id: u16,
) -> Result<Vec<SyntaxNode>, Vec<ParseError>> {
    let mut stream = TokenStream::new(tokens, file, file_id);
    let definitions = sections::parse_definitions(&mut stream)?;
    trace!(count = definitions.len(), "recognized definitions");
    Ok(definitions)
}

/// Recognize one standalone expression, consuming all tokens.
pub fn parse_expression(
    tokens: &[(Token, Range<usize>)],
    file: &SourceFile,
    file_id: u16,
) -> Result<SyntaxNode, Vec<ParseError>> {
    let mut stream = TokenStream::new(tokens, file, file_id);
    let node = expr::parse_expr(&mut stream, Position::Logical).map_err(|e| vec![e])?;
    if !stream.at_end() {
        return Err(vec![ParseError::unexpected_token(
            stream.peek(),
            "after the end of the expression",
            stream.current_span(),
        )]);
    }
    Ok(node)
}
