//! Parse error types.

use pddl_ast::foundation::Span;
use pddl_lexer::Token;
use std::fmt;

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token was expected but another one was found.
    UnexpectedToken,
    /// Input ended inside an unfinished construct, typically an unclosed `(`.
    UnexpectedEof,
    /// Tokens are present but do not form a valid construct.
    InvalidSyntax,
}

impl ParseError {
    /// Create an "expected token" error.
    pub fn expected_token(expected: &Token, found: Option<&Token>, span: Span) -> Self {
        match found {
            Some(token) => Self {
                kind: ParseErrorKind::UnexpectedToken,
                span,
                message: format!("expected '{expected}', found '{token}'"),
            },
            None => Self::eof(&format!("expected '{expected}'"), span),
        }
    }

    /// Create an "unexpected token" error.
    pub fn unexpected_token(found: Option<&Token>, context: &str, span: Span) -> Self {
        match found {
            Some(token) => Self {
                kind: ParseErrorKind::UnexpectedToken,
                span,
                message: format!("unexpected '{token}' {context}"),
            },
            None => Self::eof(context, span),
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    fn eof(context: &str, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedEof,
            span,
            message: format!("unexpected end of input, {context}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}
