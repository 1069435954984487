//! Token stream wrapper for the recognizer.

use super::ParseError;
use pddl_ast::foundation::{SourceFile, Span};
use pddl_lexer::Token;
use std::ops::Range;

/// Token stream with lookahead and position tracking.
///
/// Each token is paired with its byte range in the source; spans carry the
/// 1-based line/column computed from the file's line index.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    file: &'src SourceFile,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [(Token, Range<usize>)], file: &'src SourceFile, file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            file_id,
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&'src Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<&'src Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Advance to the next token and return the current one.
    pub fn advance(&mut self) -> Option<&'src Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token has the same variant as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Expect a token of the same variant and advance past it.
    pub fn expect(&mut self, expected: Token) -> Result<Span, ParseError> {
        if self.check(&expected) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::expected_token(
                &expected,
                self.peek(),
                self.current_span(),
            ))
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Rewind (or jump) to a position previously returned by `current_pos`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    /// Span from the token at `start` to the last consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        let Some((_, first)) = self.tokens.get(start) else {
            return self.current_span();
        };
        let end = match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, last)) if self.pos > start => last.end,
            _ => first.end,
        };
        self.span(first.start, end)
    }

    /// Span of the current token, or an empty span at EOF.
    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some((_, range)) if self.pos < self.tokens.len() => self.span(range.start, range.end),
            Some((_, range)) => self.span(range.end, range.end),
            None => Span::zero(self.file_id),
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.file.line_col(start as u32);
        Span::new(self.file_id, start as u32, end as u32, line, column)
    }

    /// Skip to just past the `)` closing the list we are inside.
    ///
    /// Used for recovery after an error in a section or expression.
    pub fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.advance() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => return,
                Token::RParen => depth -= 1,
                _ => {}
            }
        }
    }
}
