// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for PDDL.
//!
//! Tokenization of domain and problem files using logos.
//!
//! # Design
//!
//! - `Token`: parentheses, operators, keywords, variables, names and numbers
//! - `;` comments and whitespace are skipped (not tokens)
//! - PDDL is case-insensitive: names, keywords and variables are lowered
//!   while lexing, so later stages compare plain strings
//! - `@` is not a name character; generated names use it to stay clear of
//!   user symbols
//!
//! # Examples
//!
//! ```
//! # use pddl_lexer::Token;
//! # use logos::Logos;
//! let tokens: Vec<Result<Token, ()>> = Token::lexer("(on ?x B)").collect();
//! assert_eq!(tokens.len(), 5);
//! ```

use logos::{Lexer, Logos};
use std::fmt;
use std::rc::Rc;

/// PDDL token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // === Operators ===
    /// `-`: typed-list separator and subtraction
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token("=")]
    Eq,
    #[token(">=")]
    Ge,
    #[token(">")]
    Gt,
    /// TLPlan local assignment `:=`
    #[token(":=")]
    Assign,

    /// Continuous time `#t`
    #[token("#t", ignore(ascii_case))]
    Time,

    // === Data ===
    /// Numeric literal, optionally signed
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", number)]
    Number(f64),

    /// `?name`
    #[regex(r"\?[a-zA-Z][a-zA-Z0-9_\-]*", lowered)]
    Variable(Rc<str>),

    /// `:name`, section and requirement keywords
    #[regex(r":[a-zA-Z][a-zA-Z0-9_\-]*", lowered)]
    Keyword(Rc<str>),

    #[regex(r"[a-zA-Z][a-zA-Z0-9_\-]*", lowered)]
    Name(Rc<str>),
}

fn number(lex: &mut Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn lowered(lex: &mut Lexer<Token>) -> Rc<str> {
    Rc::from(lex.slice().to_ascii_lowercase())
}

impl Token {
    /// Text of a name, keyword or variable token.
    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Name(s) | Token::Keyword(s) | Token::Variable(s) => Some(s),
            _ => None,
        }
    }

    /// Image of an operator token, as used for node images.
    pub fn operator(&self) -> Option<&'static str> {
        Some(match self {
            Token::Minus => "-",
            Token::Plus => "+",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Caret => "^",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Eq => "=",
            Token::Ge => ">=",
            Token::Gt => ">",
            Token::Assign => ":=",
            _ => return None,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Time => f.write_str("#t"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Variable(s) | Token::Keyword(s) | Token::Name(s) => f.write_str(s),
            other => f.write_str(other.operator().unwrap_or("?")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source).filter_map(|result| result.ok()).collect()
    }

    fn name(s: &str) -> Token {
        Token::Name(Rc::from(s))
    }

    fn keyword(s: &str) -> Token {
        Token::Keyword(Rc::from(s))
    }

    fn variable(s: &str) -> Token {
        Token::Variable(Rc::from(s))
    }

    #[test]
    fn test_atom() {
        assert_eq!(
            lex("(on ?x b)"),
            vec![
                Token::LParen,
                name("on"),
                variable("?x"),
                name("b"),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_case_is_folded() {
        assert_eq!(
            lex("(:Requirements :STRIPS) ?Obj Truck-1"),
            vec![
                Token::LParen,
                keyword(":requirements"),
                keyword(":strips"),
                Token::RParen,
                variable("?obj"),
                name("truck-1"),
            ]
        );
    }

    #[test]
    fn test_typed_list_separator_is_not_a_number() {
        assert_eq!(
            lex("a b - block"),
            vec![name("a"), name("b"), Token::Minus, name("block")]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 2.5 -3 1e3"),
            vec![
                Token::Number(42.0),
                Token::Number(2.5),
                Token::Number(-3.0),
                Token::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("< <= = >= > := + * / ^ #t"),
            vec![
                Token::Lt,
                Token::Le,
                Token::Eq,
                Token::Ge,
                Token::Gt,
                Token::Assign,
                Token::Plus,
                Token::Star,
                Token::Slash,
                Token::Caret,
                Token::Time,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "; header\n(and ; trailing\n p)";
        assert_eq!(
            lex(source),
            vec![Token::LParen, name("and"), name("p"), Token::RParen]
        );
    }

    #[test]
    fn test_invalid_character_is_an_error() {
        let results: Vec<_> = Token::lexer("(p @q)").collect();
        assert!(results.iter().any(Result::is_err));
    }

    #[test]
    fn test_display_round_trips_images() {
        let text: Vec<String> = lex("(<= ?d 3)").iter().map(Token::to_string).collect();
        assert_eq!(text, vec!["(", "<=", "?d", "3", ")"]);
    }
}
