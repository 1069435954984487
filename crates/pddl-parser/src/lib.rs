//! Hand-written recursive descent recognizer for PDDL.
//!
//! Turns a token stream into [`SyntaxNode`](pddl_ast::SyntaxNode) trees with
//! the child layout documented in [`pddl_ast::syntax`]. The recognizer only
//! shapes s-expressions; requirement checks, symbol resolution and typing
//! happen in `pddl-resolve`.

pub mod parser;

pub use parser::{parse_expression, parse_file, ParseError, ParseErrorKind};

// Re-export lexer
pub use pddl_lexer::Token;
