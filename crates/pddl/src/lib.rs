// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # PDDL semantic compiler
//!
//! Compiles PDDL domains and problems, including the TLPlan extensions,
//! into validated [`PddlObject`] models ready for a planning engine.
//!
//! This crate is a facade over:
//! - `pddl-ast` - model, type lattice, expressions and diagnostics
//! - `pddl-lexer` - tokenization
//! - `pddl-parser` - recognition into syntax nodes
//! - `pddl-resolve` - semantic construction and linking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pddl::{parse_files, ParseOptions};
//! use std::path::Path;
//!
//! let compilation = parse_files(
//!     Path::new("domain.pddl"),
//!     Path::new("problem.pddl"),
//!     &ParseOptions::default(),
//! )?;
//! let model = compilation.linked.expect("linked model");
//! ```

// Re-export the model
pub use pddl_ast::{self as ast, *};

pub use pddl_lexer as lexer;
pub use pddl_lexer::Token;

pub use pddl_parser as parser;
pub use pddl_parser::{ParseError, ParseErrorKind};

pub use pddl_resolve as resolve;
pub use pddl_resolve::{link, FatalError};

pub mod compile;

pub use compile::{
    parse_expression, parse_file, parse_files, parse_source, Compilation, ParseOptions, PddlError,
};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
