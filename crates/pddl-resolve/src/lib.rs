// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Semantic construction and linking of PDDL domains and problems.
//!
//! This crate turns the syntax tree produced by `pddl-parser` into
//! [`PddlObject`](pddl_ast::PddlObject) models: it resolves names against
//! scoped symbol tables, enforces requirement gating, type-checks
//! arguments, assembles durative actions and records preferences. Linking
//! merges a domain and a problem into a full model.

pub mod error;
pub mod resolve;

pub use error::{FatalError, Result};
pub use resolve::{link, resolve_domain, resolve_expression, resolve_problem};
