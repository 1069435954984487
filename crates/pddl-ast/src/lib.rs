// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Semantic model for PDDL and its TLPlan extensions.
//!
//! This crate holds everything the semantic compiler produces and everything
//! a planning engine consumes:
//!
//! - [`foundation`]: spans, source map, requirement keys
//! - [`error`] / [`diagnostics`]: categorized, recoverable diagnostics
//! - [`syntax`]: the node-shaped contract every grammar recognizer satisfies
//! - [`types`]: the multi-parent type lattice and interned type sets
//! - [`expr`]: terms, numeric/logical expressions, effects, constraints, metric
//! - [`world`]: open/closed world views expressions are evaluated against
//! - [`model`]: the `PddlObject` aggregate (domain, partial or full problem)
//!
//! The resolver in `pddl-resolve` builds these values from syntax nodes.

pub mod diagnostics;
pub mod error;
pub mod expr;
pub mod foundation;
pub mod model;
pub mod syntax;
pub mod types;
pub mod world;

pub use diagnostics::Diagnostics;
pub use error::{Category, CompileError, DiagnosticFormatter, ErrorKind, Phase, Severity};
pub use expr::{
    Bindings, Constant, ConstraintExp, Effect, EvalError, Expression, ExpressionCategory, Fuzzy,
    LogicalExp, Metric, NumericExp, Reduced, Term, Value, Variable, VariableKind,
};
pub use foundation::{Requirement, RequirementSet, SourceFile, SourceMap, Span};
pub use model::{ContentKind, PddlObject};
pub use syntax::{NodeKind, SyntaxNode};
pub use types::{TypeError, TypeId, TypeLattice, TypeSetId};
pub use world::{ClosedWorld, GroundAtom, OpenWorld, Universe, WorldState, WorldView};
