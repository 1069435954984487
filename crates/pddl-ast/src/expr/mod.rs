//! Expression object model.
//!
//! Expressions are closed sum types, one per category:
//!
//! | Category | Type | Value |
//! |----------|------|-------|
//! | term | [`Term`] | [`Constant`] |
//! | numeric | [`NumericExp`] | `f64` |
//! | logical | [`LogicalExp`] | `bool` |
//! | effect | [`Effect`] | list of [`Update`]s |
//! | trajectory constraint | [`ConstraintExp`] | structural only |
//! | metric | [`Metric`] | `f64` |
//!
//! Every evaluable category offers:
//!
//! - `evaluate_open`: three-valued ([`Fuzzy`]) evaluation against an
//!   [`OpenWorld`](crate::world::OpenWorld); composites stop at the first
//!   sub-result that is not `Defined`, left to right
//! - `evaluate_closed`: two-valued evaluation against a
//!   [`ClosedWorld`](crate::world::ClosedWorld), failing with [`EvalError`]
//! - `simplify`: partial evaluation with read-only bindings, returning a
//!   value or a residual expression ([`Reduced`])
//! - `apply`: substitution of bound variables
//! - `standardize`: alpha-renaming
//!
//! and the structural contract: `is_ground`, `free_variables`, structural
//! equality, canonical ordering (see [`order`]) and `Display`.
//!
//! Nodes are immutable trees; every transformation rebuilds.

mod bindings;
mod constraint;
mod effect;
mod logical;
mod metric;
mod numeric;
pub mod order;
mod render;
mod term;
mod variable;

#[cfg(test)]
mod tests;

pub use bindings::{Bindings, Value};
pub use constraint::{ConstraintExp, ModalOp, TemporalOp};
pub use effect::{AssignOp, Effect, Update};
pub use logical::{CompareOp, LocalValue, LogicalExp, TimeSpec};
pub use metric::{Metric, Optimization};
pub use numeric::{ArithOp, NumericExp, UnaryOp};
pub use render::Render;
pub use term::{Constant, Term};
pub use variable::{Variable, VariableClass, VariableKind};

use crate::types::TypeLattice;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Three-valued evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Fuzzy<T> {
    /// A known value
    Defined(T),
    /// Not determined by the (incomplete) state
    Unknown,
    /// Known to have no value (e.g. an unassigned fluent)
    Undefined,
}

impl<T> Fuzzy<T> {
    pub fn is_defined(&self) -> bool {
        matches!(self, Fuzzy::Defined(_))
    }

    pub fn defined(self) -> Option<T> {
        match self {
            Fuzzy::Defined(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fuzzy<U> {
        match self {
            Fuzzy::Defined(v) => Fuzzy::Defined(f(v)),
            Fuzzy::Unknown => Fuzzy::Unknown,
            Fuzzy::Undefined => Fuzzy::Undefined,
        }
    }
}

/// Result of partial evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced<T, E> {
    /// Fully evaluated
    Value(T),
    /// Evaluates to `Undefined` in this state
    Undefined,
    /// What is left to evaluate
    Residual(E),
}

/// Evaluation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Arithmetic produced NaN or an infinity
    #[error("numeric domain error: {0}")]
    Numeric(String),
    #[error("variable {0} is not bound")]
    Unbound(String),
    #[error("variable {name} is bound to a {found} value, expected {expected}")]
    BindingKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Closed-world lookup of a fluent without a value
    #[error("{0} is undefined in this state")]
    Undefined(String),
    #[error("no formula named '{0}'")]
    UnknownFormula(String),
    #[error("goal modality needs a problem goal")]
    NoGoal,
    #[error("evaluation of '{0}' exceeded the recursion limit")]
    Recursion(String),
}

/// Which category `parse_expression` should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExpressionCategory {
    Logical,
    Numeric,
    Term,
    Effect,
    Constraint,
}

/// An expression of any category.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Logical(LogicalExp),
    Numeric(NumericExp),
    Term(Term),
    Effect(Effect),
    Constraint(ConstraintExp),
}

impl Expression {
    pub fn category(&self) -> ExpressionCategory {
        match self {
            Expression::Logical(_) => ExpressionCategory::Logical,
            Expression::Numeric(_) => ExpressionCategory::Numeric,
            Expression::Term(_) => ExpressionCategory::Term,
            Expression::Effect(_) => ExpressionCategory::Effect,
            Expression::Constraint(_) => ExpressionCategory::Constraint,
        }
    }

    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        match self {
            Expression::Logical(e) => e.collect_free(&mut out),
            Expression::Numeric(e) => e.collect_free(&mut out),
            Expression::Term(e) => e.collect_free(&mut out),
            Expression::Effect(e) => e.collect_free(&mut out),
            Expression::Constraint(e) => e.collect_free(&mut out),
        }
        out
    }

    pub fn is_ground(&self) -> bool {
        self.free_variables().is_empty()
    }

    pub fn as_logical(&self) -> Option<&LogicalExp> {
        match self {
            Expression::Logical(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericExp> {
        match self {
            Expression::Numeric(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_effect(&self) -> Option<&Effect> {
        match self {
            Expression::Effect(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Logical(e) => e.fmt(f),
            Expression::Numeric(e) => e.fmt(f),
            Expression::Term(e) => e.fmt(f),
            Expression::Effect(e) => e.fmt(f),
            Expression::Constraint(e) => e.fmt(f),
        }
    }
}

/// Unwrap a `Defined` result or return the non-defined one from the
/// enclosing open-world evaluation.
macro_rules! defined {
    ($eval:expr) => {
        match $eval? {
            $crate::expr::Fuzzy::Defined(value) => value,
            $crate::expr::Fuzzy::Unknown => return Ok($crate::expr::Fuzzy::Unknown),
            $crate::expr::Fuzzy::Undefined => return Ok($crate::expr::Fuzzy::Undefined),
        }
    };
}
pub(crate) use defined;

/// Run `f` once per instantiation of `vars` over their type domains.
///
/// Bindings are pushed before each call and removed afterwards. `f` returns
/// `Some` to stop early; that value is returned.
pub(crate) fn for_each_instance<R>(
    lattice: &TypeLattice,
    vars: &[Variable],
    bindings: &mut Bindings,
    mut f: impl FnMut(&mut Bindings) -> Result<Option<R>, EvalError>,
) -> Result<Option<R>, EvalError> {
    let domains: Vec<Vec<Constant>> = vars
        .iter()
        .map(|v| lattice.domain_of(v.types()))
        .collect();
    if domains.iter().any(Vec::is_empty) {
        return Ok(None);
    }

    let mut cursor = vec![0usize; vars.len()];
    loop {
        let mark = bindings.mark();
        for (var, (domain, &index)) in vars.iter().zip(domains.iter().zip(&cursor)) {
            bindings.bind(var.name.clone(), Value::Object(domain[index].clone()));
        }
        let outcome = f(bindings);
        bindings.truncate(mark);
        if let Some(result) = outcome? {
            return Ok(Some(result));
        }

        // odometer increment, last variable fastest
        let mut position = vars.len();
        loop {
            if position == 0 {
                return Ok(None);
            }
            position -= 1;
            cursor[position] += 1;
            if cursor[position] < domains[position].len() {
                break;
            }
            cursor[position] = 0;
        }
    }
}

/// Turn a trial open-world evaluation into a simplification result.
///
/// `Unknown` and unbound variables leave `residual()` behind.
pub(crate) fn attempt<T, E>(
    outcome: Result<Fuzzy<T>, EvalError>,
    residual: impl FnOnce() -> E,
) -> Result<Reduced<T, E>, EvalError> {
    match outcome {
        Ok(Fuzzy::Defined(value)) => Ok(Reduced::Value(value)),
        Ok(Fuzzy::Undefined) => Ok(Reduced::Undefined),
        Ok(Fuzzy::Unknown) | Err(EvalError::Unbound(_)) => Ok(Reduced::Residual(residual())),
        Err(err) => Err(err),
    }
}

/// Simplified operand list of a strict operator.
pub(crate) enum Operands<T, E> {
    Values(Vec<T>),
    Undefined,
    Residual(Vec<E>),
}

/// Simplify operands left to right the way open evaluation visits them.
///
/// Before the first residual, `Undefined` and errors decide the outcome.
/// After it, evaluation would have stopped at the residual, so such operands
/// are kept unsimplified.
pub(crate) fn simplify_operands<T, E: Clone>(
    items: &[E],
    mut simplify: impl FnMut(&E) -> Result<Reduced<T, E>, EvalError>,
    lift: impl Fn(T) -> E,
) -> Result<Operands<T, E>, EvalError> {
    let mut values = Vec::with_capacity(items.len());
    let mut residual: Option<Vec<E>> = None;
    for item in items {
        match residual.as_mut() {
            None => match simplify(item)? {
                Reduced::Value(v) => values.push(v),
                Reduced::Undefined => return Ok(Operands::Undefined),
                Reduced::Residual(r) => {
                    let mut out: Vec<E> = values.drain(..).map(&lift).collect();
                    out.push(r);
                    residual = Some(out);
                }
            },
            Some(out) => match simplify(item) {
                Ok(Reduced::Value(v)) => out.push(lift(v)),
                Ok(Reduced::Residual(r)) => out.push(r),
                Ok(Reduced::Undefined) | Err(_) => out.push(item.clone()),
            },
        }
    }
    Ok(match residual {
        Some(out) => Operands::Residual(out),
        None => Operands::Values(values),
    })
}

/// Reject non-finite arithmetic results.
pub(crate) fn finite(value: f64, what: &str) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::Numeric(format!("{what} produced {value}")))
    }
}
