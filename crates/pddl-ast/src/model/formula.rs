use crate::expr::{LogicalExp, NumericExp, Variable};
use crate::foundation::Span;
use crate::types::TypeSetId;
use indexmap::IndexMap;
use std::fmt;

/// Formulas by name, in declaration order.
pub type FormulaTable = IndexMap<String, RootFormula>;

/// Name and typed parameters of a declared formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Variable>,
    pub span: Span,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<Variable>, span: Span) -> Self {
        Self {
            name: name.into(),
            params,
            span,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// What an application of a formula produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaClass {
    Predicate,
    Numeric,
    Object,
}

impl fmt::Display for FormulaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormulaClass::Predicate => "predicate",
            FormulaClass::Numeric => "numeric function",
            FormulaClass::Object => "object function",
        })
    }
}

/// A declared predicate or function.
#[derive(Debug, Clone, PartialEq)]
pub enum RootFormula {
    Predicate(Signature),
    NumericFluent(Signature),
    ObjectFluent {
        signature: Signature,
        result: TypeSetId,
    },
    /// `:derived` predicate; several rules are merged into one body
    Derived {
        signature: Signature,
        body: LogicalExp,
    },
    /// TLPlan defined predicate
    DefinedPredicate {
        signature: Signature,
        locals: Vec<Variable>,
        body: LogicalExp,
    },
    /// TLPlan defined function; `body` runs first, then `result` is read
    DefinedFunction {
        signature: Signature,
        locals: Vec<Variable>,
        body: LogicalExp,
        result: NumericExp,
    },
}

impl RootFormula {
    /// Nullary numeric fluent counting violations of a preference.
    pub fn counter(name: impl Into<String>) -> Self {
        RootFormula::NumericFluent(Signature::new(name, Vec::new(), Span::default()))
    }

    pub fn signature(&self) -> &Signature {
        match self {
            RootFormula::Predicate(s) | RootFormula::NumericFluent(s) => s,
            RootFormula::ObjectFluent { signature, .. }
            | RootFormula::Derived { signature, .. }
            | RootFormula::DefinedPredicate { signature, .. }
            | RootFormula::DefinedFunction { signature, .. } => signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature().name
    }

    pub fn class(&self) -> FormulaClass {
        match self {
            RootFormula::Predicate(_)
            | RootFormula::Derived { .. }
            | RootFormula::DefinedPredicate { .. } => FormulaClass::Predicate,
            RootFormula::NumericFluent(_) | RootFormula::DefinedFunction { .. } => {
                FormulaClass::Numeric
            }
            RootFormula::ObjectFluent { .. } => FormulaClass::Object,
        }
    }

    /// Human-readable kind for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            RootFormula::Predicate(_) => "predicate",
            RootFormula::NumericFluent(_) => "numeric function",
            RootFormula::ObjectFluent { .. } => "object function",
            RootFormula::Derived { .. } => "derived predicate",
            RootFormula::DefinedPredicate { .. } => "defined predicate",
            RootFormula::DefinedFunction { .. } => "defined function",
        }
    }

    /// Defined through TLPlan `def-defined-*`.
    pub fn is_defined(&self) -> bool {
        matches!(
            self,
            RootFormula::DefinedPredicate { .. } | RootFormula::DefinedFunction { .. }
        )
    }
}
