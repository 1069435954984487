//! Construction context.
//!
//! [`SemanticContext`] owns everything a construction pass mutates: the
//! object under construction (and through it the symbol tables), the scope
//! stack, the unique-name counter and the preference bookkeeping. It
//! borrows the diagnostics collector, so one collector can span a domain,
//! its problem and the link step.

use super::scope::{Lookup, ScopeStack};
use enumset::EnumSet;
use pddl_ast::expr::{TimeSpec, VariableClass};
use pddl_ast::model::{declare_counter, OverallPreference, RootFormula};
use pddl_ast::{
    CompileError, Constant, Diagnostics, Effect, ErrorKind, PddlObject, Requirement, Span,
    TypeLattice, Variable,
};
use std::sync::Arc;

/// Where a condition is being resolved; decides what a `preference` means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Site {
    /// Action precondition, or a timed condition of a durative action
    Precondition {
        action: String,
        at: Option<TimeSpec>,
    },
    Goal,
    /// State formula inside a trajectory constraint
    Constraint,
    /// Derived and defined bodies, standalone expressions
    Body,
}

pub struct SemanticContext<'a> {
    pub(crate) object: PddlObject,
    /// Domain a problem or expression is resolved against
    pub(crate) domain: Option<&'a PddlObject>,
    pub(crate) diagnostics: &'a mut Diagnostics,
    pub(crate) accepted: EnumSet<Requirement>,
    pub(crate) scopes: ScopeStack,
    pub(crate) site: Site,
    /// Inside a durative action: `?duration` is available
    pub(crate) durative: bool,
    /// Set when `#t` is resolved, cleared by whoever inspects it
    pub(crate) saw_time: bool,
    pub(crate) in_preference: bool,
    /// Violation effects produced by precondition preferences
    pub(crate) pending_effects: Vec<(Option<TimeSpec>, Effect)>,
    pub(crate) pending_overall: Vec<OverallPreference>,
    /// `is-violated` references, checked once all preferences are known
    pub(crate) violated_refs: Vec<(String, Span)>,
    unique: usize,
}

impl<'a> SemanticContext<'a> {
    pub fn new(
        object: PddlObject,
        domain: Option<&'a PddlObject>,
        diagnostics: &'a mut Diagnostics,
        accepted: EnumSet<Requirement>,
    ) -> Self {
        // continue numbering after the domain's unnamed preferences
        let unique = domain.map_or(0, |d| {
            d.preferences
                .groups()
                .filter(|(name, _)| name.starts_with("unnamed@"))
                .count()
        });
        Self {
            object,
            domain,
            diagnostics,
            accepted,
            scopes: ScopeStack::new(),
            site: Site::Body,
            durative: false,
            saw_time: false,
            in_preference: false,
            pending_effects: Vec::new(),
            pending_overall: Vec::new(),
            violated_refs: Vec::new(),
            unique,
        }
    }

    pub fn finish(self) -> PddlObject {
        self.object
    }

    // === Diagnostics ===

    pub(crate) fn error(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        self.diagnostics.error(kind, span, message);
    }

    pub(crate) fn warning(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        self.diagnostics.warning(kind, span, message);
    }

    pub(crate) fn push(&mut self, error: CompileError) {
        self.diagnostics.push(error);
    }

    /// Report `what` unless `requirement` is active.
    pub(crate) fn require(&mut self, requirement: Requirement, span: Span, what: &str) {
        if !self.object.requirements.contains(requirement) {
            self.error(
                ErrorKind::MissingRequirement,
                span,
                format!("{what} requires {requirement}"),
            );
        }
    }

    /// Report `what` unless one of `requirements` is active.
    pub(crate) fn require_any(
        &mut self,
        requirements: EnumSet<Requirement>,
        span: Span,
        what: &str,
    ) {
        if !self.object.requirements.contains_any(requirements) {
            let keys: Vec<&str> = requirements.iter().map(Requirement::key).collect();
            self.error(
                ErrorKind::MissingRequirement,
                span,
                format!("{what} requires one of {}", keys.join(" ")),
            );
        }
    }

    // === Symbols ===

    pub(crate) fn fresh(&mut self) -> usize {
        let n = self.unique;
        self.unique += 1;
        n
    }

    pub(crate) fn lattice(&self) -> &TypeLattice {
        &self.object.lattice
    }

    /// Copy-on-write access; a problem copies its domain's lattice only
    /// when it interns a set the domain never used.
    pub(crate) fn lattice_mut(&mut self) -> &mut TypeLattice {
        Arc::make_mut(&mut self.object.lattice)
    }

    pub(crate) fn formula(&self, name: &str) -> Option<&RootFormula> {
        self.object.formulas.get(name)
    }

    pub(crate) fn insert_formula(&mut self, formula: RootFormula) {
        Arc::make_mut(&mut self.object.formulas).insert(formula.name().to_string(), formula);
    }

    pub(crate) fn declare_counter(&mut self, counter: &str) {
        declare_counter(&mut self.object.formulas, counter);
    }

    /// A constant of this unit or of the domain it is resolved against.
    pub(crate) fn constant(&self, name: &str) -> Option<&Constant> {
        self.object
            .constant(name)
            .or_else(|| self.domain.and_then(|d| d.constant(name)))
    }

    /// Report names a new scope rejected because they are already active.
    pub(crate) fn report_shadowed(&mut self, rejected: Vec<Variable>, span: Span) {
        for var in rejected {
            self.error(
                ErrorKind::DuplicateName,
                span,
                format!("variable {} is already bound in an enclosing scope", var.name),
            );
        }
    }

    pub(crate) fn push_scope(&mut self, vars: &[Variable], span: Span) {
        let rejected = self.scopes.push(vars);
        self.report_shadowed(rejected, span);
    }

    pub(crate) fn push_quantified(&mut self, vars: &[Variable], span: Span) {
        let rejected = self.scopes.push_quantified(vars);
        self.report_shadowed(rejected, span);
    }

    /// Resolve a variable of class `expected`, reporting a missing or
    /// mismatched one and returning a placeholder of that class.
    pub(crate) fn variable(&mut self, name: &str, expected: VariableClass, span: Span) -> Variable {
        match self.scopes.lookup(name, expected) {
            Lookup::Found(var) => var,
            Lookup::Missing => {
                self.error(
                    ErrorKind::UndefinedName,
                    span,
                    format!("variable {name} is not bound here"),
                );
                placeholder(name, expected)
            }
            Lookup::WrongKind(found) => {
                self.error(
                    ErrorKind::WrongKind,
                    span,
                    format!(
                        "variable {name} is {}, expected {expected}",
                        found.class()
                    ),
                );
                placeholder(name, expected)
            }
        }
    }

    /// Duplicate declaration with a pointer to the first one.
    pub(crate) fn duplicate(&mut self, what: &str, name: &str, span: Span, first: Span) {
        let error = CompileError::new(
            ErrorKind::DuplicateName,
            span,
            format!("{what} '{name}' is already declared"),
        )
        .in_phase(self.diagnostics.phase())
        .with_label(first, "first declared here".to_string());
        self.push(error);
    }
}

fn placeholder(name: &str, class: VariableClass) -> Variable {
    use pddl_ast::{TypeSetId, VariableKind};
    let kind = match class {
        VariableClass::Object => VariableKind::Object(TypeSetId::OBJECT),
        VariableClass::Numeric => VariableKind::NumericLocal,
        VariableClass::Boolean => VariableKind::BooleanLocal,
    };
    Variable::new(name, kind)
}
