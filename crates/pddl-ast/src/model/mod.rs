//! The compiled model.
//!
//! [`PddlObject`] is the aggregate root for a domain, a problem resolved
//! against its domain, or the full problem produced by linking the two.
//! Large tables (lattice, formulas, actions) sit behind [`Arc`]s so a linked
//! problem shares them with its domain; [`preprocess`](PddlObject::preprocess)
//! copies them on write.

mod action;
mod formula;
mod preference;
mod preprocess;

pub use action::{
    Action, ActionDef, DurationConstraint, DurativeAction, OverallPreference, TimedBuckets,
};
pub use formula::{FormulaClass, FormulaTable, RootFormula, Signature};
pub use preference::{
    counter_name, PreferenceBody, PreferenceGroup, PreferenceInstance, PreferenceSite,
    PreferenceTable,
};
pub use preprocess::{declare_counter, violation_effect};

use crate::expr::{Constant, ConstraintExp, LogicalExp, Metric};
use crate::foundation::{RequirementSet, Span};
use crate::types::TypeLattice;
use crate::world::{GroundAtom, Universe};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// What a [`PddlObject`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Domain,
    /// A problem resolved against its domain, not yet linked
    PartialProblem,
    /// Domain and problem linked into one model
    FullProblem,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Domain => "domain",
            ContentKind::PartialProblem => "problem",
            ContentKind::FullProblem => "linked problem",
        })
    }
}

/// A constant with the place it was declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDecl {
    pub constant: Constant,
    pub span: Span,
    pub file: String,
}

/// One element of `:init`.
#[derive(Debug, Clone, PartialEq)]
pub enum InitElement {
    Fact(GroundAtom),
    NegatedFact(GroundAtom),
    Numeric { fluent: GroundAtom, value: f64 },
    Object { fluent: GroundAtom, value: Constant },
    /// `(at t literal)`
    Timed { at: f64, literal: Box<InitElement> },
}

impl fmt::Display for InitElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitElement::Fact(atom) => write!(f, "{atom}"),
            InitElement::NegatedFact(atom) => write!(f, "(not {atom})"),
            InitElement::Numeric { fluent, value } => write!(f, "(= {fluent} {value})"),
            InitElement::Object { fluent, value } => write!(f, "(= {fluent} {value})"),
            InitElement::Timed { at, literal } => write!(f, "(at {at} {literal})"),
        }
    }
}

/// Table sizes, for tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub content: ContentKind,
    pub requirements: String,
    pub types: usize,
    pub predicates: usize,
    pub functions: usize,
    pub actions: usize,
    pub objects: usize,
    pub init: usize,
    pub preferences: usize,
}

/// A compiled domain or problem.
#[derive(Debug, Clone)]
pub struct PddlObject {
    pub name: String,
    /// Domain a problem refers to; equals `name` for domains
    pub domain_name: String,
    pub content: ContentKind,
    pub file: String,
    /// Span of the `define` form; default when built programmatically
    pub span: Span,
    /// Effective requirements, implied keys included
    pub requirements: RequirementSet,
    /// False when the requirements were inherited or defaulted
    pub explicit_requirements: bool,
    pub lattice: Arc<TypeLattice>,
    /// Domain constants and problem objects
    pub constants: IndexMap<String, ConstantDecl>,
    pub formulas: Arc<FormulaTable>,
    pub actions: Arc<IndexMap<String, ActionDef>>,
    pub init: Vec<InitElement>,
    pub goal: Option<LogicalExp>,
    pub constraints: ConstraintExp,
    pub metric: Option<Metric>,
    pub preferences: PreferenceTable,
    universe: OnceLock<Arc<Universe>>,
}

impl PddlObject {
    /// An empty domain.
    pub fn domain(name: impl Into<String>, file: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            domain_name: name.clone(),
            name,
            content: ContentKind::Domain,
            file: file.into(),
            span: Span::default(),
            requirements: RequirementSet::new(),
            explicit_requirements: false,
            lattice: Arc::new(TypeLattice::new()),
            constants: IndexMap::new(),
            formulas: Arc::default(),
            actions: Arc::default(),
            init: Vec::new(),
            goal: None,
            constraints: ConstraintExp::True,
            metric: None,
            preferences: PreferenceTable::new(),
            universe: OnceLock::new(),
        }
    }

    /// An empty problem sharing the tables of `domain`.
    pub fn problem(name: impl Into<String>, file: impl Into<String>, domain: &PddlObject) -> Self {
        Self {
            name: name.into(),
            domain_name: domain.name.clone(),
            content: ContentKind::PartialProblem,
            file: file.into(),
            span: Span::default(),
            requirements: domain.requirements,
            explicit_requirements: false,
            lattice: Arc::clone(&domain.lattice),
            constants: IndexMap::new(),
            formulas: Arc::clone(&domain.formulas),
            actions: Arc::clone(&domain.actions),
            init: Vec::new(),
            goal: None,
            constraints: ConstraintExp::True,
            metric: None,
            preferences: PreferenceTable::new(),
            universe: OnceLock::new(),
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name).map(|d| &d.constant)
    }

    pub fn formula(&self, name: &str) -> Option<&RootFormula> {
        self.formulas.get(name)
    }

    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// Evaluation context of this object, built on first use.
    pub fn universe(&self) -> Arc<Universe> {
        let universe = self.universe.get_or_init(|| {
            Arc::new(
                Universe::new(Arc::clone(&self.lattice))
                    .with_formulas(Arc::clone(&self.formulas))
                    .with_preferences(Arc::new(self.preferences.clone()))
                    .with_goal(self.goal.clone()),
            )
        });
        Arc::clone(universe)
    }

    /// Drop the memoized universe after the tables changed.
    pub fn invalidate(&mut self) {
        self.universe = OnceLock::new();
    }

    pub fn summary(&self) -> ModelSummary {
        let count = |class| {
            self.formulas
                .values()
                .filter(|f| f.class() == class)
                .count()
        };
        ModelSummary {
            name: self.name.clone(),
            content: self.content,
            requirements: self.requirements.to_string(),
            types: self.lattice.user_type_count(),
            predicates: count(FormulaClass::Predicate),
            functions: count(FormulaClass::Numeric) + count(FormulaClass::Object),
            actions: self.actions.len(),
            objects: self.constants.len(),
            init: self.init.len(),
            preferences: self.preferences.len(),
        }
    }
}
