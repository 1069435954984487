//! States expressions are evaluated against.
//!
//! A world answers queries about ground atoms. [`OpenWorld`] answers with
//! three-valued [`Fuzzy`] results; [`ClosedWorld`] answers definitely, with
//! `None` for fluents that have no value. Both expose the [`Universe`]: the
//! type domains quantifiers range over, the formula table holding derived and
//! defined bodies, the preference table and the goal.

use crate::expr::{Constant, EvalError, Fuzzy, LogicalExp, Term};
use crate::model::{FormulaTable, InitElement, PddlObject, PreferenceTable};
use crate::types::TypeLattice;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A formula application over constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroundAtom {
    pub name: String,
    pub args: Vec<Constant>,
}

impl GroundAtom {
    pub fn new(name: impl Into<String>, args: Vec<Constant>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn nullary(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Ground atom of an application whose arguments are all constants.
    pub fn from_terms(name: &str, args: &[Term]) -> Option<Self> {
        let args = args
            .iter()
            .map(|t| match t {
                Term::Constant(c) => Some(c.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(name, args))
    }
}

impl fmt::Display for GroundAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg.name)?;
        }
        f.write_str(")")
    }
}

pub trait WorldView {
    fn universe(&self) -> &Universe;
}

/// Three-valued state queries.
pub trait OpenWorld: WorldView {
    fn fuzzy_predicate(&self, atom: &GroundAtom) -> Fuzzy<bool>;
    fn fuzzy_numeric(&self, atom: &GroundAtom) -> Fuzzy<f64>;
    fn fuzzy_object(&self, atom: &GroundAtom) -> Fuzzy<Constant>;
}

/// Two-valued state queries.
pub trait ClosedWorld: WorldView {
    fn holds(&self, atom: &GroundAtom) -> bool;
    fn numeric(&self, atom: &GroundAtom) -> Option<f64>;
    fn object(&self, atom: &GroundAtom) -> Option<Constant>;
}

/// Everything evaluation needs beyond the state itself.
#[derive(Debug, Clone)]
pub struct Universe {
    pub lattice: Arc<TypeLattice>,
    pub formulas: Arc<FormulaTable>,
    pub preferences: Arc<PreferenceTable>,
    pub goal: Option<LogicalExp>,
    goal_world: OnceLock<GoalWorld>,
}

impl Universe {
    pub fn new(lattice: Arc<TypeLattice>) -> Self {
        Self {
            lattice,
            formulas: Arc::default(),
            preferences: Arc::default(),
            goal: None,
            goal_world: OnceLock::new(),
        }
    }

    pub fn with_formulas(mut self, formulas: Arc<FormulaTable>) -> Self {
        self.formulas = formulas;
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<PreferenceTable>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_goal(mut self, goal: Option<LogicalExp>) -> Self {
        self.goal = goal;
        self.goal_world = OnceLock::new();
        self
    }

    /// The world described by the goal's literals, built on first use.
    pub fn goal_world(&self) -> Result<&GoalWorld, EvalError> {
        let goal = self.goal.as_ref().ok_or(EvalError::NoGoal)?;
        Ok(self.goal_world.get_or_init(|| GoalWorld::from_goal(goal)))
    }

    pub fn goal_view(&self) -> Result<GoalView<'_>, EvalError> {
        Ok(GoalView {
            universe: self,
            goal: self.goal_world()?,
        })
    }
}

/// Ground literals of a goal.
///
/// Literals are collected from the top-level conjunction; anything else in
/// the goal (disjunctions, quantifiers, comparisons) leaves atoms unknown.
#[derive(Debug, Clone, Default)]
pub struct GoalWorld {
    positive: BTreeSet<GroundAtom>,
    negative: BTreeSet<GroundAtom>,
}

impl GoalWorld {
    pub fn from_goal(goal: &LogicalExp) -> Self {
        let mut world = GoalWorld::default();
        world.collect(goal);
        world
    }

    fn collect(&mut self, exp: &LogicalExp) {
        match exp {
            LogicalExp::And(children) => children.iter().for_each(|c| self.collect(c)),
            LogicalExp::Atom { name, args } => {
                if let Some(atom) = GroundAtom::from_terms(name, args) {
                    self.positive.insert(atom);
                }
            }
            LogicalExp::Not(inner) => {
                if let LogicalExp::Atom { name, args } = inner.as_ref() {
                    if let Some(atom) = GroundAtom::from_terms(name, args) {
                        self.negative.insert(atom);
                    }
                }
            }
            LogicalExp::Timed { body, .. } | LogicalExp::Preference { body, .. } => {
                self.collect(body)
            }
            _ => {}
        }
    }

    /// `Some(true)` for goal atoms, `Some(false)` for negated ones.
    pub fn literal(&self, atom: &GroundAtom) -> Option<bool> {
        if self.positive.contains(atom) {
            Some(true)
        } else if self.negative.contains(atom) {
            Some(false)
        } else {
            None
        }
    }
}

/// The goal world seen through the world traits.
#[derive(Debug, Clone, Copy)]
pub struct GoalView<'a> {
    universe: &'a Universe,
    goal: &'a GoalWorld,
}

impl WorldView for GoalView<'_> {
    fn universe(&self) -> &Universe {
        self.universe
    }
}

impl OpenWorld for GoalView<'_> {
    fn fuzzy_predicate(&self, atom: &GroundAtom) -> Fuzzy<bool> {
        match self.goal.literal(atom) {
            Some(value) => Fuzzy::Defined(value),
            None => Fuzzy::Unknown,
        }
    }

    fn fuzzy_numeric(&self, _atom: &GroundAtom) -> Fuzzy<f64> {
        Fuzzy::Unknown
    }

    fn fuzzy_object(&self, _atom: &GroundAtom) -> Fuzzy<Constant> {
        Fuzzy::Unknown
    }
}

impl ClosedWorld for GoalView<'_> {
    fn holds(&self, atom: &GroundAtom) -> bool {
        self.goal.literal(atom) == Some(true)
    }

    fn numeric(&self, _atom: &GroundAtom) -> Option<f64> {
        None
    }

    fn object(&self, _atom: &GroundAtom) -> Option<Constant> {
        None
    }
}

/// A map-backed state snapshot.
///
/// Predicates not set are false and fluents not set are undefined. Atoms
/// marked unknown answer `Unknown` in the open view and false/undefined in
/// the closed one.
#[derive(Debug, Clone)]
pub struct WorldState {
    universe: Arc<Universe>,
    facts: BTreeSet<GroundAtom>,
    numeric: BTreeMap<GroundAtom, f64>,
    objects: BTreeMap<GroundAtom, Constant>,
    unknown: BTreeSet<GroundAtom>,
}

impl WorldState {
    pub fn new(universe: Arc<Universe>) -> Self {
        Self {
            universe,
            facts: BTreeSet::new(),
            numeric: BTreeMap::new(),
            objects: BTreeMap::new(),
            unknown: BTreeSet::new(),
        }
    }

    /// Initial state of a problem; timed literals are not yet in effect.
    pub fn from_init(object: &PddlObject) -> Self {
        let mut state = WorldState::new(object.universe());
        for element in &object.init {
            match element {
                InitElement::Fact(atom) => state.set_fact(atom.clone(), true),
                InitElement::NegatedFact(atom) => state.set_fact(atom.clone(), false),
                InitElement::Numeric { fluent, value } => state.set_numeric(fluent.clone(), *value),
                InitElement::Object { fluent, value } => {
                    state.set_object(fluent.clone(), Some(value.clone()))
                }
                InitElement::Timed { .. } => {}
            }
        }
        state
    }

    pub fn set_fact(&mut self, atom: GroundAtom, value: bool) {
        self.unknown.remove(&atom);
        if value {
            self.facts.insert(atom);
        } else {
            self.facts.remove(&atom);
        }
    }

    pub fn set_numeric(&mut self, fluent: GroundAtom, value: f64) {
        self.unknown.remove(&fluent);
        self.numeric.insert(fluent, value);
    }

    /// `None` makes the fluent undefined.
    pub fn set_object(&mut self, fluent: GroundAtom, value: Option<Constant>) {
        self.unknown.remove(&fluent);
        match value {
            Some(c) => self.objects.insert(fluent, c),
            None => self.objects.remove(&fluent),
        };
    }

    pub fn mark_unknown(&mut self, atom: GroundAtom) {
        self.facts.remove(&atom);
        self.numeric.remove(&atom);
        self.objects.remove(&atom);
        self.unknown.insert(atom);
    }

    pub fn facts(&self) -> impl Iterator<Item = &GroundAtom> {
        self.facts.iter()
    }
}

impl WorldView for WorldState {
    fn universe(&self) -> &Universe {
        &self.universe
    }
}

impl OpenWorld for WorldState {
    fn fuzzy_predicate(&self, atom: &GroundAtom) -> Fuzzy<bool> {
        if self.unknown.contains(atom) {
            Fuzzy::Unknown
        } else {
            Fuzzy::Defined(self.facts.contains(atom))
        }
    }

    fn fuzzy_numeric(&self, atom: &GroundAtom) -> Fuzzy<f64> {
        match self.numeric.get(atom) {
            Some(v) => Fuzzy::Defined(*v),
            None if self.unknown.contains(atom) => Fuzzy::Unknown,
            None => Fuzzy::Undefined,
        }
    }

    fn fuzzy_object(&self, atom: &GroundAtom) -> Fuzzy<Constant> {
        match self.objects.get(atom) {
            Some(c) => Fuzzy::Defined(c.clone()),
            None if self.unknown.contains(atom) => Fuzzy::Unknown,
            None => Fuzzy::Undefined,
        }
    }
}

impl ClosedWorld for WorldState {
    fn holds(&self, atom: &GroundAtom) -> bool {
        self.facts.contains(atom)
    }

    fn numeric(&self, atom: &GroundAtom) -> Option<f64> {
        self.numeric.get(atom).copied()
    }

    fn object(&self, atom: &GroundAtom) -> Option<Constant> {
        self.objects.get(atom).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Bindings;
    use crate::types::TypeSetId;

    fn c(name: &str) -> Constant {
        Constant::new(name, TypeSetId::OBJECT)
    }

    fn t(name: &str) -> Term {
        Term::Constant(c(name))
    }

    #[test]
    fn test_open_and_closed_views_of_a_state() {
        let mut state = WorldState::new(Arc::new(Universe::new(Arc::default())));
        let on = GroundAtom::new("on", vec![c("a"), c("b")]);
        let hidden = GroundAtom::new("clear", vec![c("a")]);
        state.set_fact(on.clone(), true);
        state.mark_unknown(hidden.clone());

        assert_eq!(state.fuzzy_predicate(&on), Fuzzy::Defined(true));
        assert_eq!(state.fuzzy_predicate(&hidden), Fuzzy::Unknown);
        assert!(!state.holds(&hidden));
        assert_eq!(
            state.fuzzy_numeric(&GroundAtom::nullary("fuel")),
            Fuzzy::Undefined
        );
    }

    #[test]
    fn test_goal_world_is_memoized_from_literals() {
        let goal = LogicalExp::And(vec![
            LogicalExp::atom("on", vec![t("a"), t("b")]),
            LogicalExp::atom("clear", vec![t("c")]).negate(),
        ]);
        let universe = Universe::new(Arc::default()).with_goal(Some(goal));
        let first: *const GoalWorld = universe.goal_world().unwrap();
        let second: *const GoalWorld = universe.goal_world().unwrap();
        assert_eq!(first, second);

        let view = universe.goal_view().unwrap();
        let on = GroundAtom::new("on", vec![c("a"), c("b")]);
        assert_eq!(view.fuzzy_predicate(&on), Fuzzy::Defined(true));
        assert_eq!(
            view.fuzzy_predicate(&GroundAtom::new("clear", vec![c("c")])),
            Fuzzy::Defined(false)
        );
        assert_eq!(
            view.fuzzy_predicate(&GroundAtom::new("clear", vec![c("a")])),
            Fuzzy::Unknown
        );
    }

    #[test]
    fn test_goal_modality_needs_a_goal() {
        let state = WorldState::new(Arc::new(Universe::new(Arc::default())));
        let exp = LogicalExp::Goal(Box::new(LogicalExp::atom("p", Vec::new())));
        assert_eq!(
            exp.evaluate_open(&state, &mut Bindings::new()),
            Err(EvalError::NoGoal)
        );
    }
}
