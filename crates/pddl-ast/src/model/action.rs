use crate::expr::{Effect, LogicalExp, NumericExp, TimeSpec, Variable};
use crate::foundation::Span;

/// An instantaneous action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub params: Vec<Variable>,
    pub precondition: LogicalExp,
    pub effect: Effect,
    pub span: Span,
}

/// Restriction on `?duration`.
#[derive(Debug, Clone, PartialEq)]
pub enum DurationConstraint {
    /// No constraint given
    Any,
    /// `(= ?duration e)`
    Exact { at: TimeSpec, value: NumericExp },
    /// `<=`/`>=` bounds, under `:duration-inequalities`
    Range {
        at: TimeSpec,
        lower: Option<NumericExp>,
        upper: Option<NumericExp>,
    },
}

/// Parts of a durative action split by time point.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBuckets<T> {
    pub start: Vec<T>,
    pub overall: Vec<T>,
    pub end: Vec<T>,
    /// Continuous effects; always empty for conditions
    pub continuous: Vec<T>,
}

impl<T> Default for TimedBuckets<T> {
    fn default() -> Self {
        Self {
            start: Vec::new(),
            overall: Vec::new(),
            end: Vec::new(),
            continuous: Vec::new(),
        }
    }
}

impl<T> TimedBuckets<T> {
    pub fn at(&self, time: TimeSpec) -> &[T] {
        match time {
            TimeSpec::AtStart => &self.start,
            TimeSpec::OverAll => &self.overall,
            TimeSpec::AtEnd => &self.end,
        }
    }

    pub fn at_mut(&mut self, time: TimeSpec) -> &mut Vec<T> {
        match time {
            TimeSpec::AtStart => &mut self.start,
            TimeSpec::OverAll => &mut self.overall,
            TimeSpec::AtEnd => &mut self.end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
            && self.overall.is_empty()
            && self.end.is_empty()
            && self.continuous.is_empty()
    }
}

/// An `over all` preference waiting to be wired into the action's effects.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallPreference {
    pub name: String,
    pub condition: LogicalExp,
    pub context: Vec<Variable>,
}

/// A durative action.
#[derive(Debug, Clone, PartialEq)]
pub struct DurativeAction {
    pub name: String,
    pub params: Vec<Variable>,
    pub duration: DurationConstraint,
    pub conditions: TimedBuckets<LogicalExp>,
    pub effects: TimedBuckets<Effect>,
    pub overall_preferences: Vec<OverallPreference>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionDef {
    Simple(Action),
    Durative(DurativeAction),
}

impl ActionDef {
    pub fn name(&self) -> &str {
        match self {
            ActionDef::Simple(a) => &a.name,
            ActionDef::Durative(a) => &a.name,
        }
    }

    pub fn params(&self) -> &[Variable] {
        match self {
            ActionDef::Simple(a) => &a.params,
            ActionDef::Durative(a) => &a.params,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ActionDef::Simple(a) => a.span,
            ActionDef::Durative(a) => a.span,
        }
    }

    pub fn is_durative(&self) -> bool {
        matches!(self, ActionDef::Durative(_))
    }
}
