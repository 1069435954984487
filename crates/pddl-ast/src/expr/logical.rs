use super::numeric::bind_params;
use super::render::{self, Render};
use super::term::{ground_closed, ground_open, rename};
use super::{
    attempt, defined, for_each_instance, Bindings, EvalError, Fuzzy, NumericExp, Reduced, Term,
    Value, Variable,
};
use crate::model::RootFormula;
use crate::types::TypeLattice;
use crate::world::{ClosedWorld, GroundAtom, OpenWorld};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

impl CompareOp {
    pub fn from_symbol(symbol: &str) -> Option<CompareOp> {
        Some(match symbol {
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            "=" => CompareOp::Eq,
            ">=" => CompareOp::Ge,
            ">" => CompareOp::Gt,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ge => ">=",
            CompareOp::Gt => ">",
        }
    }

    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Eq => left == right,
            CompareOp::Ge => left >= right,
            CompareOp::Gt => left > right,
        }
    }
}

/// Time point of a timed condition or effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSpec {
    AtStart,
    OverAll,
    AtEnd,
}

impl TimeSpec {
    pub fn from_image(image: &str) -> Option<TimeSpec> {
        Some(match image {
            "at-start" | "start" => TimeSpec::AtStart,
            "over-all" | "all" => TimeSpec::OverAll,
            "at-end" | "end" => TimeSpec::AtEnd,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TimeSpec::AtStart => "at start",
            TimeSpec::OverAll => "over all",
            TimeSpec::AtEnd => "at end",
        }
    }
}

/// Right-hand side of a TLPlan local assignment.
#[derive(Debug, Clone)]
pub enum LocalValue {
    Numeric(NumericExp),
    Term(Term),
    Logical(Box<LogicalExp>),
}

/// A truth-valued expression.
#[derive(Debug, Clone)]
pub enum LogicalExp {
    True,
    False,
    And(Vec<LogicalExp>),
    Or(Vec<LogicalExp>),
    Not(Box<LogicalExp>),
    Imply(Box<LogicalExp>, Box<LogicalExp>),
    Exists {
        vars: Vec<Variable>,
        body: Box<LogicalExp>,
    },
    Forall {
        vars: Vec<Variable>,
        body: Box<LogicalExp>,
    },
    /// Predicate or derived predicate atom
    Atom {
        name: String,
        args: Vec<Term>,
    },
    /// TLPlan defined predicate application
    Defined {
        name: String,
        args: Vec<Term>,
    },
    /// Term equality
    Equal(Term, Term),
    Compare {
        op: CompareOp,
        left: NumericExp,
        right: NumericExp,
    },
    /// Boolean local
    Variable(Variable),
    /// `(:= ?v value)`, binds the local and holds
    Assign {
        var: Variable,
        value: LocalValue,
    },
    /// `(goal φ)`, evaluated against the goal world
    Goal(Box<LogicalExp>),
    Timed {
        at: TimeSpec,
        body: Box<LogicalExp>,
    },
    Preference {
        name: String,
        body: Box<LogicalExp>,
    },
}

impl LogicalExp {
    pub fn atom(name: impl Into<String>, args: Vec<Term>) -> Self {
        LogicalExp::Atom {
            name: name.into(),
            args,
        }
    }

    pub fn negate(self) -> Self {
        LogicalExp::Not(Box::new(self))
    }

    /// Conjunction that drops `true` operands and unwraps a single one.
    pub fn conjoin(parts: impl IntoIterator<Item = LogicalExp>) -> Self {
        let mut parts: Vec<LogicalExp> = parts
            .into_iter()
            .filter(|p| !matches!(p, LogicalExp::True))
            .collect();
        match parts.len() {
            0 => LogicalExp::True,
            1 => parts.remove(0),
            _ => LogicalExp::And(parts),
        }
    }

    pub fn evaluate_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
    ) -> Result<Fuzzy<bool>, EvalError> {
        match self {
            LogicalExp::True => Ok(Fuzzy::Defined(true)),
            LogicalExp::False => Ok(Fuzzy::Defined(false)),
            LogicalExp::And(children) => {
                for child in children {
                    if !defined!(child.evaluate_open(world, bindings)) {
                        return Ok(Fuzzy::Defined(false));
                    }
                }
                Ok(Fuzzy::Defined(true))
            }
            LogicalExp::Or(children) => {
                for child in children {
                    if defined!(child.evaluate_open(world, bindings)) {
                        return Ok(Fuzzy::Defined(true));
                    }
                }
                Ok(Fuzzy::Defined(false))
            }
            LogicalExp::Not(inner) => Ok(inner.evaluate_open(world, bindings)?.map(|v| !v)),
            LogicalExp::Imply(cond, then) => {
                if !defined!(cond.evaluate_open(world, bindings)) {
                    return Ok(Fuzzy::Defined(true));
                }
                then.evaluate_open(world, bindings)
            }
            LogicalExp::Exists { vars, body } => quantify_open(vars, body, true, world, bindings),
            LogicalExp::Forall { vars, body } => quantify_open(vars, body, false, world, bindings),
            LogicalExp::Atom { name, args } => {
                let atom = defined!(ground_open(name, args, world, bindings));
                match world.universe().formulas.get(&atom.name) {
                    Some(RootFormula::Derived { signature, body }) => {
                        if !bindings.begin(&atom)? {
                            return Ok(Fuzzy::Defined(false));
                        }
                        let frame = bindings.enter();
                        bind_params(bindings, &signature.params, &atom);
                        let outcome = body.evaluate_open(world, bindings);
                        bindings.leave(frame);
                        bindings.end();
                        outcome
                    }
                    _ => Ok(world.fuzzy_predicate(&atom)),
                }
            }
            LogicalExp::Defined { name, args } => {
                let atom = defined!(ground_open(name, args, world, bindings));
                let formula = world.universe().formulas.get(&atom.name);
                let (params, body) = defined_predicate(formula, &atom)?;
                if !bindings.begin(&atom)? {
                    return Err(EvalError::Recursion(atom.to_string()));
                }
                let frame = bindings.enter();
                bind_params(bindings, params, &atom);
                let outcome = body.evaluate_open(world, bindings);
                bindings.leave(frame);
                bindings.end();
                outcome
            }
            LogicalExp::Equal(left, right) => {
                let l = defined!(left.evaluate_open(world, bindings));
                let r = defined!(right.evaluate_open(world, bindings));
                Ok(Fuzzy::Defined(l == r))
            }
            LogicalExp::Compare { op, left, right } => {
                let l = defined!(left.evaluate_open(world, bindings));
                let r = defined!(right.evaluate_open(world, bindings));
                Ok(Fuzzy::Defined(op.holds(l, r)))
            }
            LogicalExp::Variable(v) => Ok(Fuzzy::Defined(bindings.boolean(&v.name)?)),
            LogicalExp::Assign { var, value } => {
                let value = match value {
                    LocalValue::Numeric(e) => {
                        Value::Number(defined!(e.evaluate_open(world, bindings)))
                    }
                    LocalValue::Term(t) => {
                        Value::Object(defined!(t.evaluate_open(world, bindings)))
                    }
                    LocalValue::Logical(e) => {
                        Value::Boolean(defined!(e.evaluate_open(world, bindings)))
                    }
                };
                bindings.assign(&var.name, value);
                Ok(Fuzzy::Defined(true))
            }
            LogicalExp::Goal(inner) => {
                let view = world.universe().goal_view()?;
                inner.evaluate_open(&view, bindings)
            }
            LogicalExp::Timed { body, .. } | LogicalExp::Preference { body, .. } => {
                body.evaluate_open(world, bindings)
            }
        }
    }

    pub fn evaluate_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
    ) -> Result<bool, EvalError> {
        match self {
            LogicalExp::True => Ok(true),
            LogicalExp::False => Ok(false),
            LogicalExp::And(children) => {
                for child in children {
                    if !child.evaluate_closed(world, bindings)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalExp::Or(children) => {
                for child in children {
                    if child.evaluate_closed(world, bindings)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalExp::Not(inner) => Ok(!inner.evaluate_closed(world, bindings)?),
            LogicalExp::Imply(cond, then) => {
                if !cond.evaluate_closed(world, bindings)? {
                    return Ok(true);
                }
                then.evaluate_closed(world, bindings)
            }
            LogicalExp::Exists { vars, body } => {
                quantify_closed(vars, body, true, world, bindings)
            }
            LogicalExp::Forall { vars, body } => {
                quantify_closed(vars, body, false, world, bindings)
            }
            LogicalExp::Atom { name, args } => {
                let atom = ground_closed(name, args, world, bindings)?;
                match world.universe().formulas.get(&atom.name) {
                    Some(RootFormula::Derived { signature, body }) => {
                        if !bindings.begin(&atom)? {
                            return Ok(false);
                        }
                        let frame = bindings.enter();
                        bind_params(bindings, &signature.params, &atom);
                        let outcome = body.evaluate_closed(world, bindings);
                        bindings.leave(frame);
                        bindings.end();
                        outcome
                    }
                    _ => Ok(world.holds(&atom)),
                }
            }
            LogicalExp::Defined { name, args } => {
                let atom = ground_closed(name, args, world, bindings)?;
                let formula = world.universe().formulas.get(&atom.name);
                let (params, body) = defined_predicate(formula, &atom)?;
                if !bindings.begin(&atom)? {
                    return Err(EvalError::Recursion(atom.to_string()));
                }
                let frame = bindings.enter();
                bind_params(bindings, params, &atom);
                let outcome = body.evaluate_closed(world, bindings);
                bindings.leave(frame);
                bindings.end();
                outcome
            }
            LogicalExp::Equal(left, right) => undefined_is_false(|| {
                let l = left.evaluate_closed(world, bindings)?;
                let r = right.evaluate_closed(world, bindings)?;
                Ok(l == r)
            }),
            LogicalExp::Compare { op, left, right } => undefined_is_false(|| {
                let l = left.evaluate_closed(world, bindings)?;
                let r = right.evaluate_closed(world, bindings)?;
                Ok(op.holds(l, r))
            }),
            LogicalExp::Variable(v) => bindings.boolean(&v.name),
            LogicalExp::Assign { var, value } => {
                let value = match value {
                    LocalValue::Numeric(e) => Value::Number(e.evaluate_closed(world, bindings)?),
                    LocalValue::Term(t) => Value::Object(t.evaluate_closed(world, bindings)?),
                    LocalValue::Logical(e) => Value::Boolean(e.evaluate_closed(world, bindings)?),
                };
                bindings.assign(&var.name, value);
                Ok(true)
            }
            LogicalExp::Goal(inner) => {
                let view = world.universe().goal_view()?;
                inner.evaluate_closed(&view, bindings)
            }
            LogicalExp::Timed { body, .. } | LogicalExp::Preference { body, .. } => {
                body.evaluate_closed(world, bindings)
            }
        }
    }

    pub fn simplify(
        &self,
        world: &dyn OpenWorld,
        bindings: &Bindings,
    ) -> Result<Reduced<bool, LogicalExp>, EvalError> {
        match self {
            LogicalExp::True => Ok(Reduced::Value(true)),
            LogicalExp::False => Ok(Reduced::Value(false)),
            LogicalExp::And(children) => simplify_junction(children, true, world, bindings),
            LogicalExp::Or(children) => simplify_junction(children, false, world, bindings),
            LogicalExp::Not(inner) => Ok(match inner.simplify(world, bindings)? {
                Reduced::Value(v) => Reduced::Value(!v),
                Reduced::Undefined => Reduced::Undefined,
                Reduced::Residual(r) => Reduced::Residual(r.negate()),
            }),
            LogicalExp::Imply(cond, then) => match cond.simplify(world, bindings)? {
                Reduced::Value(false) => Ok(Reduced::Value(true)),
                Reduced::Value(true) => then.simplify(world, bindings),
                Reduced::Undefined => Ok(Reduced::Undefined),
                Reduced::Residual(cond) => {
                    let then = match then.simplify(world, bindings) {
                        Ok(Reduced::Value(v)) => LogicalExp::from(v),
                        Ok(Reduced::Residual(r)) => r,
                        Ok(Reduced::Undefined) | Err(_) => then.as_ref().clone(),
                    };
                    Ok(Reduced::Residual(LogicalExp::Imply(
                        Box::new(cond),
                        Box::new(then),
                    )))
                }
            },
            LogicalExp::Timed { at, body } => Ok(match body.simplify(world, bindings)? {
                Reduced::Residual(body) => Reduced::Residual(LogicalExp::Timed {
                    at: *at,
                    body: Box::new(body),
                }),
                other => other,
            }),
            LogicalExp::Preference { name, body } => Ok(match body.simplify(world, bindings)? {
                Reduced::Residual(body) => Reduced::Residual(LogicalExp::Preference {
                    name: name.clone(),
                    body: Box::new(body),
                }),
                other => other,
            }),
            // the binding must survive for later readers of the local
            LogicalExp::Assign { .. } => {
                let mut scratch = bindings.clone();
                match self.evaluate_open(world, &mut scratch) {
                    Ok(Fuzzy::Undefined) => Ok(Reduced::Undefined),
                    Ok(_) | Err(EvalError::Unbound(_)) => {
                        Ok(Reduced::Residual(self.apply(bindings)))
                    }
                    Err(err) => Err(err),
                }
            }
            _ => {
                let mut scratch = bindings.clone();
                attempt(self.evaluate_open(world, &mut scratch), || self.apply(bindings))
            }
        }
    }

    /// Substitute bound variables; quantified names shadow the bindings.
    pub fn apply(&self, bindings: &Bindings) -> LogicalExp {
        match self {
            LogicalExp::True | LogicalExp::False => self.clone(),
            LogicalExp::And(children) => {
                LogicalExp::And(children.iter().map(|c| c.apply(bindings)).collect())
            }
            LogicalExp::Or(children) => {
                LogicalExp::Or(children.iter().map(|c| c.apply(bindings)).collect())
            }
            LogicalExp::Not(inner) => LogicalExp::Not(Box::new(inner.apply(bindings))),
            LogicalExp::Imply(cond, then) => LogicalExp::Imply(
                Box::new(cond.apply(bindings)),
                Box::new(then.apply(bindings)),
            ),
            LogicalExp::Exists { vars, body } => LogicalExp::Exists {
                vars: vars.clone(),
                body: Box::new(body.apply(&shadowed(bindings, vars))),
            },
            LogicalExp::Forall { vars, body } => LogicalExp::Forall {
                vars: vars.clone(),
                body: Box::new(body.apply(&shadowed(bindings, vars))),
            },
            LogicalExp::Atom { name, args } => LogicalExp::Atom {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            LogicalExp::Defined { name, args } => LogicalExp::Defined {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            LogicalExp::Equal(left, right) => {
                LogicalExp::Equal(left.apply(bindings), right.apply(bindings))
            }
            LogicalExp::Compare { op, left, right } => LogicalExp::Compare {
                op: *op,
                left: left.apply(bindings),
                right: right.apply(bindings),
            },
            LogicalExp::Variable(v) => match bindings.get(&v.name) {
                Some(Value::Boolean(b)) => LogicalExp::from(*b),
                _ => self.clone(),
            },
            LogicalExp::Assign { var, value } => LogicalExp::Assign {
                var: var.clone(),
                value: match value {
                    LocalValue::Numeric(e) => LocalValue::Numeric(e.apply(bindings)),
                    LocalValue::Term(t) => LocalValue::Term(t.apply(bindings)),
                    LocalValue::Logical(e) => LocalValue::Logical(Box::new(e.apply(bindings))),
                },
            },
            LogicalExp::Goal(inner) => LogicalExp::Goal(Box::new(inner.apply(bindings))),
            LogicalExp::Timed { at, body } => LogicalExp::Timed {
                at: *at,
                body: Box::new(body.apply(bindings)),
            },
            LogicalExp::Preference { name, body } => LogicalExp::Preference {
                name: name.clone(),
                body: Box::new(body.apply(bindings)),
            },
        }
    }

    /// Rename variables, bound ones included, through `mapping`.
    pub fn standardize(&self, mapping: &HashMap<String, String>) -> LogicalExp {
        let vars = |vars: &[Variable]| vars.iter().map(|v| rename(v, mapping)).collect();
        match self {
            LogicalExp::True | LogicalExp::False => self.clone(),
            LogicalExp::And(children) => {
                LogicalExp::And(children.iter().map(|c| c.standardize(mapping)).collect())
            }
            LogicalExp::Or(children) => {
                LogicalExp::Or(children.iter().map(|c| c.standardize(mapping)).collect())
            }
            LogicalExp::Not(inner) => LogicalExp::Not(Box::new(inner.standardize(mapping))),
            LogicalExp::Imply(cond, then) => LogicalExp::Imply(
                Box::new(cond.standardize(mapping)),
                Box::new(then.standardize(mapping)),
            ),
            LogicalExp::Exists { vars: v, body } => LogicalExp::Exists {
                vars: vars(v),
                body: Box::new(body.standardize(mapping)),
            },
            LogicalExp::Forall { vars: v, body } => LogicalExp::Forall {
                vars: vars(v),
                body: Box::new(body.standardize(mapping)),
            },
            LogicalExp::Atom { name, args } => LogicalExp::Atom {
                name: name.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            LogicalExp::Defined { name, args } => LogicalExp::Defined {
                name: name.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            LogicalExp::Equal(left, right) => {
                LogicalExp::Equal(left.standardize(mapping), right.standardize(mapping))
            }
            LogicalExp::Compare { op, left, right } => LogicalExp::Compare {
                op: *op,
                left: left.standardize(mapping),
                right: right.standardize(mapping),
            },
            LogicalExp::Variable(v) => LogicalExp::Variable(rename(v, mapping)),
            LogicalExp::Assign { var, value } => LogicalExp::Assign {
                var: rename(var, mapping),
                value: match value {
                    LocalValue::Numeric(e) => LocalValue::Numeric(e.standardize(mapping)),
                    LocalValue::Term(t) => LocalValue::Term(t.standardize(mapping)),
                    LocalValue::Logical(e) => {
                        LocalValue::Logical(Box::new(e.standardize(mapping)))
                    }
                },
            },
            LogicalExp::Goal(inner) => LogicalExp::Goal(Box::new(inner.standardize(mapping))),
            LogicalExp::Timed { at, body } => LogicalExp::Timed {
                at: *at,
                body: Box::new(body.standardize(mapping)),
            },
            LogicalExp::Preference { name, body } => LogicalExp::Preference {
                name: name.clone(),
                body: Box::new(body.standardize(mapping)),
            },
        }
    }

    pub fn collect_free(&self, out: &mut BTreeSet<Variable>) {
        match self {
            LogicalExp::True | LogicalExp::False => {}
            LogicalExp::And(children) | LogicalExp::Or(children) => {
                children.iter().for_each(|c| c.collect_free(out))
            }
            LogicalExp::Not(inner) | LogicalExp::Goal(inner) => inner.collect_free(out),
            LogicalExp::Imply(cond, then) => {
                cond.collect_free(out);
                then.collect_free(out);
            }
            LogicalExp::Exists { vars, body } | LogicalExp::Forall { vars, body } => {
                let mut inner = BTreeSet::new();
                body.collect_free(&mut inner);
                out.extend(
                    inner
                        .into_iter()
                        .filter(|v| !vars.iter().any(|q| q.name == v.name)),
                );
            }
            LogicalExp::Atom { args, .. } | LogicalExp::Defined { args, .. } => {
                args.iter().for_each(|a| a.collect_free(out))
            }
            LogicalExp::Equal(left, right) => {
                left.collect_free(out);
                right.collect_free(out);
            }
            LogicalExp::Compare { left, right, .. } => {
                left.collect_free(out);
                right.collect_free(out);
            }
            LogicalExp::Variable(v) => {
                out.insert(v.clone());
            }
            LogicalExp::Assign { var, value } => {
                out.insert(var.clone());
                match value {
                    LocalValue::Numeric(e) => e.collect_free(out),
                    LocalValue::Term(t) => t.collect_free(out),
                    LocalValue::Logical(e) => e.collect_free(out),
                }
            }
            LogicalExp::Timed { body, .. } | LogicalExp::Preference { body, .. } => {
                body.collect_free(out)
            }
        }
    }

    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut out);
        out
    }

    pub fn is_ground(&self) -> bool {
        self.free_variables().is_empty()
    }

    /// Visit this node and every logical sub-expression, outermost first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a LogicalExp)) {
        visit(self);
        match self {
            LogicalExp::And(children) | LogicalExp::Or(children) => {
                children.iter().for_each(|c| c.walk(visit))
            }
            LogicalExp::Not(inner) | LogicalExp::Goal(inner) => inner.walk(visit),
            LogicalExp::Imply(cond, then) => {
                cond.walk(visit);
                then.walk(visit);
            }
            LogicalExp::Exists { body, .. }
            | LogicalExp::Forall { body, .. }
            | LogicalExp::Timed { body, .. }
            | LogicalExp::Preference { body, .. } => body.walk(visit),
            LogicalExp::Assign {
                value: LocalValue::Logical(e),
                ..
            } => e.walk(visit),
            _ => {}
        }
    }
}

impl From<bool> for LogicalExp {
    fn from(value: bool) -> Self {
        if value {
            LogicalExp::True
        } else {
            LogicalExp::False
        }
    }
}

fn shadowed(bindings: &Bindings, vars: &[Variable]) -> Bindings {
    bindings.without(vars.iter().map(|v| v.name.as_str()))
}

fn defined_predicate<'u>(
    formula: Option<&'u RootFormula>,
    atom: &GroundAtom,
) -> Result<(&'u [Variable], &'u LogicalExp), EvalError> {
    match formula {
        Some(RootFormula::DefinedPredicate {
            signature, body, ..
        }) => Ok((&signature.params, body)),
        _ => Err(EvalError::UnknownFormula(atom.name.clone())),
    }
}

/// Closed-world comparisons over an undefined value are false.
fn undefined_is_false(eval: impl FnOnce() -> Result<bool, EvalError>) -> Result<bool, EvalError> {
    match eval() {
        Err(EvalError::Undefined(_)) => Ok(false),
        other => other,
    }
}

/// `exists` when `stop_on` is true, `forall` otherwise.
fn quantify_open(
    vars: &[Variable],
    body: &LogicalExp,
    stop_on: bool,
    world: &dyn OpenWorld,
    bindings: &mut Bindings,
) -> Result<Fuzzy<bool>, EvalError> {
    let universe = world.universe();
    let found = for_each_instance(&universe.lattice, vars, bindings, |b| {
        match body.evaluate_open(world, b)? {
            Fuzzy::Defined(v) if v == stop_on => Ok(Some(Fuzzy::Defined(v))),
            Fuzzy::Defined(_) => Ok(None),
            other => Ok(Some(other)),
        }
    })?;
    Ok(found.unwrap_or(Fuzzy::Defined(!stop_on)))
}

fn quantify_closed(
    vars: &[Variable],
    body: &LogicalExp,
    stop_on: bool,
    world: &dyn ClosedWorld,
    bindings: &mut Bindings,
) -> Result<bool, EvalError> {
    let universe = world.universe();
    let found = for_each_instance(&universe.lattice, vars, bindings, |b| {
        let value = body.evaluate_closed(world, b)?;
        Ok((value == stop_on).then_some(value))
    })?;
    Ok(found.unwrap_or(!stop_on))
}

/// `and` when `unit` is true, `or` otherwise.
fn simplify_junction(
    children: &[LogicalExp],
    unit: bool,
    world: &dyn OpenWorld,
    bindings: &Bindings,
) -> Result<Reduced<bool, LogicalExp>, EvalError> {
    // assignments stay in the residual; their values reach later siblings
    let mut local = bindings.clone();
    let mut out = Vec::new();
    for child in children {
        let simplified = child.simplify(world, &local);
        if matches!(child, LogicalExp::Assign { .. }) {
            let _ = child.evaluate_open(world, &mut local);
        }
        if out.is_empty() {
            match simplified? {
                Reduced::Value(v) if v == unit => {}
                Reduced::Value(v) => return Ok(Reduced::Value(v)),
                Reduced::Undefined => return Ok(Reduced::Undefined),
                Reduced::Residual(r) => out.push(r),
            }
        } else {
            match simplified {
                Ok(Reduced::Value(v)) if v == unit => {}
                Ok(Reduced::Value(v)) => {
                    out.push(LogicalExp::from(v));
                    break;
                }
                Ok(Reduced::Residual(r)) => out.push(r),
                Ok(Reduced::Undefined) | Err(_) => out.push(child.clone()),
            }
        }
    }
    Ok(match out.len() {
        0 => Reduced::Value(unit),
        1 => Reduced::Residual(out.remove(0)),
        _ if unit => Reduced::Residual(LogicalExp::And(out)),
        _ => Reduced::Residual(LogicalExp::Or(out)),
    })
}

impl Render for LocalValue {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            LocalValue::Numeric(e) => e.render(out, lattice),
            LocalValue::Term(t) => t.render(out, lattice),
            LocalValue::Logical(e) => e.render(out, lattice),
        }
    }
}

impl Render for LogicalExp {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            LogicalExp::True => out.push_str("(and)"),
            LogicalExp::False => out.push_str("(or)"),
            LogicalExp::And(children) => render::list(out, "and", children, lattice),
            LogicalExp::Or(children) => render::list(out, "or", children, lattice),
            LogicalExp::Not(inner) => {
                render::list(out, "not", std::slice::from_ref(inner.as_ref()), lattice)
            }
            LogicalExp::Imply(cond, then) => {
                out.push_str("(imply ");
                cond.render(out, lattice);
                out.push(' ');
                then.render(out, lattice);
                out.push(')');
            }
            LogicalExp::Exists { vars, body } => {
                render::quantifier(out, "exists", vars, body.as_ref(), lattice)
            }
            LogicalExp::Forall { vars, body } => {
                render::quantifier(out, "forall", vars, body.as_ref(), lattice)
            }
            LogicalExp::Atom { name, args } | LogicalExp::Defined { name, args } => {
                render::application(out, name, args, lattice)
            }
            LogicalExp::Equal(left, right) => {
                out.push_str("(= ");
                left.render(out, lattice);
                out.push(' ');
                right.render(out, lattice);
                out.push(')');
            }
            LogicalExp::Compare { op, left, right } => {
                out.push('(');
                out.push_str(op.symbol());
                out.push(' ');
                left.render(out, lattice);
                out.push(' ');
                right.render(out, lattice);
                out.push(')');
            }
            LogicalExp::Variable(v) => out.push_str(&v.name),
            LogicalExp::Assign { var, value } => {
                out.push_str("(:= ");
                out.push_str(&var.name);
                out.push(' ');
                value.render(out, lattice);
                out.push(')');
            }
            LogicalExp::Goal(inner) => {
                render::list(out, "goal", std::slice::from_ref(inner.as_ref()), lattice)
            }
            LogicalExp::Timed { at, body } => {
                render::list(out, at.keyword(), std::slice::from_ref(body.as_ref()), lattice)
            }
            LogicalExp::Preference { name, body } => {
                out.push_str("(preference ");
                out.push_str(name);
                out.push(' ');
                body.render(out, lattice);
                out.push(')');
            }
        }
    }
}

impl fmt::Display for LogicalExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}

impl fmt::Display for LocalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
