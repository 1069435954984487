use super::render::{self, Render};
use super::term::{ground_closed, ground_open, rename};
use super::{
    attempt, defined, for_each_instance, Bindings, Constant, EvalError, Fuzzy, LogicalExp,
    NumericExp, Reduced, Term, TimeSpec, Variable,
};
use crate::types::TypeLattice;
use crate::world::{ClosedWorld, GroundAtom, OpenWorld};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Numeric assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssignOp {
    Assign,
    Increase,
    Decrease,
    ScaleUp,
    ScaleDown,
}

impl AssignOp {
    pub fn from_keyword(keyword: &str) -> Option<AssignOp> {
        Some(match keyword {
            "assign" => AssignOp::Assign,
            "increase" => AssignOp::Increase,
            "decrease" => AssignOp::Decrease,
            "scale-up" => AssignOp::ScaleUp,
            "scale-down" => AssignOp::ScaleDown,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            AssignOp::Assign => "assign",
            AssignOp::Increase => "increase",
            AssignOp::Decrease => "decrease",
            AssignOp::ScaleUp => "scale-up",
            AssignOp::ScaleDown => "scale-down",
        }
    }
}

/// One atomic change an effect would make.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Add(GroundAtom),
    Delete(GroundAtom),
    Numeric {
        fluent: GroundAtom,
        op: AssignOp,
        value: f64,
    },
    /// `None` assigns `undefined`
    Object {
        fluent: GroundAtom,
        value: Option<Constant>,
    },
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Add(atom) => write!(f, "{atom}"),
            Update::Delete(atom) => write!(f, "(not {atom})"),
            Update::Numeric { fluent, op, value } => {
                write!(f, "({} {fluent} {})", op.keyword(), render::number(*value))
            }
            Update::Object { fluent, value } => match value {
                Some(c) => write!(f, "(assign {fluent} {c})"),
                None => write!(f, "(assign {fluent} undefined)"),
            },
        }
    }
}

/// A state-changing expression.
#[derive(Debug, Clone)]
pub enum Effect {
    And(Vec<Effect>),
    Add {
        name: String,
        args: Vec<Term>,
    },
    Delete {
        name: String,
        args: Vec<Term>,
    },
    Forall {
        vars: Vec<Variable>,
        body: Box<Effect>,
    },
    When {
        condition: LogicalExp,
        effect: Box<Effect>,
    },
    /// Numeric fluent assignment
    Numeric {
        op: AssignOp,
        name: String,
        args: Vec<Term>,
        value: NumericExp,
    },
    /// Object fluent assignment
    Object {
        name: String,
        args: Vec<Term>,
        value: Term,
    },
    Timed {
        at: TimeSpec,
        effect: Box<Effect>,
    },
    /// Continuous change, `value` mentions `#t`
    Continuous {
        op: AssignOp,
        name: String,
        args: Vec<Term>,
        value: NumericExp,
    },
}

impl Effect {
    pub fn add(name: impl Into<String>, args: Vec<Term>) -> Self {
        Effect::Add {
            name: name.into(),
            args,
        }
    }

    pub fn delete(name: impl Into<String>, args: Vec<Term>) -> Self {
        Effect::Delete {
            name: name.into(),
            args,
        }
    }

    /// Conjunction that flattens nested `and`s and unwraps a single effect.
    pub fn conjoin(parts: impl IntoIterator<Item = Effect>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Effect::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Effect::And(flat)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Effect::And(children) if children.iter().all(Effect::is_empty))
    }

    pub fn evaluate_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
    ) -> Result<Fuzzy<Vec<Update>>, EvalError> {
        let mut out = Vec::new();
        match self.collect_open(world, bindings, &mut out)? {
            Fuzzy::Defined(()) => Ok(Fuzzy::Defined(out)),
            Fuzzy::Unknown => Ok(Fuzzy::Unknown),
            Fuzzy::Undefined => Ok(Fuzzy::Undefined),
        }
    }

    fn collect_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
        out: &mut Vec<Update>,
    ) -> Result<Fuzzy<()>, EvalError> {
        match self {
            Effect::And(children) => {
                for child in children {
                    defined!(child.collect_open(world, bindings, out));
                }
            }
            Effect::Add { name, args } => {
                out.push(Update::Add(defined!(ground_open(name, args, world, bindings))));
            }
            Effect::Delete { name, args } => {
                out.push(Update::Delete(defined!(ground_open(
                    name, args, world, bindings
                ))));
            }
            Effect::Forall { vars, body } => {
                let lattice = &world.universe().lattice;
                let stop = for_each_instance(lattice, vars, bindings, |b| {
                    match body.collect_open(world, b, out)? {
                        Fuzzy::Defined(()) => Ok(None),
                        other => Ok(Some(other)),
                    }
                })?;
                if let Some(stop) = stop {
                    return Ok(stop);
                }
            }
            Effect::When { condition, effect } => {
                if defined!(condition.evaluate_open(world, bindings)) {
                    defined!(effect.collect_open(world, bindings, out));
                }
            }
            Effect::Numeric {
                op,
                name,
                args,
                value,
            }
            | Effect::Continuous {
                op,
                name,
                args,
                value,
            } => {
                let fluent = defined!(ground_open(name, args, world, bindings));
                let value = defined!(value.evaluate_open(world, bindings));
                out.push(Update::Numeric {
                    fluent,
                    op: *op,
                    value,
                });
            }
            Effect::Object { name, args, value } => {
                let fluent = defined!(ground_open(name, args, world, bindings));
                let value = match value {
                    Term::Undefined => None,
                    other => Some(defined!(other.evaluate_open(world, bindings))),
                };
                out.push(Update::Object { fluent, value });
            }
            Effect::Timed { effect, .. } => {
                defined!(effect.collect_open(world, bindings, out));
            }
        }
        Ok(Fuzzy::Defined(()))
    }

    pub fn evaluate_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
    ) -> Result<Vec<Update>, EvalError> {
        let mut out = Vec::new();
        self.collect_closed(world, bindings, &mut out)?;
        Ok(out)
    }

    fn collect_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
        out: &mut Vec<Update>,
    ) -> Result<(), EvalError> {
        match self {
            Effect::And(children) => {
                for child in children {
                    child.collect_closed(world, bindings, out)?;
                }
            }
            Effect::Add { name, args } => {
                out.push(Update::Add(ground_closed(name, args, world, bindings)?));
            }
            Effect::Delete { name, args } => {
                out.push(Update::Delete(ground_closed(name, args, world, bindings)?));
            }
            Effect::Forall { vars, body } => {
                let lattice = &world.universe().lattice;
                for_each_instance(lattice, vars, bindings, |b| {
                    body.collect_closed(world, b, out)?;
                    Ok(None::<()>)
                })?;
            }
            Effect::When { condition, effect } => {
                if condition.evaluate_closed(world, bindings)? {
                    effect.collect_closed(world, bindings, out)?;
                }
            }
            Effect::Numeric {
                op,
                name,
                args,
                value,
            }
            | Effect::Continuous {
                op,
                name,
                args,
                value,
            } => {
                let fluent = ground_closed(name, args, world, bindings)?;
                let value = value.evaluate_closed(world, bindings)?;
                out.push(Update::Numeric {
                    fluent,
                    op: *op,
                    value,
                });
            }
            Effect::Object { name, args, value } => {
                let fluent = ground_closed(name, args, world, bindings)?;
                let value = match value {
                    Term::Undefined => None,
                    other => Some(other.evaluate_closed(world, bindings)?),
                };
                out.push(Update::Object { fluent, value });
            }
            Effect::Timed { effect, .. } => effect.collect_closed(world, bindings, out)?,
        }
        Ok(())
    }

    pub fn simplify(
        &self,
        world: &dyn OpenWorld,
        bindings: &Bindings,
    ) -> Result<Reduced<Vec<Update>, Effect>, EvalError> {
        let mut scratch = bindings.clone();
        attempt(self.evaluate_open(world, &mut scratch), || self.apply(bindings))
    }

    /// Substitute bound variables; `forall` variables shadow the bindings.
    pub fn apply(&self, bindings: &Bindings) -> Effect {
        let terms = |args: &[Term]| args.iter().map(|a| a.apply(bindings)).collect();
        match self {
            Effect::And(children) => {
                Effect::And(children.iter().map(|c| c.apply(bindings)).collect())
            }
            Effect::Add { name, args } => Effect::Add {
                name: name.clone(),
                args: terms(args),
            },
            Effect::Delete { name, args } => Effect::Delete {
                name: name.clone(),
                args: terms(args),
            },
            Effect::Forall { vars, body } => {
                let inner = bindings.without(vars.iter().map(|v| v.name.as_str()));
                Effect::Forall {
                    vars: vars.clone(),
                    body: Box::new(body.apply(&inner)),
                }
            }
            Effect::When { condition, effect } => Effect::When {
                condition: condition.apply(bindings),
                effect: Box::new(effect.apply(bindings)),
            },
            Effect::Numeric {
                op,
                name,
                args,
                value,
            } => Effect::Numeric {
                op: *op,
                name: name.clone(),
                args: terms(args),
                value: value.apply(bindings),
            },
            Effect::Object { name, args, value } => Effect::Object {
                name: name.clone(),
                args: terms(args),
                value: value.apply(bindings),
            },
            Effect::Timed { at, effect } => Effect::Timed {
                at: *at,
                effect: Box::new(effect.apply(bindings)),
            },
            Effect::Continuous {
                op,
                name,
                args,
                value,
            } => Effect::Continuous {
                op: *op,
                name: name.clone(),
                args: terms(args),
                value: value.apply(bindings),
            },
        }
    }

    /// Rename variables, bound ones included, through `mapping`.
    pub fn standardize(&self, mapping: &HashMap<String, String>) -> Effect {
        let terms = |args: &[Term]| args.iter().map(|a| a.standardize(mapping)).collect();
        match self {
            Effect::And(children) => {
                Effect::And(children.iter().map(|c| c.standardize(mapping)).collect())
            }
            Effect::Add { name, args } => Effect::Add {
                name: name.clone(),
                args: terms(args),
            },
            Effect::Delete { name, args } => Effect::Delete {
                name: name.clone(),
                args: terms(args),
            },
            Effect::Forall { vars, body } => Effect::Forall {
                vars: vars.iter().map(|v| rename(v, mapping)).collect(),
                body: Box::new(body.standardize(mapping)),
            },
            Effect::When { condition, effect } => Effect::When {
                condition: condition.standardize(mapping),
                effect: Box::new(effect.standardize(mapping)),
            },
            Effect::Numeric {
                op,
                name,
                args,
                value,
            } => Effect::Numeric {
                op: *op,
                name: name.clone(),
                args: terms(args),
                value: value.standardize(mapping),
            },
            Effect::Object { name, args, value } => Effect::Object {
                name: name.clone(),
                args: terms(args),
                value: value.standardize(mapping),
            },
            Effect::Timed { at, effect } => Effect::Timed {
                at: *at,
                effect: Box::new(effect.standardize(mapping)),
            },
            Effect::Continuous {
                op,
                name,
                args,
                value,
            } => Effect::Continuous {
                op: *op,
                name: name.clone(),
                args: terms(args),
                value: value.standardize(mapping),
            },
        }
    }

    pub fn collect_free(&self, out: &mut BTreeSet<Variable>) {
        match self {
            Effect::And(children) => children.iter().for_each(|c| c.collect_free(out)),
            Effect::Add { args, .. } | Effect::Delete { args, .. } => {
                args.iter().for_each(|a| a.collect_free(out))
            }
            Effect::Forall { vars, body } => {
                let mut inner = BTreeSet::new();
                body.collect_free(&mut inner);
                out.extend(
                    inner
                        .into_iter()
                        .filter(|v| !vars.iter().any(|q| q.name == v.name)),
                );
            }
            Effect::When { condition, effect } => {
                condition.collect_free(out);
                effect.collect_free(out);
            }
            Effect::Numeric { args, value, .. } | Effect::Continuous { args, value, .. } => {
                args.iter().for_each(|a| a.collect_free(out));
                value.collect_free(out);
            }
            Effect::Object { args, value, .. } => {
                args.iter().for_each(|a| a.collect_free(out));
                value.collect_free(out);
            }
            Effect::Timed { effect, .. } => effect.collect_free(out),
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
}

impl Render for Effect {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            Effect::And(children) => render::list(out, "and", children, lattice),
            Effect::Add { name, args } => render::application(out, name, args, lattice),
            Effect::Delete { name, args } => {
                out.push_str("(not ");
                render::application(out, name, args, lattice);
                out.push(')');
            }
            Effect::Forall { vars, body } => {
                render::quantifier(out, "forall", vars, body.as_ref(), lattice)
            }
            Effect::When { condition, effect } => {
                out.push_str("(when ");
                condition.render(out, lattice);
                out.push(' ');
                effect.render(out, lattice);
                out.push(')');
            }
            Effect::Numeric {
                op,
                name,
                args,
                value,
            }
            | Effect::Continuous {
                op,
                name,
                args,
                value,
            } => {
                out.push('(');
                out.push_str(op.keyword());
                out.push(' ');
                render::application(out, name, args, lattice);
                out.push(' ');
                value.render(out, lattice);
                out.push(')');
            }
            Effect::Object { name, args, value } => {
                out.push_str("(assign ");
                render::application(out, name, args, lattice);
                out.push(' ');
                value.render(out, lattice);
                out.push(')');
            }
            Effect::Timed { at, effect } => {
                render::list(out, at.keyword(), std::slice::from_ref(effect.as_ref()), lattice)
            }
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
