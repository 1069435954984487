use super::render::{self, Render};
use super::term::rename;
use super::{Bindings, EvalError, LogicalExp, Reduced, Variable};
use crate::types::TypeLattice;
use crate::world::OpenWorld;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// PDDL3 modal operator over state formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModalOp {
    AtEnd,
    Always,
    Sometime,
    Within,
    AtMostOnce,
    SometimeAfter,
    SometimeBefore,
    AlwaysWithin,
    HoldDuring,
    HoldAfter,
}

impl ModalOp {
    pub fn from_keyword(keyword: &str) -> Option<ModalOp> {
        Some(match keyword {
            "at-end" | "at end" => ModalOp::AtEnd,
            "always" => ModalOp::Always,
            "sometime" => ModalOp::Sometime,
            "within" => ModalOp::Within,
            "at-most-once" => ModalOp::AtMostOnce,
            "sometime-after" => ModalOp::SometimeAfter,
            "sometime-before" => ModalOp::SometimeBefore,
            "always-within" => ModalOp::AlwaysWithin,
            "hold-during" => ModalOp::HoldDuring,
            "hold-after" => ModalOp::HoldAfter,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ModalOp::AtEnd => "at end",
            ModalOp::Always => "always",
            ModalOp::Sometime => "sometime",
            ModalOp::Within => "within",
            ModalOp::AtMostOnce => "at-most-once",
            ModalOp::SometimeAfter => "sometime-after",
            ModalOp::SometimeBefore => "sometime-before",
            ModalOp::AlwaysWithin => "always-within",
            ModalOp::HoldDuring => "hold-during",
            ModalOp::HoldAfter => "hold-after",
        }
    }

    /// Number of leading time bounds.
    pub fn times(self) -> usize {
        match self {
            ModalOp::Within | ModalOp::AlwaysWithin | ModalOp::HoldAfter => 1,
            ModalOp::HoldDuring => 2,
            _ => 0,
        }
    }

    /// Number of formula operands.
    pub fn operands(self) -> usize {
        match self {
            ModalOp::SometimeAfter | ModalOp::SometimeBefore | ModalOp::AlwaysWithin => 2,
            _ => 1,
        }
    }
}

/// TLPlan linear temporal operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalOp {
    Next,
    Eventually,
    Until,
    Release,
}

impl TemporalOp {
    pub fn from_keyword(keyword: &str) -> Option<TemporalOp> {
        Some(match keyword {
            "next" => TemporalOp::Next,
            "eventually" => TemporalOp::Eventually,
            "until" => TemporalOp::Until,
            "release" => TemporalOp::Release,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TemporalOp::Next => "next",
            TemporalOp::Eventually => "eventually",
            TemporalOp::Until => "until",
            TemporalOp::Release => "release",
        }
    }

    pub fn operands(self) -> usize {
        match self {
            TemporalOp::Until | TemporalOp::Release => 2,
            TemporalOp::Next | TemporalOp::Eventually => 1,
        }
    }
}

/// A trajectory constraint.
///
/// Constraints describe whole plans, so they carry no state evaluation;
/// `simplify` only reduces the state formulas they embed.
#[derive(Debug, Clone)]
pub enum ConstraintExp {
    True,
    And(Vec<ConstraintExp>),
    Forall {
        vars: Vec<Variable>,
        body: Box<ConstraintExp>,
    },
    Preference {
        name: String,
        body: Box<ConstraintExp>,
    },
    Modal {
        op: ModalOp,
        times: Vec<f64>,
        args: Vec<LogicalExp>,
    },
    Temporal {
        op: TemporalOp,
        args: Vec<ConstraintExp>,
    },
    /// A state formula used as a temporal operand
    Holds(LogicalExp),
}

impl ConstraintExp {
    /// Conjunction that drops `true` operands and unwraps a single one.
    pub fn conjoin(parts: impl IntoIterator<Item = ConstraintExp>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                ConstraintExp::True => {}
                ConstraintExp::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => ConstraintExp::True,
            1 => flat.remove(0),
            _ => ConstraintExp::And(flat),
        }
    }

    pub fn is_trivial(&self) -> bool {
        match self {
            ConstraintExp::True => true,
            ConstraintExp::And(children) => children.iter().all(ConstraintExp::is_trivial),
            _ => false,
        }
    }

    /// Reduce embedded state formulas with the given bindings.
    pub fn simplify(
        &self,
        world: &dyn OpenWorld,
        bindings: &Bindings,
    ) -> Result<ConstraintExp, EvalError> {
        let formula = |f: &LogicalExp| -> Result<LogicalExp, EvalError> {
            Ok(match f.simplify(world, bindings)? {
                Reduced::Value(v) => LogicalExp::from(v),
                Reduced::Undefined => f.clone(),
                Reduced::Residual(r) => r,
            })
        };
        Ok(match self {
            ConstraintExp::True => ConstraintExp::True,
            ConstraintExp::And(children) => ConstraintExp::And(
                children
                    .iter()
                    .map(|c| c.simplify(world, bindings))
                    .collect::<Result<_, _>>()?,
            ),
            ConstraintExp::Forall { vars, body } => {
                let inner = bindings.without(vars.iter().map(|v| v.name.as_str()));
                ConstraintExp::Forall {
                    vars: vars.clone(),
                    body: Box::new(body.simplify(world, &inner)?),
                }
            }
            ConstraintExp::Preference { name, body } => ConstraintExp::Preference {
                name: name.clone(),
                body: Box::new(body.simplify(world, bindings)?),
            },
            ConstraintExp::Modal { op, times, args } => ConstraintExp::Modal {
                op: *op,
                times: times.clone(),
                args: args.iter().map(formula).collect::<Result<_, _>>()?,
            },
            ConstraintExp::Temporal { op, args } => ConstraintExp::Temporal {
                op: *op,
                args: args
                    .iter()
                    .map(|a| a.simplify(world, bindings))
                    .collect::<Result<_, _>>()?,
            },
            ConstraintExp::Holds(f) => ConstraintExp::Holds(formula(f)?),
        })
    }

    pub fn apply(&self, bindings: &Bindings) -> ConstraintExp {
        match self {
            ConstraintExp::True => ConstraintExp::True,
            ConstraintExp::And(children) => {
                ConstraintExp::And(children.iter().map(|c| c.apply(bindings)).collect())
            }
            ConstraintExp::Forall { vars, body } => {
                let inner = bindings.without(vars.iter().map(|v| v.name.as_str()));
                ConstraintExp::Forall {
                    vars: vars.clone(),
                    body: Box::new(body.apply(&inner)),
                }
            }
            ConstraintExp::Preference { name, body } => ConstraintExp::Preference {
                name: name.clone(),
                body: Box::new(body.apply(bindings)),
            },
            ConstraintExp::Modal { op, times, args } => ConstraintExp::Modal {
                op: *op,
                times: times.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            ConstraintExp::Temporal { op, args } => ConstraintExp::Temporal {
                op: *op,
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            ConstraintExp::Holds(f) => ConstraintExp::Holds(f.apply(bindings)),
        }
    }

    pub fn standardize(&self, mapping: &HashMap<String, String>) -> ConstraintExp {
        match self {
            ConstraintExp::True => ConstraintExp::True,
            ConstraintExp::And(children) => {
                ConstraintExp::And(children.iter().map(|c| c.standardize(mapping)).collect())
            }
            ConstraintExp::Forall { vars, body } => ConstraintExp::Forall {
                vars: vars.iter().map(|v| rename(v, mapping)).collect(),
                body: Box::new(body.standardize(mapping)),
            },
            ConstraintExp::Preference { name, body } => ConstraintExp::Preference {
                name: name.clone(),
                body: Box::new(body.standardize(mapping)),
            },
            ConstraintExp::Modal { op, times, args } => ConstraintExp::Modal {
                op: *op,
                times: times.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            ConstraintExp::Temporal { op, args } => ConstraintExp::Temporal {
                op: *op,
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            ConstraintExp::Holds(f) => ConstraintExp::Holds(f.standardize(mapping)),
        }
    }

    pub fn collect_free(&self, out: &mut BTreeSet<Variable>) {
        match self {
            ConstraintExp::True => {}
            ConstraintExp::And(children) => children.iter().for_each(|c| c.collect_free(out)),
            ConstraintExp::Forall { vars, body } => {
                let mut inner = BTreeSet::new();
                body.collect_free(&mut inner);
                out.extend(
                    inner
                        .into_iter()
                        .filter(|v| !vars.iter().any(|q| q.name == v.name)),
                );
            }
            ConstraintExp::Preference { body, .. } => body.collect_free(out),
            ConstraintExp::Modal { args, .. } => args.iter().for_each(|a| a.collect_free(out)),
            ConstraintExp::Temporal { args, .. } => args.iter().for_each(|a| a.collect_free(out)),
            ConstraintExp::Holds(f) => f.collect_free(out),
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

impl Render for ConstraintExp {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            ConstraintExp::True => out.push_str("(and)"),
            ConstraintExp::And(children) => render::list(out, "and", children, lattice),
            ConstraintExp::Forall { vars, body } => {
                render::quantifier(out, "forall", vars, body.as_ref(), lattice)
            }
            ConstraintExp::Preference { name, body } => {
                out.push_str("(preference ");
                out.push_str(name);
                out.push(' ');
                body.render(out, lattice);
                out.push(')');
            }
            ConstraintExp::Modal { op, times, args } => {
                out.push('(');
                out.push_str(op.keyword());
                for t in times {
                    out.push(' ');
                    out.push_str(&render::number(*t));
                }
                for a in args {
                    out.push(' ');
                    a.render(out, lattice);
                }
                out.push(')');
            }
            ConstraintExp::Temporal { op, args } => render::list(out, op.keyword(), args, lattice),
            ConstraintExp::Holds(f) => f.render(out, lattice),
        }
    }
}

impl fmt::Display for ConstraintExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
