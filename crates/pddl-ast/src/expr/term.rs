use super::render::{self, Render};
use super::{attempt, defined, Bindings, EvalError, Fuzzy, Reduced, Value, Variable};
use crate::types::{TypeLattice, TypeSetId};
use crate::world::{ClosedWorld, GroundAtom, OpenWorld};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named object of the domain or problem.
///
/// Constants are identified by name; the type set is carried along for
/// domain materialization and type checks.
#[derive(Debug, Clone)]
pub struct Constant {
    pub name: String,
    pub types: TypeSetId,
}

impl Constant {
    pub fn new(name: impl Into<String>, types: TypeSetId) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Constant {}

impl PartialOrd for Constant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Constant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An object-valued expression.
#[derive(Debug, Clone)]
pub enum Term {
    Constant(Constant),
    Variable(Variable),
    /// Object fluent application; `types` is the declared result type set
    Fluent {
        name: String,
        args: Vec<Term>,
        types: TypeSetId,
    },
    /// The explicit `undefined` object
    Undefined,
}

impl Term {
    pub fn constant(name: impl Into<String>, types: TypeSetId) -> Self {
        Term::Constant(Constant::new(name, types))
    }

    /// Type set the term ranges over, `None` for `undefined`.
    pub fn types(&self) -> Option<TypeSetId> {
        match self {
            Term::Constant(c) => Some(c.types),
            Term::Variable(v) => Some(v.types()),
            Term::Fluent { types, .. } => Some(*types),
            Term::Undefined => None,
        }
    }

    pub fn evaluate_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
    ) -> Result<Fuzzy<Constant>, EvalError> {
        match self {
            Term::Constant(c) => Ok(Fuzzy::Defined(c.clone())),
            Term::Variable(v) => Ok(Fuzzy::Defined(bindings.object(&v.name)?.clone())),
            Term::Fluent { name, args, .. } => {
                let atom = defined!(ground_open(name, args, world, bindings));
                Ok(world.fuzzy_object(&atom))
            }
            Term::Undefined => Ok(Fuzzy::Undefined),
        }
    }

    pub fn evaluate_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
    ) -> Result<Constant, EvalError> {
        match self {
            Term::Constant(c) => Ok(c.clone()),
            Term::Variable(v) => Ok(bindings.object(&v.name)?.clone()),
            Term::Fluent { name, args, .. } => {
                let atom = ground_closed(name, args, world, bindings)?;
                world
                    .object(&atom)
                    .ok_or_else(|| EvalError::Undefined(atom.to_string()))
            }
            Term::Undefined => Err(EvalError::Undefined("undefined".into())),
        }
    }

    pub fn simplify(
        &self,
        world: &dyn OpenWorld,
        bindings: &Bindings,
    ) -> Result<Reduced<Constant, Term>, EvalError> {
        match self {
            Term::Constant(c) => Ok(Reduced::Value(c.clone())),
            Term::Undefined => Ok(Reduced::Undefined),
            _ => {
                let mut scratch = bindings.clone();
                attempt(self.evaluate_open(world, &mut scratch), || self.apply(bindings))
            }
        }
    }

    /// Substitute bound object variables.
    pub fn apply(&self, bindings: &Bindings) -> Term {
        match self {
            Term::Variable(v) => match bindings.get(&v.name) {
                Some(Value::Object(c)) => Term::Constant(c.clone()),
                _ => self.clone(),
            },
            Term::Fluent { name, args, types } => Term::Fluent {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
                types: *types,
            },
            Term::Constant(_) | Term::Undefined => self.clone(),
        }
    }

    /// Rename variables through `mapping`.
    pub fn standardize(&self, mapping: &HashMap<String, String>) -> Term {
        match self {
            Term::Variable(v) => Term::Variable(rename(v, mapping)),
            Term::Fluent { name, args, types } => Term::Fluent {
                name: name.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
                types: *types,
            },
            Term::Constant(_) | Term::Undefined => self.clone(),
        }
    }

    pub fn collect_free(&self, out: &mut BTreeSet<Variable>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Fluent { args, .. } => args.iter().for_each(|a| a.collect_free(out)),
            Term::Constant(_) | Term::Undefined => {}
        }
    }

    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut out);
        out
    }

    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Fluent { args, .. } => args.iter().all(Term::is_ground),
            Term::Constant(_) | Term::Undefined => true,
        }
    }
}

pub(crate) fn rename(var: &Variable, mapping: &HashMap<String, String>) -> Variable {
    match mapping.get(&var.name) {
        Some(name) => var.renamed(name.clone()),
        None => var.clone(),
    }
}

/// Evaluate the arguments of an application.
pub(crate) fn ground_open(
    name: &str,
    args: &[Term],
    world: &dyn OpenWorld,
    bindings: &mut Bindings,
) -> Result<Fuzzy<GroundAtom>, EvalError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(defined!(arg.evaluate_open(world, bindings)));
    }
    Ok(Fuzzy::Defined(GroundAtom::new(name, values)))
}

pub(crate) fn ground_closed(
    name: &str,
    args: &[Term],
    world: &dyn ClosedWorld,
    bindings: &mut Bindings,
) -> Result<GroundAtom, EvalError> {
    let values = args
        .iter()
        .map(|arg| arg.evaluate_closed(world, bindings))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(GroundAtom::new(name, values))
}

impl Render for Term {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            Term::Constant(c) => out.push_str(&c.name),
            Term::Variable(v) => out.push_str(&v.name),
            Term::Fluent { name, args, .. } => render::application(out, name, args, lattice),
            Term::Undefined => out.push_str("undefined"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
