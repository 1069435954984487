use super::render::{self, Render};
use super::term::{ground_closed, ground_open, rename};
use super::{
    attempt, defined, finite, simplify_operands, Bindings, EvalError, Fuzzy, Operands, Reduced,
    Term, Value, Variable,
};
use crate::model::{PreferenceSite, RootFormula};
use crate::types::TypeLattice;
use crate::world::{ClosedWorld, GroundAtom, OpenWorld, Universe};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// N-ary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn from_symbol(symbol: &str) -> Option<ArithOp> {
        Some(match symbol {
            "+" => ArithOp::Add,
            "-" => ArithOp::Sub,
            "*" => ArithOp::Mul,
            "/" => ArithOp::Div,
            "min" => ArithOp::Min,
            "max" => ArithOp::Max,
            "mod" => ArithOp::Mod,
            "^" => ArithOp::Pow,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Min => "min",
            ArithOp::Max => "max",
            ArithOp::Mod => "mod",
            ArithOp::Pow => "^",
        }
    }

    /// Fold evaluated operands.
    ///
    /// Every operator folds left and each step must stay finite. With a
    /// single operand `-` and `/` give the additive and multiplicative
    /// inverse.
    pub fn reduce(self, values: &[f64]) -> Result<f64, EvalError> {
        let (first, rest) = match (self, values.split_first()) {
            (ArithOp::Add, None) => return Ok(0.0),
            (ArithOp::Mul, None) => return Ok(1.0),
            (_, None) => {
                return Err(EvalError::Numeric(format!(
                    "'{}' needs at least one operand",
                    self.symbol()
                )))
            }
            (_, Some(split)) => split,
        };
        match self {
            ArithOp::Sub if rest.is_empty() => return finite(-first, self.symbol()),
            ArithOp::Div if rest.is_empty() => return finite(1.0 / first, self.symbol()),
            _ => {}
        }
        rest.iter().try_fold(*first, |acc, &v| {
            let next = match self {
                ArithOp::Add => acc + v,
                ArithOp::Sub => acc - v,
                ArithOp::Mul => acc * v,
                ArithOp::Div => acc / v,
                ArithOp::Min => acc.min(v),
                ArithOp::Max => acc.max(v),
                ArithOp::Mod => acc % v,
                ArithOp::Pow => acc.powf(v),
            };
            finite(next, self.symbol())
        })
    }
}

/// Unary numeric function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Sqrt,
    Abs,
    Log,
    Exp,
    Round,
    Truncate,
    Floor,
    Ceiling,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<UnaryOp> {
        Some(match symbol {
            "sqrt" => UnaryOp::Sqrt,
            "abs" => UnaryOp::Abs,
            "log" => UnaryOp::Log,
            "exp" => UnaryOp::Exp,
            "round" => UnaryOp::Round,
            "int" => UnaryOp::Truncate,
            "floor" => UnaryOp::Floor,
            "ceiling" => UnaryOp::Ceiling,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Abs => "abs",
            UnaryOp::Log => "log",
            UnaryOp::Exp => "exp",
            UnaryOp::Round => "round",
            UnaryOp::Truncate => "int",
            UnaryOp::Floor => "floor",
            UnaryOp::Ceiling => "ceiling",
        }
    }

    pub fn apply(self, value: f64) -> Result<f64, EvalError> {
        let result = match self {
            UnaryOp::Sqrt => value.sqrt(),
            UnaryOp::Abs => value.abs(),
            UnaryOp::Log => value.ln(),
            UnaryOp::Exp => value.exp(),
            UnaryOp::Round => value.round(),
            UnaryOp::Truncate => value.trunc(),
            UnaryOp::Floor => value.floor(),
            UnaryOp::Ceiling => value.ceil(),
        };
        finite(result, self.symbol())
    }
}

/// A number-valued expression.
#[derive(Debug, Clone)]
pub enum NumericExp {
    Number(f64),
    Nary {
        op: ArithOp,
        args: Vec<NumericExp>,
    },
    Unary {
        op: UnaryOp,
        arg: Box<NumericExp>,
    },
    /// Numeric fluent application
    Fluent {
        name: String,
        args: Vec<Term>,
    },
    /// TLPlan defined function application
    Defined {
        name: String,
        args: Vec<Term>,
    },
    /// Numeric local, `?duration` or `#t`
    Variable(Variable),
    /// `(is-violated p)`
    IsViolated(String),
    /// `total-time`
    TotalTime,
}

impl NumericExp {
    pub fn nary(op: ArithOp, args: Vec<NumericExp>) -> Self {
        NumericExp::Nary { op, args }
    }

    pub fn fluent(name: impl Into<String>, args: Vec<Term>) -> Self {
        NumericExp::Fluent {
            name: name.into(),
            args,
        }
    }

    pub fn evaluate_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
    ) -> Result<Fuzzy<f64>, EvalError> {
        match self {
            NumericExp::Number(n) => Ok(Fuzzy::Defined(*n)),
            NumericExp::Nary { op, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(defined!(arg.evaluate_open(world, bindings)));
                }
                op.reduce(&values).map(Fuzzy::Defined)
            }
            NumericExp::Unary { op, arg } => {
                let value = defined!(arg.evaluate_open(world, bindings));
                op.apply(value).map(Fuzzy::Defined)
            }
            NumericExp::Fluent { name, args } => {
                let atom = defined!(ground_open(name, args, world, bindings));
                Ok(world.fuzzy_numeric(&atom))
            }
            NumericExp::Defined { name, args } => {
                let atom = defined!(ground_open(name, args, world, bindings));
                call_open(&atom, world, bindings)
            }
            NumericExp::Variable(v) => Ok(Fuzzy::Defined(bindings.number(&v.name)?)),
            NumericExp::IsViolated(name) => violations_open(name, world, bindings),
            NumericExp::TotalTime => Ok(world.fuzzy_numeric(&GroundAtom::nullary("total-time"))),
        }
    }

    pub fn evaluate_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
    ) -> Result<f64, EvalError> {
        match self {
            NumericExp::Number(n) => Ok(*n),
            NumericExp::Nary { op, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate_closed(world, bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                op.reduce(&values)
            }
            NumericExp::Unary { op, arg } => op.apply(arg.evaluate_closed(world, bindings)?),
            NumericExp::Fluent { name, args } => {
                let atom = ground_closed(name, args, world, bindings)?;
                world
                    .numeric(&atom)
                    .ok_or_else(|| EvalError::Undefined(atom.to_string()))
            }
            NumericExp::Defined { name, args } => {
                let atom = ground_closed(name, args, world, bindings)?;
                call_closed(&atom, world, bindings)
            }
            NumericExp::Variable(v) => bindings.number(&v.name),
            NumericExp::IsViolated(name) => violations_closed(name, world, bindings),
            NumericExp::TotalTime => {
                let atom = GroundAtom::nullary("total-time");
                world
                    .numeric(&atom)
                    .ok_or_else(|| EvalError::Undefined(atom.to_string()))
            }
        }
    }

    pub fn simplify(
        &self,
        world: &dyn OpenWorld,
        bindings: &Bindings,
    ) -> Result<Reduced<f64, NumericExp>, EvalError> {
        match self {
            NumericExp::Number(n) => Ok(Reduced::Value(*n)),
            NumericExp::Nary { op, args } => {
                match simplify_operands(args, |a| a.simplify(world, bindings), NumericExp::Number)?
                {
                    Operands::Values(values) => op.reduce(&values).map(Reduced::Value),
                    Operands::Undefined => Ok(Reduced::Undefined),
                    Operands::Residual(args) => Ok(Reduced::Residual(NumericExp::Nary {
                        op: *op,
                        args,
                    })),
                }
            }
            NumericExp::Unary { op, arg } => match arg.simplify(world, bindings)? {
                Reduced::Value(v) => op.apply(v).map(Reduced::Value),
                Reduced::Undefined => Ok(Reduced::Undefined),
                Reduced::Residual(arg) => Ok(Reduced::Residual(NumericExp::Unary {
                    op: *op,
                    arg: Box::new(arg),
                })),
            },
            _ => {
                let mut scratch = bindings.clone();
                attempt(self.evaluate_open(world, &mut scratch), || self.apply(bindings))
            }
        }
    }

    /// Substitute bound variables.
    pub fn apply(&self, bindings: &Bindings) -> NumericExp {
        match self {
            NumericExp::Nary { op, args } => NumericExp::Nary {
                op: *op,
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            NumericExp::Unary { op, arg } => NumericExp::Unary {
                op: *op,
                arg: Box::new(arg.apply(bindings)),
            },
            NumericExp::Fluent { name, args } => NumericExp::Fluent {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            NumericExp::Defined { name, args } => NumericExp::Defined {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(bindings)).collect(),
            },
            NumericExp::Variable(v) => match bindings.get(&v.name) {
                Some(Value::Number(n)) => NumericExp::Number(*n),
                _ => self.clone(),
            },
            NumericExp::Number(_) | NumericExp::IsViolated(_) | NumericExp::TotalTime => {
                self.clone()
            }
        }
    }

    /// Rename variables through `mapping`.
    pub fn standardize(&self, mapping: &HashMap<String, String>) -> NumericExp {
        match self {
            NumericExp::Nary { op, args } => NumericExp::Nary {
                op: *op,
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            NumericExp::Unary { op, arg } => NumericExp::Unary {
                op: *op,
                arg: Box::new(arg.standardize(mapping)),
            },
            NumericExp::Fluent { name, args } => NumericExp::Fluent {
                name: name.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            NumericExp::Defined { name, args } => NumericExp::Defined {
                name: name.clone(),
                args: args.iter().map(|a| a.standardize(mapping)).collect(),
            },
            NumericExp::Variable(v) => NumericExp::Variable(rename(v, mapping)),
            NumericExp::Number(_) | NumericExp::IsViolated(_) | NumericExp::TotalTime => {
                self.clone()
            }
        }
    }

    pub fn collect_free(&self, out: &mut BTreeSet<Variable>) {
        match self {
            NumericExp::Nary { args, .. } => args.iter().for_each(|a| a.collect_free(out)),
            NumericExp::Unary { arg, .. } => arg.collect_free(out),
            NumericExp::Fluent { args, .. } | NumericExp::Defined { args, .. } => {
                args.iter().for_each(|a| a.collect_free(out))
            }
            NumericExp::Variable(v) => {
                out.insert(v.clone());
            }
            NumericExp::Number(_) | NumericExp::IsViolated(_) | NumericExp::TotalTime => {}
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

fn defined_function<'u>(
    universe: &'u Universe,
    atom: &GroundAtom,
) -> Result<(&'u [Variable], &'u super::LogicalExp, &'u NumericExp), EvalError> {
    match universe.formulas.get(&atom.name) {
        Some(RootFormula::DefinedFunction {
            signature,
            body,
            result,
            ..
        }) => Ok((&signature.params, body, result)),
        _ => Err(EvalError::UnknownFormula(atom.name.clone())),
    }
}

/// Bind the parameters of a formula body in a fresh frame.
pub(crate) fn bind_params(bindings: &mut Bindings, params: &[Variable], atom: &GroundAtom) {
    for (param, arg) in params.iter().zip(&atom.args) {
        bindings.bind(param.name.clone(), Value::Object(arg.clone()));
    }
}

fn call_open(
    atom: &GroundAtom,
    world: &dyn OpenWorld,
    bindings: &mut Bindings,
) -> Result<Fuzzy<f64>, EvalError> {
    let (params, body, result) = defined_function(world.universe(), atom)?;
    if !bindings.begin(atom)? {
        return Err(EvalError::Recursion(atom.to_string()));
    }
    let frame = bindings.enter();
    bind_params(bindings, params, atom);
    let outcome = match body.evaluate_open(world, bindings) {
        Ok(Fuzzy::Defined(true)) => result.evaluate_open(world, bindings),
        Ok(Fuzzy::Defined(false)) => Ok(Fuzzy::Undefined),
        other => other.map(|f| f.map(|_| 0.0)),
    };
    bindings.leave(frame);
    bindings.end();
    outcome
}

fn call_closed(
    atom: &GroundAtom,
    world: &dyn ClosedWorld,
    bindings: &mut Bindings,
) -> Result<f64, EvalError> {
    let (params, body, result) = defined_function(world.universe(), atom)?;
    if !bindings.begin(atom)? {
        return Err(EvalError::Recursion(atom.to_string()));
    }
    let frame = bindings.enter();
    bind_params(bindings, params, atom);
    let outcome = match body.evaluate_closed(world, bindings) {
        Ok(true) => result.evaluate_closed(world, bindings),
        Ok(false) => Err(EvalError::Undefined(atom.to_string())),
        Err(err) => Err(err),
    };
    bindings.leave(frame);
    bindings.end();
    outcome
}

/// Counter value plus the goal preferences violated in this state.
fn violations_open(
    name: &str,
    world: &dyn OpenWorld,
    bindings: &mut Bindings,
) -> Result<Fuzzy<f64>, EvalError> {
    let universe = world.universe();
    let Some(group) = universe.preferences.get(name) else {
        return Ok(Fuzzy::Defined(0.0));
    };
    let mut total = match &group.counter {
        Some(counter) => defined!(Ok::<_, EvalError>(
            world.fuzzy_numeric(&GroundAtom::nullary(counter.as_str()))
        )),
        None => 0.0,
    };
    for instance in group.instances.iter().filter(|i| i.site == PreferenceSite::Goal) {
        let Some(condition) = instance.condition() else {
            continue;
        };
        let frame = bindings.enter();
        let mut violated = 0.0;
        let outcome = super::for_each_instance(
            &universe.lattice,
            &instance.context,
            bindings,
            |b| match condition.evaluate_open(world, b)? {
                Fuzzy::Defined(true) => Ok(None),
                Fuzzy::Defined(false) => {
                    violated += 1.0;
                    Ok(None)
                }
                other => Ok(Some(other.map(|_| 0.0))),
            },
        );
        bindings.leave(frame);
        if let Some(stop) = outcome? {
            return Ok(stop);
        }
        total += violated;
    }
    Ok(Fuzzy::Defined(total))
}

fn violations_closed(
    name: &str,
    world: &dyn ClosedWorld,
    bindings: &mut Bindings,
) -> Result<f64, EvalError> {
    let universe = world.universe();
    let Some(group) = universe.preferences.get(name) else {
        return Ok(0.0);
    };
    let mut total = match &group.counter {
        Some(counter) => world
            .numeric(&GroundAtom::nullary(counter.as_str()))
            .ok_or_else(|| EvalError::Undefined(counter.clone()))?,
        None => 0.0,
    };
    for instance in group.instances.iter().filter(|i| i.site == PreferenceSite::Goal) {
        let Some(condition) = instance.condition() else {
            continue;
        };
        let frame = bindings.enter();
        let mut violated = 0.0;
        let outcome = super::for_each_instance(
            &universe.lattice,
            &instance.context,
            bindings,
            |b| {
                if !condition.evaluate_closed(world, b)? {
                    violated += 1.0;
                }
                Ok(None::<()>)
            },
        );
        bindings.leave(frame);
        outcome?;
        total += violated;
    }
    Ok(total)
}

impl Render for NumericExp {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        match self {
            NumericExp::Number(n) => out.push_str(&render::number(*n)),
            NumericExp::Nary { op, args } => render::list(out, op.symbol(), args, lattice),
            NumericExp::Unary { op, arg } => {
                render::list(out, op.symbol(), std::slice::from_ref(arg.as_ref()), lattice)
            }
            NumericExp::Fluent { name, args } | NumericExp::Defined { name, args } => {
                render::application(out, name, args, lattice)
            }
            NumericExp::Variable(v) => out.push_str(&v.name),
            NumericExp::IsViolated(name) => {
                out.push_str("(is-violated ");
                out.push_str(name);
                out.push(')');
            }
            NumericExp::TotalTime => out.push_str("total-time"),
        }
    }
}

impl fmt::Display for NumericExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
