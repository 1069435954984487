use super::render::{self, Render};
use super::{Bindings, EvalError, Fuzzy, NumericExp};
use crate::types::TypeLattice;
use crate::world::{ClosedWorld, OpenWorld};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Optimization {
    Minimize,
    Maximize,
}

impl Optimization {
    pub fn from_keyword(keyword: &str) -> Option<Optimization> {
        match keyword {
            "minimize" => Some(Optimization::Minimize),
            "maximize" => Some(Optimization::Maximize),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Optimization::Minimize => "minimize",
            Optimization::Maximize => "maximize",
        }
    }
}

/// Plan metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub direction: Optimization,
    pub exp: NumericExp,
}

impl Default for Metric {
    /// `(minimize total-time)`
    fn default() -> Self {
        Self {
            direction: Optimization::Minimize,
            exp: NumericExp::TotalTime,
        }
    }
}

impl Metric {
    pub fn evaluate_open(
        &self,
        world: &dyn OpenWorld,
        bindings: &mut Bindings,
    ) -> Result<Fuzzy<f64>, EvalError> {
        self.exp.evaluate_open(world, bindings)
    }

    pub fn evaluate_closed(
        &self,
        world: &dyn ClosedWorld,
        bindings: &mut Bindings,
    ) -> Result<f64, EvalError> {
        self.exp.evaluate_closed(world, bindings)
    }
}

impl Render for Metric {
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>) {
        render::list(
            out,
            self.direction.keyword(),
            std::slice::from_ref(&self.exp),
            lattice,
        );
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render::display(self, f)
    }
}
