//! Deterministic s-expression rendering.
//!
//! `Display` renders the untyped form. [`Render::render_typed`] additionally
//! annotates quantified variables with their type sets.

use super::{Term, Variable};
use crate::types::TypeLattice;
use std::fmt;

pub trait Render {
    /// Append the rendering to `out`, typed when a lattice is given.
    fn render(&self, out: &mut String, lattice: Option<&TypeLattice>);

    fn render_typed(&self, lattice: &TypeLattice) -> String {
        let mut out = String::new();
        self.render(&mut out, Some(lattice));
        out
    }
}

pub(crate) fn display(value: &impl Render, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = String::new();
    value.render(&mut out, None);
    f.write_str(&out)
}

/// Shortest decimal form; integral values have no fraction.
pub(crate) fn number(value: f64) -> String {
    format!("{value}")
}

/// `(head item item ...)`
pub(crate) fn list<T: Render>(
    out: &mut String,
    head: &str,
    items: &[T],
    lattice: Option<&TypeLattice>,
) {
    out.push('(');
    out.push_str(head);
    for item in items {
        out.push(' ');
        item.render(out, lattice);
    }
    out.push(')');
}

/// `(name arg ...)`
pub(crate) fn application(
    out: &mut String,
    name: &str,
    args: &[Term],
    lattice: Option<&TypeLattice>,
) {
    list(out, name, args, lattice);
}

pub(crate) fn variables(out: &mut String, vars: &[Variable], lattice: Option<&TypeLattice>) {
    out.push('(');
    for (i, var) in vars.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&var.name);
        if let Some(lattice) = lattice {
            out.push_str(" - ");
            out.push_str(&lattice.render(var.types()));
        }
    }
    out.push(')');
}

pub(crate) fn quantifier<T: Render>(
    out: &mut String,
    head: &str,
    vars: &[Variable],
    body: &T,
    lattice: Option<&TypeLattice>,
) {
    out.push('(');
    out.push_str(head);
    out.push(' ');
    variables(out, vars, lattice);
    out.push(' ');
    body.render(out, lattice);
    out.push(')');
}
