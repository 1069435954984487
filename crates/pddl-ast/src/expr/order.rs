//! Structural equality and canonical ordering of expressions.
//!
//! Every expression node is viewed as a rank (its variant, unique across all
//! categories) and an ordered child list. Two nodes compare by rank, then by
//! arity, then child by child. Names, numbers and variables are the leaves.
//! Numbers use the IEEE total order so the relation stays total.

use super::{ConstraintExp, Effect, LocalValue, LogicalExp, NumericExp, Term, Variable};
use std::cmp::Ordering;

/// A borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Term(&'a Term),
    Numeric(&'a NumericExp),
    Logical(&'a LogicalExp),
    Effect(&'a Effect),
    Constraint(&'a ConstraintExp),
    Local(&'a LocalValue),
    Variable(&'a Variable),
    Name(&'a str),
    Number(f64),
}

/// Canonical total order over nodes.
pub fn compare(a: &Node<'_>, b: &Node<'_>) -> Ordering {
    match (a, b) {
        (Node::Name(x), Node::Name(y)) => x.cmp(y),
        (Node::Number(x), Node::Number(y)) => x.total_cmp(y),
        (Node::Variable(x), Node::Variable(y)) => x.cmp(y),
        _ => {
            let (rank_a, children_a) = shape(a);
            let (rank_b, children_b) = shape(b);
            rank_a
                .cmp(&rank_b)
                .then(children_a.len().cmp(&children_b.len()))
                .then_with(|| {
                    children_a
                        .iter()
                        .zip(&children_b)
                        .map(|(x, y)| compare(x, y))
                        .find(|o| o.is_ne())
                        .unwrap_or(Ordering::Equal)
                })
        }
    }
}

fn terms(args: &[Term]) -> impl Iterator<Item = Node<'_>> {
    args.iter().map(Node::Term)
}

fn shape<'a>(node: &Node<'a>) -> (u16, Vec<Node<'a>>) {
    match *node {
        Node::Name(_) => (0, Vec::new()),
        Node::Number(_) => (1, Vec::new()),
        Node::Variable(_) => (2, Vec::new()),
        Node::Term(term) => term_shape(term),
        Node::Numeric(exp) => numeric_shape(exp),
        Node::Logical(exp) => logical_shape(exp),
        Node::Effect(effect) => effect_shape(effect),
        Node::Constraint(exp) => constraint_shape(exp),
        Node::Local(value) => match value {
            LocalValue::Numeric(e) => (110, vec![Node::Numeric(e)]),
            LocalValue::Term(t) => (111, vec![Node::Term(t)]),
            LocalValue::Logical(e) => (112, vec![Node::Logical(e)]),
        },
    }
}

fn term_shape(term: &Term) -> (u16, Vec<Node<'_>>) {
    match term {
        Term::Constant(c) => (10, vec![Node::Name(&c.name)]),
        Term::Variable(v) => (11, vec![Node::Variable(v)]),
        Term::Fluent { name, args, .. } => {
            (12, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        Term::Undefined => (13, Vec::new()),
    }
}

fn numeric_shape(exp: &NumericExp) -> (u16, Vec<Node<'_>>) {
    match exp {
        NumericExp::Number(n) => (20, vec![Node::Number(*n)]),
        NumericExp::Nary { op, args } => (
            21,
            std::iter::once(Node::Name(op.symbol()))
                .chain(args.iter().map(Node::Numeric))
                .collect(),
        ),
        NumericExp::Unary { op, arg } => (22, vec![Node::Name(op.symbol()), Node::Numeric(arg)]),
        NumericExp::Fluent { name, args } => {
            (23, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        NumericExp::Defined { name, args } => {
            (24, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        NumericExp::Variable(v) => (25, vec![Node::Variable(v)]),
        NumericExp::IsViolated(name) => (26, vec![Node::Name(name)]),
        NumericExp::TotalTime => (27, Vec::new()),
    }
}

fn logical_shape(exp: &LogicalExp) -> (u16, Vec<Node<'_>>) {
    match exp {
        LogicalExp::True => (40, Vec::new()),
        LogicalExp::False => (41, Vec::new()),
        LogicalExp::And(children) => (42, children.iter().map(Node::Logical).collect()),
        LogicalExp::Or(children) => (43, children.iter().map(Node::Logical).collect()),
        LogicalExp::Not(inner) => (44, vec![Node::Logical(inner)]),
        LogicalExp::Imply(cond, then) => (45, vec![Node::Logical(cond), Node::Logical(then)]),
        LogicalExp::Exists { vars, body } => (
            46,
            vars.iter()
                .map(Node::Variable)
                .chain(std::iter::once(Node::Logical(body)))
                .collect(),
        ),
        LogicalExp::Forall { vars, body } => (
            47,
            vars.iter()
                .map(Node::Variable)
                .chain(std::iter::once(Node::Logical(body)))
                .collect(),
        ),
        LogicalExp::Atom { name, args } => {
            (48, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        LogicalExp::Defined { name, args } => {
            (49, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        LogicalExp::Equal(left, right) => (50, vec![Node::Term(left), Node::Term(right)]),
        LogicalExp::Compare { op, left, right } => (
            51,
            vec![
                Node::Name(op.symbol()),
                Node::Numeric(left),
                Node::Numeric(right),
            ],
        ),
        LogicalExp::Variable(v) => (52, vec![Node::Variable(v)]),
        LogicalExp::Assign { var, value } => (53, vec![Node::Variable(var), Node::Local(value)]),
        LogicalExp::Goal(inner) => (54, vec![Node::Logical(inner)]),
        LogicalExp::Timed { at, body } => {
            (55, vec![Node::Name(at.keyword()), Node::Logical(body)])
        }
        LogicalExp::Preference { name, body } => {
            (56, vec![Node::Name(name), Node::Logical(body)])
        }
    }
}

fn effect_shape(effect: &Effect) -> (u16, Vec<Node<'_>>) {
    match effect {
        Effect::And(children) => (70, children.iter().map(Node::Effect).collect()),
        Effect::Add { name, args } => {
            (71, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        Effect::Delete { name, args } => {
            (72, std::iter::once(Node::Name(name)).chain(terms(args)).collect())
        }
        Effect::Forall { vars, body } => (
            73,
            vars.iter()
                .map(Node::Variable)
                .chain(std::iter::once(Node::Effect(body)))
                .collect(),
        ),
        Effect::When { condition, effect } => {
            (74, vec![Node::Logical(condition), Node::Effect(effect)])
        }
        Effect::Numeric {
            op,
            name,
            args,
            value,
        } => (
            75,
            [Node::Name(op.keyword()), Node::Name(name)]
                .into_iter()
                .chain(terms(args))
                .chain(std::iter::once(Node::Numeric(value)))
                .collect(),
        ),
        Effect::Object { name, args, value } => (
            76,
            std::iter::once(Node::Name(name))
                .chain(terms(args))
                .chain(std::iter::once(Node::Term(value)))
                .collect(),
        ),
        Effect::Timed { at, effect } => (77, vec![Node::Name(at.keyword()), Node::Effect(effect)]),
        Effect::Continuous {
            op,
            name,
            args,
            value,
        } => (
            78,
            [Node::Name(op.keyword()), Node::Name(name)]
                .into_iter()
                .chain(terms(args))
                .chain(std::iter::once(Node::Numeric(value)))
                .collect(),
        ),
    }
}

fn constraint_shape(exp: &ConstraintExp) -> (u16, Vec<Node<'_>>) {
    match exp {
        ConstraintExp::True => (90, Vec::new()),
        ConstraintExp::And(children) => (91, children.iter().map(Node::Constraint).collect()),
        ConstraintExp::Forall { vars, body } => (
            92,
            vars.iter()
                .map(Node::Variable)
                .chain(std::iter::once(Node::Constraint(body)))
                .collect(),
        ),
        ConstraintExp::Preference { name, body } => {
            (93, vec![Node::Name(name), Node::Constraint(body)])
        }
        ConstraintExp::Modal { op, times, args } => (
            94,
            std::iter::once(Node::Name(op.keyword()))
                .chain(times.iter().map(|t| Node::Number(*t)))
                .chain(args.iter().map(Node::Logical))
                .collect(),
        ),
        ConstraintExp::Temporal { op, args } => (
            95,
            std::iter::once(Node::Name(op.keyword()))
                .chain(args.iter().map(Node::Constraint))
                .collect(),
        ),
        ConstraintExp::Holds(f) => (96, vec![Node::Logical(f)]),
    }
}

/// Structural `Eq` and canonical `Ord` from [`compare`].
macro_rules! canonical_order {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                compare(&Node::$variant(self), &Node::$variant(other))
            }
        }
    )*};
}

canonical_order! {
    Term => Term,
    NumericExp => Numeric,
    LogicalExp => Logical,
    Effect => Effect,
    ConstraintExp => Constraint,
    LocalValue => Local,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ArithOp, TimeSpec};
    use crate::types::TypeSetId;

    fn atom(name: &str, args: &[&str]) -> LogicalExp {
        LogicalExp::atom(
            name,
            args.iter().map(|a| Term::constant(*a, TypeSetId::OBJECT)).collect(),
        )
    }

    #[test]
    fn test_rank_orders_before_arity() {
        // `true` ranks before any conjunction, however small
        assert!(LogicalExp::True < LogicalExp::And(Vec::new()));
        assert!(LogicalExp::And(vec![atom("p", &[])]) < LogicalExp::Or(Vec::new()));
    }

    #[test]
    fn test_arity_orders_before_children() {
        let short = atom("z", &["a"]);
        let long = atom("a", &["a", "b"]);
        assert!(short < long);
    }

    #[test]
    fn test_children_compare_pairwise() {
        assert!(atom("on", &["a", "b"]) < atom("on", &["a", "c"]));
        assert_eq!(atom("on", &["a", "b"]), atom("on", &["a", "b"]));
    }

    #[test]
    fn test_constant_types_do_not_affect_identity() {
        let mut lattice = crate::types::TypeLattice::new();
        lattice.declare("car", &[]).unwrap();
        let car = lattice.type_set(&["car"]).unwrap();
        assert_eq!(
            Term::constant("c1", car),
            Term::constant("c1", TypeSetId::OBJECT)
        );
    }

    #[test]
    fn test_numbers_order_totally() {
        let a = NumericExp::nary(ArithOp::Add, vec![NumericExp::Number(1.0)]);
        let b = NumericExp::nary(ArithOp::Add, vec![NumericExp::Number(2.0)]);
        assert!(a < b);
        assert_eq!(NumericExp::Number(f64::NAN), NumericExp::Number(f64::NAN));
    }

    #[test]
    fn test_timed_conditions_distinguish_time_points() {
        let start = LogicalExp::Timed {
            at: TimeSpec::AtStart,
            body: Box::new(atom("p", &[])),
        };
        let end = LogicalExp::Timed {
            at: TimeSpec::AtEnd,
            body: Box::new(atom("p", &[])),
        };
        assert_ne!(start, end);
    }
}
