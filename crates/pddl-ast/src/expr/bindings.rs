use super::{Constant, EvalError, VariableClass};
use crate::world::GroundAtom;
use std::fmt;

/// A value a variable can be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Object(Constant),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn class(&self) -> VariableClass {
        match self {
            Value::Object(_) => VariableClass::Object,
            Value::Number(_) => VariableClass::Numeric,
            Value::Boolean(_) => VariableClass::Boolean,
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Number(_) => "numeric",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(c) => write!(f, "{}", c.name),
            Value::Number(n) => write!(f, "{}", super::render::number(*n)),
            Value::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Maximum nesting of derived/defined formula evaluations.
const MAX_DEPTH: usize = 256;

/// Scoped variable bindings used during evaluation.
///
/// Bindings form a stack; lookups search from the top down to the base of the
/// current frame. Entering a derived or defined formula opens a fresh frame so
/// its parameters cannot see the caller's variables.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    slots: Vec<(String, Value)>,
    base: usize,
    /// Ground formula applications currently being evaluated.
    active: Vec<GroundAtom>,
}

/// Saved state of [`Bindings::enter`].
#[derive(Debug)]
#[must_use]
pub struct Frame {
    base: usize,
    mark: usize,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name on top of the stack, shadowing earlier bindings.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.slots.push((name.into(), value));
    }

    /// Builder form of [`bind`](Self::bind).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }

    /// Overwrite the visible binding of `name`, or bind it if absent.
    pub fn assign(&mut self, name: &str, value: Value) {
        let base = self.base;
        match self.slots[base..].iter_mut().rev().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.bind(name, value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots[self.base..]
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up an object binding.
    pub fn object(&self, name: &str) -> Result<&Constant, EvalError> {
        match self.get(name) {
            Some(Value::Object(c)) => Ok(c),
            Some(other) => Err(EvalError::BindingKind {
                name: name.to_string(),
                expected: "object",
                found: other.class_name(),
            }),
            None => Err(EvalError::Unbound(name.to_string())),
        }
    }

    /// Look up a numeric binding.
    pub fn number(&self, name: &str) -> Result<f64, EvalError> {
        match self.get(name) {
            Some(Value::Number(n)) => Ok(*n),
            Some(other) => Err(EvalError::BindingKind {
                name: name.to_string(),
                expected: "numeric",
                found: other.class_name(),
            }),
            None => Err(EvalError::Unbound(name.to_string())),
        }
    }

    /// Look up a boolean binding.
    pub fn boolean(&self, name: &str) -> Result<bool, EvalError> {
        match self.get(name) {
            Some(Value::Boolean(b)) => Ok(*b),
            Some(other) => Err(EvalError::BindingKind {
                name: name.to_string(),
                expected: "boolean",
                found: other.class_name(),
            }),
            None => Err(EvalError::Unbound(name.to_string())),
        }
    }

    /// Current stack height, for [`truncate`](Self::truncate).
    pub fn mark(&self) -> usize {
        self.slots.len()
    }

    /// Drop every binding pushed after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.slots.truncate(mark.max(self.base));
    }

    /// Open a frame that hides all current bindings.
    pub fn enter(&mut self) -> Frame {
        let frame = Frame {
            base: self.base,
            mark: self.slots.len(),
        };
        self.base = self.slots.len();
        frame
    }

    /// Close a frame opened by [`enter`](Self::enter).
    pub fn leave(&mut self, frame: Frame) {
        self.slots.truncate(frame.mark);
        self.base = frame.base;
    }

    /// Copy of the visible bindings without the given names.
    ///
    /// Used when substituting under a quantifier, whose variables shadow
    /// outer bindings.
    pub fn without<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Bindings {
        let hidden: Vec<&str> = names.into_iter().collect();
        Bindings {
            slots: self.slots[self.base..]
                .iter()
                .filter(|(n, _)| !hidden.contains(&n.as_str()))
                .cloned()
                .collect(),
            base: 0,
            active: Vec::new(),
        }
    }

    /// Visible bindings, innermost last.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots[self.base..].iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == self.base
    }

    /// Start evaluating a formula application.
    ///
    /// Returns `false` when the same application is already in progress.
    pub(crate) fn begin(&mut self, atom: &GroundAtom) -> Result<bool, EvalError> {
        if self.active.len() >= MAX_DEPTH {
            return Err(EvalError::Recursion(atom.name.clone()));
        }
        if self.active.contains(atom) {
            return Ok(false);
        }
        self.active.push(atom.clone());
        Ok(true)
    }

    pub(crate) fn end(&mut self) {
        self.active.pop();
    }
}

impl FromIterator<(String, Value)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Bindings {
            slots: iter.into_iter().collect(),
            base: 0,
            active: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeSetId;

    #[test]
    fn test_shadowing_and_truncate() {
        let mut b = Bindings::new();
        b.bind("?x", Value::Number(1.0));
        let mark = b.mark();
        b.bind("?x", Value::Number(2.0));
        assert_eq!(b.number("?x"), Ok(2.0));
        b.truncate(mark);
        assert_eq!(b.number("?x"), Ok(1.0));
    }

    #[test]
    fn test_frames_hide_outer_bindings() {
        let mut b = Bindings::new().with("?x", Value::Boolean(true));
        let frame = b.enter();
        assert_eq!(b.boolean("?x"), Err(EvalError::Unbound("?x".into())));
        b.bind("?y", Value::Number(3.0));
        b.leave(frame);
        assert!(b.contains("?x"));
        assert!(!b.contains("?y"));
    }

    #[test]
    fn test_assign_overwrites_visible_binding() {
        let mut b = Bindings::new();
        b.assign("?v", Value::Number(1.0));
        b.assign("?v", Value::Number(5.0));
        assert_eq!(b.iter().count(), 1);
        assert_eq!(b.number("?v"), Ok(5.0));
    }

    #[test]
    fn test_kind_mismatch_is_reported() {
        let b = Bindings::new().with("?x", Value::Object(Constant::new("a", TypeSetId::OBJECT)));
        assert!(matches!(
            b.number("?x"),
            Err(EvalError::BindingKind { expected: "numeric", found: "object", .. })
        ));
    }

    #[test]
    fn test_without_hides_names() {
        let b = Bindings::new()
            .with("?x", Value::Number(1.0))
            .with("?y", Value::Number(2.0));
        let hidden = b.without(["?x"]);
        assert!(!hidden.contains("?x"));
        assert!(hidden.contains("?y"));
    }
}
