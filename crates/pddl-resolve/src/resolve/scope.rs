//! Scoped variable bindings.
//!
//! Action parameters, quantified variables and TLPlan locals each open a
//! scope. A name may be active only once across the whole stack, so PDDL's
//! usual shadowing mistakes (reusing an action parameter in a nested
//! `forall`) are reported instead of silently rebinding.

use pddl_ast::expr::VariableClass;
use pddl_ast::Variable;

/// Outcome of a variable lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Variable),
    /// No active variable has this name
    Missing,
    /// Active, but of another class than expected
    WrongKind(Variable),
}

#[derive(Debug, Clone, Default)]
struct Frame {
    vars: Vec<Variable>,
    quantified: bool,
}

/// Stack of active variable scopes (innermost = last).
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope with `vars`.
    ///
    /// Names already active anywhere in the stack are left out of the new
    /// scope and returned, so the caller can report them.
    pub fn push(&mut self, vars: &[Variable]) -> Vec<Variable> {
        self.push_frame(vars, false)
    }

    /// Open a scope of quantified variables.
    pub fn push_quantified(&mut self, vars: &[Variable]) -> Vec<Variable> {
        self.push_frame(vars, true)
    }

    fn push_frame(&mut self, vars: &[Variable], quantified: bool) -> Vec<Variable> {
        let mut frame = Frame {
            vars: Vec::with_capacity(vars.len()),
            quantified,
        };
        let mut rejected = Vec::new();
        for var in vars {
            let active = self.is_active(&var.name) || frame.vars.iter().any(|v| v.name == var.name);
            if active {
                rejected.push(var.clone());
            } else {
                frame.vars.push(var.clone());
            }
        }
        self.frames.push(frame);
        rejected
    }

    /// Forget the innermost scope.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn find(&self, name: &str) -> Option<&Variable> {
        self.frames
            .iter()
            .rev()
            .flat_map(|f| f.vars.iter())
            .find(|v| v.name == name)
    }

    /// Resolve `name`, expecting a variable of class `expected`.
    pub fn lookup(&self, name: &str, expected: VariableClass) -> Lookup {
        match self.find(name) {
            Some(var) if var.class() == expected => Lookup::Found(var.clone()),
            Some(var) => Lookup::WrongKind(var.clone()),
            None => Lookup::Missing,
        }
    }

    /// Resolve `name` whatever its class.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.find(name)
    }

    /// Currently quantified variables, outermost first.
    pub fn quantified(&self) -> Vec<Variable> {
        self.frames
            .iter()
            .filter(|f| f.quantified)
            .flat_map(|f| f.vars.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pddl_ast::{TypeSetId, VariableKind};

    fn object(name: &str) -> Variable {
        Variable::object(name, TypeSetId::OBJECT)
    }

    #[test]
    fn test_lookup_classes() {
        let mut scopes = ScopeStack::new();
        scopes.push(&[object("?x"), Variable::new("?n", VariableKind::NumericLocal)]);
        assert_eq!(
            scopes.lookup("?x", VariableClass::Object),
            Lookup::Found(object("?x"))
        );
        assert!(matches!(
            scopes.lookup("?n", VariableClass::Object),
            Lookup::WrongKind(_)
        ));
        assert_eq!(scopes.lookup("?y", VariableClass::Object), Lookup::Missing);
    }

    #[test]
    fn test_active_names_are_rejected() {
        let mut scopes = ScopeStack::new();
        assert!(scopes.push(&[object("?x")]).is_empty());
        let rejected = scopes.push_quantified(&[object("?x"), object("?y"), object("?y")]);
        assert_eq!(rejected, vec![object("?x"), object("?y")]);
        assert_eq!(scopes.quantified(), vec![object("?y")]);
    }

    #[test]
    fn test_pop_forgets_quantified() {
        let mut scopes = ScopeStack::new();
        scopes.push(&[object("?a")]);
        scopes.push_quantified(&[object("?b")]);
        scopes.push_quantified(&[object("?c")]);
        assert_eq!(scopes.quantified(), vec![object("?b"), object("?c")]);
        scopes.pop();
        assert_eq!(scopes.quantified(), vec![object("?b")]);
        assert!(!scopes.is_active("?c"));
        assert_eq!(scopes.depth(), 2);
    }
}
