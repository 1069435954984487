use crate::types::TypeSetId;
use std::fmt;

/// A variable reference.
///
/// Identity is the name within its lexical scope. Names keep their sigil
/// (`?x`, `?duration`, `#t`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

/// What a variable ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    /// Action, quantifier or formula parameter
    Object(TypeSetId),
    /// TLPlan local holding an object
    ObjectLocal(TypeSetId),
    /// TLPlan local holding a number
    NumericLocal,
    /// TLPlan local holding a truth value
    BooleanLocal,
    /// `?duration` of a durative action
    Duration,
    /// `#t`, elapsed time in a continuous effect
    Time,
}

/// Coarse class used when resolving a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableClass {
    Object,
    Numeric,
    Boolean,
}

impl fmt::Display for VariableClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariableClass::Object => "object",
            VariableClass::Numeric => "numeric",
            VariableClass::Boolean => "boolean",
        })
    }
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Object parameter of the given type set.
    pub fn object(name: impl Into<String>, types: TypeSetId) -> Self {
        Self::new(name, VariableKind::Object(types))
    }

    pub fn duration() -> Self {
        Self::new("?duration", VariableKind::Duration)
    }

    pub fn time() -> Self {
        Self::new("#t", VariableKind::Time)
    }

    pub fn class(&self) -> VariableClass {
        match self.kind {
            VariableKind::Object(_) | VariableKind::ObjectLocal(_) => VariableClass::Object,
            VariableKind::NumericLocal | VariableKind::Duration | VariableKind::Time => {
                VariableClass::Numeric
            }
            VariableKind::BooleanLocal => VariableClass::Boolean,
        }
    }

    /// Type set of object variables, `{object}` otherwise.
    pub fn types(&self) -> TypeSetId {
        match self.kind {
            VariableKind::Object(t) | VariableKind::ObjectLocal(t) => t,
            _ => TypeSetId::OBJECT,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            VariableKind::ObjectLocal(_) | VariableKind::NumericLocal | VariableKind::BooleanLocal
        )
    }

    /// Same variable under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.kind)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
