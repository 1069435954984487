//! Node-shaped input contract between a grammar recognizer and the resolver.
//!
//! A recognizer hands the resolver a tree of [`SyntaxNode`]s. Each node has an
//! integer kind, ordered children, an optional source image and a 1-based
//! line/column pair. The resolver classifies the integer through
//! [`NodeKind::from_raw`]; a kind it does not know, or a known kind in a
//! position where it makes no sense, is an internal-consistency failure
//! between the two layers and aborts resolution.
//!
//! # Child layout per kind
//!
//! | Kind | Image | Children |
//! |------|-------|----------|
//! | `Name`, `Variable`, `Number`, `RequireKey` | token text | none |
//! | `Domain` | | `Name`, sections |
//! | `Problem` | | `Name`, `ProblemDomain`, sections |
//! | `ProblemDomain` | | `Name` |
//! | `Requirements` | | `RequireKey`* |
//! | `Types`, `Constants`, `Objects`, `Parameters`, `LocalVars` | | `TypedGroup`* |
//! | `TypedGroup` | | (`Name`\|`Variable`)+, optional `TypeSpec` |
//! | `TypeSpec` | `either` for unions | `Name`+ |
//! | `Predicates` | | `AtomicSkeleton`* |
//! | `AtomicSkeleton` | | `Name`, `TypedGroup`* |
//! | `Functions` | | `FunctionGroup`* |
//! | `FunctionGroup` | | `AtomicSkeleton`+, optional `TypeSpec` |
//! | `Action` | | `Name`, `Parameters`, optional `Precondition`, optional `Effect` |
//! | `DurativeAction` | | `Name`, `Parameters`, `Duration`, optional `Condition`, optional `Effect` |
//! | `Precondition`, `Effect`, `Condition`, `Duration`, `Goal`, `Constraints` | | one body |
//! | `Derived` | | `AtomicSkeleton`, body |
//! | `DefinedPredicate` | | `AtomicSkeleton`, optional `LocalVars`, body |
//! | `DefinedFunction` | | `AtomicSkeleton`, optional `LocalVars`, body, numeric result |
//! | `Init` | | elements |
//! | `Metric` | `minimize`\|`maximize` | numeric |
//! | `And`, `Or` | | operands |
//! | `Not`, `GoalModality` | | operand |
//! | `Imply`, `When` | | two operands |
//! | `Exists`, `Forall` | | `Parameters`, body |
//! | `Atom`, `FunctionTerm` | | `Name`, arguments |
//! | `Comparison`, `Arithmetic`, `Assignment` | operator | operands |
//! | `Preference` | | optional `Name`, body |
//! | `LocalAssign` | | `Variable`, value |
//! | `Timed` | `at-start`\|`over-all`\|`at-end` | body |
//! | `IsViolated` | | `Name` |
//! | `Modal` | operator | `Number`s and operands |
//! | `TimedLiteral` | | `Number`, literal |

use crate::foundation::Span;
use std::fmt;

/// Classified node kind.
///
/// # Invariant
///
/// The discriminant values must match the ALL_NODE_KINDS and NODE_KIND_NAMES
/// array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum NodeKind {
    Name = 0,
    Variable = 1,
    Number = 2,
    RequireKey = 3,
    Domain = 4,
    Problem = 5,
    ProblemDomain = 6,
    Requirements = 7,
    Types = 8,
    Constants = 9,
    Objects = 10,
    TypedGroup = 11,
    TypeSpec = 12,
    Predicates = 13,
    AtomicSkeleton = 14,
    Functions = 15,
    FunctionGroup = 16,
    Action = 17,
    Parameters = 18,
    Precondition = 19,
    Effect = 20,
    DurativeAction = 21,
    Duration = 22,
    Condition = 23,
    Derived = 24,
    DefinedPredicate = 25,
    DefinedFunction = 26,
    LocalVars = 27,
    Constraints = 28,
    Init = 29,
    Goal = 30,
    Metric = 31,
    And = 32,
    Or = 33,
    Not = 34,
    Imply = 35,
    Exists = 36,
    Forall = 37,
    Atom = 38,
    Comparison = 39,
    Preference = 40,
    LocalAssign = 41,
    GoalModality = 42,
    Timed = 43,
    FunctionTerm = 44,
    Arithmetic = 45,
    IsViolated = 46,
    When = 47,
    Assignment = 48,
    Modal = 49,
    TimedLiteral = 50,
}

const ALL_NODE_KINDS: &[NodeKind] = &[
    NodeKind::Name,
    NodeKind::Variable,
    NodeKind::Number,
    NodeKind::RequireKey,
    NodeKind::Domain,
    NodeKind::Problem,
    NodeKind::ProblemDomain,
    NodeKind::Requirements,
    NodeKind::Types,
    NodeKind::Constants,
    NodeKind::Objects,
    NodeKind::TypedGroup,
    NodeKind::TypeSpec,
    NodeKind::Predicates,
    NodeKind::AtomicSkeleton,
    NodeKind::Functions,
    NodeKind::FunctionGroup,
    NodeKind::Action,
    NodeKind::Parameters,
    NodeKind::Precondition,
    NodeKind::Effect,
    NodeKind::DurativeAction,
    NodeKind::Duration,
    NodeKind::Condition,
    NodeKind::Derived,
    NodeKind::DefinedPredicate,
    NodeKind::DefinedFunction,
    NodeKind::LocalVars,
    NodeKind::Constraints,
    NodeKind::Init,
    NodeKind::Goal,
    NodeKind::Metric,
    NodeKind::And,
    NodeKind::Or,
    NodeKind::Not,
    NodeKind::Imply,
    NodeKind::Exists,
    NodeKind::Forall,
    NodeKind::Atom,
    NodeKind::Comparison,
    NodeKind::Preference,
    NodeKind::LocalAssign,
    NodeKind::GoalModality,
    NodeKind::Timed,
    NodeKind::FunctionTerm,
    NodeKind::Arithmetic,
    NodeKind::IsViolated,
    NodeKind::When,
    NodeKind::Assignment,
    NodeKind::Modal,
    NodeKind::TimedLiteral,
];

const NODE_KIND_NAMES: &[&str] = &[
    "name",
    "variable",
    "number",
    "requirement key",
    "domain",
    "problem",
    "problem domain reference",
    "requirements section",
    "types section",
    "constants section",
    "objects section",
    "typed list group",
    "type specification",
    "predicates section",
    "atomic formula skeleton",
    "functions section",
    "function group",
    "action",
    "parameters",
    "precondition",
    "effect",
    "durative action",
    "duration constraint",
    "condition",
    "derived predicate",
    "defined predicate",
    "defined function",
    "local variables",
    "constraints section",
    "init section",
    "goal section",
    "metric",
    "and",
    "or",
    "not",
    "imply",
    "exists",
    "forall",
    "atomic formula",
    "comparison",
    "preference",
    "local assignment",
    "goal modality",
    "timed expression",
    "function term",
    "arithmetic expression",
    "is-violated",
    "when",
    "assignment",
    "modal operator",
    "timed literal",
];

impl NodeKind {
    /// Classify a raw discriminant.
    pub fn from_raw(raw: u16) -> Option<NodeKind> {
        ALL_NODE_KINDS.get(raw as usize).copied()
    }

    pub fn raw(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        NODE_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    /// Raw kind discriminant, see [`NodeKind`]
    pub kind: u16,
    /// Ordered children
    pub children: Vec<SyntaxNode>,
    /// Source image (token text or operator)
    pub image: Option<String>,
    /// Location, carrying the 1-based line/column pair
    pub span: Span,
}

impl SyntaxNode {
    /// Interior node without an image.
    pub fn new(kind: NodeKind, span: Span, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind: kind.raw(),
            children,
            image: None,
            span,
        }
    }

    /// Leaf node carrying its token text.
    pub fn leaf(kind: NodeKind, image: impl Into<String>, span: Span) -> Self {
        Self {
            kind: kind.raw(),
            children: Vec::new(),
            image: Some(image.into()),
            span,
        }
    }

    /// Interior node with an operator image.
    pub fn with_image(
        kind: NodeKind,
        image: impl Into<String>,
        span: Span,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind: kind.raw(),
            children,
            image: Some(image.into()),
            span,
        }
    }

    /// Classified kind, `None` for discriminants this crate does not know.
    pub fn kind(&self) -> Option<NodeKind> {
        NodeKind::from_raw(self.kind)
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind.raw()
    }

    /// Source image, empty when absent.
    pub fn image(&self) -> &str {
        self.image.as_deref().unwrap_or("")
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn column(&self) -> u32 {
        self.span.column
    }

    pub fn child(&self, index: usize) -> Option<&SyntaxNode> {
        self.children.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tables_line_up() {
        assert_eq!(ALL_NODE_KINDS.len(), NODE_KIND_NAMES.len());
        for (index, kind) in ALL_NODE_KINDS.iter().enumerate() {
            assert_eq!(kind.raw() as usize, index);
            assert_eq!(NodeKind::from_raw(index as u16), Some(*kind));
        }
        assert_eq!(NodeKind::from_raw(ALL_NODE_KINDS.len() as u16), None);
    }

    #[test]
    fn test_node_accessors() {
        let name = SyntaxNode::leaf(NodeKind::Name, "on", Span::at(3, 7));
        let atom = SyntaxNode::new(NodeKind::Atom, Span::at(3, 6), vec![name]);
        assert_eq!(atom.kind(), Some(NodeKind::Atom));
        assert!(atom.is(NodeKind::Atom));
        assert_eq!(atom.image(), "");
        assert_eq!(atom.child(0).map(SyntaxNode::image), Some("on"));
        assert_eq!((atom.line(), atom.column()), (3, 6));
    }

    #[test]
    fn test_unknown_raw_kind_is_not_classified() {
        let node = SyntaxNode {
            kind: 999,
            children: Vec::new(),
            image: None,
            span: Span::default(),
        };
        assert_eq!(node.kind(), None);
    }
}
