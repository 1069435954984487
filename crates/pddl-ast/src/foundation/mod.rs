//! Foundation types shared by every compiler stage.

pub mod requirements;
pub mod span;

pub use requirements::{Requirement, RequirementSet};
pub use span::{SourceFile, SourceMap, Span};
