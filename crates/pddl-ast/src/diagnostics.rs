//! Append-only diagnostics collector.
//!
//! One collector spans a whole parse/link pass. Every stage appends to it and
//! keeps going; callers decide afterwards whether the pass failed by asking
//! [`Diagnostics::has_errors`].

use crate::error::{Category, CompileError, ErrorKind, Phase};
use crate::foundation::Span;

/// Categorized diagnostics of one compilation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<CompileError>,
    file: String,
    phase: Phase,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// File name stamped on messages that do not carry one.
    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = file.into();
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Phase stamped on messages created through the helpers.
    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Append a diagnostic, stamping the current file when it has none.
    pub fn push(&mut self, mut error: CompileError) {
        if error.file.is_empty() {
            error.file = self.file.clone();
        }
        self.messages.push(error);
    }

    /// Record an error in the current phase.
    pub fn error(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        let error = CompileError::new(kind, span, message.into()).in_phase(self.phase);
        self.push(error);
    }

    /// Record a warning in the current phase.
    pub fn warning(&mut self, kind: ErrorKind, span: Span, message: impl Into<String>) {
        let warning = CompileError::warning(kind, span, message.into()).in_phase(self.phase);
        self.push(warning);
    }

    /// Append every message of another collector.
    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    /// Number of messages in any of the given categories.
    pub fn count(&self, category: Category) -> usize {
        self.iter(category).count()
    }

    /// Messages in any of the given categories, in report order.
    pub fn iter(&self, category: Category) -> impl Iterator<Item = &CompileError> {
        self.messages
            .iter()
            .filter(move |m| m.category().intersects(category))
    }

    /// Messages originating from one file.
    pub fn in_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a CompileError> {
        self.messages.iter().filter(move |m| m.file == file)
    }

    /// Messages matching a category and, optionally, a file.
    pub fn query<'a>(
        &'a self,
        category: Category,
        file: Option<&'a str>,
    ) -> impl Iterator<Item = &'a CompileError> {
        self.iter(category)
            .filter(move |m| file.map_or(true, |f| m.file == f))
    }

    /// Whether any error-class message was recorded.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(CompileError::is_error)
    }

    /// Messages routed to the error stream.
    pub fn errors(&self) -> impl Iterator<Item = &CompileError> {
        self.messages.iter().filter(|m| m.is_error())
    }

    /// Messages routed to the warning stream.
    pub fn warnings(&self) -> impl Iterator<Item = &CompileError> {
        self.messages.iter().filter(|m| !m.is_error())
    }

    pub fn messages(&self) -> &[CompileError] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<CompileError> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> Diagnostics {
        let mut d = Diagnostics::new();
        d.set_file("domain.pddl");
        d.error(ErrorKind::UndefinedName, Span::at(1, 1), "undefined predicate 'p'");
        d.warning(ErrorKind::UntypedVariable, Span::at(2, 1), "untyped ?x");
        d.set_file("problem.pddl");
        d.set_phase(Phase::Linker);
        d.error(ErrorKind::DuplicateName, Span::at(3, 1), "duplicate constant");
        d.warning(ErrorKind::RequirementMismatch, Span::at(1, 1), "requirements differ");
        d.push(
            CompileError::new(ErrorKind::Lexical, Span::at(5, 5), "bad character".into())
                .in_phase(Phase::Lexer)
                .in_file("other.pddl"),
        );
        d
    }

    #[test]
    fn test_counts_by_category() {
        let d = collector();
        assert_eq!(d.count(Category::PARSER_ERROR), 1);
        assert_eq!(d.count(Category::PARSER_WARNING), 1);
        assert_eq!(d.count(Category::LINKER_ERROR), 1);
        assert_eq!(d.count(Category::LINKER_WARNING), 1);
        assert_eq!(d.count(Category::LEXICAL_ERROR), 1);
        assert_eq!(d.count(Category::ERROR), 3);
        assert_eq!(d.count(Category::WARNING), 2);
        assert_eq!(d.count(Category::ALL), 5);
    }

    #[test]
    fn test_file_stamping_and_queries() {
        let d = collector();
        assert_eq!(d.in_file("domain.pddl").count(), 2);
        assert_eq!(d.in_file("problem.pddl").count(), 2);
        assert_eq!(d.in_file("other.pddl").count(), 1);
        let linker_errors: Vec<_> = d.query(Category::ERROR, Some("problem.pddl")).collect();
        assert_eq!(linker_errors.len(), 1);
        assert_eq!(linker_errors[0].message, "duplicate constant");
    }

    #[test]
    fn test_error_and_warning_streams() {
        let d = collector();
        assert!(d.has_errors());
        assert_eq!(d.errors().count(), 3);
        assert_eq!(d.warnings().count(), 2);

        let mut only_warnings = Diagnostics::new();
        only_warnings.warning(ErrorKind::UntypedVariable, Span::at(1, 1), "untyped");
        assert!(!only_warnings.has_errors());
    }
}
