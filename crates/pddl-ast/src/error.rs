//! Diagnostics reported while compiling PDDL sources.
//!
//! A bad domain or problem rarely stops compilation. The resolver records a
//! [`CompileError`] and carries on with a placeholder, so one run lists
//! every undeclared predicate and missing requirement in the file.
//!
//! Each diagnostic knows the stage that raised it ([`Phase`]) and how bad
//! it is ([`Severity`]). The two together give its [`Category`], which is
//! what callers filter on. [`DiagnosticFormatter`] renders diagnostics
//! against the loaded sources.
//!
//! # Examples
//!
//! ```
//! # use pddl_ast::error::*;
//! # use pddl_ast::foundation::Span;
//! let error = CompileError::new(
//!     ErrorKind::DuplicateName,
//!     Span::at(3, 5),
//!     "predicate 'on' is already declared".to_string(),
//! );
//! assert_eq!(error.category(), Category::PARSER_ERROR);
//! ```

use crate::foundation::{SourceMap, Span};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One problem found in a domain or problem file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// What went wrong
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Reporting stage
    pub phase: Phase,
    /// Originating file name (stamped by the collector when empty)
    pub file: String,
    /// The offending construct
    pub span: Span,
    pub message: String,
    /// Related places, such as an earlier declaration of the same name
    pub labels: Vec<Label>,
    /// Suggestions, e.g. the requirement key to add
    pub notes: Vec<String>,
}

/// What a diagnostic complains about.
///
/// Discriminants index `ERROR_KIND_NAMES`; keep both in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorKind {
    /// Invalid character sequence
    Lexical = 0,
    /// Malformed s-expression or section
    Syntax = 1,
    /// Reference to an undeclared symbol
    UndefinedName = 2,
    /// Symbol declared twice
    DuplicateName = 3,
    /// Arity or parameter types differ from the declaration
    SignatureMismatch = 4,
    /// Symbol exists but is the wrong kind for this position
    WrongKind = 5,
    /// Type set not compatible with the expected one
    TypeMismatch = 6,
    /// Undeclared type name
    UnknownType = 7,
    /// Type hierarchy would contain a cycle
    CyclicType = 8,
    /// Construct used without its requirement key
    MissingRequirement = 9,
    /// Requirement key unknown or not accepted by the caller
    UnsupportedRequirement = 10,
    /// Untyped variable under `:typing`
    UntypedVariable = 11,
    /// Malformed duration constraint
    InvalidDuration = 12,
    /// Well-formed but unsupported combination
    Unsupported = 13,
    /// Domain and problem disagree on their requirements
    RequirementMismatch = 14,
    /// Construct not allowed at this position
    Misplaced = 15,
    /// Invariant violated inside the compiler
    Internal = 16,
}

/// Names printed after the severity, e.g. `error: undefined name: ...`.
const ERROR_KIND_NAMES: &[&str] = &[
    "lexical error",           // 0: Lexical
    "syntax error",            // 1: Syntax
    "undefined name",          // 2: UndefinedName
    "duplicate name",          // 3: DuplicateName
    "signature mismatch",      // 4: SignatureMismatch
    "wrong kind",              // 5: WrongKind
    "type mismatch",           // 6: TypeMismatch
    "unknown type",            // 7: UnknownType
    "cyclic type",             // 8: CyclicType
    "missing requirement",     // 9: MissingRequirement
    "unsupported requirement", // 10: UnsupportedRequirement
    "untyped variable",        // 11: UntypedVariable
    "invalid duration",        // 12: InvalidDuration
    "unsupported",             // 13: Unsupported
    "requirement mismatch",    // 14: RequirementMismatch
    "misplaced construct",     // 15: Misplaced
    "internal compiler error", // 16: Internal
];

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Note,
    /// Accepted, but probably not what the author meant
    Warning,
    /// The construct is dropped from the model
    Error,
}

/// Stage that raised a diagnostic. Resolution of a single file counts as
/// `Parser`; `Linker` is the domain/problem merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    Lexer,
    #[default]
    Parser,
    Linker,
}

bitflags! {
    /// Phase and severity folded into one flag, so a query can ask for
    /// e.g. all linker diagnostics or every error at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u16 {
        const PARSER_ERROR = 1 << 0;
        const PARSER_WARNING = 1 << 1;
        const LEXICAL_ERROR = 1 << 2;
        const LINKER_ERROR = 1 << 3;
        const LINKER_WARNING = 1 << 4;

        const ERROR = Self::PARSER_ERROR.bits()
            | Self::LEXICAL_ERROR.bits()
            | Self::LINKER_ERROR.bits();
        const WARNING = Self::PARSER_WARNING.bits() | Self::LINKER_WARNING.bits();
        const ALL = Self::ERROR.bits() | Self::WARNING.bits();
    }
}

/// A second location attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl CompileError {
    /// An error raised while resolving a file. Use [`in_phase`] for lexer
    /// and linker diagnostics.
    ///
    /// [`in_phase`]: CompileError::in_phase
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Error, span, message)
    }

    pub fn warning(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Warning, span, message)
    }

    pub fn note(kind: ErrorKind, span: Span, message: String) -> Self {
        Self::with_severity(kind, Severity::Note, span, message)
    }

    fn with_severity(kind: ErrorKind, severity: Severity, span: Span, message: String) -> Self {
        Self {
            kind,
            severity,
            phase: Phase::default(),
            file: String::new(),
            span,
            message,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Usually left empty; [`Diagnostics`](crate::Diagnostics) stamps the
    /// current file when the diagnostic is pushed.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Point at a related location, e.g. where a duplicate name was first
    /// declared.
    pub fn with_label(mut self, span: Span, message: String) -> Self {
        self.labels.push(Label { span, message });
        self
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    /// Notes count as warnings of their phase. Anything the lexer reports
    /// is an error.
    pub fn category(&self) -> Category {
        let is_error = self.severity == Severity::Error;
        match (self.phase, is_error) {
            (Phase::Lexer, _) => Category::LEXICAL_ERROR,
            (Phase::Parser, true) => Category::PARSER_ERROR,
            (Phase::Parser, false) => Category::PARSER_WARNING,
            (Phase::Linker, true) => Category::LINKER_ERROR,
            (Phase::Linker, false) => Category::LINKER_WARNING,
        }
    }

    /// True when the diagnostic fails the compilation.
    pub fn is_error(&self) -> bool {
        self.category().intersects(Category::ERROR)
    }
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.file.is_empty() {
            write!(f, "{}:{}:{}: ", self.file, self.span.line, self.span.column)?;
        }
        write!(f, "{}: {}: {}", self.severity, self.kind.name(), self.message)
    }
}

impl std::error::Error for CompileError {}

/// Renders diagnostics the way `pddl-check` prints them:
///
/// ```text
/// error: undefined name: undefined predicate 'onn'
///   --> blocks.pddl:7:20
///     |
///   7 |     :precondition (onn ?x ?y)
///     |                   ^^^^^^^^^^^
///    = help: declare it in :predicates
/// ```
///
/// A span whose file is not in the map is printed with the diagnostic's
/// own file name and without the source line.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, error: &CompileError) -> String {
        let mut output = format!(
            "{}: {}: {}\n",
            error.severity,
            error.kind.name(),
            error.message
        );

        let (line, col) = self.sources.line_col(&error.span);
        output.push_str(&format!("  --> {}:{}:{}\n", self.location(error, &error.span), line, col));

        if let Some(source_line) = self
            .sources
            .file(&error.span)
            .and_then(|file| file.line_text(line))
        {
            output.push_str("    |\n");
            output.push_str(&format!("{:3} | {}\n", line, source_line));

            let start_col = col as usize;
            let span_len = error.span.len() as usize;
            let end_col = (start_col + span_len).min(source_line.len() + 1);
            let underline = " ".repeat(start_col.saturating_sub(1))
                + &"^".repeat(end_col.saturating_sub(start_col).max(1));
            output.push_str(&format!("    | {}\n", underline));
        }

        for label in &error.labels {
            output.push_str(&format!("   = note: {}\n", label.message));
            let (label_line, label_col) = self.sources.line_col(&label.span);
            output.push_str(&format!(
                "     at {}:{}:{}\n",
                self.location(error, &label.span),
                label_line,
                label_col
            ));
        }

        for note in &error.notes {
            output.push_str(&format!("   = help: {}\n", note));
        }

        output
    }

    /// One block per diagnostic, blank line between blocks.
    pub fn format_all<'e>(&self, errors: impl IntoIterator<Item = &'e CompileError>) -> String {
        errors
            .into_iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn location(&self, error: &CompileError, span: &Span) -> String {
        match self.sources.file_path(span) {
            Some(path) => path.display().to_string(),
            None if !error.file.is_empty() => error.file.clone(),
            None => "<input>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dummy_span() -> Span {
        Span::new(0, 0, 5, 1, 1)
    }

    fn test_sources() -> SourceMap {
        let mut sources = SourceMap::new();
        sources.add_file(
            PathBuf::from("test.pddl"),
            "(define (domain d)\n  (:predicates (on ?x ?y)))".to_string(),
        );
        sources
    }

    #[test]
    fn test_error_creation() {
        let err = CompileError::new(
            ErrorKind::DuplicateName,
            dummy_span(),
            "predicate 'on' is already declared".to_string(),
        );

        assert_eq!(err.kind, ErrorKind::DuplicateName);
        assert_eq!(err.severity, Severity::Error);
        assert_eq!(err.phase, Phase::Parser);
        assert!(err.labels.is_empty());
        assert!(err.notes.is_empty());
    }

    #[test]
    fn test_categories_follow_phase_and_severity() {
        let span = dummy_span();
        let msg = || "m".to_string();
        assert_eq!(
            CompileError::new(ErrorKind::Syntax, span, msg()).category(),
            Category::PARSER_ERROR
        );
        assert_eq!(
            CompileError::warning(ErrorKind::UntypedVariable, span, msg()).category(),
            Category::PARSER_WARNING
        );
        assert_eq!(
            CompileError::new(ErrorKind::Lexical, span, msg())
                .in_phase(Phase::Lexer)
                .category(),
            Category::LEXICAL_ERROR
        );
        assert_eq!(
            CompileError::new(ErrorKind::DuplicateName, span, msg())
                .in_phase(Phase::Linker)
                .category(),
            Category::LINKER_ERROR
        );
        assert_eq!(
            CompileError::warning(ErrorKind::RequirementMismatch, span, msg())
                .in_phase(Phase::Linker)
                .category(),
            Category::LINKER_WARNING
        );
    }

    #[test]
    fn test_error_routing_uses_the_error_mask() {
        let warning = CompileError::warning(ErrorKind::UntypedVariable, dummy_span(), "w".into());
        let error = CompileError::new(ErrorKind::Syntax, dummy_span(), "e".into());
        assert!(!warning.is_error());
        assert!(error.is_error());
    }

    #[test]
    fn test_category_unions() {
        assert!(Category::ERROR.contains(Category::LINKER_ERROR));
        assert!(!Category::ERROR.intersects(Category::WARNING));
        assert_eq!(Category::ALL, Category::ERROR | Category::WARNING);
    }

    #[test]
    fn test_error_chaining() {
        let err = CompileError::new(ErrorKind::DuplicateName, dummy_span(), "dup".into())
            .with_label(dummy_span(), "first declared here".to_string())
            .with_note("rename one of them".to_string());

        assert_eq!(err.labels.len(), 1);
        assert_eq!(err.labels[0].message, "first declared here");
        assert_eq!(err.notes, vec!["rename one of them".to_string()]);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::Lexical.name(), "lexical error");
        assert_eq!(ErrorKind::SignatureMismatch.name(), "signature mismatch");
        assert_eq!(ErrorKind::Internal.name(), "internal compiler error");
        assert_eq!(ERROR_KIND_NAMES.len(), ErrorKind::Internal as usize + 1);
    }

    #[test]
    fn test_error_display_includes_location_when_file_known() {
        let err = CompileError::new(ErrorKind::UndefinedName, Span::at(4, 2), "undefined predicate 'p'".into())
            .in_file("d.pddl");
        assert_eq!(
            err.to_string(),
            "d.pddl:4:2: error: undefined name: undefined predicate 'p'"
        );
    }

    #[test]
    fn test_formatter_basic() {
        let sources = test_sources();
        // "on" inside the predicates line
        let span = Span::new(0, 35, 37, 2, 17);
        let err = CompileError::new(ErrorKind::DuplicateName, span, "duplicate predicate 'on'".into());

        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.contains("error: duplicate name: duplicate predicate 'on'"));
        assert!(formatted.contains("test.pddl:2:17"));
        assert!(formatted.contains("(:predicates (on ?x ?y)))"));
        assert!(formatted.contains("^^"));
    }

    #[test]
    fn test_formatter_without_source_uses_file_name() {
        let sources = SourceMap::new();
        let err = CompileError::new(ErrorKind::Syntax, Span::at(9, 1), "unbalanced".into())
            .in_file("p.pddl");
        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.contains("p.pddl:9:1"));
        assert!(!formatted.contains('^'));
    }

    #[test]
    fn test_format_all_renders_one_block_per_diagnostic() {
        let sources = test_sources();
        let first = CompileError::new(ErrorKind::Syntax, dummy_span(), "first".into());
        let second = CompileError::warning(ErrorKind::UntypedVariable, dummy_span(), "second".into());
        let formatted = DiagnosticFormatter::new(&sources).format_all([&first, &second]);

        let blocks: Vec<&str> = formatted.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("error: syntax error: first\n  --> test.pddl:1:1"));
        assert!(blocks[1].starts_with("warning: untyped variable: second"));
    }

    #[test]
    fn test_formatter_labels_and_notes() {
        let sources = test_sources();
        let err = CompileError::new(ErrorKind::DuplicateName, dummy_span(), "dup".into())
            .with_label(Span::new(0, 8, 14, 1, 9), "first declared here".into())
            .with_note("rename it".into());
        let formatted = DiagnosticFormatter::new(&sources).format(&err);
        assert!(formatted.contains("= note: first declared here"));
        assert!(formatted.contains("at test.pddl:1:9"));
        assert!(formatted.contains("= help: rename it"));
    }
}
