use enumset::EnumSet;
use logos::Logos;
use pddl_ast::{
    Category, CompileError, DiagnosticFormatter, Diagnostics, ErrorKind, Expression,
    ExpressionCategory, NodeKind, PddlObject, Phase, Requirement, SourceFile, SourceMap, Span,
    SyntaxNode, Variable,
};
use pddl_lexer::Token;
use pddl_parser::ParseError;
use pddl_resolve::{
    link, resolve_domain, resolve_expression, resolve_problem, FatalError,
};
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Caller settings for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Requirement keys a source may declare
    pub accepted: EnumSet<Requirement>,
    /// Name used in diagnostics for text that did not come from a file
    pub source_name: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            accepted: EnumSet::all(),
            source_name: "<input>".to_string(),
        }
    }
}

/// Everything one compilation produced.
#[derive(Debug, Default)]
pub struct Compilation {
    pub sources: SourceMap,
    pub diagnostics: Diagnostics,
    pub domain: Option<PddlObject>,
    /// The problem as resolved against the domain, before linking
    pub problem: Option<PddlObject>,
    /// The linked model, when both a domain and a problem were given
    pub linked: Option<PddlObject>,
}

impl Compilation {
    /// The most complete model available: linked, else problem, else domain.
    pub fn model(&self) -> Option<&PddlObject> {
        self.linked
            .as_ref()
            .or(self.problem.as_ref())
            .or(self.domain.as_ref())
    }

    /// All diagnostics rendered with source context.
    pub fn format_diagnostics(&self) -> String {
        DiagnosticFormatter::new(&self.sources).format_all(self.diagnostics.iter(Category::ALL))
    }
}

#[derive(Debug, Error)]
pub enum PddlError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input had errors; the partial result is kept for reporting.
    #[error("compilation failed with {} error(s)", .0.diagnostics.errors().count())]
    Failed(Box<Compilation>),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Compile one file holding a domain, a problem, or both.
///
/// A problem is resolved against the domain defined earlier in the same
/// file and linked with it. Any error makes the compilation fail.
pub fn parse_file(path: &Path, options: &ParseOptions) -> Result<Compilation, PddlError> {
    let source = read(path)?;
    let mut compilation = Compilation::default();
    if let Some(nodes) = recognize(&mut compilation, path.to_path_buf(), source) {
        resolve_all(&mut compilation, &nodes, &path.display().to_string(), options)?;
    }
    finish(compilation)
}

/// Compile a domain file and a problem file, then link them.
pub fn parse_files(
    domain: &Path,
    problem: &Path,
    options: &ParseOptions,
) -> Result<Compilation, PddlError> {
    let domain_source = read(domain)?;
    let problem_source = read(problem)?;
    let mut compilation = Compilation::default();

    let domain_nodes = recognize(&mut compilation, domain.to_path_buf(), domain_source);
    let problem_nodes = recognize(&mut compilation, problem.to_path_buf(), problem_source);
    if let Some(nodes) = domain_nodes {
        resolve_all(&mut compilation, &nodes, &domain.display().to_string(), options)?;
    }
    if let Some(nodes) = problem_nodes {
        if compilation.domain.is_some() {
            resolve_all(&mut compilation, &nodes, &problem.display().to_string(), options)?;
        }
    }
    finish(compilation)
}

/// Compile source text; diagnostics name it after `options.source_name`.
pub fn parse_source(source: &str, options: &ParseOptions) -> Result<Compilation, PddlError> {
    let mut compilation = Compilation::default();
    let path = PathBuf::from(&options.source_name);
    if let Some(nodes) = recognize(&mut compilation, path, source.to_string()) {
        resolve_all(&mut compilation, &nodes, &options.source_name, options)?;
    }
    finish(compilation)
}

/// Compile one standalone expression.
///
/// `variables` are in scope; `domain`, when given, provides the symbols.
/// Returns `None` when the text could not be recognized. A returned
/// expression may still come with errors.
pub fn parse_expression(
    text: &str,
    variables: &[Variable],
    category: ExpressionCategory,
    domain: Option<&PddlObject>,
    options: &ParseOptions,
) -> (Option<Expression>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    diagnostics.set_file(options.source_name.clone());
    let file = SourceFile::new(PathBuf::from(&options.source_name), text.to_string());

    let Some(tokens) = tokenize(&file, 0, &mut diagnostics) else {
        return (None, diagnostics);
    };
    let node = match pddl_parser::parse_expression(&tokens, &file, 0) {
        Ok(node) => node,
        Err(errors) => {
            errors
                .into_iter()
                .for_each(|e| diagnostics.push(syntax_error(e)));
            return (None, diagnostics);
        }
    };
    let accepted = options.accepted;
    match resolve_expression(&node, category, variables, domain, accepted, &mut diagnostics) {
        Ok(expression) => (Some(expression), diagnostics),
        Err(fatal) => {
            diagnostics.error(ErrorKind::Internal, node.span, fatal.to_string());
            (None, diagnostics)
        }
    }
}

fn read(path: &Path) -> Result<String, PddlError> {
    std::fs::read_to_string(path).map_err(|source| PddlError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn finish(compilation: Compilation) -> Result<Compilation, PddlError> {
    debug!(
        files = compilation.sources.file_count(),
        errors = compilation.diagnostics.count(Category::ERROR),
        warnings = compilation.diagnostics.count(Category::WARNING),
        linked = compilation.linked.is_some(),
        "compilation finished"
    );
    if compilation.diagnostics.has_errors() {
        return Err(PddlError::Failed(Box::new(compilation)));
    }
    Ok(compilation)
}

// === Recognition ===

/// Register, lex and recognize one source; `None` after lexical or
/// syntax errors.
fn recognize(
    compilation: &mut Compilation,
    path: PathBuf,
    source: String,
) -> Option<Vec<SyntaxNode>> {
    let diagnostics = &mut compilation.diagnostics;
    diagnostics.set_file(path.display().to_string());
    let file_id = compilation.sources.add_file(path, source);
    let Some(file) = compilation.sources.get(file_id) else {
        diagnostics.error(ErrorKind::Internal, Span::default(), "too many source files");
        return None;
    };

    let tokens = tokenize(file, file_id, diagnostics)?;
    match pddl_parser::parse_file(&tokens, file, file_id) {
        Ok(nodes) => Some(nodes),
        Err(errors) => {
            errors
                .into_iter()
                .for_each(|e| diagnostics.push(syntax_error(e)));
            None
        }
    }
}

fn tokenize(
    file: &SourceFile,
    file_id: u16,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<(Token, Range<usize>)>> {
    let mut lexer = Token::lexer(&file.source);
    let mut tokens = Vec::new();
    let mut failed = false;
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => tokens.push((token, range)),
            Err(()) => {
                failed = true;
                let start = range.start as u32;
                let (line, column) = file.line_col(start);
                let span = Span::new(file_id, start, range.end as u32, line, column);
                let error = CompileError::new(
                    ErrorKind::Lexical,
                    span,
                    format!("invalid token '{}'", lexer.slice()),
                )
                .in_phase(Phase::Lexer);
                diagnostics.push(error);
            }
        }
    }
    (!failed).then_some(tokens)
}

fn syntax_error(error: ParseError) -> CompileError {
    CompileError::new(ErrorKind::Syntax, error.span, error.message).in_phase(Phase::Parser)
}

// === Resolution ===

/// Resolve the definitions of one file in order.
fn resolve_all(
    compilation: &mut Compilation,
    nodes: &[SyntaxNode],
    file: &str,
    options: &ParseOptions,
) -> Result<(), FatalError> {
    let diagnostics = &mut compilation.diagnostics;
    diagnostics.set_file(file);
    diagnostics.set_phase(Phase::Parser);

    for node in nodes {
        match node.kind() {
            Some(NodeKind::Domain) => {
                if compilation.domain.is_some() {
                    diagnostics.error(
                        ErrorKind::Unsupported,
                        node.span,
                        "only one domain can be compiled at a time",
                    );
                    continue;
                }
                let domain = resolve_domain(node, file, options.accepted, diagnostics)?;
                compilation.domain = Some(domain);
            }
            Some(NodeKind::Problem) => {
                let Some(domain) = compilation.domain.as_ref() else {
                    diagnostics.error(
                        ErrorKind::UndefinedName,
                        node.span,
                        "a problem needs its domain; give the domain file first",
                    );
                    continue;
                };
                if compilation.problem.is_some() {
                    diagnostics.error(
                        ErrorKind::Unsupported,
                        node.span,
                        "only one problem can be compiled at a time",
                    );
                    continue;
                }
                let problem = resolve_problem(node, domain, file, options.accepted, diagnostics)?;
                compilation.linked = link(domain, &problem, diagnostics);
                compilation.problem = Some(problem);
            }
            _ => diagnostics.error(
                ErrorKind::Syntax,
                node.span,
                "expected a domain or problem definition",
            ),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
