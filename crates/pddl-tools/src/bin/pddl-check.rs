//! PDDL Check
//!
//! Compiles a PDDL domain, optionally with a problem, and reports
//! diagnostics and a summary of the compiled model.
//!
//! Usage: `pddl-check <file> [--problem <file>] [--accept strips,typing]`

use clap::Parser;
use pddl::{Category, Compilation, CompileError, ParseOptions, PddlError};
use serde_json::json;
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "pddl-check")]
#[command(about = "Compile a PDDL domain and problem and report diagnostics")]
struct Args {
    /// Domain file, or a file holding both a domain and a problem
    file: PathBuf,

    /// Problem file to link against the domain
    #[arg(short, long)]
    problem: Option<PathBuf>,

    /// Requirement keys to accept (default: all)
    #[arg(long, value_delimiter = ',')]
    accept: Vec<String>,

    /// Fail when any warning is reported
    #[arg(long)]
    warnings_as_errors: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    pddl_tools::init_logging();

    let args = Args::parse();

    let mut options = ParseOptions::default();
    if !args.accept.is_empty() {
        match pddl_tools::parse_requirements(args.accept.iter().map(String::as_str)) {
            Ok(accepted) => options.accepted = accepted,
            Err(message) => {
                error!("{message}");
                process::exit(2);
            }
        }
    }

    info!("Compiling {}", args.file.display());
    let result = match &args.problem {
        Some(problem) => pddl::parse_files(&args.file, problem, &options),
        None => pddl::parse_file(&args.file, &options),
    };

    let compilation = match result {
        Ok(compilation) => compilation,
        Err(PddlError::Failed(compilation)) => *compilation,
        Err(err) => {
            error!("{err}");
            process::exit(2);
        }
    };

    if args.json {
        println!("{}", to_json(&compilation));
    } else {
        report(&compilation);
    }

    let warnings = compilation.diagnostics.count(Category::WARNING);
    if compilation.diagnostics.has_errors() || (args.warnings_as_errors && warnings > 0) {
        process::exit(1);
    }
}

fn report(compilation: &Compilation) {
    let diagnostics = compilation.format_diagnostics();
    if compilation.diagnostics.has_errors() {
        error!("Errors found:\n{}", diagnostics);
        return;
    }
    if !compilation.diagnostics.is_empty() {
        warn!("Warnings found:\n{}", diagnostics);
    }

    if let Some(model) = compilation.model() {
        let summary = model.summary();
        info!("Successfully compiled {:?} '{}'", summary.content, summary.name);
        info!("  - Requirements: {}", summary.requirements);
        info!("  - Types: {}", summary.types);
        info!("  - Predicates: {}", summary.predicates);
        info!("  - Functions: {}", summary.functions);
        info!("  - Actions: {}", summary.actions);
        info!("  - Objects: {}", summary.objects);
        info!("  - Init: {}", summary.init);
        info!("  - Preferences: {}", summary.preferences);
    } else {
        info!("No definitions found.");
    }
}

fn to_json(compilation: &Compilation) -> serde_json::Value {
    let diagnostics: Vec<_> = compilation
        .diagnostics
        .iter(Category::ALL)
        .map(diagnostic_json)
        .collect();
    json!({
        "success": !compilation.diagnostics.has_errors(),
        "model": compilation.model().map(|m| m.summary()),
        "diagnostics": diagnostics,
    })
}

fn diagnostic_json(error: &CompileError) -> serde_json::Value {
    json!({
        "severity": error.severity.to_string(),
        "kind": error.kind.name(),
        "file": error.file,
        "line": error.span.line,
        "column": error.span.column,
        "message": error.message,
        "notes": error.notes,
    })
}
