use super::*;
use pddl_ast::model::ContentKind;
use std::fs;
use tempfile::tempdir;

const DOMAIN: &str = r#"
(define (domain vehicles)
  (:requirements :strips :typing)
  (:types vehicle location - object
          car truck - vehicle)
  (:constants depot - location c0 - car)
  (:predicates (at ?v - vehicle ?l - location))
  (:action drive
    :parameters (?v - vehicle ?from ?to - location)
    :precondition (at ?v ?from)
    :effect (and (not (at ?v ?from)) (at ?v ?to))))
"#;

const PROBLEM: &str = r#"
(define (problem deliver)
  (:domain vehicles)
  (:objects c1 c2 - car t1 - truck l1 - location)
  (:init (at c1 depot) (at c2 depot) (at t1 l1))
  (:goal (and (at c1 l1) (at c2 l1))))
"#;

#[test]
fn test_parse_file_with_domain_and_problem() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("combined.pddl");
    fs::write(&path, format!("{DOMAIN}\n{PROBLEM}")).unwrap();

    let compilation = parse_file(&path, &ParseOptions::default()).unwrap();
    assert!(compilation.diagnostics.is_empty());
    assert_eq!(compilation.sources.file_count(), 1);
    let linked = compilation.linked.as_ref().unwrap();
    assert_eq!(linked.content, ContentKind::FullProblem);
    assert_eq!(linked.name, "deliver");
    assert_eq!(compilation.model().unwrap().name, "deliver");
}

#[test]
fn test_parse_files_fills_domains_from_both_files() {
    let dir = tempdir().unwrap();
    let domain = dir.path().join("domain.pddl");
    let problem = dir.path().join("problem.pddl");
    fs::write(&domain, DOMAIN).unwrap();
    fs::write(&problem, PROBLEM).unwrap();

    let compilation = parse_files(&domain, &problem, &ParseOptions::default()).unwrap();
    assert_eq!(compilation.sources.file_count(), 2);
    let linked = compilation.linked.unwrap();
    let lattice = &linked.lattice;
    let names = |ty: &str| -> Vec<String> {
        let id = lattice.lookup(ty).unwrap();
        lattice.domain(id).iter().map(|c| c.name.clone()).collect()
    };
    assert_eq!(names("car"), vec!["c0", "c1", "c2"]);
    assert_eq!(names("vehicle"), vec!["c0", "c1", "c2", "t1"]);
    assert_eq!(names("location"), vec!["depot", "l1"]);
}

#[test]
fn test_domain_only_is_not_linked() {
    let compilation = parse_source(DOMAIN, &ParseOptions::default()).unwrap();
    assert!(compilation.domain.is_some());
    assert!(compilation.linked.is_none());
    assert_eq!(compilation.model().unwrap().content, ContentKind::Domain);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let result = parse_file(&dir.path().join("absent.pddl"), &ParseOptions::default());
    assert!(matches!(result, Err(PddlError::Io { .. })));
}

#[test]
fn test_lexical_error_is_reported() {
    let source = "(define (domain d) $)";
    let Err(PddlError::Failed(compilation)) = parse_source(source, &ParseOptions::default())
    else {
        panic!("expected a failed compilation");
    };
    assert_eq!(compilation.diagnostics.count(Category::LEXICAL_ERROR), 1);
    let error = compilation.diagnostics.errors().next().unwrap();
    assert_eq!(error.kind, ErrorKind::Lexical);
    assert_eq!(error.span.column, 20);
    assert!(compilation.domain.is_none());
}

#[test]
fn test_syntax_error_is_reported() {
    let Err(PddlError::Failed(compilation)) =
        parse_source("(define (domain d)", &ParseOptions::default())
    else {
        panic!("expected a failed compilation");
    };
    assert!(compilation.diagnostics.count(Category::PARSER_ERROR) > 0);
    assert!(compilation
        .diagnostics
        .errors()
        .all(|e| e.kind == ErrorKind::Syntax));
}

#[test]
fn test_semantic_error_fails_with_formatted_output() {
    let source = r#"
(define (domain d)
  (:requirements :strips)
  (:predicates (p ?x))
  (:action a
    :parameters ()
    :precondition (forall (?x) (p ?x))
    :effect (and)))
"#;
    let options = ParseOptions {
        source_name: "strips.pddl".to_string(),
        ..ParseOptions::default()
    };
    let Err(error) = parse_source(source, &options) else {
        panic!("expected a failed compilation");
    };
    assert_eq!(error.to_string(), "compilation failed with 1 error(s)");
    let PddlError::Failed(compilation) = error else {
        panic!("expected a failed compilation");
    };
    let report = compilation.format_diagnostics();
    assert!(report.contains("strips.pddl"));
    assert!(report.contains(":universal-preconditions"));
}

#[test]
fn test_problem_before_domain() {
    let Err(PddlError::Failed(compilation)) = parse_source(PROBLEM, &ParseOptions::default())
    else {
        panic!("expected a failed compilation");
    };
    let kinds: Vec<_> = compilation.diagnostics.errors().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::UndefinedName]);
}

#[test]
fn test_unaccepted_requirement() {
    let options = ParseOptions {
        accepted: EnumSet::all() - Requirement::Typing,
        ..ParseOptions::default()
    };
    let Err(PddlError::Failed(compilation)) = parse_source(DOMAIN, &options) else {
        panic!("expected a failed compilation");
    };
    assert!(compilation
        .diagnostics
        .errors()
        .any(|e| e.kind == ErrorKind::UnsupportedRequirement));
}

#[test]
fn test_parse_expression_against_domain() {
    let compilation = parse_source(DOMAIN, &ParseOptions::default()).unwrap();
    let domain = compilation.domain.unwrap();
    let vehicle = domain.lattice.find_set(&["vehicle"]).unwrap();
    let vars = [Variable::object("?v", vehicle)];

    let (exp, diagnostics) = parse_expression(
        "(at ?v depot)",
        &vars,
        ExpressionCategory::Logical,
        Some(&domain),
        &ParseOptions::default(),
    );
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.messages());
    assert_eq!(exp.unwrap().to_string(), "(at ?v depot)");

    let (exp, diagnostics) = parse_expression(
        "(at ?v",
        &vars,
        ExpressionCategory::Logical,
        Some(&domain),
        &ParseOptions::default(),
    );
    assert!(exp.is_none());
    assert!(diagnostics.has_errors());
}
