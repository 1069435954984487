//! Recognizer tests over complete domain and problem files.
//!
//! These check node shapes the resolver depends on and the recovery
//! behavior for malformed sections.

use logos::Logos;
use pddl_ast::{NodeKind, SourceFile, SyntaxNode};
use pddl_parser::{parse_expression, parse_file, ParseError, Token};
use std::ops::Range;
use std::path::PathBuf;

fn lex(source: &str) -> Vec<(Token, Range<usize>)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        tokens.push((token.expect("test sources lex cleanly"), lexer.span()));
    }
    tokens
}

fn parse_ok(source: &str) -> Vec<SyntaxNode> {
    let file = SourceFile::new(PathBuf::from("test.pddl"), source.to_string());
    parse_file(&lex(source), &file, 0).expect("Parse should succeed")
}

fn expect_error(source: &str) -> Vec<ParseError> {
    let file = SourceFile::new(PathBuf::from("test.pddl"), source.to_string());
    match parse_file(&lex(source), &file, 0) {
        Ok(_) => panic!("Expected parse error, but parsing succeeded"),
        Err(errors) => {
            assert!(!errors.is_empty(), "Expected at least one error");
            errors
        }
    }
}

fn kinds(node: &SyntaxNode) -> Vec<NodeKind> {
    node.children.iter().filter_map(SyntaxNode::kind).collect()
}

const BLOCKS: &str = r#"
; blocks world
(define (domain blocks)
  (:requirements :strips :typing)
  (:types block)
  (:predicates (on ?x ?y - block) (clear ?x - block) (handempty))
  (:action stack
    :parameters (?x ?y - block)
    :precondition (and (clear ?y) (holding ?x))
    :effect (and (on ?x ?y) (not (clear ?y)))))
"#;

#[test]
fn test_domain_sections_in_order() {
    let nodes = parse_ok(BLOCKS);
    assert_eq!(nodes.len(), 1);
    let domain = &nodes[0];
    assert_eq!(domain.kind(), Some(NodeKind::Domain));
    assert_eq!(domain.children[0].image(), "blocks");
    assert_eq!(
        kinds(domain),
        vec![
            NodeKind::Name,
            NodeKind::Requirements,
            NodeKind::Types,
            NodeKind::Predicates,
            NodeKind::Action,
        ]
    );
}

#[test]
fn test_action_layout() {
    let nodes = parse_ok(BLOCKS);
    let action = &nodes[0].children[4];
    assert_eq!(
        kinds(action),
        vec![
            NodeKind::Name,
            NodeKind::Parameters,
            NodeKind::Precondition,
            NodeKind::Effect,
        ]
    );
    assert_eq!(action.line(), 7);
}

#[test]
fn test_missing_parameters_become_empty() {
    let nodes = parse_ok("(define (domain d) (:action noop :effect (done)))");
    let action = &nodes[0].children[1];
    assert_eq!(kinds(action), vec![NodeKind::Name, NodeKind::Parameters, NodeKind::Effect]);
    assert!(action.children[1].children.is_empty());
}

#[test]
fn test_durative_action_layout() {
    let source = r#"
(define (domain d)
  (:durative-action fly
    :parameters (?p - plane)
    :duration (= ?duration (distance ?p))
    :condition (at start (ready ?p))
    :effect (and (at end (arrived ?p)) (decrease (fuel ?p) (* #t 2)))))
"#;
    let nodes = parse_ok(source);
    let action = &nodes[0].children[1];
    assert_eq!(action.kind(), Some(NodeKind::DurativeAction));
    assert_eq!(
        kinds(action),
        vec![
            NodeKind::Name,
            NodeKind::Parameters,
            NodeKind::Duration,
            NodeKind::Condition,
            NodeKind::Effect,
        ]
    );
    let duration = &action.children[2].children[0];
    assert_eq!(duration.kind(), Some(NodeKind::Comparison));
    assert_eq!(
        kinds(duration),
        vec![NodeKind::Variable, NodeKind::FunctionTerm]
    );
}

#[test]
fn test_problem_layout() {
    let source = r#"
(define (problem p1)
  (:domain blocks)
  (:objects a b - block)
  (:init (clear a) (= (weight a) 3) (at 5 (not (clear b))))
  (:goal (on a b))
  (:metric minimize (total-time)))
"#;
    let nodes = parse_ok(source);
    let problem = &nodes[0];
    assert_eq!(
        kinds(problem),
        vec![
            NodeKind::Name,
            NodeKind::ProblemDomain,
            NodeKind::Objects,
            NodeKind::Init,
            NodeKind::Goal,
            NodeKind::Metric,
        ]
    );
    let init = &problem.children[3];
    assert_eq!(
        kinds(init),
        vec![NodeKind::Atom, NodeKind::Comparison, NodeKind::TimedLiteral]
    );
    assert_eq!(problem.children[5].image(), "minimize");
}

#[test]
fn test_functions_and_defined_forms() {
    let source = r#"
(define (domain tl)
  (:functions (fuel ?t) (capacity) - number (owner ?t) - agent)
  (:defined-predicate (full ?t) (>= (fuel ?t) (capacity)))
  (:defined-function (twice ?x)
     (:local-vars ?y - number)
     (:= ?y (* 2 ?x))
     ?y))
"#;
    let nodes = parse_ok(source);
    let domain = &nodes[0];
    let functions = &domain.children[1];
    assert_eq!(functions.children.len(), 2);
    assert_eq!(
        kinds(&functions.children[0]),
        vec![
            NodeKind::AtomicSkeleton,
            NodeKind::AtomicSkeleton,
            NodeKind::TypeSpec,
        ]
    );
    assert_eq!(
        kinds(&domain.children[3]),
        vec![
            NodeKind::AtomicSkeleton,
            NodeKind::LocalVars,
            NodeKind::LocalAssign,
            NodeKind::Variable,
        ]
    );
}

#[test]
fn test_domain_and_problem_in_one_file() {
    let source = "(define (domain d)) (define (problem p) (:domain d))";
    let nodes = parse_ok(source);
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1].kind(), Some(NodeKind::Problem));
}

#[test]
fn test_unclosed_define_is_eof() {
    let errors = expect_error("(define (domain d) (:predicates (p))");
    assert!(
        errors.iter().any(|e| e.message.contains("end of input")),
        "Should report unexpected end of input, got: {:?}",
        errors
    );
}

#[test]
fn test_bad_section_is_skipped_and_parsing_continues() {
    let source = r#"
(define (domain d)
  (:action broken :parameters (?x - ) :effect (p))
  (:frobnicate)
  (:predicates (p)))
"#;
    let errors = expect_error(source);
    assert_eq!(errors.len(), 2, "got: {:?}", errors);
    assert!(errors[1].message.contains("unknown domain section ':frobnicate'"));
    assert_eq!(errors[1].span.line, 4);
}

#[test]
fn test_durative_action_requires_duration() {
    let errors = expect_error("(define (domain d) (:durative-action a :effect (at end (p))))");
    assert!(errors[0].message.contains("no :duration"));
}

#[test]
fn test_metric_direction_checked() {
    let errors = expect_error("(define (problem p) (:domain d) (:metric reduce (cost)))");
    assert!(errors[0].message.contains("minimize"));
}

#[test]
fn test_standalone_expression() {
    let source = "(exists (?b) (and (clear ?b) (not (= ?b table))))";
    let file = SourceFile::new(PathBuf::from("expr"), source.to_string());
    let node = parse_expression(&lex(source), &file, 0).unwrap();
    assert_eq!(node.kind(), Some(NodeKind::Exists));

    let trailing = "(p) (q)";
    let file = SourceFile::new(PathBuf::from("expr"), trailing.to_string());
    let errors = parse_expression(&lex(trailing), &file, 0).unwrap_err();
    assert!(errors[0].message.contains("after the end"));
}
