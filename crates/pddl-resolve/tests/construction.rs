//! Construction tests over complete domain and problem sources.

use enumset::EnumSet;
use logos::Logos;
use pddl_ast::model::{ActionDef, DurationConstraint, InitElement, RootFormula};
use pddl_ast::{
    Category, Diagnostics, ErrorKind, Expression, ExpressionCategory, NumericExp, PddlObject,
    SourceFile, SyntaxNode,
};
use pddl_parser::{parse_expression, parse_file, Token};
use pddl_resolve::{link, resolve_domain, resolve_expression, resolve_problem};
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

fn definition(source: &str, name: &str) -> SyntaxNode {
    let file = SourceFile::new(PathBuf::from(name), source.to_string());
    let mut nodes = parse_file(&lex(source), &file, 0).expect("Parse should succeed");
    assert_eq!(nodes.len(), 1);
    nodes.remove(0)
}

fn domain(source: &str, diagnostics: &mut Diagnostics) -> PddlObject {
    diagnostics.set_file("domain.pddl");
    let node = definition(source, "domain.pddl");
    resolve_domain(&node, "domain.pddl", EnumSet::all(), diagnostics).unwrap()
}

fn problem(source: &str, domain: &PddlObject, diagnostics: &mut Diagnostics) -> PddlObject {
    diagnostics.set_file("problem.pddl");
    let node = definition(source, "problem.pddl");
    resolve_problem(&node, domain, "problem.pddl", EnumSet::all(), diagnostics).unwrap()
}

fn domain_ok(source: &str) -> PddlObject {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(source, &mut diagnostics);
    assert!(!diagnostics.has_errors(), "{:#?}", diagnostics.errors().collect::<Vec<_>>());
    domain
}

fn error_kinds(diagnostics: &Diagnostics) -> Vec<ErrorKind> {
    diagnostics.errors().map(|e| e.kind).collect()
}

fn simple(domain: &PddlObject, name: &str) -> pddl_ast::model::Action {
    match domain.action(name) {
        Some(ActionDef::Simple(action)) => action.clone(),
        other => panic!("expected simple action {name}, got {other:?}"),
    }
}

// === Requirements ===

#[test]
fn test_strips_domain_rejects_forall() {
    let source = r#"
(define (domain d)
  (:requirements :strips)
  (:predicates (p ?x))
  (:action a
    :parameters ()
    :precondition (forall (?x) (p ?x))
    :effect (and)))
"#;
    let mut diagnostics = Diagnostics::new();
    domain(source, &mut diagnostics);
    assert_eq!(diagnostics.count(Category::PARSER_ERROR), 1);
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::MissingRequirement]);
    assert!(diagnostics.errors().next().unwrap().message.contains(":universal-preconditions"));
}

#[test]
fn test_missing_requirements_section_defaults_to_strips() {
    let domain = domain_ok(
        r#"
(define (domain d)
  (:predicates (p))
  (:action a :parameters () :precondition (p) :effect (not (p))))
"#,
    );
    assert!(domain.requirements.contains(pddl_ast::Requirement::Strips));
    assert!(!domain.explicit_requirements);
}

#[test]
fn test_unaccepted_requirement() {
    let source = "(define (domain d) (:requirements :strips :tlplan))";
    let node = definition(source, "domain.pddl");
    let mut diagnostics = Diagnostics::new();
    let accepted = EnumSet::all() - pddl_ast::Requirement::Tlplan;
    resolve_domain(&node, "domain.pddl", accepted, &mut diagnostics).unwrap();
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::UnsupportedRequirement]);
}

// === Typing ===

const VEHICLES: &str = r#"
(define (domain vehicles)
  (:requirements :strips :typing)
  (:types vehicle location - object
          car truck - vehicle)
  (:constants depot - location)
  (:predicates (at ?v - vehicle ?l - location) (car-only ?c - car))
  (:action drive
    :parameters (?c - car ?from ?to - location)
    :precondition (and (at ?c ?from) (car-only ?c))
    :effect (and (not (at ?c ?from)) (at ?c ?to))))
"#;

#[test]
fn test_subtype_argument_is_accepted() {
    let domain = domain_ok(VEHICLES);
    let drive = simple(&domain, "drive");
    assert_eq!(drive.params.len(), 3);
    assert_eq!(drive.precondition.to_string(), "(and (at ?c ?from) (car-only ?c))");
    assert!(domain.constant("depot").is_some());
}

#[test]
fn test_supertype_argument_is_rejected() {
    let source = r#"
(define (domain vehicles)
  (:requirements :strips :typing)
  (:types vehicle location - object car - vehicle)
  (:predicates (car-only ?c - car))
  (:action a
    :parameters (?v - vehicle)
    :precondition (car-only ?v)
    :effect (and)))
"#;
    let mut diagnostics = Diagnostics::new();
    domain(source, &mut diagnostics);
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::SignatureMismatch]);
}

#[test]
fn test_link_vehicles_problem() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(VEHICLES, &mut diagnostics);
    let problem = problem(
        r#"
(define (problem p1)
  (:domain vehicles)
  (:objects c1 - car l1 l2 - location)
  (:init (at c1 l1) (car-only c1))
  (:goal (at c1 l2)))
"#,
        &domain,
        &mut diagnostics,
    );
    assert!(!diagnostics.has_errors());
    assert_eq!(problem.init.len(), 2);

    let linked = link(&domain, &problem, &mut diagnostics).unwrap();
    assert_eq!(
        linked.constants.keys().collect::<Vec<_>>(),
        vec!["depot", "c1", "l1", "l2"]
    );
    assert!(linked.action("drive").is_some());
    assert_eq!(linked.goal.as_ref().unwrap().to_string(), "(at c1 l2)");
}

#[test]
fn test_link_fills_type_domains_from_both_units() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(
        r#"
(define (domain vehicles)
  (:requirements :strips :typing)
  (:types vehicle location - object
          car truck - vehicle)
  (:constants depot - location c0 - car)
  (:predicates (at ?v - vehicle ?l - location)))
"#,
        &mut diagnostics,
    );
    let problem = problem(
        r#"
(define (problem p1)
  (:domain vehicles)
  (:objects c1 - car)
  (:goal (at c1 depot)))
"#,
        &domain,
        &mut diagnostics,
    );
    let linked = link(&domain, &problem, &mut diagnostics).unwrap();
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.messages());

    let lattice = &linked.lattice;
    let names = |ty: &str| -> Vec<String> {
        let id = lattice.lookup(ty).unwrap();
        lattice.domain(id).iter().map(|c| c.name.clone()).collect()
    };
    assert_eq!(names("car"), vec!["c0", "c1"]);
    assert_eq!(names("vehicle"), vec!["c0", "c1"]);
    assert!(names("truck").is_empty());
    assert_eq!(names("location"), vec!["depot"]);
}

#[test]
fn test_duplicate_constant_across_files() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(VEHICLES, &mut diagnostics);
    let problem = problem(
        r#"
(define (problem p1)
  (:domain vehicles)
  (:objects depot - location)
  (:goal (and)))
"#,
        &domain,
        &mut diagnostics,
    );
    assert!(!diagnostics.has_errors());

    assert!(link(&domain, &problem, &mut diagnostics).is_none());
    assert_eq!(diagnostics.count(Category::LINKER_ERROR), 1);
    let error = diagnostics.errors().next().unwrap();
    assert_eq!(error.kind, ErrorKind::DuplicateName);
    assert_eq!(error.file, "problem.pddl");
    assert_eq!(error.labels.len(), 1);
    assert!(error.notes[0].contains("domain.pddl"));
}

#[test]
fn test_init_rejects_derived_and_undeclared() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(
        r#"
(define (domain d)
  (:requirements :derived-predicates)
  (:predicates (p ?x) (q ?x))
  (:derived (q ?x) (p ?x)))
"#,
        &mut diagnostics,
    );
    problem(
        r#"
(define (problem p) (:domain d) (:objects a)
  (:init (p a) (q a) (p undeclared)))
"#,
        &domain,
        &mut diagnostics,
    );
    assert_eq!(
        error_kinds(&diagnostics),
        vec![ErrorKind::WrongKind, ErrorKind::UndefinedName]
    );
}

// === Preferences ===

const PREFERENCES: &str = r#"
(define (domain blocks)
  (:requirements :strips :typing :universal-preconditions :preferences)
  (:types block)
  (:predicates (clear ?b - block) (on ?x ?y - block))
  (:action tidy
    :parameters (?x - block)
    :precondition (and (clear ?x)
                       (forall (?b - block) (preference p1 (clear ?b))))
    :effect (not (clear ?x))))
"#;

#[test]
fn test_precondition_preference_counts_violations() {
    let domain = domain_ok(PREFERENCES);
    assert!(matches!(
        domain.formula("is-violated@p1"),
        Some(RootFormula::NumericFluent(_))
    ));

    let tidy = simple(&domain, "tidy");
    assert_eq!(tidy.precondition.to_string(), "(clear ?x)");
    let effect = tidy.effect.to_string();
    assert!(effect.starts_with("(and (not (clear ?x)) (forall (?b)"), "{effect}");
    assert!(effect.contains("(when (not (clear ?b)) (increase (is-violated@p1) 1))"), "{effect}");
}

#[test]
fn test_goal_preference_shares_counter() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(PREFERENCES, &mut diagnostics);
    let problem = problem(
        r#"
(define (problem p)
  (:domain blocks)
  (:objects a b - block)
  (:goal (and (preference p1 (on a b)) (clear a)))
  (:metric minimize (is-violated p1)))
"#,
        &domain,
        &mut diagnostics,
    );
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.messages());
    assert_eq!(problem.goal.as_ref().unwrap().to_string(), "(clear a)");

    let linked = link(&domain, &problem, &mut diagnostics).unwrap();
    let group = linked.preferences.get("p1").unwrap();
    assert_eq!(group.instances.len(), 2);
    assert_eq!(group.counter.as_deref(), Some("is-violated@p1"));
    assert!(linked.init.iter().any(|e| matches!(
        e,
        InitElement::Numeric { fluent, value } if fluent.name == "is-violated@p1" && *value == 0.0
    )));
}

#[test]
fn test_is_violated_unknown_preference() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(PREFERENCES, &mut diagnostics);
    problem(
        r#"
(define (problem p) (:domain blocks) (:objects a - block)
  (:goal (clear a))
  (:metric minimize (is-violated nope)))
"#,
        &domain,
        &mut diagnostics,
    );
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::UndefinedName]);
}

#[test]
fn test_preference_instances_share_one_counter() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(
        r#"
(define (domain blocks)
  (:requirements :strips :typing :universal-preconditions :preferences)
  (:types block)
  (:predicates (clear ?b - block) (held ?b - block))
  (:action tidy
    :parameters (?x - block)
    :precondition (and (clear ?x)
                       (forall (?b - block) (preference p1 (clear ?b))))
    :effect (not (clear ?x)))
  (:action grab
    :parameters (?x - block)
    :precondition (preference p1 (clear ?x))
    :effect (held ?x)))
"#,
        &mut diagnostics,
    );
    let counters = domain
        .formulas
        .keys()
        .filter(|name| name.starts_with("is-violated@"))
        .count();
    assert_eq!(counters, 1);
    for action in ["tidy", "grab"] {
        let effect = simple(&domain, action).effect.to_string();
        assert!(effect.contains("(increase (is-violated@p1) 1)"), "{effect}");
    }

    let problem = problem(
        r#"
(define (problem p)
  (:domain blocks)
  (:objects a b c - block)
  (:goal (forall (?b - block) (preference p1 (clear ?b)))))
"#,
        &domain,
        &mut diagnostics,
    );
    let linked = link(&domain, &problem, &mut diagnostics).unwrap();
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.messages());

    let group = linked.preferences.get("p1").unwrap();
    assert_eq!(group.counter.as_deref(), Some("is-violated@p1"));
    // two precondition instances plus one goal instance per block
    assert_eq!(group.instances.len(), 5);
    let initial: Vec<f64> = linked
        .init
        .iter()
        .filter_map(|e| match e {
            InitElement::Numeric { fluent, value } if fluent.name == "is-violated@p1" => {
                Some(*value)
            }
            _ => None,
        })
        .collect();
    assert_eq!(initial, vec![0.0]);
}

// === Durative actions ===

fn durative_domain(duration: &str, effect: &str) -> String {
    format!(
        r#"
(define (domain timed)
  (:requirements :durative-actions :duration-inequalities :conditional-effects)
  (:predicates (ready) (done) (flag))
  (:durative-action work
    :parameters ()
    :duration {duration}
    :condition (and (at start (ready)) (over all (ready)))
    :effect {effect}))
"#
    )
}

fn work(domain: &PddlObject) -> pddl_ast::model::DurativeAction {
    match domain.action("work") {
        Some(ActionDef::Durative(action)) => action.clone(),
        other => panic!("expected durative action, got {other:?}"),
    }
}

#[test]
fn test_duration_equality_and_buckets() {
    let domain = domain_ok(&durative_domain("(= ?duration 5)", "(at end (done))"));
    let work = work(&domain);
    assert!(matches!(
        work.duration,
        DurationConstraint::Exact { value: NumericExp::Number(v), .. } if v == 5.0
    ));
    assert_eq!(work.conditions.start.len(), 1);
    assert_eq!(work.conditions.overall.len(), 1);
    assert!(work.conditions.end.is_empty());
    assert_eq!(work.effects.end.len(), 1);
}

#[test]
fn test_duration_bounds() {
    let domain = domain_ok(&durative_domain(
        "(and (>= ?duration 1) (<= ?duration 4))",
        "(at end (done))",
    ));
    match work(&domain).duration {
        DurationConstraint::Range { lower, upper, .. } => {
            assert_eq!(lower, Some(NumericExp::Number(1.0)));
            assert_eq!(upper, Some(NumericExp::Number(4.0)));
        }
        other => panic!("expected a range, got {other:?}"),
    }
}

#[test]
fn test_duration_rejects_two_equalities() {
    let mut diagnostics = Diagnostics::new();
    domain(
        &durative_domain("(and (= ?duration 1) (= ?duration 2))", "(at end (done))"),
        &mut diagnostics,
    );
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::InvalidDuration]);
}

#[test]
fn test_duration_rejects_start_and_end() {
    let mut diagnostics = Diagnostics::new();
    domain(
        &durative_domain(
            "(and (at start (>= ?duration 1)) (at end (<= ?duration 3)))",
            "(at end (done))",
        ),
        &mut diagnostics,
    );
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::Unsupported]);
}

#[test]
fn test_untimed_durative_effect_is_misplaced() {
    let mut diagnostics = Diagnostics::new();
    domain(&durative_domain("(= ?duration 1)", "(done)"), &mut diagnostics);
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::Misplaced]);
}

#[test]
fn test_conditional_effect_across_time_points() {
    let domain = domain_ok(&durative_domain(
        "(= ?duration 2)",
        "(when (at start (flag)) (at end (done)))",
    ));
    let dummy = "work@when0";
    assert!(matches!(
        domain.formula(dummy),
        Some(RootFormula::Predicate(sig)) if sig.arity() == 0
    ));
    let work = work(&domain);
    assert_eq!(
        work.effects.start[0].to_string(),
        format!("(when (flag) ({dummy}))")
    );
    assert_eq!(
        work.effects.end[0].to_string(),
        format!("(when ({dummy}) (and (done) (not ({dummy}))))")
    );
}

#[test]
fn test_effect_at_start_guarded_at_end_is_unsupported() {
    let mut diagnostics = Diagnostics::new();
    domain(
        &durative_domain("(= ?duration 2)", "(when (at end (flag)) (at start (done)))"),
        &mut diagnostics,
    );
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::Unsupported]);
}

#[test]
fn test_overall_preference_is_wired_into_every_bucket() {
    let mut diagnostics = Diagnostics::new();
    let domain = domain(
        r#"
(define (domain timed)
  (:requirements :durative-actions :preferences)
  (:predicates (ready) (done))
  (:durative-action work
    :parameters ()
    :duration (= ?duration 5)
    :condition (and (at start (ready)) (over all (preference keep (ready))))
    :effect (at end (done))))
"#,
        &mut diagnostics,
    );
    let problem = problem(
        r#"
(define (problem p) (:domain timed) (:init (ready)) (:goal (done)))
"#,
        &domain,
        &mut diagnostics,
    );
    let linked = link(&domain, &problem, &mut diagnostics).unwrap();
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.messages());

    let work = work(&linked);
    let bump = "(when (not (ready)) (increase (is-violated@keep) 1))";
    for (bucket, effects) in [
        ("start", &work.effects.start),
        ("overall", &work.effects.overall),
        ("end", &work.effects.end),
    ] {
        assert!(
            effects.iter().any(|e| e.to_string().contains(bump)),
            "{bucket}: {effects:?}"
        );
    }
    assert!(work.overall_preferences.is_empty());
    assert_eq!(
        linked.preferences.get("keep").unwrap().counter.as_deref(),
        Some("is-violated@keep")
    );
    assert!(linked.init.iter().any(|e| matches!(
        e,
        InitElement::Numeric { fluent, value } if fluent.name == "is-violated@keep" && *value == 0.0
    )));
}

// === Derived predicates ===

#[test]
fn test_derived_rules_are_merged() {
    let domain = domain_ok(
        r#"
(define (domain towers)
  (:requirements :derived-predicates :existential-preconditions)
  (:predicates (on ?x ?y))
  (:derived (above ?x ?y) (on ?x ?y))
  (:derived (above ?a ?b) (exists (?z) (and (on ?a ?z) (above ?z ?b)))))
"#,
    );
    match domain.formula("above") {
        Some(RootFormula::Derived { signature, body }) => {
            assert_eq!(signature.arity(), 2);
            assert_eq!(
                body.to_string(),
                "(or (on ?x ?y) (exists (?z) (and (on ?x ?z) (above ?z ?y))))"
            );
        }
        other => panic!("expected a derived predicate, got {other:?}"),
    }
}

#[test]
fn test_derived_predicate_cannot_be_an_effect() {
    let mut diagnostics = Diagnostics::new();
    domain(
        r#"
(define (domain d)
  (:requirements :derived-predicates)
  (:predicates (p) (q))
  (:derived (q) (p))
  (:action a :parameters () :effect (q)))
"#,
        &mut diagnostics,
    );
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::WrongKind]);
}

// === Numeric fluents ===

#[test]
fn test_bare_nullary_fluent_in_numeric_position() {
    let domain = domain_ok(
        r#"
(define (domain fuel)
  (:requirements :numeric-fluents)
  (:functions (fuel))
  (:action refuel
    :parameters ()
    :precondition (< fuel 5)
    :effect (increase (fuel) 1)))
"#,
    );
    assert_eq!(simple(&domain, "refuel").precondition.to_string(), "(< (fuel) 5)");
}

// === Standalone expressions ===

#[test]
fn test_expression_against_domain() {
    let domain = domain_ok(VEHICLES);
    let source = "(and (at ?c depot) (car-only ?c))";
    let file = SourceFile::new(PathBuf::from("expr"), source.to_string());
    let node = parse_expression(&lex(source), &file, 0).unwrap();
    // ?c - car, borrowed from the action that declares it
    let vars = [simple(&domain, "drive").params[0].clone()];

    let mut diagnostics = Diagnostics::new();
    let exp = resolve_expression(
        &node,
        ExpressionCategory::Logical,
        &vars,
        Some(&domain),
        EnumSet::all(),
        &mut diagnostics,
    )
    .unwrap();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics.messages());
    assert_eq!(exp.to_string(), source);

    let mut diagnostics = Diagnostics::new();
    let wrong = "(car-only depot)";
    let file = SourceFile::new(PathBuf::from("expr"), wrong.to_string());
    let node = parse_expression(&lex(wrong), &file, 0).unwrap();
    resolve_expression(
        &node,
        ExpressionCategory::Logical,
        &[],
        Some(&domain),
        EnumSet::all(),
        &mut diagnostics,
    )
    .unwrap();
    assert_eq!(error_kinds(&diagnostics), vec![ErrorKind::SignatureMismatch]);
}

#[test]
fn test_numeric_expression_without_domain() {
    let source = "(max 2 (* 3 4))";
    let file = SourceFile::new(PathBuf::from("expr"), source.to_string());
    let node = parse_expression(&lex(source), &file, 0).unwrap();
    let mut diagnostics = Diagnostics::new();
    let exp = resolve_expression(
        &node,
        ExpressionCategory::Numeric,
        &[],
        None,
        EnumSet::all(),
        &mut diagnostics,
    )
    .unwrap();
    assert!(diagnostics.is_empty());
    assert!(matches!(exp, Expression::Numeric(_)));
    assert_eq!(exp.to_string(), source);
}
