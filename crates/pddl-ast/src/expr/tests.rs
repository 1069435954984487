use super::*;
use crate::foundation::Span;
use crate::model::{
    counter_name, FormulaTable, PreferenceBody, PreferenceInstance, PreferenceSite,
    PreferenceTable, RootFormula, Signature,
};
use crate::types::TypeSetId;
use crate::world::{GroundAtom, Universe, WorldState};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Lattice with `block` and blocks a, b, c.
fn blocks() -> (TypeLattice, TypeSetId) {
    let mut lattice = TypeLattice::new();
    let id = lattice.declare("block", &[]).unwrap();
    let set = lattice.singleton(id);
    let constants: Vec<Constant> = ["a", "b", "c"]
        .iter()
        .map(|n| Constant::new(*n, set))
        .collect();
    lattice.materialize_domains(&constants);
    (lattice, set)
}

fn state_with(formulas: FormulaTable, preferences: PreferenceTable) -> (WorldState, TypeSetId) {
    let (lattice, set) = blocks();
    let universe = Universe::new(Arc::new(lattice))
        .with_formulas(Arc::new(formulas))
        .with_preferences(Arc::new(preferences));
    (WorldState::new(Arc::new(universe)), set)
}

fn state() -> (WorldState, TypeSetId) {
    state_with(FormulaTable::new(), PreferenceTable::new())
}

fn n(value: f64) -> NumericExp {
    NumericExp::Number(value)
}

fn var(name: &str, set: TypeSetId) -> Variable {
    Variable::object(name, set)
}

fn block(name: &str, set: TypeSetId) -> Constant {
    Constant::new(name, set)
}

fn closed(exp: &NumericExp) -> Result<f64, EvalError> {
    let (world, _) = state();
    exp.evaluate_closed(&world, &mut Bindings::new())
}

#[test]
fn test_single_operand_arithmetic() {
    let minus = NumericExp::nary(ArithOp::Sub, vec![n(5.0)]);
    let divide = NumericExp::nary(ArithOp::Div, vec![n(4.0)]);
    assert_eq!(closed(&minus), Ok(-5.0));
    assert_eq!(closed(&divide), Ok(0.25));
}

#[test]
fn test_left_fold_subtraction() {
    let exp = NumericExp::nary(ArithOp::Sub, vec![n(10.0), n(3.0), n(2.0)]);
    assert_eq!(closed(&exp), Ok(5.0));
}

#[test]
fn test_overflow_in_an_intermediate_sum_is_a_domain_error() {
    let exp = NumericExp::nary(ArithOp::Add, vec![n(1e308), n(1e308), n(-1e308)]);
    assert!(matches!(closed(&exp), Err(EvalError::Numeric(_))));
}

#[test]
fn test_division_by_zero_is_a_domain_error() {
    let exp = NumericExp::nary(ArithOp::Div, vec![n(3.0), n(0.0)]);
    assert!(matches!(closed(&exp), Err(EvalError::Numeric(_))));

    let (world, _) = state();
    assert!(matches!(
        exp.evaluate_open(&world, &mut Bindings::new()),
        Err(EvalError::Numeric(_))
    ));
}

#[test]
fn test_undefined_fluent_open_and_closed() {
    let (world, _) = state();
    let fuel = NumericExp::fluent("fuel", Vec::new());
    let sum = NumericExp::nary(ArithOp::Add, vec![n(1.0), fuel.clone()]);
    assert_eq!(
        sum.evaluate_open(&world, &mut Bindings::new()),
        Ok(Fuzzy::Undefined)
    );
    assert!(matches!(
        sum.evaluate_closed(&world, &mut Bindings::new()),
        Err(EvalError::Undefined(_))
    ));

    // comparisons over an undefined value do not hold
    let cmp = LogicalExp::Compare {
        op: CompareOp::Ge,
        left: fuel,
        right: n(0.0),
    };
    assert_eq!(cmp.evaluate_closed(&world, &mut Bindings::new()), Ok(false));
}

#[test]
fn test_unknown_stops_conjunction_left_to_right() {
    let (mut world, set) = state();
    let hidden = GroundAtom::new("clear", vec![block("a", set)]);
    world.mark_unknown(hidden);

    let clear_a = LogicalExp::atom("clear", vec![Term::Constant(block("a", set))]);
    let unknown_first = LogicalExp::And(vec![clear_a.clone(), LogicalExp::False]);
    let false_first = LogicalExp::And(vec![LogicalExp::False, clear_a]);
    assert_eq!(
        unknown_first.evaluate_open(&world, &mut Bindings::new()),
        Ok(Fuzzy::Unknown)
    );
    assert_eq!(
        false_first.evaluate_open(&world, &mut Bindings::new()),
        Ok(Fuzzy::Defined(false))
    );
}

#[test]
fn test_quantifiers_range_over_type_domains() {
    let (mut world, set) = state();
    for name in ["a", "b"] {
        world.set_fact(GroundAtom::new("clear", vec![block(name, set)]), true);
    }
    let x = var("?x", set);
    let clear_x = LogicalExp::atom("clear", vec![Term::Variable(x.clone())]);
    let exists = LogicalExp::Exists {
        vars: vec![x.clone()],
        body: Box::new(clear_x.clone()),
    };
    let forall = LogicalExp::Forall {
        vars: vec![x],
        body: Box::new(clear_x),
    };
    let mut bindings = Bindings::new();
    assert_eq!(exists.evaluate_closed(&world, &mut bindings), Ok(true));
    assert_eq!(forall.evaluate_closed(&world, &mut bindings), Ok(false));
    assert!(bindings.is_empty());

    world.set_fact(GroundAtom::new("clear", vec![block("c", set)]), true);
    assert_eq!(
        forall.evaluate_open(&world, &mut bindings),
        Ok(Fuzzy::Defined(true))
    );
}

#[test]
fn test_unbound_variable_is_an_error() {
    let (world, set) = state();
    let exp = LogicalExp::atom("clear", vec![Term::Variable(var("?x", set))]);
    assert_eq!(
        exp.evaluate_closed(&world, &mut Bindings::new()),
        Err(EvalError::Unbound("?x".into()))
    );
}

#[test]
fn test_derived_predicate_cycle_is_false() {
    let (_, set) = blocks();
    let x = var("?x", set);
    let mut formulas = FormulaTable::new();
    // (:derived (above ?x) (or (on-table ?x) (above ?x)))
    formulas.insert(
        "above".into(),
        RootFormula::Derived {
            signature: Signature::new("above", vec![x.clone()], Span::default()),
            body: LogicalExp::Or(vec![
                LogicalExp::atom("on-table", vec![Term::Variable(x.clone())]),
                LogicalExp::atom("above", vec![Term::Variable(x)]),
            ]),
        },
    );
    let (mut world, set) = state_with(formulas, PreferenceTable::new());
    world.set_fact(GroundAtom::new("on-table", vec![block("a", set)]), true);

    let above = |name: &str| LogicalExp::atom("above", vec![Term::Constant(block(name, set))]);
    assert_eq!(above("a").evaluate_closed(&world, &mut Bindings::new()), Ok(true));
    assert_eq!(above("b").evaluate_closed(&world, &mut Bindings::new()), Ok(false));
}

#[test]
fn test_defined_predicate_recursion_is_reported() {
    let (_, set) = blocks();
    let x = var("?x", set);
    let mut formulas = FormulaTable::new();
    formulas.insert(
        "loop".into(),
        RootFormula::DefinedPredicate {
            signature: Signature::new("loop", vec![x.clone()], Span::default()),
            locals: Vec::new(),
            body: LogicalExp::Defined {
                name: "loop".into(),
                args: vec![Term::Variable(x)],
            },
        },
    );
    let (world, set) = state_with(formulas, PreferenceTable::new());
    let exp = LogicalExp::Defined {
        name: "loop".into(),
        args: vec![Term::Constant(block("a", set))],
    };
    assert!(matches!(
        exp.evaluate_closed(&world, &mut Bindings::new()),
        Err(EvalError::Recursion(_))
    ));
}

#[test]
fn test_defined_function_reads_result_after_body() {
    let (_, set) = blocks();
    let x = var("?x", set);
    let local = Variable::new("?v", VariableKind::NumericLocal);
    let mut formulas = FormulaTable::new();
    // holds for clear blocks only, yielding 7
    formulas.insert(
        "weight".into(),
        RootFormula::DefinedFunction {
            signature: Signature::new("weight", vec![x.clone()], Span::default()),
            locals: vec![local.clone()],
            body: LogicalExp::And(vec![
                LogicalExp::atom("clear", vec![Term::Variable(x)]),
                LogicalExp::Assign {
                    var: local.clone(),
                    value: LocalValue::Numeric(n(7.0)),
                },
            ]),
            result: NumericExp::Variable(local),
        },
    );
    let (mut world, set) = state_with(formulas, PreferenceTable::new());
    world.set_fact(GroundAtom::new("clear", vec![block("a", set)]), true);

    let weight = |name: &str| NumericExp::Defined {
        name: "weight".into(),
        args: vec![Term::Constant(block(name, set))],
    };
    let mut bindings = Bindings::new();
    assert_eq!(weight("a").evaluate_closed(&world, &mut bindings), Ok(7.0));
    assert_eq!(
        weight("b").evaluate_open(&world, &mut bindings),
        Ok(Fuzzy::Undefined)
    );
    assert!(matches!(
        weight("b").evaluate_closed(&world, &mut bindings),
        Err(EvalError::Undefined(_))
    ));
    assert!(bindings.is_empty());
}

#[test]
fn test_is_violated_adds_counter_and_goal_violations() {
    let (_, set) = blocks();
    let mut preferences = PreferenceTable::new();
    for name in ["a", "b"] {
        preferences.record(PreferenceInstance {
            name: "p1".into(),
            site: PreferenceSite::Goal,
            body: PreferenceBody::Condition(LogicalExp::atom(
                "clear",
                vec![Term::Constant(block(name, set))],
            )),
            context: Vec::new(),
        });
    }
    let (counter, _) = preferences.ensure_counter("p1");
    let (mut world, set) = state_with(FormulaTable::new(), preferences);
    world.set_numeric(GroundAtom::nullary(counter.as_str()), 2.0);
    world.set_fact(GroundAtom::new("clear", vec![block("a", set)]), true);

    let exp = NumericExp::IsViolated("p1".into());
    assert_eq!(exp.evaluate_closed(&world, &mut Bindings::new()), Ok(3.0));
    assert_eq!(
        exp.evaluate_open(&world, &mut Bindings::new()),
        Ok(Fuzzy::Defined(3.0))
    );
    assert_eq!(counter, counter_name("p1"));
    assert_eq!(
        NumericExp::IsViolated("other".into()).evaluate_closed(&world, &mut Bindings::new()),
        Ok(0.0)
    );
}

#[test]
fn test_simplify_leaves_unknown_residual() {
    let (mut world, set) = state();
    let a = Term::Constant(block("a", set));
    world.set_fact(GroundAtom::new("clear", vec![block("a", set)]), true);
    world.mark_unknown(GroundAtom::new("on-table", vec![block("a", set)]));

    let on_table = LogicalExp::atom("on-table", vec![a.clone()]);
    let exp = LogicalExp::And(vec![
        LogicalExp::atom("clear", vec![a]),
        on_table.clone(),
    ]);
    assert_eq!(
        exp.simplify(&world, &Bindings::new()),
        Ok(Reduced::Residual(on_table))
    );
}

#[test]
fn test_simplify_substitutes_bound_variables() {
    let (world, set) = state();
    let x = var("?x", set);
    let fuel = NumericExp::nary(
        ArithOp::Add,
        vec![n(1.0), n(2.0), NumericExp::fluent("fuel", vec![Term::Variable(x.clone())])],
    );
    let bindings = Bindings::new();
    let Ok(Reduced::Residual(residual)) = fuel.simplify(&world, &bindings) else {
        panic!("expected a residual");
    };
    assert_eq!(residual.to_string(), "(+ 1 2 (fuel ?x))");

    let bound = Bindings::new().with("?x", Value::Object(block("a", set)));
    assert_eq!(fuel.simplify(&world, &bound), Ok(Reduced::Undefined));
}

#[test]
fn test_simplify_keeps_local_assignment() {
    let (world, _) = state();
    let local = Variable::new("?v", VariableKind::NumericLocal);
    let exp = LogicalExp::And(vec![
        LogicalExp::Assign {
            var: local.clone(),
            value: LocalValue::Numeric(n(3.0)),
        },
        LogicalExp::Compare {
            op: CompareOp::Gt,
            left: NumericExp::Variable(local),
            right: n(2.0),
        },
    ]);
    let direct = exp.evaluate_open(&world, &mut Bindings::new());
    assert_eq!(direct, Ok(Fuzzy::Defined(true)));

    let Ok(Reduced::Residual(residual)) = exp.simplify(&world, &Bindings::new()) else {
        panic!("expected the assignment to remain");
    };
    assert_eq!(residual.to_string(), "(:= ?v 3)");
    assert_eq!(residual.evaluate_open(&world, &mut Bindings::new()), direct);
}

#[test]
fn test_effect_collects_updates() {
    let (mut world, set) = state();
    world.set_fact(GroundAtom::new("clear", vec![block("b", set)]), true);
    let x = var("?x", set);
    let effect = Effect::Forall {
        vars: vec![x.clone()],
        body: Box::new(Effect::When {
            condition: LogicalExp::atom("clear", vec![Term::Variable(x.clone())]),
            effect: Box::new(Effect::conjoin([
                Effect::delete("clear", vec![Term::Variable(x)]),
                Effect::Numeric {
                    op: AssignOp::Increase,
                    name: "moves".into(),
                    args: Vec::new(),
                    value: n(1.0),
                },
            ])),
        }),
    };
    let updates = effect.evaluate_closed(&world, &mut Bindings::new()).unwrap();
    assert_eq!(
        updates,
        vec![
            Update::Delete(GroundAtom::new("clear", vec![block("b", set)])),
            Update::Numeric {
                fluent: GroundAtom::nullary("moves"),
                op: AssignOp::Increase,
                value: 1.0,
            },
        ]
    );
}

#[test]
fn test_constants_render_as_empty_connectives() {
    assert_eq!(LogicalExp::True.to_string(), "(and)");
    assert_eq!(LogicalExp::False.to_string(), "(or)");
}

#[test]
fn test_quantified_variables_are_not_free() {
    let (_, set) = blocks();
    let x = var("?x", set);
    let y = var("?y", set);
    let exp = LogicalExp::Forall {
        vars: vec![x.clone()],
        body: Box::new(LogicalExp::atom(
            "on",
            vec![Term::Variable(x), Term::Variable(y.clone())],
        )),
    };
    assert_eq!(exp.free_variables().into_iter().collect::<Vec<_>>(), vec![y]);
    assert!(!Expression::Logical(exp).is_ground());
}

#[test]
fn test_apply_respects_quantifier_shadowing() {
    let (_, set) = blocks();
    let x = var("?x", set);
    let exp = LogicalExp::And(vec![
        LogicalExp::atom("clear", vec![Term::Variable(x.clone())]),
        LogicalExp::Exists {
            vars: vec![x.clone()],
            body: Box::new(LogicalExp::atom("clear", vec![Term::Variable(x)])),
        },
    ]);
    let bindings = Bindings::new().with("?x", Value::Object(block("a", set)));
    assert_eq!(
        exp.apply(&bindings).to_string(),
        "(and (clear a) (exists (?x) (clear ?x)))"
    );
}

// Ground numeric trees over fluents f0..f2, where f2 is undefined.
fn numeric_tree() -> impl Strategy<Value = NumericExp> {
    let leaf = prop_oneof![
        (-20i32..20).prop_map(|v| NumericExp::Number(f64::from(v))),
        (0usize..3).prop_map(|i| NumericExp::fluent(format!("f{i}"), Vec::new())),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (
                prop_oneof![
                    Just(ArithOp::Add),
                    Just(ArithOp::Sub),
                    Just(ArithOp::Mul),
                    Just(ArithOp::Div)
                ],
                prop::collection::vec(inner.clone(), 1..3)
            )
                .prop_map(|(op, args)| NumericExp::nary(op, args)),
            inner.prop_map(|arg| NumericExp::Unary {
                op: UnaryOp::Abs,
                arg: Box::new(arg),
            }),
        ]
    })
}

fn fluent_world() -> WorldState {
    let (mut world, _) = state();
    world.set_numeric(GroundAtom::nullary("f0"), 3.0);
    world.set_numeric(GroundAtom::nullary("f1"), -2.0);
    world
}

fn logical_tree(set: TypeSetId) -> impl Strategy<Value = LogicalExp> {
    let names = prop_oneof![Just("?x"), Just("?y"), Just("?z")];
    let leaf = prop_oneof![
        Just(LogicalExp::True),
        names.prop_map(move |v| LogicalExp::atom("p", vec![Term::Variable(var(v, set))])),
    ];
    leaf.prop_recursive(3, 16, 3, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..3).prop_map(LogicalExp::And),
            inner
                .clone()
                .prop_map(move |body| LogicalExp::Exists {
                    vars: vec![var("?y", set)],
                    body: Box::new(body),
                }),
            inner.prop_map(LogicalExp::negate),
        ]
    })
}

proptest! {
    #[test]
    fn prop_open_and_closed_agree_on_ground_numerics(exp in numeric_tree()) {
        let world = fluent_world();
        let open = exp.evaluate_open(&world, &mut Bindings::new());
        let closed = exp.evaluate_closed(&world, &mut Bindings::new());
        match (open, closed) {
            (Ok(Fuzzy::Defined(a)), Ok(b)) => prop_assert_eq!(a, b),
            (Ok(Fuzzy::Undefined), Err(EvalError::Undefined(_))) => {}
            (Err(EvalError::Numeric(_)), Err(EvalError::Numeric(_))) => {}
            (open, closed) => prop_assert!(false, "open {:?} vs closed {:?}", open, closed),
        }
    }

    #[test]
    fn prop_simplify_then_evaluate_matches_evaluate(exp in numeric_tree()) {
        let world = fluent_world();
        let direct = exp.evaluate_open(&world, &mut Bindings::new());
        match exp.simplify(&world, &Bindings::new()) {
            Ok(Reduced::Value(v)) => prop_assert_eq!(direct, Ok(Fuzzy::Defined(v))),
            Ok(Reduced::Undefined) => prop_assert_eq!(direct, Ok(Fuzzy::Undefined)),
            Ok(Reduced::Residual(r)) => {
                prop_assert_eq!(r.evaluate_open(&world, &mut Bindings::new()), direct)
            }
            Err(err) => prop_assert_eq!(direct, Err(err)),
        }
    }

    #[test]
    fn prop_apply_with_no_bindings_is_identity(exp in logical_tree(TypeSetId::OBJECT)) {
        prop_assert_eq!(exp.apply(&Bindings::new()), exp);
    }

    #[test]
    fn prop_standardize_round_trips(exp in logical_tree(TypeSetId::OBJECT)) {
        let forward: HashMap<String, String> = ["?x", "?y", "?z"]
            .iter()
            .enumerate()
            .map(|(i, v)| (v.to_string(), format!("?v{i}")))
            .collect();
        let backward: HashMap<String, String> =
            forward.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        let renamed = exp.standardize(&forward);
        prop_assert!(renamed
            .free_variables()
            .iter()
            .all(|v| v.name.starts_with("?v")));
        prop_assert_eq!(renamed.standardize(&backward), exp);
    }
}
