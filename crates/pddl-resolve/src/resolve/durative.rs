//! Durative action assembly.
//!
//! Conditions and effects of a durative action are split by time point into
//! [`TimedBuckets`]. A conditional effect whose guard and effect sit at
//! different time points is carried over by a synthesized dummy atom: the
//! guard's time point adds it, the effect's time point consumes it.

use super::conditions::{condition, preference_parts};
use super::context::{SemanticContext, Site};
use super::declarations::{expect, typed_variables};
use super::effects::{effect, guard_condition};
use super::numeric::numeric;
use crate::error::{child, kind_of, FatalError, Result};
use pddl_ast::expr::{CompareOp, TimeSpec};
use pddl_ast::model::{DurationConstraint, DurativeAction, RootFormula, Signature, TimedBuckets};
use pddl_ast::{
    Effect, ErrorKind, LogicalExp, NodeKind, NumericExp, Requirement, Span, SyntaxNode, Term,
    Variable,
};
use tracing::trace;

/// Resolve a `:durative-action`.
pub fn durative_action(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<DurativeAction> {
    expect(node, NodeKind::DurativeAction, "a durative action")?;
    ctx.require(Requirement::DurativeActions, node.span, "a durative action");
    let name = child(node, 0, "action name")?.image().to_string();
    let params = typed_variables(ctx, child(node, 1, "parameters")?)?;

    let mut scope = params.clone();
    scope.push(Variable::duration());
    ctx.push_scope(&scope, node.span);
    ctx.durative = true;
    let built = assemble(ctx, node, &name, &params);
    ctx.durative = false;
    ctx.site = Site::Body;
    ctx.scopes.pop();
    let (duration, conditions, mut effects) = built?;

    for (at, violation) in std::mem::take(&mut ctx.pending_effects) {
        effects
            .at_mut(at.unwrap_or(TimeSpec::AtStart))
            .push(violation);
    }
    let overall_preferences = std::mem::take(&mut ctx.pending_overall);

    trace!(action = %name, params = params.len(), "durative action built");
    Ok(DurativeAction {
        name,
        params,
        duration,
        conditions,
        effects,
        overall_preferences,
        span: node.span,
    })
}

type Assembled = (
    DurationConstraint,
    TimedBuckets<LogicalExp>,
    TimedBuckets<Effect>,
);

fn assemble(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    name: &str,
    params: &[Variable],
) -> Result<Assembled> {
    let mut duration = DurationConstraint::Any;
    let mut conditions = TimedBuckets::default();
    let mut effects = TimedBuckets::default();
    for part in &node.children[2..] {
        match kind_of(part)? {
            NodeKind::Duration => {
                duration = duration_constraint(ctx, child(part, 0, "duration constraint")?)?;
            }
            NodeKind::Condition => {
                split_conditions(ctx, child(part, 0, "condition")?, name, None, &mut conditions)?;
            }
            NodeKind::Effect => {
                let splitter = EffectSplitter { action: name, params };
                splitter.split(ctx, child(part, 0, "effect")?, None, &mut effects)?;
            }
            _ => return Err(FatalError::unexpected(part, "a durative action")),
        }
    }
    Ok((duration, conditions, effects))
}

// === Duration ===

/// Reduce a `:duration` body to one equality or a pair of bounds.
fn duration_constraint(ctx: &mut SemanticContext, node: &SyntaxNode) -> Result<DurationConstraint> {
    let mut parts = Vec::new();
    collect_duration(ctx, node, None, &mut parts)?;
    if parts.is_empty() {
        return Ok(DurationConstraint::Any);
    }

    let explicit: Vec<TimeSpec> = parts.iter().filter_map(|p| p.at).collect();
    if explicit.contains(&TimeSpec::AtStart) && explicit.contains(&TimeSpec::AtEnd) {
        ctx.error(
            ErrorKind::Unsupported,
            node.span,
            "duration constraints at both start and end are not supported",
        );
    }
    let at = explicit.first().copied().unwrap_or(TimeSpec::AtStart);

    let equalities = parts.iter().filter(|p| p.op == CompareOp::Eq).count();
    if equalities > 0 {
        if equalities > 1 {
            ctx.error(
                ErrorKind::InvalidDuration,
                node.span,
                "a duration may have only one equality constraint",
            );
        } else if parts.len() > 1 {
            ctx.error(
                ErrorKind::InvalidDuration,
                node.span,
                "a duration equality cannot be combined with bounds",
            );
        }
        let value = parts
            .into_iter()
            .find(|p| p.op == CompareOp::Eq)
            .map_or(NumericExp::Number(0.0), |p| p.value);
        return Ok(DurationConstraint::Exact { at, value });
    }

    ctx.require(
        Requirement::DurationInequalities,
        node.span,
        "a duration inequality",
    );
    let mut lower = None;
    let mut upper = None;
    for part in parts {
        let slot = match part.op {
            CompareOp::Ge | CompareOp::Gt => &mut lower,
            _ => &mut upper,
        };
        if slot.is_some() {
            ctx.error(
                ErrorKind::InvalidDuration,
                part.span,
                "duplicate duration bound",
            );
        }
        *slot = Some(part.value);
    }
    Ok(DurationConstraint::Range { at, lower, upper })
}

struct DurationPart {
    at: Option<TimeSpec>,
    op: CompareOp,
    value: NumericExp,
    span: Span,
}

fn collect_duration(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    at: Option<TimeSpec>,
    out: &mut Vec<DurationPart>,
) -> Result<()> {
    match kind_of(node)? {
        NodeKind::And => {
            for part in &node.children {
                collect_duration(ctx, part, at, out)?;
            }
        }
        NodeKind::Timed if at.is_none() => {
            let time = time_spec(node)?;
            if time == TimeSpec::OverAll {
                ctx.error(
                    ErrorKind::InvalidDuration,
                    node.span,
                    "a duration constraint applies at start or at end, not over all",
                );
            }
            collect_duration(ctx, child(node, 0, "timed duration")?, Some(time), out)?;
        }
        NodeKind::Comparison => {
            let op = CompareOp::from_symbol(node.image()).unwrap_or(CompareOp::Eq);
            let [left, right] = node.children.as_slice() else {
                ctx.error(
                    ErrorKind::SignatureMismatch,
                    node.span,
                    "a duration constraint compares ?duration with one value",
                );
                return Ok(());
            };
            if !(left.is(NodeKind::Variable) && left.image() == "?duration") {
                ctx.error(
                    ErrorKind::InvalidDuration,
                    left.span,
                    "a duration constraint must constrain ?duration",
                );
                return Ok(());
            }
            let value = numeric(ctx, right)?;
            out.push(DurationPart {
                at,
                op,
                value,
                span: node.span,
            });
        }
        other => ctx.error(
            ErrorKind::InvalidDuration,
            node.span,
            format!("a {} cannot constrain a duration", other.name()),
        ),
    }
    Ok(())
}

fn time_spec(node: &SyntaxNode) -> Result<TimeSpec> {
    TimeSpec::from_image(node.image()).ok_or_else(|| FatalError::unexpected(node, "a time specifier"))
}

// === Conditions ===

/// Sort a condition into buckets by its time specifiers.
fn split_conditions(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    action: &str,
    at: Option<TimeSpec>,
    buckets: &mut TimedBuckets<LogicalExp>,
) -> Result<()> {
    match kind_of(node)? {
        NodeKind::And => {
            for part in &node.children {
                split_conditions(ctx, part, action, at, buckets)?;
            }
        }
        NodeKind::Timed => {
            let time = time_spec(node)?;
            if at.is_some() {
                ctx.error(ErrorKind::Misplaced, node.span, "nested time specifier");
            }
            timed_condition(ctx, child(node, 0, "timed condition")?, action, time, buckets)?;
        }
        NodeKind::Forall => {
            ctx.require(
                Requirement::UniversalPreconditions,
                node.span,
                "'forall' in a condition",
            );
            let vars = typed_variables(ctx, child(node, 0, "quantified variables")?)?;
            let body = child(node, 1, "quantified body")?;
            let mut inner = TimedBuckets::default();
            ctx.push_quantified(&vars, node.span);
            let split = split_conditions(ctx, body, action, at, &mut inner);
            ctx.scopes.pop();
            split?;
            for time in [TimeSpec::AtStart, TimeSpec::OverAll, TimeSpec::AtEnd] {
                let pieces = std::mem::take(inner.at_mut(time));
                if !pieces.is_empty() {
                    buckets.at_mut(time).push(LogicalExp::Forall {
                        vars: vars.clone(),
                        body: Box::new(LogicalExp::conjoin(pieces)),
                    });
                }
            }
        }
        // `(preference p (at end φ))`
        NodeKind::Preference => {
            let (name, body) = preference_parts(ctx, node)?;
            if !body.is(NodeKind::Timed) {
                untimed(ctx, node);
                return Ok(());
            }
            let time = time_spec(body)?;
            let moved = SyntaxNode::new(
                NodeKind::Preference,
                node.span,
                vec![
                    SyntaxNode::leaf(NodeKind::Name, name, node.span),
                    child(body, 0, "timed condition")?.clone(),
                ],
            );
            timed_condition(ctx, &moved, action, time, buckets)?;
        }
        _ => untimed(ctx, node),
    }
    Ok(())
}

fn timed_condition(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    action: &str,
    time: TimeSpec,
    buckets: &mut TimedBuckets<LogicalExp>,
) -> Result<()> {
    ctx.site = Site::Precondition {
        action: action.to_string(),
        at: Some(time),
    };
    let resolved = condition(ctx, node);
    ctx.site = Site::Body;
    let resolved = resolved?;
    if !matches!(resolved, LogicalExp::True) {
        buckets.at_mut(time).push(resolved);
    }
    Ok(())
}

fn untimed(ctx: &mut SemanticContext, node: &SyntaxNode) {
    ctx.error(
        ErrorKind::Misplaced,
        node.span,
        "durative action conditions need a time specifier (at start, over all or at end)",
    );
}

// === Effects ===

struct EffectSplitter<'p> {
    action: &'p str,
    params: &'p [Variable],
}

impl EffectSplitter<'_> {
    /// Sort an effect into buckets by its time specifiers.
    fn split(
        &self,
        ctx: &mut SemanticContext,
        node: &SyntaxNode,
        at: Option<TimeSpec>,
        buckets: &mut TimedBuckets<Effect>,
    ) -> Result<()> {
        match kind_of(node)? {
            NodeKind::And => {
                for part in &node.children {
                    self.split(ctx, part, at, buckets)?;
                }
            }
            NodeKind::Timed => {
                let time = time_spec(node)?;
                if time == TimeSpec::OverAll {
                    ctx.error(
                        ErrorKind::Misplaced,
                        node.span,
                        "effects happen at start or at end, not over all",
                    );
                }
                let resolved = effect(ctx, child(node, 0, "timed effect")?)?;
                if !resolved.is_empty() {
                    buckets.at_mut(time).push(resolved);
                }
            }
            NodeKind::Assignment => {
                let resolved = effect(ctx, node)?;
                match resolved {
                    Effect::Continuous { .. } => buckets.continuous.push(resolved),
                    _ => ctx.error(
                        ErrorKind::Misplaced,
                        node.span,
                        "a discrete durative effect needs a time specifier (at start or at end)",
                    ),
                }
            }
            NodeKind::Forall => {
                ctx.require(
                    Requirement::ConditionalEffects,
                    node.span,
                    "'forall' in an effect",
                );
                let vars = typed_variables(ctx, child(node, 0, "quantified variables")?)?;
                let body = child(node, 1, "quantified effect")?;
                let mut inner = TimedBuckets::default();
                ctx.push_quantified(&vars, node.span);
                let split = self.split(ctx, body, at, &mut inner);
                ctx.scopes.pop();
                split?;
                let wrap = |pieces: Vec<Effect>| Effect::Forall {
                    vars: vars.clone(),
                    body: Box::new(Effect::conjoin(pieces)),
                };
                for time in [TimeSpec::AtStart, TimeSpec::OverAll, TimeSpec::AtEnd] {
                    let pieces = std::mem::take(inner.at_mut(time));
                    if !pieces.is_empty() {
                        buckets.at_mut(time).push(wrap(pieces));
                    }
                }
                if !inner.continuous.is_empty() {
                    let pieces = std::mem::take(&mut inner.continuous);
                    buckets.continuous.push(wrap(pieces));
                }
            }
            NodeKind::When => self.conditional(ctx, node, buckets)?,
            _ => ctx.error(
                ErrorKind::Misplaced,
                node.span,
                "durative action effects need a time specifier (at start or at end)",
            ),
        }
        Ok(())
    }

    /// A `when` inside a durative effect.
    fn conditional(
        &self,
        ctx: &mut SemanticContext,
        node: &SyntaxNode,
        buckets: &mut TimedBuckets<Effect>,
    ) -> Result<()> {
        ctx.require(Requirement::ConditionalEffects, node.span, "'when'");
        let [guard_node, then_node] = node.children.as_slice() else {
            ctx.error(
                ErrorKind::SignatureMismatch,
                node.span,
                "'when' takes a condition and an effect",
            );
            return Ok(());
        };

        let mut guards = TimedBuckets::default();
        timed_guard(ctx, guard_node, &mut guards)?;
        let times: Vec<TimeSpec> = [TimeSpec::AtStart, TimeSpec::OverAll, TimeSpec::AtEnd]
            .into_iter()
            .filter(|t| !guards.at(*t).is_empty())
            .collect();
        let guard_at = match times.as_slice() {
            [TimeSpec::OverAll] | [] => {
                ctx.error(
                    ErrorKind::Unsupported,
                    guard_node.span,
                    "a durative conditional effect needs a guard at start or at end",
                );
                return Ok(());
            }
            [single] => *single,
            _ => {
                ctx.error(
                    ErrorKind::Unsupported,
                    guard_node.span,
                    "a conditional effect guard spanning several time points is not supported",
                );
                return Ok(());
            }
        };
        let guard = LogicalExp::conjoin(std::mem::take(guards.at_mut(guard_at)));

        let mut inner = TimedBuckets::default();
        self.split(ctx, then_node, None, &mut inner)?;
        if !inner.continuous.is_empty() {
            ctx.error(
                ErrorKind::Unsupported,
                then_node.span,
                "conditional continuous effects are not supported",
            );
        }

        for time in [TimeSpec::AtStart, TimeSpec::AtEnd] {
            let pieces = std::mem::take(inner.at_mut(time));
            if pieces.is_empty() {
                continue;
            }
            let effect = Effect::conjoin(pieces);
            if time == guard_at {
                buckets.at_mut(time).push(Effect::When {
                    condition: guard.clone(),
                    effect: Box::new(effect),
                });
            } else if time == TimeSpec::AtStart {
                ctx.error(
                    ErrorKind::Unsupported,
                    then_node.span,
                    "an effect at start cannot depend on a condition at end",
                );
            } else {
                let (dummy, args) = self.dummy(ctx, node.span);
                buckets.at_mut(guard_at).push(Effect::When {
                    condition: guard.clone(),
                    effect: Box::new(Effect::add(dummy.clone(), args.clone())),
                });
                buckets.at_mut(time).push(Effect::When {
                    condition: LogicalExp::atom(dummy.clone(), args.clone()),
                    effect: Box::new(Effect::conjoin([effect, Effect::delete(dummy, args)])),
                });
            }
        }
        Ok(())
    }

    /// Declare a fresh dummy predicate over the action parameters and the
    /// quantified context; returns its name and arguments.
    fn dummy(&self, ctx: &mut SemanticContext, span: Span) -> (String, Vec<Term>) {
        let name = format!("{}@when{}", self.action, ctx.fresh());
        let mut vars: Vec<Variable> = self.params.to_vec();
        vars.extend(ctx.scopes.quantified());
        let args = vars.iter().cloned().map(Term::Variable).collect();
        ctx.insert_formula(RootFormula::Predicate(Signature::new(name.clone(), vars, span)));
        trace!(dummy = %name, "conditional effect split across time points");
        (name, args)
    }
}

/// Guard of a durative `when`, sorted by time point.
fn timed_guard(
    ctx: &mut SemanticContext,
    node: &SyntaxNode,
    buckets: &mut TimedBuckets<LogicalExp>,
) -> Result<()> {
    match kind_of(node)? {
        NodeKind::And => {
            for part in &node.children {
                timed_guard(ctx, part, buckets)?;
            }
        }
        NodeKind::Timed => {
            let time = time_spec(node)?;
            let guard = guard_condition(ctx, child(node, 0, "timed guard")?)?;
            buckets.at_mut(time).push(guard);
        }
        _ => untimed(ctx, node),
    }
    Ok(())
}
