use super::{
    ActionDef, ContentKind, FormulaTable, InitElement, PddlObject, PreferenceBody,
    PreferenceInstance, PreferenceSite, RootFormula,
};
use crate::expr::{
    for_each_instance, AssignOp, Bindings, Constant, Effect, LogicalExp, NumericExp, Variable,
};
use crate::world::GroundAtom;
use std::sync::Arc;
use tracing::debug;

impl PddlObject {
    /// Prepare the model for evaluation.
    ///
    /// - rebuilds the type domains from the constants
    /// - instantiates goal and constraint preferences over their quantified
    ///   context, so each instance is ground
    /// - turns pending durative `over all` preferences into effects at
    ///   start, over all and end that count violations
    /// - gives every counter a zero initial value in a full problem
    ///
    /// Running it again is harmless.
    pub fn preprocess(&mut self) {
        let constants: Vec<Constant> = self
            .constants
            .values()
            .map(|d| d.constant.clone())
            .collect();
        Arc::make_mut(&mut self.lattice).materialize_domains(&constants);

        let flattened = self.flatten_preferences();
        let wired = self.wire_overall_preferences();
        if self.content == ContentKind::FullProblem {
            self.initialize_counters();
        }
        self.invalidate();
        debug!(
            object = %self.name,
            constants = constants.len(),
            flattened,
            wired,
            "preprocessed"
        );
    }

    /// Replace quantified goal/constraint preferences by their instances.
    fn flatten_preferences(&mut self) -> usize {
        let lattice = Arc::clone(&self.lattice);
        let mut flattened = 0;
        for group in self.preferences.groups_mut() {
            let mut expanded = Vec::with_capacity(group.instances.len());
            for instance in group.instances.drain(..) {
                let ground_site = matches!(
                    instance.site,
                    PreferenceSite::Goal | PreferenceSite::Constraint
                );
                if !ground_site || instance.context.is_empty() {
                    expanded.push(instance);
                    continue;
                }
                flattened += 1;
                let mut bindings = Bindings::new();
                // enumeration itself cannot fail
                let _ = for_each_instance(&lattice, &instance.context, &mut bindings, |b| {
                    expanded.push(PreferenceInstance {
                        name: instance.name.clone(),
                        site: instance.site.clone(),
                        body: match &instance.body {
                            PreferenceBody::Condition(c) => PreferenceBody::Condition(c.apply(b)),
                            PreferenceBody::Constraint(c) => {
                                PreferenceBody::Constraint(c.apply(b))
                            }
                        },
                        context: Vec::new(),
                    });
                    Ok(None::<()>)
                });
            }
            group.instances = expanded;
        }
        flattened
    }

    /// Wire pending `over all` preferences of durative actions.
    fn wire_overall_preferences(&mut self) -> usize {
        let pending = self.actions.values().any(|a| match a {
            ActionDef::Durative(d) => !d.overall_preferences.is_empty(),
            ActionDef::Simple(_) => false,
        });
        if !pending {
            return 0;
        }

        let mut wired = 0;
        let actions = Arc::make_mut(&mut self.actions);
        for action in actions.values_mut() {
            let ActionDef::Durative(durative) = action else {
                continue;
            };
            for preference in std::mem::take(&mut durative.overall_preferences) {
                let (counter, created) = self.preferences.ensure_counter(&preference.name);
                if created {
                    declare_counter(&mut self.formulas, &counter);
                }
                let effect = violation_effect(&counter, preference.condition, preference.context);
                durative.effects.start.push(effect.clone());
                durative.effects.overall.push(effect.clone());
                durative.effects.end.push(effect);
                wired += 1;
            }
        }
        wired
    }

    fn initialize_counters(&mut self) {
        let counters: Vec<String> = self.preferences.counters().map(str::to_string).collect();
        for counter in counters {
            let fluent = GroundAtom::nullary(counter.as_str());
            let present = self.init.iter().any(|e| {
                matches!(e, InitElement::Numeric { fluent: f, .. } if *f == fluent)
            });
            if !present {
                self.init.push(InitElement::Numeric { fluent, value: 0.0 });
            }
        }
    }
}

/// Register a counter fluent unless the table already has it.
pub fn declare_counter(formulas: &mut Arc<FormulaTable>, counter: &str) {
    if !formulas.contains_key(counter) {
        Arc::make_mut(formulas).insert(counter.to_string(), RootFormula::counter(counter));
    }
}

/// `(forall (ctx) (when (not φ) (increase (counter) 1)))`, without the
/// `forall` when nothing is quantified.
pub fn violation_effect(
    counter: &str,
    condition: LogicalExp,
    context: Vec<Variable>,
) -> Effect {
    let bump = Effect::When {
        condition: condition.negate(),
        effect: Box::new(Effect::Numeric {
            op: AssignOp::Increase,
            name: counter.to_string(),
            args: Vec::new(),
            value: NumericExp::Number(1.0),
        }),
    };
    if context.is_empty() {
        bump
    } else {
        Effect::Forall {
            vars: context,
            body: Box::new(bump),
        }
    }
}
