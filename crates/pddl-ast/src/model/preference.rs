use crate::expr::{ConstraintExp, LogicalExp, Variable};
use indexmap::IndexMap;

/// Name of the counter fluent of a preference.
///
/// `@` cannot appear in a lexed name, so counters never clash with user
/// symbols.
pub fn counter_name(preference: &str) -> String {
    format!("is-violated@{preference}")
}

/// Where a preference was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceSite {
    Precondition { action: String },
    Goal,
    Constraint,
    OverAll { action: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceBody {
    Condition(LogicalExp),
    Constraint(ConstraintExp),
}

/// One occurrence of a named preference.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceInstance {
    pub name: String,
    pub site: PreferenceSite,
    pub body: PreferenceBody,
    /// Quantified variables in scope where the preference was written
    pub context: Vec<Variable>,
}

impl PreferenceInstance {
    pub fn condition(&self) -> Option<&LogicalExp> {
        match &self.body {
            PreferenceBody::Condition(c) => Some(c),
            PreferenceBody::Constraint(_) => None,
        }
    }
}

/// All instances of one preference name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceGroup {
    /// Counter fluent, created on first need
    pub counter: Option<String>,
    pub instances: Vec<PreferenceInstance>,
}

/// Preferences by name, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceTable {
    groups: IndexMap<String, PreferenceGroup>,
}

impl PreferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PreferenceGroup> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &PreferenceGroup)> {
        self.groups.iter().map(|(n, g)| (n.as_str(), g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn record(&mut self, instance: PreferenceInstance) {
        self.groups
            .entry(instance.name.clone())
            .or_default()
            .instances
            .push(instance);
    }

    /// Counter of `name`, created if the preference has none yet.
    ///
    /// Returns the counter name and whether it was just created.
    pub fn ensure_counter(&mut self, name: &str) -> (String, bool) {
        let group = self.groups.entry(name.to_string()).or_default();
        match &group.counter {
            Some(counter) => (counter.clone(), false),
            None => {
                let counter = counter_name(name);
                group.counter = Some(counter.clone());
                (counter, true)
            }
        }
    }

    /// Every counter fluent created so far.
    pub fn counters(&self) -> impl Iterator<Item = &str> {
        self.groups.values().filter_map(|g| g.counter.as_deref())
    }

    /// Append the instances and counters of `other`.
    pub fn merge(&mut self, other: &PreferenceTable) {
        for (name, group) in &other.groups {
            let target = self.groups.entry(name.clone()).or_default();
            if target.counter.is_none() {
                target.counter = group.counter.clone();
            }
            target.instances.extend(group.instances.iter().cloned());
        }
    }

    pub(crate) fn groups_mut(&mut self) -> impl Iterator<Item = &mut PreferenceGroup> {
        self.groups.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_instance(name: &str) -> PreferenceInstance {
        PreferenceInstance {
            name: name.to_string(),
            site: PreferenceSite::Goal,
            body: PreferenceBody::Condition(LogicalExp::True),
            context: Vec::new(),
        }
    }

    #[test]
    fn test_one_counter_per_name() {
        let mut table = PreferenceTable::new();
        table.record(goal_instance("p1"));
        table.record(goal_instance("p1"));
        let (first, created) = table.ensure_counter("p1");
        assert!(created);
        let (second, created) = table.ensure_counter("p1");
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(table.get("p1").map(|g| g.instances.len()), Some(2));
        assert_eq!(table.counters().count(), 1);
    }

    #[test]
    fn test_merge_keeps_existing_counter() {
        let mut domain = PreferenceTable::new();
        domain.ensure_counter("p1");
        let mut problem = PreferenceTable::new();
        problem.record(goal_instance("p1"));
        problem.record(goal_instance("p2"));
        domain.merge(&problem);
        assert_eq!(domain.len(), 2);
        assert_eq!(domain.get("p1").and_then(|g| g.counter.clone()), Some(counter_name("p1")));
        assert_eq!(domain.get("p2").and_then(|g| g.counter.clone()), None);
    }
}
