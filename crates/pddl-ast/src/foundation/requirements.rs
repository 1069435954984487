//! Requirement keys and the active requirement set.
//!
//! A requirement key (`:typing`, `:fluents`, ...) gates which constructs a
//! domain may use. Some keys are shorthands for a group of others; the group
//! is expanded exactly once, when the shorthand is added to a
//! [`RequirementSet`].

use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single requirement key.
#[derive(EnumSetType, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Requirement {
    Strips,
    Typing,
    NegativePreconditions,
    DisjunctivePreconditions,
    Equality,
    ExistentialPreconditions,
    UniversalPreconditions,
    QuantifiedPreconditions,
    ConditionalEffects,
    Fluents,
    NumericFluents,
    ObjectFluents,
    Adl,
    DurativeActions,
    DurationInequalities,
    ContinuousEffects,
    DerivedPredicates,
    TimedInitialLiterals,
    Preferences,
    Constraints,
    ActionCosts,
    /// TLPlan extensions: defined formulas, local variables, goal modality,
    /// LTL trajectory operators.
    Tlplan,
}

/// Key spelling, indexed by discriminant.
const REQUIREMENT_KEYS: &[&str] = &[
    ":strips",
    ":typing",
    ":negative-preconditions",
    ":disjunctive-preconditions",
    ":equality",
    ":existential-preconditions",
    ":universal-preconditions",
    ":quantified-preconditions",
    ":conditional-effects",
    ":fluents",
    ":numeric-fluents",
    ":object-fluents",
    ":adl",
    ":durative-actions",
    ":duration-inequalities",
    ":continuous-effects",
    ":derived-predicates",
    ":timed-initial-literals",
    ":preferences",
    ":constraints",
    ":action-costs",
    ":tlplan",
];

impl Requirement {
    /// The key as written in a `:requirements` section.
    pub fn key(self) -> &'static str {
        REQUIREMENT_KEYS[self as usize]
    }

    /// Look up a key (with or without the leading colon, case-insensitive).
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        let key = key.strip_prefix(':').unwrap_or(&key);
        EnumSet::<Requirement>::all()
            .iter()
            .find(|r| &r.key()[1..] == key)
    }

    /// Keys this one stands for, besides itself.
    pub fn implied(self) -> EnumSet<Requirement> {
        use Requirement::*;
        match self {
            Adl => {
                Strips
                    | Typing
                    | ExistentialPreconditions
                    | UniversalPreconditions
                    | QuantifiedPreconditions
                    | NegativePreconditions
                    | DisjunctivePreconditions
                    | Equality
                    | ConditionalEffects
            }
            QuantifiedPreconditions => ExistentialPreconditions | UniversalPreconditions,
            Fluents => NumericFluents | ObjectFluents,
            TimedInitialLiterals => EnumSet::only(DurativeActions),
            ActionCosts => EnumSet::only(NumericFluents),
            _ => EnumSet::empty(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The active requirement set of a domain or problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequirementSet {
    keys: EnumSet<Requirement>,
}

impl RequirementSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and everything it implies.
    pub fn add(&mut self, requirement: Requirement) {
        self.keys.insert(requirement);
        self.keys.insert_all(requirement.implied());
    }

    /// Check whether a key is active.
    pub fn contains(&self, requirement: Requirement) -> bool {
        self.keys.contains(requirement)
    }

    /// Check whether any of the given keys is active.
    pub fn contains_any(&self, requirements: EnumSet<Requirement>) -> bool {
        !self.keys.is_disjoint(requirements)
    }

    /// Union of two sets (no further expansion needed).
    pub fn union(&self, other: &RequirementSet) -> RequirementSet {
        RequirementSet {
            keys: self.keys | other.keys,
        }
    }

    /// Raw key set.
    pub fn keys(&self) -> EnumSet<Requirement> {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Requirement> {
        self.keys.iter()
    }
}

impl FromIterator<Requirement> for RequirementSet {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        let mut set = RequirementSet::new();
        for requirement in iter {
            set.add(requirement);
        }
        set
    }
}

impl fmt::Display for RequirementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys.iter().map(Requirement::key).collect();
        write!(f, "({})", keys.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_lookup() {
        for requirement in EnumSet::<Requirement>::all() {
            assert_eq!(Requirement::from_key(requirement.key()), Some(requirement));
        }
        assert_eq!(Requirement::from_key("TYPING"), Some(Requirement::Typing));
        assert_eq!(Requirement::from_key(":teleportation"), None);
    }

    #[test]
    fn test_adl_expands_on_add() {
        let mut set = RequirementSet::new();
        set.add(Requirement::Adl);
        for r in [
            Requirement::Strips,
            Requirement::Typing,
            Requirement::ExistentialPreconditions,
            Requirement::UniversalPreconditions,
            Requirement::NegativePreconditions,
            Requirement::DisjunctivePreconditions,
            Requirement::Equality,
            Requirement::ConditionalEffects,
        ] {
            assert!(set.contains(r), "{r} missing");
        }
        assert!(!set.contains(Requirement::NumericFluents));
    }

    #[test]
    fn test_shorthand_expansion() {
        let set: RequirementSet = [Requirement::Fluents, Requirement::TimedInitialLiterals]
            .into_iter()
            .collect();
        assert!(set.contains(Requirement::NumericFluents));
        assert!(set.contains(Requirement::ObjectFluents));
        assert!(set.contains(Requirement::DurativeActions));

        let set: RequirementSet = std::iter::once(Requirement::ActionCosts).collect();
        assert!(set.contains(Requirement::NumericFluents));

        let set: RequirementSet = std::iter::once(Requirement::QuantifiedPreconditions).collect();
        assert!(set.contains(Requirement::ExistentialPreconditions));
        assert!(set.contains(Requirement::UniversalPreconditions));
    }

    #[test]
    fn test_display_lists_keys() {
        let set: RequirementSet = [Requirement::Strips, Requirement::Typing].into_iter().collect();
        assert_eq!(set.to_string(), "(:strips :typing)");
    }
}
