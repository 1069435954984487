//! Type lattice.
//!
//! Named types form a multi-parent inheritance graph rooted at `object`.
//! `number` is a disjoint pseudo-type that never appears in a type set.
//! Unions such as `(either truck car)` are resolved into canonical, interned
//! [`TypeSetId`]s, so equal sets compare by identity.
//!
//! Each type carries a *domain*: the constants whose declared type set
//! includes it or one of its subtypes. Domains are rebuilt on demand with
//! [`TypeLattice::materialize_domains`], once per link/preprocess cycle,
//! because constants come from both the domain and the problem.

use crate::expr::Constant;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::trace;

/// Index of a type in its lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    /// The universal root type.
    pub const OBJECT: TypeId = TypeId(0);
    /// The numeric pseudo-type.
    pub const NUMBER: TypeId = TypeId(1);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an interned type set in its lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeSetId(u32);

impl TypeSetId {
    /// The set `{object}`.
    pub const OBJECT: TypeSetId = TypeSetId(0);
}

/// Rejected lattice operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("'{0}' is a reserved type name")]
    Reserved(String),
    #[error("type '{0}' is already declared")]
    Redeclared(String),
    #[error("type '{0}' is not declared")]
    Undeclared(String),
    #[error("declaring '{child}' as a subtype of '{parent}' would create a cycle")]
    Cycle { child: String, parent: String },
    #[error("'number' cannot be part of a type union")]
    NumberInUnion,
    #[error("empty type union")]
    EmptyUnion,
}

#[derive(Debug, Clone)]
struct TypeNode {
    name: String,
    parents: BTreeSet<TypeId>,
    /// False for types only referenced as a parent so far.
    explicit: bool,
    domain: BTreeSet<Constant>,
}

/// Registry of types, type sets and type domains.
#[derive(Debug, Clone)]
pub struct TypeLattice {
    nodes: Vec<TypeNode>,
    by_name: IndexMap<String, TypeId>,
    sets: Vec<Vec<TypeId>>,
    interned: HashMap<Vec<TypeId>, TypeSetId>,
}

impl Default for TypeLattice {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeLattice {
    /// Lattice holding only `object` and `number`.
    pub fn new() -> Self {
        let mut lattice = Self {
            nodes: Vec::new(),
            by_name: IndexMap::new(),
            sets: Vec::new(),
            interned: HashMap::new(),
        };
        for name in ["object", "number"] {
            let id = TypeId(lattice.nodes.len() as u32);
            lattice.nodes.push(TypeNode {
                name: name.to_string(),
                parents: BTreeSet::new(),
                explicit: true,
                domain: BTreeSet::new(),
            });
            lattice.by_name.insert(name.to_string(), id);
        }
        let object = lattice.intern(vec![TypeId::OBJECT]);
        debug_assert_eq!(object, TypeSetId::OBJECT);
        lattice
    }

    /// Declare a user type under the given parents (`object` when empty).
    ///
    /// Parents that are not declared yet are created implicitly under
    /// `object`; a later explicit declaration of such a type is accepted
    /// once. Multi-parent declarations add the child under every parent.
    ///
    /// # Errors
    ///
    /// - `Reserved` for `object` or `number` as the child, or `number` as a parent
    /// - `Redeclared` for a second explicit declaration
    /// - `Cycle` when a parent is already a subtype of the child
    pub fn declare(&mut self, name: &str, parents: &[&str]) -> Result<TypeId, TypeError> {
        if name == "object" || name == "number" {
            return Err(TypeError::Reserved(name.to_string()));
        }

        let id = match self.by_name.get(name).copied() {
            Some(id) if self.nodes[id.index()].explicit => {
                return Err(TypeError::Redeclared(name.to_string()));
            }
            Some(id) => {
                self.nodes[id.index()].explicit = true;
                self.nodes[id.index()].parents.clear();
                id
            }
            None => self.insert(name, true),
        };

        let mut resolved = BTreeSet::new();
        for &parent in parents {
            let parent_id = match parent {
                "number" => return Err(TypeError::Reserved(parent.to_string())),
                _ => match self.by_name.get(parent).copied() {
                    Some(pid) => pid,
                    None => self.insert(parent, false),
                },
            };
            if self.is_subtype(parent_id, id) {
                self.nodes[id.index()].parents.insert(TypeId::OBJECT);
                return Err(TypeError::Cycle {
                    child: name.to_string(),
                    parent: parent.to_string(),
                });
            }
            resolved.insert(parent_id);
        }
        if resolved.is_empty() {
            resolved.insert(TypeId::OBJECT);
        }
        trace!(ty = name, parents = ?parents, "type declared");
        self.nodes[id.index()].parents = resolved;
        Ok(id)
    }

    fn insert(&mut self, name: &str, explicit: bool) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        let mut parents = BTreeSet::new();
        if !explicit {
            parents.insert(TypeId::OBJECT);
        }
        self.nodes.push(TypeNode {
            name: name.to_string(),
            parents,
            explicit,
            domain: BTreeSet::new(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Look up a type by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Name of a type.
    pub fn name(&self, id: TypeId) -> &str {
        &self.nodes[id.index()].name
    }

    /// Declared parents of a type.
    pub fn parents(&self, id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.nodes[id.index()].parents.iter().copied()
    }

    /// The type and all of its transitive supertypes.
    pub fn ancestors(&self, id: TypeId) -> BTreeSet<TypeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if seen.insert(current) {
                stack.extend(self.parents(current));
            }
        }
        seen
    }

    /// Reflexive, transitive subtype check.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        if sub == TypeId::NUMBER || sup == TypeId::NUMBER {
            return false;
        }
        sup == TypeId::OBJECT || self.ancestors(sub).contains(&sup)
    }

    /// User-visible types in declaration order, `object` first.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.by_name
            .values()
            .copied()
            .filter(|&id| id != TypeId::NUMBER)
    }

    /// Number of user-declared types (implicit ones included).
    pub fn user_type_count(&self) -> usize {
        self.nodes.len() - 2
    }

    /// Resolve a syntactic union into its canonical set.
    ///
    /// # Errors
    ///
    /// `NumberInUnion` for `number`, `Undeclared` for the first unknown
    /// name, `EmptyUnion` for no names.
    pub fn type_set(&mut self, names: &[&str]) -> Result<TypeSetId, TypeError> {
        let mut members = Vec::with_capacity(names.len());
        for &name in names {
            match self.by_name.get(name).copied() {
                Some(TypeId::NUMBER) => return Err(TypeError::NumberInUnion),
                Some(id) => members.push(id),
                None => return Err(TypeError::Undeclared(name.to_string())),
            }
        }
        if members.is_empty() {
            return Err(TypeError::EmptyUnion);
        }
        Ok(self.intern(members))
    }

    /// Intern the set containing a single type.
    ///
    /// `number` is not a valid member; asking for it yields `{object}`.
    pub fn singleton(&mut self, id: TypeId) -> TypeSetId {
        if id == TypeId::NUMBER {
            return TypeSetId::OBJECT;
        }
        self.intern(vec![id])
    }

    /// Find an already interned set without mutating the lattice.
    pub fn find_set(&self, names: &[&str]) -> Option<TypeSetId> {
        let mut members = names
            .iter()
            .map(|n| self.lookup(n))
            .collect::<Option<Vec<_>>>()?;
        members.sort_unstable();
        members.dedup();
        self.interned.get(&members).copied()
    }

    fn intern(&mut self, mut members: Vec<TypeId>) -> TypeSetId {
        members.sort_unstable();
        members.dedup();
        if let Some(&id) = self.interned.get(&members) {
            return id;
        }
        let id = TypeSetId(self.sets.len() as u32);
        self.sets.push(members.clone());
        self.interned.insert(members, id);
        id
    }

    /// Members of a type set, sorted.
    pub fn members(&self, set: TypeSetId) -> &[TypeId] {
        &self.sets[set.0 as usize]
    }

    /// Every type of `arg` is a subtype of some type of `param`.
    pub fn is_compatible(&self, arg: TypeSetId, param: TypeSetId) -> bool {
        if arg == param || param == TypeSetId::OBJECT {
            return true;
        }
        self.members(arg)
            .iter()
            .all(|&a| self.members(param).iter().any(|&p| self.is_subtype(a, p)))
    }

    /// Rebuild every type's domain from the given constants.
    ///
    /// Each constant lands in every type of its set and in all of their
    /// ancestors.
    pub fn materialize_domains<'a>(&mut self, constants: impl IntoIterator<Item = &'a Constant>) {
        for node in &mut self.nodes {
            node.domain.clear();
        }
        for constant in constants {
            let mut targets = BTreeSet::new();
            for &ty in &self.sets[constant.types.0 as usize] {
                targets.extend(self.ancestors(ty));
            }
            for ty in targets {
                self.nodes[ty.index()].domain.insert(constant.clone());
            }
        }
    }

    /// Materialized domain of one type.
    pub fn domain(&self, id: TypeId) -> &BTreeSet<Constant> {
        &self.nodes[id.index()].domain
    }

    /// Sorted union of the domains of a set's members.
    pub fn domain_of(&self, set: TypeSetId) -> Vec<Constant> {
        let mut union = BTreeSet::new();
        for &ty in self.members(set) {
            union.extend(self.domain(ty).iter().cloned());
        }
        union.into_iter().collect()
    }

    /// `t` for singletons, `(either a b)` for unions.
    pub fn render(&self, set: TypeSetId) -> String {
        match self.members(set) {
            [single] => self.name(*single).to_string(),
            many => {
                let names: Vec<&str> = many.iter().map(|&t| self.name(t)).collect();
                format!("(either {})", names.join(" "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(lattice: &mut TypeLattice, name: &str, types: &[&str]) -> Constant {
        Constant::new(name, lattice.type_set(types).unwrap())
    }

    #[test]
    fn test_reserved_names_are_rejected() {
        let mut lattice = TypeLattice::new();
        assert_eq!(
            lattice.declare("object", &[]),
            Err(TypeError::Reserved("object".into()))
        );
        assert_eq!(
            lattice.declare("number", &[]),
            Err(TypeError::Reserved("number".into()))
        );
        assert_eq!(
            lattice.declare("count", &["number"]),
            Err(TypeError::Reserved("number".into()))
        );
    }

    #[test]
    fn test_redeclaration_is_rejected_but_forward_parent_is_not() {
        let mut lattice = TypeLattice::new();
        lattice.declare("car", &["vehicle"]).unwrap();
        // vehicle was only referenced so far
        lattice.declare("vehicle", &["object"]).unwrap();
        assert_eq!(
            lattice.declare("vehicle", &[]),
            Err(TypeError::Redeclared("vehicle".into()))
        );
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut lattice = TypeLattice::new();
        lattice.declare("a", &["b"]).unwrap();
        let err = lattice.declare("b", &["a"]).unwrap_err();
        assert!(matches!(err, TypeError::Cycle { .. }));
    }

    #[test]
    fn test_subtyping_with_multiple_parents() {
        let mut lattice = TypeLattice::new();
        lattice.declare("vehicle", &[]).unwrap();
        lattice.declare("cargo", &[]).unwrap();
        let amphi = lattice.declare("crate-truck", &["vehicle", "cargo"]).unwrap();
        let vehicle = lattice.lookup("vehicle").unwrap();
        let cargo = lattice.lookup("cargo").unwrap();
        assert!(lattice.is_subtype(amphi, vehicle));
        assert!(lattice.is_subtype(amphi, cargo));
        assert!(lattice.is_subtype(amphi, TypeId::OBJECT));
        assert!(!lattice.is_subtype(vehicle, amphi));
        assert!(!lattice.is_subtype(TypeId::NUMBER, TypeId::OBJECT));
    }

    #[test]
    fn test_type_sets_are_canonical_and_interned() {
        let mut lattice = TypeLattice::new();
        lattice.declare("truck", &[]).unwrap();
        lattice.declare("car", &[]).unwrap();
        let a = lattice.type_set(&["truck", "car"]).unwrap();
        let b = lattice.type_set(&["car", "truck", "car"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(lattice.render(a), "(either truck car)");
        assert_eq!(lattice.type_set(&["object"]).unwrap(), TypeSetId::OBJECT);
    }

    #[test]
    fn test_type_set_rejects_number_and_unknown_names() {
        let mut lattice = TypeLattice::new();
        lattice.declare("car", &[]).unwrap();
        assert_eq!(
            lattice.type_set(&["car", "number"]),
            Err(TypeError::NumberInUnion)
        );
        assert_eq!(
            lattice.type_set(&["boat"]),
            Err(TypeError::Undeclared("boat".into()))
        );
        assert_eq!(lattice.type_set(&[]), Err(TypeError::EmptyUnion));
    }

    #[test]
    fn test_compatibility() {
        let mut lattice = TypeLattice::new();
        lattice.declare("vehicle", &[]).unwrap();
        lattice.declare("car", &["vehicle"]).unwrap();
        lattice.declare("truck", &["vehicle"]).unwrap();
        lattice.declare("block", &[]).unwrap();
        let car = lattice.type_set(&["car"]).unwrap();
        let vehicle = lattice.type_set(&["vehicle"]).unwrap();
        let either = lattice.type_set(&["car", "truck"]).unwrap();
        let block = lattice.type_set(&["block"]).unwrap();
        assert!(lattice.is_compatible(car, vehicle));
        assert!(lattice.is_compatible(either, vehicle));
        assert!(lattice.is_compatible(car, either));
        assert!(!lattice.is_compatible(vehicle, car));
        assert!(!lattice.is_compatible(block, vehicle));
        assert!(lattice.is_compatible(block, TypeSetId::OBJECT));
    }

    #[test]
    fn test_domains_include_ancestors() {
        let mut lattice = TypeLattice::new();
        lattice.declare("car", &["vehicle"]).unwrap();
        let c1 = constant(&mut lattice, "c1", &["car"]);
        let c2 = constant(&mut lattice, "c2", &["car"]);
        let v1 = constant(&mut lattice, "v1", &["vehicle"]);
        lattice.materialize_domains([&c1, &c2, &v1]);

        let car = lattice.lookup("car").unwrap();
        let vehicle = lattice.lookup("vehicle").unwrap();
        let names = |id| {
            lattice
                .domain(id)
                .iter()
                .map(|c: &Constant| c.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(car), vec!["c1", "c2"]);
        assert_eq!(names(vehicle), vec!["c1", "c2", "v1"]);
        assert_eq!(names(TypeId::OBJECT), vec!["c1", "c2", "v1"]);

        // Rebuilding forgets constants that are gone
        lattice.materialize_domains([&v1]);
        assert!(lattice.domain(car).is_empty());
    }
}
