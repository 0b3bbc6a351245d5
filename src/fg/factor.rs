//! Factors and their potential tables.

use super::rv::{RandVar, RangeValue};
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

/// A potential table: one non-negative real per point in the Cartesian product of
/// the scope's ranges, keyed by the assignment tuple in scope order.
///
/// Keyed on a `BTreeMap` (not a `HashMap`) so iteration is always in a fixed,
/// deterministic order without a separate sort step at every call site that needs
/// one — color refinement's signature hashing and the emitter's descending-key sort
/// both want that.
pub type PotentialTable = BTreeMap<Vec<RangeValue>, f64>;

/// A factor: a unique name, an ordered scope of shared random variables, and a
/// potential table that may be empty (an *unknown* factor).
///
/// The loaded `potentials` field is never mutated after load. When the lifter
/// (`crate::lift`) adopts a group's potentials for an unknown factor, it writes to
/// `imputed_potentials` instead — see §9 of the spec on why the original mutate-in-
/// place design was replaced with a separate field.
#[derive(Debug, Clone)]
pub struct Factor {
    pub name: String,
    pub scope: Vec<Rc<RandVar>>,
    pub potentials: PotentialTable,
    pub imputed_potentials: Option<PotentialTable>,
}

impl Factor {
    pub fn new(name: impl Into<String>, scope: Vec<Rc<RandVar>>, potentials: PotentialTable) -> Self {
        Self {
            name: name.into(),
            scope,
            potentials,
            imputed_potentials: None,
        }
    }

    pub fn unknown(name: impl Into<String>, scope: Vec<Rc<RandVar>>) -> Self {
        Self {
            name: name.into(),
            scope,
            potentials: PotentialTable::new(),
            imputed_potentials: None,
        }
    }

    /// The potential table actually used by every downstream computation: the
    /// imputed table if the lifter has set one, otherwise the loaded table.
    pub fn effective_potentials(&self) -> &PotentialTable {
        self.imputed_potentials.as_ref().unwrap_or(&self.potentials)
    }

    /// A factor is unknown iff it has no effective potential table.
    pub fn is_unknown(&self) -> bool {
        self.effective_potentials().is_empty()
    }

    /// Record an adopted potential table without disturbing the loaded one.
    pub fn impute(&mut self, potentials: PotentialTable) {
        self.imputed_potentials = Some(potentials);
    }

    /// Validity: a known factor's table has exactly one entry per point in the
    /// Cartesian product of its scope's ranges — not merely the right *count*
    /// of entries, but the exact key set, so a stale or typo'd assignment tuple
    /// (right arity, wrong values) is caught rather than silently accepted.
    pub fn is_valid(&self) -> bool {
        let table = self.effective_potentials();
        if table.is_empty() {
            return true;
        }
        let expected: HashSet<Vec<RangeValue>> = self
            .scope
            .iter()
            .map(|rv| rv.range.clone().into_iter())
            .multi_cartesian_product()
            .collect();
        let actual: HashSet<Vec<RangeValue>> = table.keys().cloned().collect();
        actual == expected
    }
}

impl PartialEq for Factor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.scope.len() == other.scope.len()
            && self.scope.iter().zip(&other.scope).all(|(a, b)| a == b)
            && self.effective_potentials() == other.effective_potentials()
    }
}

/// A canonical, hashable signature for a potential table: `BTreeMap` already
/// iterates in sorted order, so the bit pattern of each value is all that is
/// needed to compare tables for the "identical tables ⇒ equal color" rule
/// without requiring `f64: Eq`.
pub fn potential_signature(table: &PotentialTable) -> Vec<(Vec<RangeValue>, u64)> {
    table
        .iter()
        .map(|(key, value)| (key.clone(), value.to_bits()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn rv(name: &str) -> Rc<RandVar> {
        Rc::new(RandVar::new(name, vec!["T".into(), "F".into()]))
    }

    #[test]
    fn unknown_factor_has_empty_table() {
        let f = Factor::unknown("f", vec![rv("A")]);
        assert!(f.is_unknown());
        assert!(f.is_valid());
    }

    #[test]
    fn known_factor_validity_checks_table_size() {
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["F".into()], 0.5);
        let f = Factor::new("f", vec![rv("A")], table);
        assert!(f.is_valid());

        let mut bad = PotentialTable::new();
        bad.insert(vec!["T".into()], 0.5);
        let f_bad = Factor::new("f", vec![rv("A")], bad);
        assert!(!f_bad.is_valid());
    }

    #[test]
    fn known_factor_validity_checks_key_values_not_just_count() {
        // Right number of entries, right-length keys, but "Maybe" is not in A's
        // range — this must be rejected, not accepted on cardinality alone.
        let mut table = PotentialTable::new();
        table.insert(vec!["T".into()], 0.5);
        table.insert(vec!["Maybe".into()], 0.5);
        let f = Factor::new("f", vec![rv("A")], table);
        assert!(!f.is_valid());
    }

    #[test]
    fn imputed_potentials_take_priority_without_disturbing_loaded_table() {
        let mut f = Factor::unknown("f", vec![rv("A")]);
        let mut imputed = PotentialTable::new();
        imputed.insert(vec!["T".into()], 0.9);
        imputed.insert(vec!["F".into()], 0.1);
        f.impute(imputed.clone());

        assert!(f.potentials.is_empty());
        assert_eq!(f.effective_potentials(), &imputed);
        assert!(!f.is_unknown());
    }
}
