//! Dependency tracking for derived facts.
//!
//! Every derived fact carries the set of asserted atoms it follows from; the
//! union of these sets along a refutation is the unsat core.

use smallvec::SmallVec;
use std::fmt;

/// Index of an asserted atom in the facade's assertion log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AtomId(pub u32);

/// A sorted, deduplicated set of asserted-atom indices.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Justification(SmallVec<[AtomId; 4]>);

impl Justification {
    /// The empty dependency set (a definitional or valid fact).
    pub fn empty() -> Self {
        Justification(SmallVec::new())
    }

    /// Dependency on a single asserted atom.
    pub fn single(atom: AtomId) -> Self {
        Justification(SmallVec::from_slice(&[atom]))
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of atoms in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the atoms in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.0.iter().copied()
    }

    /// Whether the set contains a given atom.
    pub fn contains(&self, atom: AtomId) -> bool {
        self.0.binary_search(&atom).is_ok()
    }

    /// Union another set into this one.
    pub fn union(&mut self, other: &Justification) {
        if other.0.is_empty() {
            return;
        }
        if self.0.is_empty() {
            self.0 = other.0.clone();
            return;
        }
        let mut merged = SmallVec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.0[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(other.0[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.0[i..]);
        merged.extend_from_slice(&other.0[j..]);
        self.0 = merged;
    }

    /// The union of two sets.
    pub fn merged(mut a: Justification, b: &Justification) -> Justification {
        a.union(b);
        a
    }
}

impl FromIterator<AtomId> for Justification {
    fn from_iter<I: IntoIterator<Item = AtomId>>(iter: I) -> Self {
        let mut atoms: SmallVec<[AtomId; 4]> = iter.into_iter().collect();
        atoms.sort_unstable();
        atoms.dedup();
        Justification(atoms)
    }
}

impl fmt::Debug for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter().map(|a| a.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_dedups_and_sorts() {
        let a: Justification = [AtomId(3), AtomId(1)].into_iter().collect();
        let b: Justification = [AtomId(2), AtomId(1)].into_iter().collect();
        let c = Justification::merged(a, &b);
        assert_eq!(c.iter().map(|a| a.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_union_empty() {
        let a = Justification::single(AtomId(7));
        let c = Justification::merged(Justification::empty(), &a);
        assert_eq!(c.len(), 1);
        assert!(c.contains(AtomId(7)));
    }
}
