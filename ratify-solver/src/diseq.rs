//! Disequalities between canonical variables.
//!
//! Pairs are keyed on ordered canonical representatives with a per-variable
//! neighbour index, so a partition merge can re-home the loser's
//! disequalities onto the winning representative.

use ratify_core::{Justification, Var};
use rustc_hash::{FxHashMap, FxHashSet};

/// The disequality set `D`.
#[derive(Clone, Default)]
pub struct DiseqSet {
    pairs: FxHashMap<(Var, Var), Justification>,
    index: FxHashMap<Var, FxHashSet<Var>>,
}

fn key(a: Var, b: Var) -> (Var, Var) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl DiseqSet {
    /// Create an empty set.
    pub fn new() -> Self {
        DiseqSet::default()
    }

    /// Record `a ≠ b` between canonical representatives. An already-known
    /// pair keeps its original justification.
    pub fn add(&mut self, a: Var, b: Var, why: Justification) {
        debug_assert_ne!(a, b);
        let k = key(a, b);
        self.pairs.entry(k).or_insert(why);
        self.index.entry(a).or_default().insert(b);
        self.index.entry(b).or_default().insert(a);
    }

    /// The justification of a recorded `a ≠ b`, if any.
    pub fn check(&self, a: Var, b: Var) -> Option<&Justification> {
        self.pairs.get(&key(a, b))
    }

    /// Re-home every disequality of `loser` onto `winner` after a partition
    /// merge. The caller has already refuted `loser ≠ winner`.
    pub fn remap(&mut self, loser: Var, winner: Var) {
        let neighbours = match self.index.remove(&loser) {
            Some(set) => set,
            None => return,
        };
        let mut sorted: Vec<Var> = neighbours.into_iter().collect();
        sorted.sort_unstable();
        for v in sorted {
            let why = self
                .pairs
                .remove(&key(loser, v))
                .expect("index and pair map agree");
            if let Some(set) = self.index.get_mut(&v) {
                set.remove(&loser);
            }
            debug_assert_ne!(v, winner, "merge against a recorded disequality");
            self.add(winner, v, why);
        }
    }

    /// Number of recorded pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no disequality is recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Known-disequal neighbours of a canonical variable, ascending.
    pub fn neighbours(&self, v: Var) -> Vec<Var> {
        let mut out: Vec<Var> = self
            .index
            .get(&v)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }
}
