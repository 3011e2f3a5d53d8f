//! Union-find over variables with justified edges.
//!
//! Each non-root variable points at a parent together with the dependency
//! set of the equality that merged them. Paths are compacted lazily during
//! queries; the shortcut edge carries the union of the justifications along
//! the replaced path, so canonicalisation never loses dependencies.

use ratify_core::{Answer, Justification, Var};
use rustc_hash::FxHashMap;

/// The shared variable partition `V`.
#[derive(Clone, Default)]
pub struct Partition {
    parent: FxHashMap<Var, (Var, Justification)>,
}

impl Partition {
    /// Create an empty partition (every variable is its own class).
    pub fn new() -> Self {
        Partition::default()
    }

    /// Canonical representative of `x` and the justification of `x = canon(x)`.
    ///
    /// Compacts the traversed path.
    pub fn canon(&mut self, x: Var) -> (Var, Justification) {
        let mut root = x;
        let mut why = Justification::empty();
        let mut path = Vec::new();
        while let Some((next, edge)) = self.parent.get(&root) {
            path.push(root);
            why.union(edge);
            root = *next;
        }
        // lazy compaction: point every traversed node straight at the root;
        // the accumulated set justifies each shortcut
        if path.len() > 1 {
            for v in path {
                self.parent.insert(v, (root, why.clone()));
            }
        }
        (root, why)
    }

    /// Whether `x` is currently a representative.
    pub fn is_canonical(&self, x: Var) -> bool {
        !self.parent.contains_key(&x)
    }

    /// Union two classes: `loser` (the larger representative) is pointed at
    /// `winner`. Both must be canonical and `winner < loser`.
    pub fn union(&mut self, loser: Var, winner: Var, why: Justification) {
        debug_assert!(self.is_canonical(loser) && self.is_canonical(winner));
        debug_assert!(winner < loser, "the smaller representative becomes the root");
        self.parent.insert(loser, (winner, why));
    }

    /// Three-valued equality test. `No` answers come from the disequality
    /// set, which the owning engine consults; here the answer is `Yes` or
    /// `Unknown`.
    pub fn is_equal(&mut self, x: Var, y: Var) -> Answer {
        let (rx, jx) = self.canon(x);
        let (ry, jy) = self.canon(y);
        if rx == ry {
            Answer::Yes(Justification::merged(jx, &jy))
        } else {
            Answer::Unknown
        }
    }

    /// Number of non-root variables.
    pub fn merged_count(&self) -> usize {
        self.parent.len()
    }
}
