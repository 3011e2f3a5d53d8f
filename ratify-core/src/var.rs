//! Variable handles and the variable table.
//!
//! A [`Var`] is a 32-bit handle whose numeric value realises the global
//! variable order: the kind tag sits in the high bits, a monotonic per-kind
//! index below. Slack variables therefore compare below every non-slack
//! variable, and zero slacks below every nonnegative slack, so the canonical
//! representative of an equivalence class is simply the numeric minimum.

use lasso::{Rodeo, Spur};
use rustc_hash::FxHashMap;
use std::fmt;

/// Interpretation domain of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dom {
    /// Integer-constrained.
    Int,
    /// Unconstrained rational.
    Real,
}

impl Dom {
    /// Intersection of two domains (`Real ∩ Int = Int`).
    pub fn meet(a: Dom, b: Dom) -> Dom {
        match (a, b) {
            (Dom::Real, Dom::Real) => Dom::Real,
            _ => Dom::Int,
        }
    }
}

/// The kind of a variable, in ascending tag order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    /// Slack constrained to the singleton `{0}`.
    ZeroSlack,
    /// Slack interpreted over the nonnegative rationals.
    Slack,
    /// Fresh variable naming an impure or compound term.
    Rename,
    /// Fresh parameter generated by a theory solver.
    FreshTheory,
    /// User-introduced variable.
    External,
}

const TAG_SHIFT: u32 = 28;
const INDEX_MASK: u32 = (1 << TAG_SHIFT) - 1;

/// An ordered variable handle.
///
/// `Ord` on the raw word is the variable order of the whole system: every
/// slack is smaller than every non-slack, and every zero slack is smaller
/// than every nonnegative slack.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    fn new(kind: VarKind, index: u32) -> Self {
        debug_assert!(index <= INDEX_MASK, "variable index overflow");
        Var(((kind as u32) << TAG_SHIFT) | index)
    }

    /// The kind encoded in the handle.
    pub fn kind(self) -> VarKind {
        match self.0 >> TAG_SHIFT {
            0 => VarKind::ZeroSlack,
            1 => VarKind::Slack,
            2 => VarKind::Rename,
            3 => VarKind::FreshTheory,
            _ => VarKind::External,
        }
    }

    /// Per-kind creation index.
    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Whether the variable is a slack (restricted to nonnegative values).
    pub fn is_slack(self) -> bool {
        matches!(self.kind(), VarKind::ZeroSlack | VarKind::Slack)
    }

    /// Whether the variable is a zero slack.
    pub fn is_zero_slack(self) -> bool {
        self.kind() == VarKind::ZeroSlack
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind() {
            VarKind::ZeroSlack => "z",
            VarKind::Slack => "k",
            VarKind::Rename => "v",
            VarKind::FreshTheory => "i",
            VarKind::External => "x",
        };
        write!(f, "{}!{}", tag, self.index())
    }
}

struct VarInfo {
    name: Spur,
    dom: Option<Dom>,
}

/// Owner of per-variable metadata: interned names, kinds and domains.
///
/// The table is monotonic; variables are never destroyed. Fresh handles come
/// from per-kind counters, so rollbacks of solver state never invalidate a
/// handle already seen by a caller.
pub struct VarTable {
    names: Rodeo,
    info: [Vec<VarInfo>; 5],
    externals: FxHashMap<Spur, Var>,
}

impl VarTable {
    /// Create a table holding only the distinguished zero slack.
    pub fn new() -> Self {
        let mut table = VarTable {
            names: Rodeo::default(),
            info: Default::default(),
            externals: FxHashMap::default(),
        };
        // the distinguished zero slack, global minimum of the variable order
        let z0 = table.fresh(VarKind::ZeroSlack, Some(Dom::Int));
        debug_assert_eq!(z0, table.zero_var());
        table
    }

    /// The distinguished zero slack, which names the constant 0.
    pub fn zero_var(&self) -> Var {
        Var::new(VarKind::ZeroSlack, 0)
    }

    fn fresh(&mut self, kind: VarKind, dom: Option<Dom>) -> Var {
        let slot = &mut self.info[kind as usize];
        let index = slot.len() as u32;
        let var = Var::new(kind, index);
        let tag = match kind {
            VarKind::ZeroSlack => 'z',
            VarKind::Slack => 'k',
            VarKind::Rename => 'v',
            VarKind::FreshTheory => 'i',
            VarKind::External => 'x',
        };
        let name = self.names.get_or_intern(format!("{}!{}", tag, index));
        slot.push(VarInfo { name, dom });
        var
    }

    /// Introduce (or look up) a user variable by name.
    ///
    /// Redeclaring an existing name returns the original handle; a declared
    /// domain narrows the recorded one.
    pub fn external(&mut self, name: &str, dom: Option<Dom>) -> Var {
        if let Some(spur) = self.names.get(name) {
            if let Some(&var) = self.externals.get(&spur) {
                if let Some(d) = dom {
                    let old = self.dom(var).unwrap_or(Dom::Real);
                    self.set_dom(var, Dom::meet(old, d));
                }
                return var;
            }
        }
        let slot = &mut self.info[VarKind::External as usize];
        let index = slot.len() as u32;
        let var = Var::new(VarKind::External, index);
        let spur = self.names.get_or_intern(name);
        slot.push(VarInfo { name: spur, dom });
        self.externals.insert(spur, var);
        var
    }

    /// Fresh nonnegative slack.
    pub fn fresh_slack(&mut self, dom: Option<Dom>) -> Var {
        self.fresh(VarKind::Slack, dom)
    }

    /// Fresh zero slack (value fixed to 0 once processed).
    pub fn fresh_zero_slack(&mut self, dom: Option<Dom>) -> Var {
        self.fresh(VarKind::ZeroSlack, dom)
    }

    /// Fresh rename variable.
    pub fn fresh_rename(&mut self, dom: Option<Dom>) -> Var {
        self.fresh(VarKind::Rename, dom)
    }

    /// Fresh theory parameter (e.g. a Diophantine solution parameter).
    pub fn fresh_param(&mut self, dom: Option<Dom>) -> Var {
        self.fresh(VarKind::FreshTheory, dom)
    }

    /// Recorded domain of a variable, if any.
    pub fn dom(&self, var: Var) -> Option<Dom> {
        self.info[var.kind() as usize][var.index() as usize].dom
    }

    /// Overwrite the recorded domain.
    pub fn set_dom(&mut self, var: Var, dom: Dom) {
        self.info[var.kind() as usize][var.index() as usize].dom = Some(dom);
    }

    /// Whether the variable is integer-constrained.
    pub fn is_int(&self, var: Var) -> bool {
        self.dom(var) == Some(Dom::Int)
    }

    /// The display name of a variable.
    pub fn name(&self, var: Var) -> &str {
        self.names
            .resolve(&self.info[var.kind() as usize][var.index() as usize].name)
    }
}

impl Default for VarTable {
    fn default() -> Self {
        Self::new()
    }
}
