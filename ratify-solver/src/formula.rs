//! Atoms and propositional formulas over arithmetic terms.

use ratify_math::Polynomial;

/// An atomic constraint over polynomials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// Equality `s = t`.
    Eq(Polynomial, Polynomial),
    /// Disequality `s ≠ t`.
    Diseq(Polynomial, Polynomial),
    /// Nonnegativity `a ≥ 0`.
    Nonneg(Polynomial),
    /// Positivity `a > 0`, processed as the pair (`a ≥ 0`, `a ≠ 0`).
    Pos(Polynomial),
}

impl Atom {
    /// The negated atom.
    pub fn negate(&self) -> Atom {
        match self {
            Atom::Eq(s, t) => Atom::Diseq(s.clone(), t.clone()),
            Atom::Diseq(s, t) => Atom::Eq(s.clone(), t.clone()),
            // ¬(a ≥ 0) is a < 0, i.e. -a > 0
            Atom::Nonneg(a) => Atom::Pos(a.neg()),
            // ¬(a > 0) is a ≤ 0, i.e. -a ≥ 0
            Atom::Pos(a) => Atom::Nonneg(a.neg()),
        }
    }
}

/// A propositional formula over atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// Truth.
    True,
    /// Falsity.
    False,
    /// An atomic constraint.
    Atom(Atom),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction.
    And(Vec<Formula>),
    /// Disjunction.
    Or(Vec<Formula>),
}

impl Formula {
    /// Equality formula.
    pub fn eq(s: Polynomial, t: Polynomial) -> Formula {
        Formula::Atom(Atom::Eq(s, t))
    }

    /// Disequality formula.
    pub fn diseq(s: Polynomial, t: Polynomial) -> Formula {
        Formula::Atom(Atom::Diseq(s, t))
    }

    /// `a ≥ 0`.
    pub fn nonneg(a: Polynomial) -> Formula {
        Formula::Atom(Atom::Nonneg(a))
    }

    /// `a > 0`.
    pub fn pos(a: Polynomial) -> Formula {
        Formula::Atom(Atom::Pos(a))
    }

    /// `s ≥ t`.
    pub fn ge(s: Polynomial, t: Polynomial) -> Formula {
        Formula::nonneg(s.sub(&t))
    }

    /// `s ≤ t`.
    pub fn le(s: Polynomial, t: Polynomial) -> Formula {
        Formula::nonneg(t.sub(&s))
    }

    /// `s > t`.
    pub fn gt(s: Polynomial, t: Polynomial) -> Formula {
        Formula::pos(s.sub(&t))
    }

    /// `s < t`.
    pub fn lt(s: Polynomial, t: Polynomial) -> Formula {
        Formula::pos(t.sub(&s))
    }

    /// Negation with the polarity pushed onto atoms and connectives.
    pub fn negate(&self) -> Formula {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Atom(a) => Formula::Atom(a.negate()),
            Formula::Not(f) => (**f).clone(),
            Formula::And(fs) => Formula::Or(fs.iter().map(Formula::negate).collect()),
            Formula::Or(fs) => Formula::And(fs.iter().map(Formula::negate).collect()),
        }
    }
}
