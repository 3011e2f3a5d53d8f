//! Extensions over arbitrary-precision rationals.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Fractional-part style operations missing from `num-rational`.
pub trait RationalExt {
    /// `frac(q) = q − ⌊q⌋ ∈ [0, 1)`.
    fn frac(&self) -> BigRational;

    /// `def(q) = ⌈q⌉ − q ∈ [0, 1)`.
    fn deficit(&self) -> BigRational;

    /// Sign as -1, 0 or 1.
    fn signum_int(&self) -> i8;
}

impl RationalExt for BigRational {
    fn frac(&self) -> BigRational {
        self - self.floor()
    }

    fn deficit(&self) -> BigRational {
        self.ceil() - self
    }

    fn signum_int(&self) -> i8 {
        if self.is_zero() {
            0
        } else if self.is_positive() {
            1
        } else {
            -1
        }
    }
}

/// Rational from an integer literal.
pub fn rat(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

/// Rational from a numerator/denominator pair.
pub fn ratio(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

/// Least common multiple of the denominators of a sequence of rationals.
///
/// Scaling by the result turns every element into an integer.
pub fn denom_lcm<'a, I: IntoIterator<Item = &'a BigRational>>(items: I) -> BigInt {
    let mut lcm = BigInt::one();
    for q in items {
        lcm = lcm.lcm(q.denom());
    }
    lcm
}

/// Euclidean division: `a = q·b + r` with `0 ≤ r < |b|`.
pub fn div_rem_euclid(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    debug_assert!(!b.is_zero(), "euclidean division by zero");
    let (mut q, mut r) = a.div_rem(b);
    if r.is_negative() {
        if b.is_positive() {
            r += b;
            q -= BigInt::one();
        } else {
            r -= b;
            q += BigInt::one();
        }
    }
    (q, r)
}
