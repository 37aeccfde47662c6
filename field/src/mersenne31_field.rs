use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num::BigUint;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::types::{Field, Sample};

/// The prime field of order `2^31 - 1`.
///
/// Reduction is cheap because the modulus is a Mersenne number: a product
/// folds back into range with shifts and adds alone.
///
/// Elements are stored canonically in `[0, ORDER)`; every constructor and
/// arithmetic op maintains that invariant, so equality and hashing can be
/// derived on the raw representation.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Mersenne31Field(pub u32);

impl Mersenne31Field {
    pub const ORDER: u32 = (1 << 31) - 1;

    /// Maps a value in `[0, 2 * ORDER)` to its canonical representative.
    #[inline(always)]
    pub const fn partial_reduce(val: u32) -> Self {
        Self(if val >= Self::ORDER {
            val - Self::ORDER
        } else {
            val
        })
    }

    /// Reduces an arbitrary `u64` modulo `ORDER`.
    #[inline(always)]
    pub const fn reduce_u64(val: u64) -> Self {
        const MASK: u64 = Mersenne31Field::ORDER as u64;
        // Fold the high bits down twice; each fold removes a multiple of
        // `2^31 = ORDER + 1`, i.e. adds the same residue back in.
        let folded = (val >> 31) + (val & MASK);
        let folded = (folded >> 31) + (folded & MASK);
        Self::partial_reduce(folded as u32)
    }

    /// Returns `n`. Assumes `n < ORDER`.
    #[inline(always)]
    pub const fn from_canonical_u32(n: u32) -> Self {
        debug_assert!(n < Self::ORDER);
        Self(n)
    }

    #[inline]
    pub const fn to_canonical_u32(self) -> u32 {
        self.0
    }
}

// Sums of two canonical values must stay representable pre-reduction.
const_assert!(2 * (Mersenne31Field::ORDER as u64 - 1) < u32::MAX as u64);

impl Display for Mersenne31Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for Mersenne31Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Field for Mersenne31Field {
    const ZERO: Self = Self(0);
    const ONE: Self = Self(1);
    const TWO: Self = Self(2);
    const NEG_ONE: Self = Self(Self::ORDER - 1);

    fn order() -> BigUint {
        Self::ORDER.into()
    }

    fn characteristic() -> BigUint {
        Self::order()
    }

    fn try_inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        // Fermat: `x^(p - 2) = x^-1`.
        Some(self.exp_u64(Self::ORDER as u64 - 2))
    }

    #[inline]
    fn from_u32(n: u32) -> Self {
        Self::reduce_u64(n as u64)
    }
}

impl Sample for Mersenne31Field {
    #[inline]
    fn sample<R>(rng: &mut R) -> Self
    where
        R: rand::RngCore + ?Sized,
    {
        use rand::Rng;
        Self(rng.gen_range(0..Self::ORDER))
    }
}

impl Neg for Mersenne31Field {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::partial_reduce(Self::ORDER - self.0)
    }
}

impl Add for Mersenne31Field {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::partial_reduce(self.0 + rhs.0)
    }
}

impl AddAssign for Mersenne31Field {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Mersenne31Field {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl Sub for Mersenne31Field {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::partial_reduce(self.0 + Self::ORDER - rhs.0)
    }
}

impl SubAssign for Mersenne31Field {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Mersenne31Field {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::reduce_u64(self.0 as u64 * rhs.0 as u64)
    }
}

impl MulAssign for Mersenne31Field {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Product for Mersenne31Field {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ONE, |acc, x| acc * x)
    }
}

impl Div for Mersenne31Field {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    #[inline]
    fn div(self, rhs: Self) -> Self {
        self * rhs.inverse()
    }
}

impl DivAssign for Mersenne31Field {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::Mersenne31Field;
    use crate::types::{Field, Sample};

    type F = Mersenne31Field;

    #[test]
    fn test_reduction() {
        assert_eq!(F::from_u32(F::ORDER), F::ZERO);
        assert_eq!(F::from_u32(F::ORDER + 1), F::ONE);
        // `2^32 - 1 = 2 * ORDER + 1`.
        assert_eq!(F::from_u32(u32::MAX), F::ONE);
        // `2^64 - 1 ≡ 2^2 - 1 (mod ORDER)` since `2^31 ≡ 1`.
        assert_eq!(F::reduce_u64(u64::MAX), F::from_u32(3));
        assert_eq!(F::reduce_u64((F::ORDER as u64).pow(2)), F::ZERO);
    }

    #[test]
    fn test_add_sub_neg() {
        let x = F::rand();
        let y = F::rand();
        assert_eq!(x + y - y, x);
        assert_eq!(x - x, F::ZERO);
        assert_eq!(x + (-x), F::ZERO);
        assert_eq!(-(-x), x);
        assert_eq!(F::NEG_ONE + F::ONE, F::ZERO);
    }

    #[test]
    fn test_mul_inverse() {
        let x = F::rand();
        if x.is_nonzero() {
            assert_eq!(x * x.inverse(), F::ONE);
        }
        assert_eq!(F::ZERO.try_inverse(), None);
        assert_eq!(F::ONE.inverse(), F::ONE);
        assert_eq!(F::TWO * F::TWO.inverse(), F::ONE);
    }

    #[test]
    fn test_distributivity() {
        let [x, y, z] = F::rand_array();
        assert_eq!(x * (y + z), x * y + x * z);
    }

    #[test]
    fn test_exp() {
        let x = F::rand();
        assert_eq!(x.exp_u64(0), F::ONE);
        assert_eq!(x.exp_u64(1), x);
        assert_eq!(x.exp_u64(5), x * x * x * x * x);
        assert_eq!(x.exp_power_of_2(3), x.exp_u64(8));
        // Fermat's little theorem.
        assert_eq!(x.exp_u64(F::ORDER as u64), x);
    }

    #[test]
    fn test_serde() {
        let x = F::rand();
        let encoded = serde_json::to_string(&x).unwrap();
        assert_eq!(serde_json::from_str::<F>(&encoded).unwrap(), x);
    }
}
