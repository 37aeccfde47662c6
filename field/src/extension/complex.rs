use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::{Product, Sum};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num::BigUint;
use serde::{Deserialize, Serialize};

use crate::extension::{ExtensionOf, FieldExtension};
use crate::mersenne31_field::Mersenne31Field;
use crate::types::{Field, Sample};

/// The degree-2 extension `F[i]/(i^2 + 1)` of the Mersenne-31 field.
///
/// `2^31 - 1 ≡ 3 (mod 4)`, so `-1` is a non-residue and `x^2 + 1` is
/// irreducible. Stored as `(real, imaginary)`.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ComplexExtension(pub Mersenne31Field, pub Mersenne31Field);

impl ComplexExtension {
    pub const fn new(real: Mersenne31Field, imag: Mersenne31Field) -> Self {
        Self(real, imag)
    }

    pub const fn from_u32_unchecked(real: u32, imag: u32) -> Self {
        Self(
            Mersenne31Field::from_canonical_u32(real),
            Mersenne31Field::from_canonical_u32(imag),
        )
    }

    /// The conjugate `a - bi`; `x * x.conjugate()` lands in the base field.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self(self.0, -self.1)
    }

    /// The norm `a^2 + b^2`, an element of the base field.
    #[inline]
    pub fn norm(&self) -> Mersenne31Field {
        self.0.square() + self.1.square()
    }
}

impl Display for ComplexExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}i", self.0, self.1)
    }
}

impl Debug for ComplexExtension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<Mersenne31Field> for ComplexExtension {
    #[inline]
    fn from(x: Mersenne31Field) -> Self {
        Self(x, Mersenne31Field::ZERO)
    }
}

impl FieldExtension<2> for ComplexExtension {
    type BaseField = Mersenne31Field;

    fn to_basefield_array(&self) -> [Mersenne31Field; 2] {
        [self.0, self.1]
    }

    fn from_basefield_array(arr: [Mersenne31Field; 2]) -> Self {
        Self(arr[0], arr[1])
    }

    fn from_basefield(x: Mersenne31Field) -> Self {
        x.into()
    }

    #[inline]
    fn scalar_mul(&self, scalar: Mersenne31Field) -> Self {
        Self(self.0 * scalar, self.1 * scalar)
    }
}

impl ExtensionOf<Mersenne31Field> for ComplexExtension {
    const DEGREE: usize = 2;
}

impl Field for ComplexExtension {
    const ZERO: Self = Self(Mersenne31Field::ZERO, Mersenne31Field::ZERO);
    const ONE: Self = Self(Mersenne31Field::ONE, Mersenne31Field::ZERO);
    const TWO: Self = Self(Mersenne31Field::TWO, Mersenne31Field::ZERO);
    const NEG_ONE: Self = Self(Mersenne31Field::NEG_ONE, Mersenne31Field::ZERO);

    fn order() -> BigUint {
        Mersenne31Field::order().pow(2u32)
    }

    fn characteristic() -> BigUint {
        Mersenne31Field::characteristic()
    }

    fn try_inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        // `(a + bi)^-1 = (a - bi) / (a^2 + b^2)`.
        Some(self.conjugate().scalar_mul(self.norm().inverse()))
    }

    fn from_u32(n: u32) -> Self {
        Mersenne31Field::from_u32(n).into()
    }
}

impl Sample for ComplexExtension {
    fn sample<R>(rng: &mut R) -> Self
    where
        R: rand::RngCore + ?Sized,
    {
        Self(Mersenne31Field::sample(rng), Mersenne31Field::sample(rng))
    }
}

impl Neg for ComplexExtension {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0, -self.1)
    }
}

impl Add for ComplexExtension {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl AddAssign for ComplexExtension {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for ComplexExtension {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl Sub for ComplexExtension {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl SubAssign for ComplexExtension {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for ComplexExtension {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let Self(a, b) = self;
        let Self(c, d) = rhs;
        Self(a * c - b * d, a * d + b * c)
    }
}

impl MulAssign for ComplexExtension {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Product for ComplexExtension {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ONE, |acc, x| acc * x)
    }
}

impl Div for ComplexExtension {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.inverse()
    }
}

impl DivAssign for ComplexExtension {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Add<Mersenne31Field> for ComplexExtension {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Mersenne31Field) -> Self {
        Self(self.0 + rhs, self.1)
    }
}

impl AddAssign<Mersenne31Field> for ComplexExtension {
    fn add_assign(&mut self, rhs: Mersenne31Field) {
        *self = *self + rhs;
    }
}

impl Sub<Mersenne31Field> for ComplexExtension {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Mersenne31Field) -> Self {
        Self(self.0 - rhs, self.1)
    }
}

impl SubAssign<Mersenne31Field> for ComplexExtension {
    fn sub_assign(&mut self, rhs: Mersenne31Field) {
        *self = *self - rhs;
    }
}

impl Mul<Mersenne31Field> for ComplexExtension {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Mersenne31Field) -> Self {
        self.scalar_mul(rhs)
    }
}

impl MulAssign<Mersenne31Field> for ComplexExtension {
    fn mul_assign(&mut self, rhs: Mersenne31Field) {
        *self = *self * rhs;
    }
}

impl Mul<ComplexExtension> for Mersenne31Field {
    type Output = ComplexExtension;

    #[inline]
    fn mul(self, rhs: ComplexExtension) -> ComplexExtension {
        rhs.scalar_mul(self)
    }
}
