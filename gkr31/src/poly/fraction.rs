use std::ops::{Add, Mul, Sub};

/// A fraction in projective form. Never reduced; addition cross-multiplies.
///
/// The numerator and denominator types may differ: LogUp columns keep
/// base-field numerators against extension-field denominators until the
/// first addition lifts both.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fraction<N, D> {
    pub numerator: N,
    pub denominator: D,
}

impl<N, D> Fraction<N, D> {
    pub const fn new(numerator: N, denominator: D) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl<N, D> Add for Fraction<N, D>
where
    N: Copy + Mul<D, Output = D>,
    D: Copy + Add<Output = D> + Mul<Output = D>,
{
    type Output = Fraction<D, D>;

    /// `a/b + c/d = (a*d + c*b)/(b*d)`
    fn add(self, rhs: Self) -> Fraction<D, D> {
        Fraction::new(
            self.numerator * rhs.denominator + rhs.numerator * self.denominator,
            self.denominator * rhs.denominator,
        )
    }
}

/// A fraction with an implicit numerator of one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reciprocal<T> {
    x: T,
}

impl<T> Reciprocal<T> {
    pub const fn new(x: T) -> Self {
        Self { x }
    }
}

impl<T> Add for Reciprocal<T>
where
    T: Copy + Add<Output = T> + Mul<Output = T>,
{
    type Output = Fraction<T, T>;

    /// `1/a + 1/b = (a + b)/(a*b)`
    fn add(self, rhs: Self) -> Fraction<T, T> {
        Fraction::new(self.x + rhs.x, self.x * rhs.x)
    }
}

impl<T> Sub for Reciprocal<T>
where
    T: Copy + Sub<Output = T> + Mul<Output = T>,
{
    type Output = Fraction<T, T>;

    /// `1/a - 1/b = (b - a)/(a*b)`
    fn sub(self, rhs: Self) -> Fraction<T, T> {
        Fraction::new(rhs.x - self.x, self.x * rhs.x)
    }
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::Field;

    use super::{Fraction, Reciprocal};
    use crate::{BaseField, SecureField};

    #[test]
    fn test_fraction_addition() {
        let a = Fraction::new(BaseField::ONE, BaseField::from_u32(3));
        let b = Fraction::new(BaseField::TWO, BaseField::from_u32(6));

        // `1/3 + 2/6 = 2/3`
        let res = a + b;
        assert_eq!(
            res.numerator * BaseField::from_u32(3),
            res.denominator * BaseField::TWO
        );
    }

    #[test]
    fn test_mixed_field_fraction_addition() {
        let a = Fraction::new(BaseField::TWO, SecureField::from_u32(5));
        let b = Fraction::new(BaseField::ONE, SecureField::from_u32(10));

        // `2/5 + 1/10 = 1/2`
        let res = a + b;
        assert_eq!(res.numerator * SecureField::TWO, res.denominator);
    }

    #[test]
    fn test_reciprocal_addition() {
        let a = SecureField::from_u32(9);
        let b = SecureField::from_u32(12);

        let res = Reciprocal::new(a) + Reciprocal::new(b);

        assert_eq!(res.numerator, a + b);
        assert_eq!(res.denominator, a * b);
        assert_eq!(res.numerator / res.denominator, a.inverse() + b.inverse());
    }

    #[test]
    fn test_reciprocal_subtraction() {
        let a = SecureField::from_u32(9);
        let b = SecureField::from_u32(12);

        let res = Reciprocal::new(a) - Reciprocal::new(b);

        assert_eq!(res.numerator / res.denominator, a.inverse() - b.inverse());
    }
}
