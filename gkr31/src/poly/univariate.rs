use std::cmp::max;
use std::iter::zip;
use std::ops::{Add, Mul, Neg, Sub};

use gkr31_field::types::Field;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum PolynomialError {
    /// Two interpolation points shared an x-coordinate.
    #[error("duplicate x-coordinate in interpolation points")]
    InterpolationDuplicate,
}

/// A univariate polynomial in coefficient form, lowest degree first.
///
/// The trailing coefficient is never zero; construction and every arithmetic
/// op re-truncate. The zero polynomial stores no coefficients.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UnivariatePoly<F: Field> {
    coeffs: Vec<F>,
}

impl<F: Field> UnivariatePoly<F> {
    pub fn new(coeffs: Vec<F>) -> Self {
        let mut poly = Self { coeffs };
        poly.truncate_leading_zeros();
        poly
    }

    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// The degree, with `0` for the zero polynomial.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn coeffs(&self) -> &[F] {
        &self.coeffs
    }

    pub fn eval_at_point(&self, x: F) -> F {
        horner_eval(&self.coeffs, x)
    }

    /// Computes the unique degree `< xs.len()` polynomial with
    /// `p(xs[i]) = ys[i]`, in Lagrange form.
    ///
    /// The domain is a handful of arbitrary points, so the quadratic-work
    /// direct construction is the right tool here.
    pub fn interpolate_lagrange(xs: &[F], ys: &[F]) -> Result<Self, PolynomialError> {
        assert_eq!(xs.len(), ys.len());

        for (i, &xi) in xs.iter().enumerate() {
            if xs[..i].contains(&xi) {
                return Err(PolynomialError::InterpolationDuplicate);
            }
        }

        let mut interpolant = Self::zero();

        for (i, (&xi, &yi)) in zip(xs, ys).enumerate() {
            let mut weighted_value = yi;
            for (j, &xj) in xs.iter().enumerate() {
                if i != j {
                    weighted_value /= xi - xj;
                }
            }

            let mut basis_term = Self::new(vec![weighted_value]);
            for (j, &xj) in xs.iter().enumerate() {
                if i != j {
                    basis_term = basis_term * Self::new(vec![-xj, F::ONE]);
                }
            }

            interpolant = interpolant + basis_term;
        }

        Ok(interpolant)
    }

    fn truncate_leading_zeros(&mut self) {
        while self.coeffs.last().is_some_and(F::is_zero) {
            self.coeffs.pop();
        }
    }

    fn coeff(&self, i: usize) -> F {
        self.coeffs.get(i).copied().unwrap_or(F::ZERO)
    }
}

impl<F: Field> From<F> for UnivariatePoly<F> {
    fn from(value: F) -> Self {
        Self::new(vec![value])
    }
}

impl<F: Field> Add for UnivariatePoly<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let n = max(self.coeffs.len(), rhs.coeffs.len());
        Self::new((0..n).map(|i| self.coeff(i) + rhs.coeff(i)).collect())
    }
}

impl<F: Field> Sub for UnivariatePoly<F> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let n = max(self.coeffs.len(), rhs.coeffs.len());
        Self::new((0..n).map(|i| self.coeff(i) - rhs.coeff(i)).collect())
    }
}

impl<F: Field> Neg for UnivariatePoly<F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            coeffs: self.coeffs.into_iter().map(Neg::neg).collect(),
        }
    }
}

impl<F: Field> Mul for UnivariatePoly<F> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        let mut coeffs = vec![F::ZERO; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &ci) in self.coeffs.iter().enumerate() {
            for (j, &cj) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += ci * cj;
            }
        }
        Self::new(coeffs)
    }
}

impl<F: Field> Mul<F> for UnivariatePoly<F> {
    type Output = Self;

    fn mul(self, rhs: F) -> Self {
        Self::new(self.coeffs.into_iter().map(|coeff| coeff * rhs).collect())
    }
}

/// Evaluates `sum_i coeffs[i] * x^i`.
pub fn horner_eval<F: Field>(coeffs: &[F], x: F) -> F {
    coeffs.iter().rev().fold(F::ZERO, |acc, &coeff| acc * x + coeff)
}

/// Computes `sum_i alpha^i * polys[i]`.
pub fn random_linear_combination<F: Field>(
    polys: &[UnivariatePoly<F>],
    alpha: F,
) -> UnivariatePoly<F> {
    polys
        .iter()
        .rfold(UnivariatePoly::zero(), |acc, poly| {
            acc * alpha + poly.clone()
        })
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::{Field, Sample};

    use super::{horner_eval, random_linear_combination, PolynomialError, UnivariatePoly};
    use crate::SecureField;

    #[test]
    fn test_zero_polynomial() {
        let zero = UnivariatePoly::<SecureField>::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.degree(), 0);
        assert_eq!(zero.eval_at_point(SecureField::rand()), SecureField::ZERO);

        // Constructing from all-zero coefficients also yields the zero polynomial.
        let from_zeros = UnivariatePoly::new(vec![SecureField::ZERO; 3]);
        assert!(from_zeros.is_zero());
        assert_eq!(from_zeros.degree(), 0);
    }

    #[test]
    fn test_leading_zeros_truncated_after_arithmetic() {
        // `(x^2 + 1) - x^2 = 1`.
        let x2_plus_1 =
            UnivariatePoly::new(vec![SecureField::ONE, SecureField::ZERO, SecureField::ONE]);
        let x2 = UnivariatePoly::new(vec![SecureField::ZERO, SecureField::ZERO, SecureField::ONE]);
        let diff = x2_plus_1 - x2;
        assert_eq!(diff.degree(), 0);
        assert_eq!(diff.coeffs(), [SecureField::ONE]);

        // `p + (-p) = 0`.
        let p = UnivariatePoly::new(SecureField::rand_vec(4));
        let sum = p.clone() + (-p);
        assert!(sum.is_zero());
    }

    #[test]
    fn test_eval_matches_naive() {
        let coeffs = SecureField::rand_vec(4);
        let poly = UnivariatePoly::new(coeffs.clone());
        let x = SecureField::rand();

        let expected = coeffs
            .iter()
            .enumerate()
            .map(|(i, &coeff)| coeff * x.exp_u64(i as u64))
            .sum();
        assert_eq!(poly.eval_at_point(x), expected);
    }

    #[test]
    fn test_interpolate_lagrange() {
        let xs: Vec<SecureField> = (0..4u32).map(SecureField::from_u32).collect();
        let ys = SecureField::rand_vec(4);

        let poly = UnivariatePoly::interpolate_lagrange(&xs, &ys).unwrap();

        assert!(poly.degree() < 4);
        for (&x, &y) in xs.iter().zip(&ys) {
            assert_eq!(poly.eval_at_point(x), y);
        }
    }

    #[test]
    fn test_interpolate_rejects_duplicates() {
        let xs = [SecureField::ONE, SecureField::TWO, SecureField::ONE];
        let ys = SecureField::rand_vec(3);

        let res = UnivariatePoly::interpolate_lagrange(&xs, &ys);

        assert_eq!(res.unwrap_err(), PolynomialError::InterpolationDuplicate);
    }

    #[test]
    fn test_mul() {
        // `(1 + x)(1 - x) = 1 - x^2`.
        let a = UnivariatePoly::new(vec![SecureField::ONE, SecureField::ONE]);
        let b = UnivariatePoly::new(vec![SecureField::ONE, -SecureField::ONE]);
        let expected = UnivariatePoly::new(vec![
            SecureField::ONE,
            SecureField::ZERO,
            -SecureField::ONE,
        ]);
        assert_eq!(a * b, expected);
    }

    #[test]
    fn test_random_linear_combination() {
        let polys: Vec<UnivariatePoly<SecureField>> = (1..=3)
            .map(|n| UnivariatePoly::new(SecureField::rand_vec(n)))
            .collect();
        let alpha = SecureField::rand();
        let x = SecureField::rand();

        let combined = random_linear_combination(&polys, alpha);

        let expected: SecureField = polys
            .iter()
            .enumerate()
            .map(|(i, poly)| alpha.exp_u64(i as u64) * poly.eval_at_point(x))
            .sum();
        assert_eq!(combined.eval_at_point(x), expected);
    }

    #[test]
    fn test_horner_eval() {
        assert_eq!(horner_eval(&[], SecureField::rand()), SecureField::ZERO);

        let coeffs = SecureField::rand_vec(3);
        let x = SecureField::rand();
        assert_eq!(
            horner_eval(&coeffs, x),
            coeffs[0] + coeffs[1] * x + coeffs[2] * x.square()
        );
    }
}
