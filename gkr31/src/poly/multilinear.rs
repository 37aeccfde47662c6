use std::iter::zip;
use std::ops::Deref;

use gkr31_field::extension::ExtensionOf;
use gkr31_field::types::Field;
use gkr31_util::log2_strict;
use serde::{Deserialize, Serialize};

use crate::SecureField;

/// Evaluations of a multilinear polynomial on the boolean hypercube.
///
/// The table length is a power of two. Index bit significance follows
/// variable order: the first variable selects between the low and high half
/// of the table, the last variable between adjacent entries. A single entry
/// represents a constant (zero variables).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Mle<F: Field> {
    evals: Vec<F>,
}

impl<F: Field> Mle<F> {
    /// Creates a [`Mle`] from evaluations on the hypercube.
    ///
    /// Panics if the number of evaluations is not a power of two.
    pub fn new(evals: Vec<F>) -> Self {
        assert!(evals.len().is_power_of_two());
        Self { evals }
    }

    pub fn into_evals(self) -> Vec<F> {
        self.evals
    }

    pub fn n_variables(&self) -> usize {
        log2_strict(self.evals.len())
    }

    /// Evaluates the partial assignment `x_0 = assignment`, halving the table.
    ///
    /// Panics on a constant (there is no variable left to fix).
    pub fn fix_first_variable(self, assignment: SecureField) -> Mle<SecureField>
    where
        SecureField: ExtensionOf<F>,
    {
        assert!(self.len() >= 2, "no variables to fix");
        let midpoint = self.len() / 2;
        let (lhs_evals, rhs_evals) = self.evals.split_at(midpoint);

        Mle::new(
            zip(lhs_evals, rhs_evals)
                .map(|(&lhs_eval, &rhs_eval)| fold_mle_evals(assignment, lhs_eval, rhs_eval))
                .collect(),
        )
    }

    /// Evaluates the multilinear extension at `point`.
    pub fn eval_at_point(&self, point: &[SecureField]) -> SecureField
    where
        SecureField: ExtensionOf<F>,
    {
        assert_eq!(point.len(), self.n_variables());
        eval_mle_at_point(&self.evals, point)
    }
}

impl<F: Field> Deref for Mle<F> {
    type Target = [F];

    fn deref(&self) -> &[F] {
        &self.evals
    }
}

impl From<Mle<crate::BaseField>> for Mle<SecureField> {
    /// Promotes a base field table by element-wise embedding.
    fn from(mle: Mle<crate::BaseField>) -> Self {
        Mle::new(mle.evals.into_iter().map(SecureField::from).collect())
    }
}

fn eval_mle_at_point<F: Field>(evals: &[F], point: &[SecureField]) -> SecureField
where
    SecureField: ExtensionOf<F>,
{
    match point {
        [] => evals[0].into(),
        &[p_i, ref sub_point @ ..] => {
            let (lhs_evals, rhs_evals) = evals.split_at(evals.len() / 2);
            let lhs_eval = eval_mle_at_point(lhs_evals, sub_point);
            let rhs_eval = eval_mle_at_point(rhs_evals, sub_point);
            p_i * (rhs_eval - lhs_eval) + lhs_eval
        }
    }
}

/// Evaluates the line passing through `(0, eval0)` and `(1, eval1)` at `t`.
pub fn fold_mle_evals<F>(t: SecureField, eval0: F, eval1: F) -> SecureField
where
    F: Field,
    SecureField: ExtensionOf<F>,
{
    t * (eval1 - eval0) + eval0
}

/// Computes `eq(x, y) = prod_i x_i * y_i + (1 - x_i)(1 - y_i)`.
///
/// This is the multilinear indicator of `x = y` on the hypercube, evaluated
/// algebraically so the arguments may lie anywhere in the field. Empty
/// inputs yield `1`. Panics if the lengths differ.
pub fn eq<F: Field>(x: &[F], y: &[F]) -> F {
    assert_eq!(x.len(), y.len());
    zip(x, y)
        .map(|(&xi, &yi)| xi * yi + (F::ONE - xi) * (F::ONE - yi))
        .product()
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::{Field, Sample};

    use super::{eq, fold_mle_evals, Mle};
    use crate::{BaseField, SecureField};

    /// All `n`-variable hypercube points, as field vectors.
    fn hypercube(n: usize) -> Vec<Vec<SecureField>> {
        (0..1 << n)
            .map(|i: usize| {
                (0..n)
                    .map(|j| SecureField::from_bool((i >> (n - 1 - j)) & 1 == 1))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_eval_at_hypercube_points_recovers_table() {
        const N_VARIABLES: usize = 3;
        let mle = Mle::new(SecureField::rand_vec(1 << N_VARIABLES));

        for (i, point) in hypercube(N_VARIABLES).iter().enumerate() {
            assert_eq!(mle.eval_at_point(point), mle[i]);
        }
    }

    #[test]
    fn test_fix_first_variable_matches_eval() {
        const N_VARIABLES: usize = 4;
        let mle = Mle::new(SecureField::rand_vec(1 << N_VARIABLES));
        let t = SecureField::rand();
        let sub_point = [SecureField::rand(), SecureField::rand(), SecureField::rand()];

        let fixed = mle.clone().fix_first_variable(t);

        let mut point = vec![t];
        point.extend(sub_point);
        assert_eq!(fixed.eval_at_point(&sub_point), mle.eval_at_point(&point));
    }

    #[test]
    fn test_fix_first_variable_embeds_base_field() {
        let mle = Mle::new(BaseField::rand_vec(8));
        let t = SecureField::rand();
        let sub_point = [SecureField::rand(), SecureField::rand()];

        let fixed = mle.clone().fix_first_variable(t);

        let mut point = vec![t];
        point.extend(sub_point);
        assert_eq!(fixed.eval_at_point(&sub_point), mle.eval_at_point(&point));
    }

    #[test]
    fn test_embedding_preserves_evaluations() {
        let mle = Mle::new(BaseField::rand_vec(8));
        let point = [SecureField::rand(), SecureField::rand(), SecureField::rand()];

        let embedded: Mle<SecureField> = mle.clone().into();

        assert_eq!(embedded.eval_at_point(&point), mle.eval_at_point(&point));
    }

    #[test]
    fn test_constant_mle() {
        let mle = Mle::new(vec![SecureField::rand()]);
        assert_eq!(mle.n_variables(), 0);
        assert_eq!(mle.eval_at_point(&[]), mle[0]);
    }

    #[test]
    #[should_panic]
    fn test_constant_mle_cannot_be_folded() {
        let mle = Mle::new(vec![SecureField::rand()]);
        mle.fix_first_variable(SecureField::rand());
    }

    #[test]
    fn test_eq_on_hypercube() {
        const N_VARIABLES: usize = 3;
        let points = hypercube(N_VARIABLES);

        for (i, x) in points.iter().enumerate() {
            for (j, y) in points.iter().enumerate() {
                let expected = if i == j {
                    SecureField::ONE
                } else {
                    SecureField::ZERO
                };
                assert_eq!(eq(x, y), expected);
            }
        }
    }

    #[test]
    fn test_eq_empty_inputs() {
        assert_eq!(eq::<SecureField>(&[], &[]), SecureField::ONE);
    }

    #[test]
    #[should_panic]
    fn test_eq_rejects_length_mismatch() {
        eq(&[SecureField::ONE], &[]);
    }

    #[test]
    fn test_fold_mle_evals() {
        let v0 = SecureField::rand();
        let v1 = SecureField::rand();

        assert_eq!(fold_mle_evals(SecureField::ZERO, v0, v1), v0);
        assert_eq!(fold_mle_evals(SecureField::ONE, v0, v1), v1);

        // Base field inputs embed into the extension.
        let b0 = BaseField::rand();
        let b1 = BaseField::rand();
        let t = SecureField::rand();
        assert_eq!(
            fold_mle_evals(t, b0, b1),
            fold_mle_evals(t, SecureField::from(b0), SecureField::from(b1))
        );
    }
}
