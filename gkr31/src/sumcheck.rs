//! The sum-check protocol over multilinear extensions.
//!
//! An interactive proof that `claim = sum_x g(x)` where the sum is over all
//! assignments of boolean values to the variables of `g`. Each round reduces
//! one variable to a random challenge; what remains at the end is a single
//! evaluation claim that the caller checks against the oracle.

use std::iter::zip;

use gkr31_field::types::Field;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::Channel;
use crate::poly::univariate::random_linear_combination;
use crate::poly::{Mle, UnivariatePoly};
use crate::{BaseField, SecureField};

/// Max degree of polynomials the verifier accepts in each round of the
/// protocol.
pub const MAX_DEGREE: usize = 3;

/// A multivariate polynomial the sum-check prover can sum and fold one
/// variable at a time.
pub trait MultivariatePolyOracle: Sized {
    /// Returns the number of variables.
    fn n_variables(&self) -> usize;

    /// Computes the sum of the polynomial over all but the first variable:
    /// `f(t) = sum_{x_1, ..., x_{n-1}} g(t, x_1, ..., x_{n-1})`.
    ///
    /// `claim` equals `f(0) + f(1)`, which lets implementations derive one
    /// evaluation for free.
    fn sum_as_poly_in_first_variable(&self, claim: SecureField) -> UnivariatePoly<SecureField>;

    /// Returns the polynomial `g(challenge, x_1, ..., x_{n-1})`.
    fn fix_first_variable(self, challenge: SecureField) -> Self;
}

/// Sum-check round polynomials, one per variable of the largest oracle.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SumcheckProof {
    pub round_polys: Vec<UnivariatePoly<SecureField>>,
}

/// Sum-check protocol verification error.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SumcheckError {
    #[error("the degree of the polynomial in round {round} is too high")]
    DegreeTooHigh { round: usize },
    #[error("sum does not match the claim in round {round} (claim {claim}, computed {computed})")]
    SumMismatch {
        round: usize,
        claim: SecureField,
        computed: SecureField,
    },
}

/// Performs sum-check on a random linear combination of multiple multivariate
/// polynomials.
///
/// The oracles may have different numbers of variables; an oracle short of
/// the maximum by `k` variables is treated as if `k` unused leading variables
/// duplicated its sum, so its claim is scaled by `2^k` up front and its round
/// polynomial is the constant `claim / 2` until the remaining rounds match
/// its size. Claims, oracles and `lambda` must line up index-wise.
///
/// Returns `(proof, assignment, folded oracles, folded claims)`. A failed
/// `f(0) + f(1) = claim` or degree invariant panics: that is a bug in the
/// caller's oracle, not a verification failure.
pub fn prove_batch<O: MultivariatePolyOracle>(
    mut claims: Vec<SecureField>,
    mut oracles: Vec<O>,
    lambda: SecureField,
    channel: &mut impl Channel,
) -> (SumcheckProof, Vec<SecureField>, Vec<O>, Vec<SecureField>) {
    assert_eq!(claims.len(), oracles.len());
    let n_variables = oracles.iter().map(O::n_variables).max().unwrap();

    let mut round_polys = Vec::with_capacity(n_variables);
    let mut assignment = Vec::with_capacity(n_variables);

    // Scale claims of short oracles by the size of their unused hypercube.
    for (claim, oracle) in zip(&mut claims, &oracles) {
        let n_unused_variables = n_variables - oracle.n_variables();
        *claim *= BaseField::TWO.exp_u64(n_unused_variables as u64);
    }

    for round in 0..n_variables {
        let n_remaining_rounds = n_variables - round;
        trace!("sum-check round {round}, {n_remaining_rounds} remaining");

        let this_round_polys = zip(&oracles, &claims)
            .enumerate()
            .map(|(i, (oracle, &claim))| {
                let round_poly = if oracle.n_variables() == n_remaining_rounds {
                    oracle.sum_as_poly_in_first_variable(claim)
                } else {
                    (claim / BaseField::TWO).into()
                };

                let eval_at_0 = round_poly.eval_at_point(SecureField::ZERO);
                let eval_at_1 = round_poly.eval_at_point(SecureField::ONE);
                assert_eq!(eval_at_0 + eval_at_1, claim, "round {round}, oracle {i}");
                assert!(round_poly.degree() <= MAX_DEGREE, "round {round}, oracle {i}");

                round_poly
            })
            .collect::<Vec<UnivariatePoly<SecureField>>>();

        let round_poly = random_linear_combination(&this_round_polys, lambda);

        channel.mix_felts(round_poly.coeffs());
        let challenge = channel.draw_felt();

        claims = this_round_polys
            .iter()
            .map(|round_poly| round_poly.eval_at_point(challenge))
            .collect();
        oracles = oracles
            .into_iter()
            .map(|oracle| {
                if oracle.n_variables() == n_remaining_rounds {
                    oracle.fix_first_variable(challenge)
                } else {
                    oracle
                }
            })
            .collect();

        round_polys.push(round_poly);
        assignment.push(challenge);
    }

    let proof = SumcheckProof { round_polys };

    (proof, assignment, oracles, claims)
}

/// Partially verifies a sum-check proof.
///
/// Only "partially" since the function checks the sum-check rounds but not
/// the evaluation of the polynomial at the returned assignment; the caller
/// must check `final_claim` against the oracle itself.
pub fn partially_verify(
    mut claim: SecureField,
    proof: &SumcheckProof,
    channel: &mut impl Channel,
) -> Result<(Vec<SecureField>, SecureField), SumcheckError> {
    let mut assignment = Vec::with_capacity(proof.round_polys.len());

    for (round, round_poly) in proof.round_polys.iter().enumerate() {
        if round_poly.degree() > MAX_DEGREE {
            return Err(SumcheckError::DegreeTooHigh { round });
        }

        let computed = round_poly.eval_at_point(SecureField::ZERO)
            + round_poly.eval_at_point(SecureField::ONE);
        if claim != computed {
            return Err(SumcheckError::SumMismatch {
                round,
                claim,
                computed,
            });
        }

        channel.mix_felts(round_poly.coeffs());
        let challenge = channel.draw_felt();

        claim = round_poly.eval_at_point(challenge);
        assignment.push(challenge);
    }

    Ok((assignment, claim))
}

impl MultivariatePolyOracle for Mle<SecureField> {
    fn n_variables(&self) -> usize {
        self.n_variables()
    }

    fn sum_as_poly_in_first_variable(&self, claim: SecureField) -> UnivariatePoly<SecureField> {
        let eval_at_0: SecureField = self[..self.len() / 2].iter().copied().sum();
        let eval_at_1 = claim - eval_at_0;
        // The sum of a multilinear polynomial over a sub-hypercube is linear
        // in the free variable; the two evaluations pin it down.
        UnivariatePoly::new(vec![eval_at_0, eval_at_1 - eval_at_0])
    }

    fn fix_first_variable(self, challenge: SecureField) -> Self {
        Mle::fix_first_variable(self, challenge)
    }
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::Field;

    use super::{partially_verify, prove_batch, SumcheckError};
    use crate::channel::{Blake2sChannel, Channel};
    use crate::poly::{Mle, UnivariatePoly};
    use crate::SecureField;

    fn test_channel() -> Blake2sChannel {
        Blake2sChannel::default()
    }

    #[test]
    fn sumcheck_works() {
        let values: Vec<SecureField> = (1..=4u32).map(SecureField::from_u32).collect();
        let claim = values.iter().copied().sum::<SecureField>();
        assert_eq!(claim, SecureField::from_u32(10));
        let mle = Mle::new(values);
        let lambda = SecureField::ONE;
        let (proof, ..) = prove_batch(vec![claim], vec![mle.clone()], lambda, &mut test_channel());

        let (assignment, final_claim) =
            partially_verify(claim, &proof, &mut test_channel()).unwrap();

        assert_eq!(assignment.len(), 2);
        assert_eq!(mle.eval_at_point(&assignment), final_claim);
    }

    #[test]
    fn batch_sumcheck_works() {
        let mut channel = test_channel();
        let mle0 = Mle::new(channel.draw_felts(8));
        let mle1 = Mle::new(channel.draw_felts(8));
        let claim0 = mle0.iter().copied().sum();
        let claim1 = mle1.iter().copied().sum();
        let lambda = channel.draw_felt();
        let claims = vec![claim0, claim1];
        let (proof, ..) = prove_batch(
            claims.clone(),
            vec![mle0.clone(), mle1.clone()],
            lambda,
            &mut test_channel(),
        );

        let claim = claim0 + lambda * claim1;
        let (assignment, final_claim) =
            partially_verify(claim, &proof, &mut test_channel()).unwrap();

        let eval0 = mle0.eval_at_point(&assignment);
        let eval1 = mle1.eval_at_point(&assignment);
        assert_eq!(final_claim, eval0 + lambda * eval1);
    }

    #[test]
    fn batch_sumcheck_with_different_n_variables() {
        let mut channel = test_channel();
        let mle0 = Mle::new(channel.draw_felts(8));
        let mle1 = Mle::new(channel.draw_felts(4));
        let claim0 = mle0.iter().copied().sum();
        let claim1 = mle1.iter().copied().sum();
        let lambda = channel.draw_felt();
        let claims = vec![claim0, claim1];
        let (proof, ..) = prove_batch(
            claims.clone(),
            vec![mle0.clone(), mle1.clone()],
            lambda,
            &mut test_channel(),
        );

        // The short oracle's sum doubles for each of its unused variables.
        let claim = claim0 + lambda * claim1.double();
        let (assignment, final_claim) =
            partially_verify(claim, &proof, &mut test_channel()).unwrap();

        assert_eq!(assignment.len(), 3);
        let eval0 = mle0.eval_at_point(&assignment);
        let eval1 = mle1.eval_at_point(&assignment[1..]);
        assert_eq!(final_claim, eval0 + lambda * eval1);
    }

    #[test]
    fn zero_variable_oracle_yields_empty_proof() {
        let mle = Mle::new(vec![SecureField::from_u32(7)]);
        let claim = SecureField::from_u32(7);

        let (proof, assignment, _, final_claims) =
            prove_batch(vec![claim], vec![mle], SecureField::ONE, &mut test_channel());

        assert!(proof.round_polys.is_empty());
        assert!(assignment.is_empty());
        assert_eq!(final_claims, [claim]);

        let (assignment, final_claim) =
            partially_verify(claim, &proof, &mut test_channel()).unwrap();
        assert!(assignment.is_empty());
        assert_eq!(final_claim, claim);
    }

    #[test]
    fn invalid_sumcheck_proof_fails() {
        let values: Vec<SecureField> = (1..=4u32).map(SecureField::from_u32).collect();
        let claim = SecureField::from_u32(10);
        let lambda = SecureField::ONE;
        // Compromise the first round polynomial.
        let (mut invalid_proof, ..) = prove_batch(
            vec![claim],
            vec![Mle::new(values)],
            lambda,
            &mut test_channel(),
        );
        let coeffs = invalid_proof.round_polys[0].coeffs().to_vec();
        invalid_proof.round_polys[0] =
            UnivariatePoly::new(coeffs.into_iter().map(|c| c + SecureField::ONE).collect());

        let res = partially_verify(claim, &invalid_proof, &mut test_channel());

        assert!(matches!(
            res,
            Err(SumcheckError::SumMismatch { round: 0, .. })
        ));
    }

    #[test]
    fn sumcheck_with_degree_too_high_fails() {
        let values: Vec<SecureField> = (1..=4u32).map(SecureField::from_u32).collect();
        let claim = SecureField::from_u32(10);
        let (mut invalid_proof, ..) = prove_batch(
            vec![claim],
            vec![Mle::new(values)],
            SecureField::ONE,
            &mut test_channel(),
        );
        // A degree-4 round polynomial must be rejected before any sum check.
        invalid_proof.round_polys[0] = UnivariatePoly::new(vec![SecureField::ONE; 5]);

        let res = partially_verify(claim, &invalid_proof, &mut test_channel());

        assert_eq!(res.unwrap_err(), SumcheckError::DegreeTooHigh { round: 0 });
    }
}
