//! The GKR protocol for Grand-Product and LogUp lookup arguments.
//!
//! A layered circuit claim on the output layer is reduced, one layer at a
//! time, to claims on the input layer columns via batched sum-check. The
//! verifier never materializes a layer: each round it receives a two-row
//! mask per instance and evaluates the gate locally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poly::{fold_mle_evals, Fraction};
use crate::sumcheck::{SumcheckError, SumcheckProof};
use crate::SecureField;

pub mod prover;
pub mod verifier;

pub use prover::{prove_batch, EqEvals, GkrMultivariatePolyOracle, Layer};
pub use verifier::partially_verify_batch;

/// Batch GKR proof.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GkrBatchProof {
    /// Sum-check proof for each layer, ordered from the output layer toward
    /// the input layers.
    pub sumcheck_proofs: Vec<SumcheckProof>,
    /// Mask for each layer, by instance.
    pub layer_masks_by_instance: Vec<Vec<GkrMask>>,
    /// Column circuit outputs for each instance.
    pub output_claims_by_instance: Vec<Vec<SecureField>>,
}

/// Values obtained from the execution of the GKR protocol, still to be
/// checked against the input layers by the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GkrArtifact {
    /// Out-of-domain point for evaluating columns in the input layer.
    pub ood_point: Vec<SecureField>,
    /// The claimed evaluation at `ood_point`, per column of each instance's
    /// input layer.
    pub claims_to_verify_by_instance: Vec<Vec<SecureField>>,
    /// The number of variables of each instance's input layer.
    pub n_variables_by_instance: Vec<usize>,
}

/// Two evaluations of each column in a layer, on the two points of a line.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GkrMask {
    columns: Vec<[SecureField; 2]>,
}

impl GkrMask {
    pub fn new(columns: Vec<[SecureField; 2]>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[[SecureField; 2]] {
        &self.columns
    }

    /// Returns the mask values as one flat list, column by column.
    pub fn flatten(&self) -> Vec<SecureField> {
        self.columns.iter().flatten().copied().collect()
    }

    /// Evaluates the line through each column's two values at `x`.
    pub fn reduce_at_point(&self, x: SecureField) -> Vec<SecureField> {
        self.columns
            .iter()
            .map(|&[v0, v1]| fold_mle_evals(x, v0, v1))
            .collect()
    }
}

/// The local operation a circuit applies to two input rows to produce an
/// output row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gate {
    GrandProduct,
    LogUp,
}

impl Gate {
    /// Returns the output row of the gate applied to the mask's two rows.
    fn eval(&self, mask: &GkrMask) -> Result<Vec<SecureField>, InvalidNumMaskColumnsError> {
        Ok(match self {
            Self::GrandProduct => {
                let &[[a, b]] = mask.columns() else {
                    return Err(InvalidNumMaskColumnsError);
                };
                vec![a * b]
            }
            Self::LogUp => {
                let &[[numer_a, numer_b], [denom_a, denom_b]] = mask.columns() else {
                    return Err(InvalidNumMaskColumnsError);
                };
                let res = Fraction::new(numer_a, denom_a) + Fraction::new(numer_b, denom_b);
                vec![res.numerator, res.denominator]
            }
        })
    }
}

/// The mask did not hold the column count its gate requires.
#[derive(Clone, Copy, Debug)]
struct InvalidNumMaskColumnsError;

/// GKR batch verification error.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum GkrError {
    /// The proof array lengths do not line up with the inferred layer count.
    #[error("proof data is invalid")]
    MalformedProof,
    /// The number of gates does not match the number of proof instances.
    #[error("wrong number of instances (given {given}, expected {expected})")]
    NumInstancesMismatch { given: usize, expected: usize },
    /// A mask did not hold the column count its gate requires.
    #[error("mask in layer {instance_layer} of instance {instance} is invalid")]
    InvalidMask {
        instance: usize,
        /// Layer index relative to the instance's output layer.
        instance_layer: usize,
    },
    /// A layer's sum-check rounds failed to verify.
    #[error("sum-check proof of layer {layer} is invalid: {source}")]
    InvalidSumcheck { layer: usize, source: SumcheckError },
    /// The gate evaluated on the masks disagrees with the sum-check output.
    #[error("circuit check failed in layer {layer} (claim {claim}, computed {computed})")]
    CircuitCheckFailure {
        layer: usize,
        claim: SecureField,
        computed: SecureField,
    },
}
