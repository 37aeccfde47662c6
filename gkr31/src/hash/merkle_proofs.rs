use std::collections::BTreeMap;
use std::iter::Peekable;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MerkleHasher;
use crate::BaseField;

/// Witness for verifying a batch of queried Merkle nodes: exactly the
/// sibling hashes and column values the verifier cannot reconstruct itself,
/// in traversal order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MerkleDecommitment<H: MerkleHasher> {
    /// Hashes of subtrees unvisited by any query.
    pub hash_witness: Vec<H::Hash>,
    /// Column values of nodes visited by the traversal but not directly
    /// queried at their layer's size.
    pub column_witness: Vec<BaseField>,
}

impl<H: MerkleHasher> MerkleDecommitment<H> {
    pub fn empty() -> Self {
        Self {
            hash_witness: Vec::new(),
            column_witness: Vec::new(),
        }
    }
}

/// Merkle tree verification error.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum MerkleVerificationError {
    #[error("witness is too short")]
    WitnessTooShort,
    #[error("witness is too long")]
    WitnessTooLong,
    #[error("too few queried values")]
    TooFewQueriedValues,
    #[error("too many queried values")]
    TooManyQueriedValues,
    #[error("root mismatch")]
    RootMismatch,
}

/// Verifies Merkle decommitments against a committed root.
#[derive(Clone, Debug)]
pub struct MerkleVerifier<H: MerkleHasher> {
    pub root: H::Hash,
    /// Log sizes of the committed columns, in commit order.
    pub column_log_sizes: Vec<usize>,
}

impl<H: MerkleHasher> MerkleVerifier<H> {
    pub fn new(root: H::Hash, column_log_sizes: Vec<usize>) -> Self {
        Self {
            root,
            column_log_sizes,
        }
    }

    /// Verifies the decommitment of queried column values.
    ///
    /// The verifier repeats the prover's traversal, rebuilding exactly one
    /// hash per visited node: children come from the layer below when a
    /// query visited them and from `hash_witness` otherwise; column values
    /// come from `queried_values` for directly queried nodes and from
    /// `column_witness` otherwise. Both witnesses and the queried values
    /// must be consumed exactly, and the final hash must equal the root.
    pub fn verify(
        &self,
        queries_per_log_size: &BTreeMap<usize, Vec<usize>>,
        queried_values: Vec<BaseField>,
        decommitment: MerkleDecommitment<H>,
    ) -> Result<(), MerkleVerificationError> {
        let max_log_size = self.column_log_sizes.iter().copied().max().unwrap_or(0);

        let mut queried_values = queried_values.into_iter();
        let mut hash_witness = decommitment.hash_witness.into_iter();
        let mut column_witness = decommitment.column_witness.into_iter();

        // The verified nodes of the previously processed layer.
        let mut last_verified_layer: Vec<(usize, H::Hash)> = Vec::new();

        for layer_log_size in (0..=max_log_size).rev() {
            let n_columns_in_layer = self
                .column_log_sizes
                .iter()
                .filter(|&&log_size| log_size == layer_log_size)
                .count();

            let (prev_indices, prev_hashes): (Vec<usize>, Vec<H::Hash>) =
                last_verified_layer.into_iter().unzip();
            let mut prev_layer_queries = prev_indices.into_iter().peekable();
            let mut prev_layer_hashes = prev_hashes.into_iter();
            let direct: &[usize] = queries_per_log_size
                .get(&layer_log_size)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let mut direct_queries = direct.iter().copied().peekable();

            let mut this_layer = Vec::new();

            while let Some(node_index) =
                next_decommitment_node(&mut prev_layer_queries, &mut direct_queries)
            {
                // Fetch the children: recomputed below if a query visited
                // them, from the witness otherwise. The largest layer has no
                // children.
                let children_hashes = if layer_log_size < max_log_size {
                    let mut child_hash =
                        |child: usize| -> Result<H::Hash, MerkleVerificationError> {
                            if prev_layer_queries.next_if_eq(&child).is_some() {
                                Ok(prev_layer_hashes.next().unwrap())
                            } else {
                                hash_witness
                                    .next()
                                    .ok_or(MerkleVerificationError::WitnessTooShort)
                            }
                        };
                    Some((child_hash(2 * node_index)?, child_hash(2 * node_index + 1)?))
                } else {
                    None
                };

                let node_values = if direct_queries.next_if_eq(&node_index).is_some() {
                    let values = (&mut queried_values).take(n_columns_in_layer).collect_vec();
                    if values.len() != n_columns_in_layer {
                        return Err(MerkleVerificationError::TooFewQueriedValues);
                    }
                    values
                } else {
                    let values = (&mut column_witness).take(n_columns_in_layer).collect_vec();
                    if values.len() != n_columns_in_layer {
                        return Err(MerkleVerificationError::WitnessTooShort);
                    }
                    values
                };

                this_layer.push((node_index, H::hash_node(children_hashes, &node_values)));
            }

            last_verified_layer = this_layer;
        }

        if hash_witness.next().is_some() || column_witness.next().is_some() {
            return Err(MerkleVerificationError::WitnessTooLong);
        }
        if queried_values.next().is_some() {
            return Err(MerkleVerificationError::TooManyQueriedValues);
        }

        match last_verified_layer.as_slice() {
            [(0, computed_root)] if *computed_root == self.root => Ok(()),
            _ => Err(MerkleVerificationError::RootMismatch),
        }
    }
}

/// Returns the next node to visit when merging the two ascending query
/// streams of a layer: nodes with a visited child below, and directly
/// queried nodes.
pub(crate) fn next_decommitment_node(
    prev_queries: &mut Peekable<impl Iterator<Item = usize>>,
    layer_queries: &mut Peekable<impl Iterator<Item = usize>>,
) -> Option<usize> {
    prev_queries
        .peek()
        .map(|&child| child / 2)
        .into_iter()
        .chain(layer_queries.peek().copied())
        .min()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::Result;
    use gkr31_field::extension::FieldExtension;
    use gkr31_field::types::Field;

    use super::{MerkleDecommitment, MerkleVerificationError, MerkleVerifier};
    use crate::channel::{Blake2sChannel, Channel};
    use crate::hash::{Blake2sHash, Blake2sMerkleHasher, MerkleProver, Poseidon252MerkleHasher};
    use crate::BaseField;

    type TestData = (
        BTreeMap<usize, Vec<usize>>,
        Vec<BaseField>,
        MerkleDecommitment<Blake2sMerkleHasher>,
        MerkleVerifier<Blake2sMerkleHasher>,
    );

    /// Ten columns of log sizes 3 and 4, three queries per present size.
    fn prepare_merkle() -> TestData {
        const LOG_SIZES: [usize; 10] = [4, 3, 4, 3, 3, 4, 4, 3, 4, 3];
        let mut channel = Blake2sChannel::default();

        let columns: Vec<Vec<BaseField>> = LOG_SIZES
            .iter()
            .map(|&log_size| {
                let len = 1 << log_size;
                let mut column = Vec::with_capacity(len + 3);
                while column.len() < len {
                    column.extend(channel.draw_felt().to_basefield_array());
                }
                column.truncate(len);
                column
            })
            .collect();
        let column_refs: Vec<&Vec<BaseField>> = columns.iter().collect();

        let prover = MerkleProver::<Blake2sMerkleHasher>::commit(column_refs.clone());

        let queries: BTreeMap<usize, Vec<usize>> =
            BTreeMap::from([(3, vec![0, 3, 7]), (4, vec![2, 8, 15])]);
        let (queried_values, decommitment) = prover.decommit(&queries, column_refs);

        let verifier = MerkleVerifier::new(prover.root(), LOG_SIZES.to_vec());

        (queries, queried_values, decommitment, verifier)
    }

    #[test]
    fn test_merkle_success() -> Result<()> {
        let (queries, queried_values, decommitment, verifier) = prepare_merkle();
        verifier.verify(&queries, queried_values, decommitment)?;
        Ok(())
    }

    #[test]
    fn test_merkle_invalid_hash_witness() {
        let (queries, queried_values, mut decommitment, verifier) = prepare_merkle();
        assert!(decommitment.hash_witness.len() > 4);
        decommitment.hash_witness[4] = Blake2sHash::default();

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::RootMismatch)
        );
    }

    #[test]
    fn test_merkle_invalid_column_witness() {
        let (queries, queried_values, mut decommitment, verifier) = prepare_merkle();
        decommitment.column_witness[2] += BaseField::ONE;

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::RootMismatch)
        );
    }

    #[test]
    fn test_merkle_witness_too_short() {
        let (queries, queried_values, mut decommitment, verifier) = prepare_merkle();
        decommitment.hash_witness.pop();

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::WitnessTooShort)
        );
    }

    #[test]
    fn test_merkle_witness_too_long() {
        let (queries, queried_values, mut decommitment, verifier) = prepare_merkle();
        decommitment.hash_witness.push(Blake2sHash::default());

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::WitnessTooLong)
        );
    }

    #[test]
    fn test_merkle_column_witness_too_long() {
        let (queries, queried_values, mut decommitment, verifier) = prepare_merkle();
        decommitment.column_witness.push(BaseField::ZERO);

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::WitnessTooLong)
        );
    }

    #[test]
    fn test_merkle_too_few_queried_values() {
        let (queries, mut queried_values, decommitment, verifier) = prepare_merkle();
        queried_values.pop();

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::TooFewQueriedValues)
        );
    }

    #[test]
    fn test_merkle_too_many_queried_values() {
        let (queries, mut queried_values, decommitment, verifier) = prepare_merkle();
        queried_values.push(BaseField::ZERO);

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::TooManyQueriedValues)
        );
    }

    #[test]
    fn test_merkle_wrong_root() {
        let (queries, queried_values, decommitment, mut verifier) = prepare_merkle();
        verifier.root = Blake2sHash::default();

        assert_eq!(
            verifier.verify(&queries, queried_values, decommitment),
            Err(MerkleVerificationError::RootMismatch)
        );
    }

    #[test]
    fn test_merkle_poseidon_round_trip() -> Result<()> {
        let mut channel = Blake2sChannel::default();
        let columns: Vec<Vec<BaseField>> = (0..4)
            .map(|_| {
                channel
                    .draw_felts(2)
                    .into_iter()
                    .flat_map(|felt| felt.to_basefield_array())
                    .collect()
            })
            .collect();
        let column_refs: Vec<&Vec<BaseField>> = columns.iter().collect();

        let prover = MerkleProver::<Poseidon252MerkleHasher>::commit(column_refs.clone());
        let queries = BTreeMap::from([(3, vec![1, 4])]);
        let (queried_values, decommitment) = prover.decommit(&queries, column_refs);

        let verifier = MerkleVerifier::<Poseidon252MerkleHasher>::new(prover.root(), vec![3; 4]);
        verifier.verify(&queries, queried_values, decommitment)?;
        Ok(())
    }

    #[test]
    fn test_decommitment_serde_round_trip() -> Result<()> {
        let (_, _, decommitment, _) = prepare_merkle();

        let encoded = serde_json::to_string(&decommitment)?;
        let decoded: MerkleDecommitment<Blake2sMerkleHasher> = serde_json::from_str(&encoded)?;

        assert_eq!(decoded, decommitment);
        Ok(())
    }
}
