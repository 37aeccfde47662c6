use std::cmp::Reverse;
use std::collections::BTreeMap;

use gkr31_util::log2_strict;
use itertools::Itertools;
use log::debug;

use super::merkle_proofs::{next_decommitment_node, MerkleDecommitment};
use super::MerkleHasher;
use crate::BaseField;

/// Merkle commitment to base field columns of mixed power-of-two lengths,
/// sharing a single tree.
///
/// A column of length `2^L` attaches to the tree layer with `2^L` nodes:
/// node `i` of that layer hashes its two children (nodes `2i` and `2i + 1`
/// of the layer below) together with the `i`-th value of every column of
/// that length.
#[derive(Clone, Debug)]
pub struct MerkleProver<H: MerkleHasher> {
    /// Layers of the tree, root layer first; layer `L` holds `2^L` hashes.
    pub layers: Vec<Vec<H::Hash>>,
}

impl<H: MerkleHasher> MerkleProver<H> {
    /// Commits to the given columns.
    ///
    /// Committing no columns at all is allowed and produces a single-node
    /// tree hashing no children and no values.
    ///
    /// Panics if a column length is not a power of two.
    pub fn commit(columns: Vec<&Vec<BaseField>>) -> Self {
        if columns.is_empty() {
            return Self {
                layers: vec![vec![H::hash_node(None, &[])]],
            };
        }
        debug!("committing {} columns", columns.len());

        let columns = &mut columns
            .into_iter()
            .sorted_by_key(|column| Reverse(column.len()))
            .peekable();
        let mut layers: Vec<Vec<H::Hash>> = Vec::new();

        let max_log_size = log2_strict(columns.peek().unwrap().len());
        for log_size in (0..=max_log_size).rev() {
            let layer_columns = columns
                .peeking_take_while(|column| log2_strict(column.len()) == log_size)
                .collect_vec();
            layers.push(Self::commit_on_layer(log_size, layers.last(), &layer_columns));
        }

        layers.reverse();
        Self { layers }
    }

    /// Hashes one layer; `prev_layer` holds the children (the layer with
    /// twice the nodes), `columns` the columns of this layer's size.
    fn commit_on_layer(
        log_size: usize,
        prev_layer: Option<&Vec<H::Hash>>,
        columns: &[&Vec<BaseField>],
    ) -> Vec<H::Hash> {
        (0..1 << log_size)
            .map(|i| {
                let children_hashes = prev_layer.map(|prev| (prev[2 * i], prev[2 * i + 1]));
                let column_values = columns.iter().map(|column| column[i]).collect_vec();
                H::hash_node(children_hashes, &column_values)
            })
            .collect()
    }

    pub fn root(&self) -> H::Hash {
        self.layers.first().unwrap()[0]
    }

    /// Generates a decommitment for the given queries.
    ///
    /// `queries_per_log_size` maps a log-size to the sorted, deduplicated
    /// node indices queried at the layer of that size. `columns` must be the
    /// columns the tree was committed with.
    ///
    /// Returns the values of the directly queried nodes, in traversal order
    /// (layers from largest to smallest, nodes in ascending index order),
    /// together with the decommitment. The verifier consumes both in exactly
    /// that order.
    pub fn decommit(
        &self,
        queries_per_log_size: &BTreeMap<usize, Vec<usize>>,
        columns: Vec<&Vec<BaseField>>,
    ) -> (Vec<BaseField>, MerkleDecommitment<H>) {
        let mut queried_values = Vec::new();
        let mut decommitment = MerkleDecommitment::empty();

        let mut columns_by_layer = columns
            .into_iter()
            .sorted_by_key(|column| Reverse(column.len()))
            .peekable();

        // Node indices visited in the layer below, in ascending order.
        let mut last_layer_queries = vec![];

        for layer_log_size in (0..self.layers.len()).rev() {
            let layer_columns = columns_by_layer
                .peeking_take_while(|column| log2_strict(column.len()) == layer_log_size)
                .collect_vec();
            let previous_layer_hashes = self.layers.get(layer_log_size + 1);

            let mut layer_total_queries = vec![];

            // Nodes are visited because a child was visited below or because
            // they are directly queried at this layer; merge both ascending
            // streams.
            let mut prev_layer_queries = last_layer_queries.into_iter().peekable();
            let direct: &[usize] = queries_per_log_size
                .get(&layer_log_size)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let mut direct_queries = direct.iter().copied().peekable();

            while let Some(node_index) =
                next_decommitment_node(&mut prev_layer_queries, &mut direct_queries)
            {
                if let Some(previous_layer) = previous_layer_hashes {
                    // Children the verifier cannot recompute join the hash
                    // witness; visited ones are consumed.
                    for child in [2 * node_index, 2 * node_index + 1] {
                        if prev_layer_queries.next_if_eq(&child).is_none() {
                            decommitment.hash_witness.push(previous_layer[child]);
                        }
                    }
                }

                // Values of a directly queried node are part of the output;
                // the rest join the column witness.
                let node_values = layer_columns.iter().map(|column| column[node_index]);
                if direct_queries.next_if_eq(&node_index).is_some() {
                    queried_values.extend(node_values);
                } else {
                    decommitment.column_witness.extend(node_values);
                }

                layer_total_queries.push(node_index);
            }

            last_layer_queries = layer_total_queries;
        }

        (queried_values, decommitment)
    }
}
