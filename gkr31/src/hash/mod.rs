//! Merkle vector commitments for base field columns of mixed sizes.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::BaseField;

pub mod blake2s;
pub mod blake3;
pub mod merkle_proofs;
pub mod merkle_tree;
pub mod poseidon252;

pub use self::blake2s::{Blake2sHash, Blake2sMerkleHasher};
pub use self::blake3::{Blake3Hash, Blake3MerkleHasher};
pub use self::merkle_proofs::{MerkleDecommitment, MerkleVerificationError, MerkleVerifier};
pub use self::merkle_tree::MerkleProver;
pub use self::poseidon252::Poseidon252MerkleHasher;

/// A hash function for Merkle tree nodes.
pub trait MerkleHasher: Debug + Default + Clone {
    type Hash: Copy + Eq + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Hashes a single Merkle node.
    ///
    /// A node has up to two children (nodes of the largest layer have none)
    /// and carries the values, at the node's index, of every column assigned
    /// to its layer. Column values arrive ordered by descending column
    /// length, ties in commit order.
    fn hash_node(
        children_hashes: Option<(Self::Hash, Self::Hash)>,
        column_values: &[BaseField],
    ) -> Self::Hash;
}
