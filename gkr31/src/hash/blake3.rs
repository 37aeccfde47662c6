use std::fmt;

use serde::{Deserialize, Serialize};

use super::MerkleHasher;
use crate::BaseField;

/// A 32-byte Blake3 digest.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl fmt::Display for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl AsRef<[u8]> for Blake3Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Merkle node hasher over Blake3, with the same input layout as the Blake2s
/// one.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Blake3MerkleHasher;

impl MerkleHasher for Blake3MerkleHasher {
    type Hash = Blake3Hash;

    fn hash_node(
        children_hashes: Option<(Self::Hash, Self::Hash)>,
        column_values: &[BaseField],
    ) -> Self::Hash {
        let mut hasher = blake3::Hasher::new();
        if let Some((left, right)) = children_hashes {
            hasher.update(&left.0);
            hasher.update(&right.0);
        }
        for value in column_values {
            hasher.update(&value.0.to_le_bytes());
        }
        Blake3Hash(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::Field;

    use super::{Blake3Hash, Blake3MerkleHasher};
    use crate::hash::MerkleHasher;
    use crate::BaseField;

    #[test]
    fn hash_node_distinguishes_inputs() {
        let children = Some((Blake3Hash([1; 32]), Blake3Hash([2; 32])));

        assert_ne!(
            Blake3MerkleHasher::hash_node(children, &[BaseField::ZERO]),
            Blake3MerkleHasher::hash_node(children, &[BaseField::ONE]),
        );
        assert_ne!(
            Blake3MerkleHasher::hash_node(None, &[]),
            Blake3MerkleHasher::hash_node(children, &[]),
        );
    }
}
