use std::fmt;

use blake2::{Blake2s256, Digest};
use serde::{Deserialize, Serialize};

use super::MerkleHasher;
use crate::BaseField;

/// A 32-byte Blake2s digest.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Blake2sHash(pub [u8; 32]);

impl fmt::Display for Blake2sHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Blake2sHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl AsRef<[u8]> for Blake2sHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Merkle node hasher over Blake2s.
///
/// Children digests are fed first, followed by the column values as
/// little-endian words.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Blake2sMerkleHasher;

impl MerkleHasher for Blake2sMerkleHasher {
    type Hash = Blake2sHash;

    fn hash_node(
        children_hashes: Option<(Self::Hash, Self::Hash)>,
        column_values: &[BaseField],
    ) -> Self::Hash {
        let mut hasher = Blake2s256::new();
        if let Some((left, right)) = children_hashes {
            hasher.update(left.0);
            hasher.update(right.0);
        }
        for value in column_values {
            hasher.update(value.0.to_le_bytes());
        }
        Blake2sHash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use gkr31_field::types::Field;

    use super::{Blake2sHash, Blake2sMerkleHasher};
    use crate::hash::MerkleHasher;
    use crate::BaseField;

    #[test]
    fn hash_node_is_deterministic() {
        let children = Some((Blake2sHash([1; 32]), Blake2sHash([2; 32])));
        let values = [BaseField::ONE, BaseField::TWO];

        assert_eq!(
            Blake2sMerkleHasher::hash_node(children, &values),
            Blake2sMerkleHasher::hash_node(children, &values),
        );
    }

    #[test]
    fn hash_node_distinguishes_inputs() {
        let children = Some((Blake2sHash([1; 32]), Blake2sHash([2; 32])));
        let swapped = Some((Blake2sHash([2; 32]), Blake2sHash([1; 32])));

        assert_ne!(
            Blake2sMerkleHasher::hash_node(children, &[]),
            Blake2sMerkleHasher::hash_node(swapped, &[]),
        );
        assert_ne!(
            Blake2sMerkleHasher::hash_node(children, &[BaseField::ZERO]),
            Blake2sMerkleHasher::hash_node(children, &[BaseField::ONE]),
        );
        assert_ne!(
            Blake2sMerkleHasher::hash_node(None, &[BaseField::ONE]),
            Blake2sMerkleHasher::hash_node(children, &[BaseField::ONE]),
        );
    }
}
