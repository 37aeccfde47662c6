use gkr31_util::ceil_div_usize;
use starknet_crypto::poseidon_hash_many;
use starknet_ff::FieldElement;

use super::MerkleHasher;
use crate::BaseField;
use gkr31_field::types::Field;

/// Base field elements packed into one 252-bit word.
const ELEMENTS_IN_BLOCK: usize = 8;

/// Merkle node hasher over Poseidon on the 252-bit Stark field.
///
/// Children hashes (if any) are fed as two felts; column values are packed
/// eight 31-bit limbs per felt in big-endian limb order, the final partial
/// block zero-padded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Poseidon252MerkleHasher;

impl MerkleHasher for Poseidon252MerkleHasher {
    type Hash = FieldElement;

    fn hash_node(
        children_hashes: Option<(Self::Hash, Self::Hash)>,
        column_values: &[BaseField],
    ) -> Self::Hash {
        let n_column_blocks = ceil_div_usize(column_values.len(), ELEMENTS_IN_BLOCK);
        let mut values = Vec::with_capacity(2 + n_column_blocks);

        if let Some((left, right)) = children_hashes {
            values.push(left);
            values.push(right);
        }

        let padding_length = ELEMENTS_IN_BLOCK * n_column_blocks - column_values.len();
        let mut padded_values = column_values.to_vec();
        padded_values.resize(column_values.len() + padding_length, BaseField::ZERO);
        for block in padded_values.chunks_exact(ELEMENTS_IN_BLOCK) {
            values.push(construct_word(block));
        }

        poseidon_hash_many(&values)
    }
}

/// Packs eight base field limbs into one felt, first limb most significant.
fn construct_word(block: &[BaseField]) -> FieldElement {
    let shift = FieldElement::from(1u64 << 31);
    block.iter().fold(FieldElement::ZERO, |word, limb| {
        word * shift + FieldElement::from(limb.0 as u64)
    })
}
