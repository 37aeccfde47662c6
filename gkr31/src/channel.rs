use blake2::{Blake2s256, Digest};
use gkr31_field::extension::FieldExtension;

use crate::{BaseField, SecureField};

/// Size of the channel digest and of every draw, in bytes.
pub const BYTES_PER_HASH: usize = 32;

/// Base field elements extracted from one 32-byte draw.
const FELTS_PER_HASH: usize = 8;

/// Observes prover messages, and generates challenges by hashing the
/// transcript, a la Fiat-Shamir.
///
/// This is the only stateful object in the protocol. Mixing invalidates all
/// pending draws; drawing never changes what future mixes see. Two channels
/// fed the same sequence of operations produce the same outputs, which is
/// the entire prover/verifier agreement contract.
pub trait Channel {
    /// Appends challenge-field elements to the transcript.
    fn mix_felts(&mut self, felts: &[SecureField]);

    /// Appends raw `u32` words to the transcript.
    fn mix_u32s(&mut self, data: &[u32]);

    /// Appends a `u64` to the transcript.
    fn mix_u64(&mut self, value: u64);

    /// Draws a deterministic challenge.
    fn draw_felt(&mut self) -> SecureField;

    /// Draws `n_felts` deterministic challenges.
    fn draw_felts(&mut self, n_felts: usize) -> Vec<SecureField> {
        (0..n_felts).map(|_| self.draw_felt()).collect()
    }

    /// Draws 32 deterministic bytes.
    fn draw_random_bytes(&mut self) -> Vec<u8>;
}

/// Mix/draw counters of a channel.
///
/// `n_sent` distinguishes successive draws between two mixes; it resets
/// whenever new data is mixed in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChannelTime {
    n_challenges: usize,
    n_sent: usize,
}

impl ChannelTime {
    fn inc_challenges(&mut self) {
        self.n_challenges += 1;
        self.n_sent = 0;
    }

    fn inc_sent(&mut self) {
        self.n_sent += 1;
    }

    pub fn n_challenges(&self) -> usize {
        self.n_challenges
    }

    pub fn n_sent(&self) -> usize {
        self.n_sent
    }
}

/// A [`Channel`] backed by Blake2s over a running 32-byte digest.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Blake2sChannel {
    digest: [u8; BYTES_PER_HASH],
    channel_time: ChannelTime,
}

impl Blake2sChannel {
    pub fn digest(&self) -> [u8; BYTES_PER_HASH] {
        self.digest
    }

    pub fn channel_time(&self) -> ChannelTime {
        self.channel_time
    }

    fn update_digest(&mut self, hasher: Blake2s256) {
        self.digest = hasher.finalize().into();
        self.channel_time.inc_challenges();
    }

    /// Draws eight base field elements from a single hash invocation.
    ///
    /// Words are rejection-sampled into `[0, 2P)` and partially reduced, so
    /// the draw is uniform. Retry probability per invocation is `~2^-30`.
    fn draw_base_felts(&mut self) -> [BaseField; FELTS_PER_HASH] {
        loop {
            let bytes = self.draw_random_bytes();
            let words: [u32; FELTS_PER_HASH] = bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
                .collect::<Vec<u32>>()
                .try_into()
                .unwrap();
            if words.iter().all(|&word| word < 2 * BaseField::ORDER) {
                return words.map(BaseField::partial_reduce);
            }
        }
    }
}

impl Channel for Blake2sChannel {
    fn mix_felts(&mut self, felts: &[SecureField]) {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        for felt in felts {
            for limb in felt.to_basefield_array() {
                hasher.update(limb.0.to_le_bytes());
            }
        }
        self.update_digest(hasher);
    }

    fn mix_u32s(&mut self, data: &[u32]) {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        for word in data {
            hasher.update(word.to_le_bytes());
        }
        self.update_digest(hasher);
    }

    fn mix_u64(&mut self, value: u64) {
        self.mix_u32s(&[value as u32, (value >> 32) as u32]);
    }

    fn draw_felt(&mut self) -> SecureField {
        let felts = self.draw_base_felts();
        SecureField::from_basefield_array(felts[..4].try_into().unwrap())
    }

    fn draw_random_bytes(&mut self) -> Vec<u8> {
        // Hash `digest || counter`, padding the counter to a full block so
        // draws and mixes can never collide on input length.
        let mut padded_counter = [0; BYTES_PER_HASH];
        padded_counter[..8].copy_from_slice(&(self.channel_time.n_sent as u64).to_le_bytes());
        self.channel_time.inc_sent();

        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        hasher.update(padded_counter);
        hasher.finalize().to_vec()
    }
}
