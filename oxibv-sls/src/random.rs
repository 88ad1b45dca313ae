//! Injectable word-level random sources.

use oxibv_core::{Word, WORD_BITS};

/// A source of uniformly distributed machine words.
///
/// Sampling operations take the source by `&mut` and never consult a global
/// generator, so a seeded generator makes every run replayable. Every
/// [`rand::RngCore`] is a `RandomSource`.
pub trait RandomSource {
    /// The next word of randomness.
    fn next_word(&mut self) -> Word;
}

impl<R: rand::RngCore> RandomSource for R {
    fn next_word(&mut self) -> Word {
        self.next_u32()
    }
}

/// XOR-folds `W/8` byte-shifted draws into one word.
///
/// Sources that only populate their low bits per draw still end up filling
/// every byte of the result.
pub fn random_bits<R: RandomSource>(rng: &mut R) -> Word {
    let mut r: Word = 0;
    for i in 0..WORD_BITS / 8 {
        r ^= rng.next_word() << (8 * i);
    }
    r
}
