//! OxiBV SLS - feasible-domain valuations for bit-vector local search
//!
//! A stochastic local search driver keeps one [`Valuation`] per bit-vector
//! variable. The valuation remembers which values the variable may take
//! (pinned bits plus a possibly wrap-around unsigned interval) and supplies
//! the primitives a search step needs: admissibility checks, directional
//! snapping to the nearest feasible value, randomized sampling, and repair.
//!
//! Randomness is injected through [`RandomSource`]; any [`rand::RngCore`]
//! qualifies, so tests and replays seed a concrete generator.
//!
//! # Examples
//!
//! ## Snapping a candidate into a range
//!
//! ```
//! use num_bigint::BigInt;
//! use oxibv_sls::{BitVec, Valuation};
//!
//! let mut v = Valuation::new(8);
//! v.add_range(&BigInt::from(0x10), &BigInt::from(0x20));
//!
//! let mut dst = BitVec::new(8);
//! assert!(v.get_at_most(&BitVec::from_u64(0xff, 8), &mut dst));
//! assert_eq!(dst.to_u64(), Some(0x1f));
//! assert!(!v.get_at_least(&BitVec::from_u64(0x30, 8), &mut dst));
//! ```
//!
//! ## Deterministic sampling
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use oxibv_sls::{BitVec, Valuation};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let mut v = Valuation::new(8);
//! let mut tmp = BitVec::new(8);
//! let cap = BitVec::from_u64(0x7f, 8);
//! assert!(v.set_random_at_most(&cap, &mut tmp, &mut rng));
//! v.commit_eval();
//! assert!(v.bits() <= &cap);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod random;
pub mod valuation;

pub use oxibv_core::{BitVec, Word, WORD_BITS};
pub use random::{random_bits, RandomSource};
pub use valuation::Valuation;
