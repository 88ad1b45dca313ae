//! OxiBV Core - multi-word bit-vector values for word-level solvers
//!
//! This crate provides [`BitVec`], a mutable unsigned integer modulo `2^bw`
//! stored as an array of machine words, together with the carry-discipline
//! arithmetic a word-level engine needs:
//! - per-bit and per-word access with an explicit top-word mask
//! - unsigned multiword comparison (most-significant word first)
//! - ripple add/sub/mul with overflow reporting
//! - hexadecimal printing/parsing and an arbitrary-precision bridge
//!
//! # Examples
//!
//! ## Modular arithmetic with overflow reporting
//!
//! ```
//! use oxibv_core::BitVec;
//!
//! let a = BitVec::from_u64(0xf0, 8);
//! let b = BitVec::from_u64(0x2a, 8);
//!
//! let mut sum = BitVec::new(8);
//! let overflow = sum.set_add(&a, &b);
//! assert!(overflow); // 0xf0 + 0x2a wraps at 8 bits
//! assert_eq!(sum.to_u64(), Some(0x1a));
//! ```
//!
//! ## Widths that cross a word boundary
//!
//! ```
//! use oxibv_core::BitVec;
//!
//! let v = BitVec::from_hex("1ffffffff", 33).unwrap();
//! assert_eq!(v.msb(), 32);
//! assert_eq!(v.to_string(), "1ffffffff");
//!
//! let mut dec = v.clone();
//! dec.sub1();
//! assert_eq!(dec.to_u64(), Some(0x1_ffff_fffe));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bitvec;

pub use bitvec::{word_log2, BitVec, ParseBitVecError, Word, WORD_BITS};
