//! Feasible-domain state for one bit-vector variable.
//!
//! A [`Valuation`] tracks, for a single variable of width `bw`, which values
//! a local-search step may assign to it. The domain is the intersection of
//! two constraint families:
//!
//! - a per-bit *fixed* mask: positions whose value is pinned to the
//!   corresponding bit of the committed assignment,
//! - a circular unsigned interval `[lo, hi)` over `Z/2^bw`. `lo == hi`
//!   denotes the full domain; `lo > hi` wraps through zero, so the
//!   feasible segment is `[0, hi) ∪ [lo, 2^bw)`.
//!
//! The valuation answers admissibility queries, snaps candidate values to
//! the nearest feasible neighbor in a chosen direction, samples feasible
//! values from an injected [`RandomSource`], and absorbs new interval and
//! fixed-bit facts. Assignments are double-buffered: mutating operations
//! write a working copy (`eval`) and [`Valuation::commit_eval`] publishes it
//! into the committed `bits`.
//!
//! Interval reasoning in the wrap case is sound but deliberately loose in a
//! few spots (see [`Valuation::add_range`] and [`Valuation::max_feasible`]);
//! a search driver is expected to recover through repair rather than rely on
//! tight bounds.

use std::cmp::Ordering;

use num_bigint::BigInt;
use tracing::trace;

use oxibv_core::{word_log2, BitVec};

use crate::random::{random_bits, RandomSource};

/// Feasible-domain state for one bit-vector variable.
///
/// Owns five equal-width [`BitVec`]s: the committed assignment `bits`, the
/// working assignment `eval`, the interval endpoints `lo` and `hi`, and the
/// pinned-bit mask `fixed`. The masked-away positions of the top word are
/// permanently pinned in `fixed`, so out-of-width bits are never treated as
/// free.
#[derive(Clone, Debug)]
pub struct Valuation {
    bits: BitVec,
    eval: BitVec,
    lo: BitVec,
    hi: BitVec,
    fixed: BitVec,
}

impl Valuation {
    /// A fresh valuation of width `bw`: full interval, no pinned bits, zero
    /// assignment.
    #[must_use]
    pub fn new(bw: u32) -> Self {
        debug_assert!(bw >= 1);
        let mut fixed = BitVec::new(bw);
        let nw = fixed.num_words();
        let mask = fixed.top_mask();
        fixed.set_word(nw - 1, !mask);
        let v = Valuation {
            bits: BitVec::new(bw),
            eval: BitVec::new(bw),
            lo: BitVec::new(bw),
            hi: BitVec::new(bw),
            fixed,
        };
        debug_assert!(v.well_formed());
        v
    }

    /// Bit width of the variable.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.bits.width()
    }

    fn bw(&self) -> usize {
        self.bits.width() as usize
    }

    fn nw(&self) -> usize {
        self.bits.num_words()
    }

    /// The committed assignment.
    #[must_use]
    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    /// The working assignment (agrees with `bits` on every fixed bit).
    #[must_use]
    pub fn eval(&self) -> &BitVec {
        &self.eval
    }

    /// Lower interval endpoint (inclusive).
    #[must_use]
    pub fn lo(&self) -> &BitVec {
        &self.lo
    }

    /// Upper interval endpoint (exclusive).
    #[must_use]
    pub fn hi(&self) -> &BitVec {
        &self.hi
    }

    /// The pinned-bit mask.
    #[must_use]
    pub fn fixed(&self) -> &BitVec {
        &self.fixed
    }

    /// Structural invariants, checked by the mutating operations in debug
    /// builds: no overflow bits in any value, out-of-width positions pinned,
    /// working and committed assignments in agreement on pinned bits.
    #[must_use]
    pub fn well_formed(&self) -> bool {
        let nw = self.nw();
        let mask = self.bits.top_mask();
        if self.lo.has_overflow()
            || self.hi.has_overflow()
            || self.bits.has_overflow()
            || self.eval.has_overflow()
        {
            return false;
        }
        if self.fixed.word(nw - 1) & !mask != !mask {
            return false;
        }
        (0..nw).all(|i| (self.bits.word(i) ^ self.eval.word(i)) & self.fixed.word(i) == 0)
    }

    /// Whether `v` lies in the interval `[lo, hi)` interpreted over
    /// `Z/2^bw`. `v` must be overflow-clear.
    #[must_use]
    pub fn in_range(&self, v: &BitVec) -> bool {
        debug_assert!(!v.has_overflow());
        match self.lo.cmp(&self.hi) {
            Ordering::Equal => true,
            Ordering::Less => self.lo <= *v && *v < self.hi,
            Ordering::Greater => self.lo <= *v || *v < self.hi,
        }
    }

    /// Whether `v` is feasible: it agrees with the committed assignment on
    /// every pinned bit and lies in the interval.
    #[must_use]
    pub fn can_set(&self, v: &BitVec) -> bool {
        debug_assert!(!v.has_overflow());
        for i in 0..self.nw() {
            if (v.word(i) ^ self.bits.word(i)) & self.fixed.word(i) != 0 {
                return false;
            }
        }
        self.in_range(v)
    }

    /// Commits `v` into the working assignment if it is feasible.
    pub fn try_set(&mut self, v: &BitVec) -> bool {
        if !self.can_set(v) {
            return false;
        }
        self.eval.clone_from(v);
        true
    }

    /// Publishes the working assignment into the committed one.
    pub fn commit_eval(&mut self) {
        debug_assert!((0..self.nw())
            .all(|i| (self.bits.word(i) ^ self.eval.word(i)) & self.fixed.word(i) == 0));
        self.bits.clone_from(&self.eval);
        debug_assert!(self.well_formed());
    }

    /// Smallest feasible value. Exact for a linear interval; with a wrap or
    /// full interval this zeroes every free bit, which under-approximates.
    pub fn min_feasible(&self, out: &mut BitVec) {
        debug_assert_eq!(out.width(), self.width());
        if self.lo < self.hi {
            out.clone_from(&self.lo);
        } else {
            for i in 0..self.nw() {
                out.set_word(i, self.fixed.word(i) & self.bits.word(i));
            }
        }
        debug_assert!(!out.has_overflow());
    }

    /// Largest feasible value. Exact for a linear interval; with a wrap or
    /// full interval this sets every free bit, which over-approximates.
    pub fn max_feasible(&self, out: &mut BitVec) {
        debug_assert_eq!(out.width(), self.width());
        if self.lo < self.hi {
            out.clone_from(&self.hi);
            out.sub1();
        } else {
            for i in 0..self.nw() {
                out.set_word(i, !self.fixed.word(i) | self.bits.word(i));
            }
        }
        debug_assert!(!out.has_overflow());
    }

    // Largest dst <= src agreeing with the pinned bits:
    // start from src with every pinned-to-0 position cleared. If that lost
    // a bit of src, every position below the highest lost bit may be raised
    // to its maximum, so saturate the free bits there and load lower words
    // with their maximal fixed-compatible pattern.

    /// Largest feasible `dst <= src`, pinned bits first, then interval.
    /// Returns false if no feasible value at most `src` exists.
    pub fn get_at_most(&self, src: &BitVec, dst: &mut BitVec) -> bool {
        debug_assert!(!src.has_overflow());
        debug_assert_eq!(src.width(), self.width());
        debug_assert_eq!(dst.width(), self.width());
        let nw = self.nw();
        for i in 0..nw {
            dst.set_word(i, src.word(i) & (!self.fixed.word(i) | self.bits.word(i)));
        }
        for i in (0..nw).rev() {
            let lost = !dst.word(i) & src.word(i);
            if lost != 0 {
                let k = word_log2(lost);
                let below = (1 << k) - 1;
                dst.set_word(i, dst.word(i) | (!self.fixed.word(i) & below));
                for j in 0..i {
                    dst.set_word(j, !self.fixed.word(j) | self.bits.word(j));
                }
                break;
            }
        }
        debug_assert!(!dst.has_overflow());
        self.round_down(dst)
    }

    // Smallest dst >= src agreeing with the pinned bits: start from src
    // with every pinned position forced. If that raised a bit of src, keep
    // the highest raised bit and drop every free bit below it.

    /// Smallest feasible `dst >= src`, pinned bits first, then interval.
    /// Returns false if no feasible value at least `src` exists.
    pub fn get_at_least(&self, src: &BitVec, dst: &mut BitVec) -> bool {
        debug_assert!(!src.has_overflow());
        debug_assert_eq!(src.width(), self.width());
        debug_assert_eq!(dst.width(), self.width());
        let nw = self.nw();
        for i in 0..nw {
            dst.set_word(
                i,
                (!self.fixed.word(i) & src.word(i)) | (self.fixed.word(i) & self.bits.word(i)),
            );
        }
        for i in (0..nw).rev() {
            let raised = dst.word(i) & !src.word(i);
            if raised != 0 {
                let k = word_log2(raised);
                dst.set_word(i, dst.word(i) & (self.fixed.word(i) | (1 << k)));
                for j in 0..i {
                    dst.set_word(j, dst.word(j) & self.fixed.word(j));
                }
                break;
            }
        }
        debug_assert!(!dst.has_overflow());
        self.round_up(dst)
    }

    /// Raises `dst` into the interval without decreasing it past `lo`.
    /// Fails only for a linear interval with `dst` already at or above `hi`.
    pub fn round_up(&self, dst: &mut BitVec) -> bool {
        if self.lo < self.hi {
            if self.hi <= *dst {
                return false;
            }
            if self.lo > *dst {
                dst.clone_from(&self.lo);
            }
        } else if self.hi <= *dst && self.lo > *dst {
            dst.clone_from(&self.lo);
        }
        debug_assert!(!dst.has_overflow());
        true
    }

    /// Lowers `dst` into the interval. Fails only for a linear interval
    /// with `dst` already below `lo`.
    pub fn round_down(&self, dst: &mut BitVec) -> bool {
        if self.lo < self.hi {
            if self.lo > *dst {
                return false;
            }
            if self.hi <= *dst {
                dst.clone_from(&self.hi);
                dst.sub1();
            }
        } else if self.hi <= *dst && self.lo > *dst {
            dst.clone_from(&self.hi);
            dst.sub1();
        }
        debug_assert!(!dst.has_overflow());
        true
    }

    /// Sets free zero-bits of `dst` from low to high until `pred` accepts
    /// it. Returns false if `pred` never held.
    pub fn round_up_under<F>(&self, dst: &mut BitVec, pred: F) -> bool
    where
        F: Fn(&BitVec) -> bool,
    {
        if pred(dst) {
            return true;
        }
        for i in 0..self.bw() {
            if self.fixed.bit(i) || dst.bit(i) {
                continue;
            }
            dst.set_bit(i, true);
            if pred(dst) {
                return true;
            }
        }
        false
    }

    /// Clears free one-bits of `dst` from high to low until `pred` accepts
    /// it. Returns false if `pred` never held.
    pub fn round_down_under<F>(&self, dst: &mut BitVec, pred: F) -> bool
    where
        F: Fn(&BitVec) -> bool,
    {
        if pred(dst) {
            return true;
        }
        for i in (0..self.bw()).rev() {
            if self.fixed.bit(i) || !dst.bit(i) {
                continue;
            }
            dst.set_bit(i, false);
            if pred(dst) {
                return true;
            }
        }
        false
    }

    /// Draws a random assignment that respects the pinned bits. The
    /// interval is not consulted.
    pub fn get_variant<R: RandomSource>(&self, dst: &mut BitVec, rng: &mut R) {
        debug_assert_eq!(dst.width(), self.width());
        for i in 0..self.nw() {
            dst.set_word(
                i,
                (random_bits(rng) & !self.fixed.word(i)) | (self.fixed.word(i) & self.bits.word(i)),
            );
        }
        dst.clear_overflow();
    }

    // re-draw the free bits of tmp, keeping its pinned positions
    fn randomize_free<R: RandomSource>(&self, tmp: &mut BitVec, rng: &mut R) {
        for i in 0..self.nw() {
            tmp.set_word(
                i,
                (random_bits(rng) & !self.fixed.word(i)) | (self.fixed.word(i) & tmp.word(i)),
            );
        }
    }

    /// Commits a random feasible value at most `src` into the working
    /// assignment. Returns false if no such value exists or the randomized
    /// candidate could not be placed.
    pub fn set_random_at_most<R: RandomSource>(
        &mut self,
        src: &BitVec,
        tmp: &mut BitVec,
        rng: &mut R,
    ) -> bool {
        if !self.get_at_most(src, tmp) {
            return false;
        }
        if tmp.is_zero() || rng.next_word() % 2 == 0 {
            return self.try_set(tmp);
        }

        // random value below the snapped one
        let msb_bit = tmp.msb();
        self.randomize_free(tmp, rng);
        for i in msb_bit..self.bw() {
            tmp.set_bit(i, false);
        }
        if self.lo == self.hi || self.lo.is_zero() || self.lo <= *tmp {
            return self.try_set(tmp);
        }

        // unlucky draw, settle for the snap
        self.get_at_most(src, tmp) && self.try_set(tmp)
    }

    /// Snaps `src` upward and commits either the snapped value or a random
    /// feasible value in its magnitude band into the working assignment.
    /// Returns false if no feasible value at least `src` exists or the
    /// randomized candidate could not be placed.
    pub fn set_random_at_least<R: RandomSource>(
        &mut self,
        src: &BitVec,
        tmp: &mut BitVec,
        rng: &mut R,
    ) -> bool {
        if !self.get_at_least(src, tmp) {
            return false;
        }
        if tmp.is_ones() || rng.next_word() % 2 == 0 {
            return self.try_set(tmp);
        }

        // random value in the magnitude band of the snapped one
        let msb_bit = tmp.msb();
        self.randomize_free(tmp, rng);
        if msb_bit < self.bw() {
            tmp.set_bit(msb_bit, true);
        }
        if self.lo == self.hi || self.hi.is_zero() || self.hi > *tmp {
            return self.try_set(tmp);
        }

        // unlucky draw, settle for the snap
        self.get_at_least(src, tmp) && self.try_set(tmp)
    }

    /// Commits a random feasible value inside the closed query interval
    /// `[lo_q, hi_q]`, trying both directions before giving up.
    pub fn set_random_in_range<R: RandomSource>(
        &mut self,
        lo_q: &BitVec,
        hi_q: &BitVec,
        tmp: &mut BitVec,
        rng: &mut R,
    ) -> bool {
        debug_assert!(lo_q <= hi_q);
        if rng.next_word() % 2 == 0 {
            self.random_above(lo_q, hi_q, tmp, rng) || self.random_below(lo_q, hi_q, tmp, rng)
        } else {
            self.random_below(lo_q, hi_q, tmp, rng) || self.random_above(lo_q, hi_q, tmp, rng)
        }
    }

    fn random_above<R: RandomSource>(
        &mut self,
        lo_q: &BitVec,
        hi_q: &BitVec,
        tmp: &mut BitVec,
        rng: &mut R,
    ) -> bool {
        if !self.get_at_least(lo_q, tmp) || &*tmp > hi_q {
            return false;
        }
        if !tmp.is_ones() && rng.next_word() % 2 != 0 {
            let msb_bit = tmp.msb();
            self.randomize_free(tmp, rng);
            if msb_bit < self.bw() {
                tmp.set_bit(msb_bit, true);
            }
            let ok =
                self.round_down_under(tmp, |t| lo_q <= t && t <= hi_q && self.in_range(t));
            if !ok {
                // retry through the snap
                return self.get_at_least(lo_q, tmp) && &*tmp <= hi_q && self.try_set(tmp);
            }
        }
        self.try_set(tmp)
    }

    fn random_below<R: RandomSource>(
        &mut self,
        lo_q: &BitVec,
        hi_q: &BitVec,
        tmp: &mut BitVec,
        rng: &mut R,
    ) -> bool {
        if !self.get_at_most(hi_q, tmp) || &*tmp < lo_q {
            return false;
        }
        if !tmp.is_zero() && rng.next_word() % 2 != 0 {
            let msb_bit = tmp.msb();
            self.randomize_free(tmp, rng);
            for i in msb_bit..self.bw() {
                tmp.set_bit(i, false);
            }
            let ok = self.round_up_under(tmp, |t| lo_q <= t && t <= hi_q && self.in_range(t));
            if !ok {
                // retry through the snap
                return self.get_at_most(hi_q, tmp) && &*tmp >= lo_q && self.try_set(tmp);
            }
        }
        self.try_set(tmp)
    }

    /// Projects `dst` onto the feasible set and commits it into the working
    /// assignment: pinned bits are forced first, then the value is rounded
    /// into the interval, preferring the `try_down` direction. Always
    /// succeeds for a non-empty domain.
    pub fn set_repair(&mut self, try_down: bool, dst: &mut BitVec) -> bool {
        debug_assert_eq!(dst.width(), self.width());
        for i in 0..self.nw() {
            dst.set_word(
                i,
                (!self.fixed.word(i) & dst.word(i)) | (self.fixed.word(i) & self.bits.word(i)),
            );
        }
        let ok = if try_down {
            self.round_down(dst)
        } else {
            self.round_up(dst)
        };
        if !ok {
            let other = if try_down {
                self.round_up(dst)
            } else {
                self.round_down(dst)
            };
            debug_assert!(other);
        }
        debug_assert!((0..self.nw())
            .all(|i| (self.bits.word(i) ^ dst.word(i)) & self.fixed.word(i) == 0));
        trace!(value = %dst, "repaired assignment");
        self.eval.clone_from(dst);
        debug_assert!(self.well_formed());
        true
    }

    /// Intersects the interval with `[l, h)` taken modulo `2^bw`.
    ///
    /// `l == h` (after reduction) means no constraint. Must be called
    /// before any bit is pinned. The wrap cases tighten only when a unique
    /// tightening is evident and never widen; in particular a linear
    /// interval is never `hi`-tightened by a later range.
    pub fn add_range(&mut self, l: &BigInt, h: &BigInt) {
        let bw = self.width();
        let mut l_b = BitVec::new(bw);
        l_b.assign_bigint(l);
        let mut h_b = BitVec::new(bw);
        h_b.assign_bigint(h);
        if l_b == h_b {
            return;
        }

        // ranges must arrive before fixed bits
        debug_assert!(self.fixed.is_zero());

        if self.lo == self.hi {
            self.lo.clone_from(&l_b);
            self.hi.clone_from(&h_b);
        } else if self.lo < self.hi {
            if self.lo < l_b && l_b < self.hi {
                self.lo.clone_from(&l_b);
            }
            if self.hi < h_b && h_b < self.hi {
                self.hi.clone_from(&h_b);
            }
        } else {
            if self.lo < l_b || l_b < self.hi {
                self.lo.clone_from(&l_b);
            }
            if self.lo < h_b && h_b < self.hi {
                self.hi.clone_from(&h_b);
            } else if self.hi < self.lo && (h_b < self.hi || self.lo < h_b) {
                self.hi.clone_from(&h_b);
            }
        }
        debug_assert!(!self.lo.has_overflow());
        debug_assert!(!self.hi.has_overflow());
        if !self.in_range(&self.bits) {
            self.bits.clone_from(&self.lo);
        }
        if !self.in_range(&self.eval) {
            self.eval.clone_from(&self.lo);
        }
        trace!(lo = %self.lo, hi = %self.hi, "range added");
        debug_assert!(self.well_formed());
    }

    /// Pins bit `i` to `b` in both assignments. A bit that is already
    /// pinned keeps its value.
    pub fn pin_bit(&mut self, i: usize, b: bool) {
        debug_assert!(i < self.bw());
        if !self.fixed.bit(i) {
            self.fixed.set_bit(i, true);
            self.bits.set_bit(i, b);
            self.eval.set_bit(i, b);
        }
    }

    /// Cross-propagates between the interval and the pinned bits once both
    /// have been populated.
    ///
    /// Tightens `lo` (and `hi` through `hi - 1`) up to the most significant
    /// pinned position where the endpoint disagrees with the pinned value,
    /// then derives pinned bits back from the interval: leading zeros of
    /// `hi`, the top bit when `hi` is a power of two, and every bit when
    /// the interval holds a single value.
    pub fn init_fixed(&mut self) {
        if self.lo == self.hi {
            return;
        }
        let bw = self.bw();

        // raise lo to the nearest pinned-compatible value
        for i in (0..bw).rev() {
            if !self.fixed.bit(i) {
                continue;
            }
            if self.bits.bit(i) == self.lo.bit(i) {
                continue;
            }
            if self.bits.bit(i) {
                self.lo.set_bit(i, true);
                for j in (0..i).rev() {
                    self.lo.set_bit(j, self.fixed.bit(j) && self.bits.bit(j));
                }
            } else {
                // lo already passed the pinned prefix, wrap to its floor
                for j in (0..bw).rev() {
                    self.lo.set_bit(j, self.fixed.bit(j) && self.bits.bit(j));
                }
            }
            break;
        }

        // lower hi - 1 to the nearest pinned-compatible value
        let one = BitVec::from_u64(1, bw as u32);
        let mut hi1 = BitVec::new(bw as u32);
        hi1.set_sub(&self.hi, &one);
        for i in (0..bw).rev() {
            if !self.fixed.bit(i) {
                continue;
            }
            if self.bits.bit(i) == hi1.bit(i) {
                continue;
            }
            if hi1.bit(i) {
                hi1.set_bit(i, false);
                for j in (0..i).rev() {
                    hi1.set_bit(j, !self.fixed.bit(j) || self.bits.bit(j));
                }
            } else {
                for j in (0..bw).rev() {
                    hi1.set_bit(j, self.fixed.bit(j) && self.bits.bit(j));
                }
            }
            let _ = self.hi.set_add(&hi1, &one);
            break;
        }

        // derive pinned bits from the bounds
        if self.lo < self.hi {
            let mut i = bw;
            while i > 0 {
                i -= 1;
                if self.hi.bit(i) {
                    break;
                }
                self.pin_bit(i, false);
            }
            if self.hi.is_power_of2() {
                self.pin_bit(i, false);
            }
        }

        // a single admissible value pins everything
        let _ = hi1.set_add(&self.lo, &one);
        if self.hi == hi1 {
            for i in 0..bw {
                let b = self.lo.bit(i);
                self.pin_bit(i, b);
            }
        }
        trace!(lo = %self.lo, hi = %self.hi, fixed = %self.fixed, "bounds and pinned bits propagated");
        debug_assert!(self.well_formed());
    }

    /// Logical right shift of the committed assignment by `shift < bw`.
    pub fn shift_right(&self, out: &mut BitVec, shift: usize) {
        debug_assert!(shift < self.bw());
        debug_assert_eq!(out.width(), self.width());
        let bw = self.bw();
        for i in 0..bw {
            out.set_bit(i, i + shift < bw && self.bits.bit(i + shift));
        }
    }

    /// The committed assignment as a small integer, saturating at `max_n`.
    #[must_use]
    pub fn to_nat(&self, max_n: u32) -> u32 {
        debug_assert!(max_n < u32::MAX / 2);
        let max = u64::from(max_n);
        let mut p = 1u64;
        let mut value = 0u64;
        for i in 0..self.bw() {
            if p >= max {
                // any set bit from here on saturates
                if (i..self.bw()).any(|j| self.bits.bit(j)) {
                    return max_n;
                }
                break;
            }
            if self.bits.bit(i) {
                value += p;
            }
            p <<= 1;
        }
        value.min(max) as u32
    }
}
