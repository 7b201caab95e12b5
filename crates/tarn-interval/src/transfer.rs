//! Abstract transfer functions over [`Interval`].
//!
//! Every function is total and monotone in interval inclusion, and
//! saturates to `±∞` wherever the mathematical result would leave the
//! signed range of the target width.

use crate::{Bound, Interval, Width};

impl Interval {
    pub fn add(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Interval::from_bounds(self.lo().add(other.lo()), self.hi().add(other.hi())).saturate(w)
    }

    pub fn sub(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Interval::from_bounds(self.lo().sub(other.hi()), self.hi().sub(other.lo())).saturate(w)
    }

    pub fn mul(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let products = [
            self.lo().mul(other.lo()),
            self.lo().mul(other.hi()),
            self.hi().mul(other.lo()),
            self.hi().mul(other.hi()),
        ];
        let lo = products.iter().copied().fold(Bound::PosInf, Bound::min);
        let hi = products.iter().copied().fold(Bound::NegInf, Bound::max);
        Interval::from_bounds(lo, hi).saturate(w)
    }

    pub fn neg(&self, w: Width) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        Interval::from_bounds(self.hi().neg(), self.lo().neg()).saturate(w)
    }

    // ------------------------------------------------------------------
    // Division and remainder
    // ------------------------------------------------------------------

    /// Signed truncating division.
    ///
    /// A divisor straddling zero is split into its negative and positive
    /// halves (dropping the zero point) and the results are unioned; a
    /// divisor that is exactly `{0}` yields the maximal interval. The
    /// `signed_min / -1` corner exceeds the signed range and therefore
    /// pins to `+∞` through saturation.
    pub fn sdiv(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let mut result = Self::empty();
        for part in split_about_zero(other) {
            result = result.union_with(&self.sdiv_nonzero(&part, w));
        }
        if result.is_empty() {
            // Divisor was exactly {0}.
            return Self::full();
        }
        result.saturate(w)
    }

    fn sdiv_nonzero(&self, divisor: &Self, w: Width) -> Self {
        let candidates = [
            self.lo().div(divisor.lo()),
            self.lo().div(divisor.hi()),
            self.hi().div(divisor.lo()),
            self.hi().div(divisor.hi()),
        ];
        let lo = candidates.iter().copied().fold(Bound::PosInf, Bound::min);
        let hi = candidates.iter().copied().fold(Bound::NegInf, Bound::max);
        Interval::from_bounds(lo, hi).saturate(w)
    }

    /// Unsigned division. Precise only when both operands are provably
    /// non-negative; a possibly-negative operand reinterprets as a huge
    /// unsigned quantity this domain cannot represent, so the result is
    /// the maximal interval.
    pub fn udiv(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        if !self.is_non_negative() || !other.is_non_negative() {
            return Self::full();
        }
        self.sdiv(other, w)
    }

    /// Signed remainder. Bounded in magnitude by `max(|c|, |d|) - 1` over
    /// the non-zero divisor corners, intersected with the side of zero the
    /// dividend can occupy.
    pub fn srem(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let Some(m) = rem_magnitude(other) else {
            // Divisor is exactly {0}.
            return Self::full();
        };
        let magnitude = match m {
            Bound::Finite(m) => Interval::new(-(m - 1), m - 1),
            _ => Interval::full(),
        };
        magnitude.intersect_with(&self.sign_span()).saturate(w)
    }

    /// Unsigned remainder: `[0, max(|c|, |d|) - 1]` clamped by the
    /// dividend's upper bound, for provably non-negative operands.
    pub fn urem(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        if !self.is_non_negative() || !other.is_non_negative() {
            return Self::full();
        }
        let Some(m) = rem_magnitude(other) else {
            return Self::full();
        };
        let hi = m.pred().min(self.hi());
        Interval::from_bounds(Bound::Finite(0), hi.max(Bound::Finite(0))).saturate(w)
    }

    /// The half-line(s) around zero the interval can reach: used to keep a
    /// remainder on the same side of zero as its dividend.
    fn sign_span(&self) -> Self {
        let lo = if self.is_non_negative() {
            Bound::Finite(0)
        } else {
            Bound::NegInf
        };
        let hi = if self.is_non_positive() {
            Bound::Finite(0)
        } else {
            Bound::PosInf
        };
        Interval::from_bounds(lo, hi)
    }

    // ------------------------------------------------------------------
    // Shifts
    // ------------------------------------------------------------------

    /// Shift left: multiplication by `2^k` for `k` in the shift interval.
    pub fn shl(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let Some((c, d)) = shift_amounts(other, w) else {
            return Self::full();
        };
        let factor = Interval::new(1i128 << c, 1i128 << d);
        self.mul(&factor, w)
    }

    /// Logical shift right: division by `2^k`, clamped at zero. Requires a
    /// provably non-negative value; negative bit patterns reinterpret as
    /// huge unsigned quantities.
    pub fn lshr(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        if !self.is_non_negative() {
            return Self::full();
        }
        let Some((c, d)) = shift_amounts(other, w) else {
            return Self::full();
        };
        Interval::from_bounds(self.lo().shr(d), self.hi().shr(c)).saturate(w)
    }

    /// Arithmetic shift right: floor division by `2^k`, sign preserved.
    pub fn ashr(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let Some((c, d)) = shift_amounts(other, w) else {
            return Self::full();
        };
        let candidates = [
            self.lo().shr(c),
            self.lo().shr(d),
            self.hi().shr(c),
            self.hi().shr(d),
        ];
        let lo = candidates.iter().copied().fold(Bound::PosInf, Bound::min);
        let hi = candidates.iter().copied().fold(Bound::NegInf, Bound::max);
        Interval::from_bounds(lo, hi).saturate(w)
    }

    // ------------------------------------------------------------------
    // Bitwise operations
    // ------------------------------------------------------------------

    /// Bitwise and. `x & y <= min(x, y)` whenever the non-negative side is
    /// known, so any operand that is provably in `[0, m]` caps the result.
    pub fn bit_and(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        let caps = [self, other]
            .into_iter()
            .filter(|i| i.is_non_negative())
            .filter_map(|i| i.hi().as_finite());
        match caps.min() {
            Some(m) => Interval::new(0, m).saturate(w),
            None => Self::full(),
        }
    }

    /// Bitwise or over non-negative operands: bounded below by the larger
    /// operand minimum and above by the union of minimum-cover masks.
    pub fn bit_or(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        match (mask_cover(self), mask_cover(other)) {
            (Some(m1), Some(m2)) => {
                Interval::from_bounds(self.lo().max(other.lo()), Bound::Finite(m1 | m2)).saturate(w)
            }
            _ => Self::full(),
        }
    }

    /// Bitwise xor over non-negative operands: `[0, cover(b) | cover(d)]`.
    pub fn bit_xor(&self, other: &Self, w: Width) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        match (mask_cover(self), mask_cover(other)) {
            (Some(m1), Some(m2)) => Interval::new(0, m1 | m2).saturate(w),
            _ => Self::full(),
        }
    }

    // ------------------------------------------------------------------
    // Width changes
    // ------------------------------------------------------------------

    /// Truncation to `target` bits: preserved when the interval already
    /// fits the narrower signed range, otherwise the full narrow range.
    pub fn truncate(&self, target: Width) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        if self.is_subrange_of(target) {
            *self
        } else {
            Interval::signed_range(target)
        }
    }

    fn is_subrange_of(&self, w: Width) -> bool {
        match (self.lo(), self.hi()) {
            (Bound::Finite(lo), Bound::Finite(hi)) => {
                lo >= w.signed_min() && hi <= w.signed_max()
            }
            _ => false,
        }
    }

    /// Sign extension preserves bounds; re-saturate at the target width.
    pub fn sign_extend(&self, target: Width) -> Self {
        self.saturate(target)
    }

    /// Zero extension from `from` bits. A value that may be negative
    /// reinterprets as an arbitrary high bit pattern, so anything not
    /// provably non-negative covers the whole unsigned range of the source
    /// width; an unbounded top likewise clamps to that unsigned maximum.
    pub fn zero_extend(&self, from: Width, target: Width) -> Self {
        if self.is_empty() {
            return Self::empty();
        }
        if !self.is_non_negative() {
            return Interval::new(0, from.unsigned_max()).saturate(target);
        }
        let hi = self.hi().min(Bound::Finite(from.unsigned_max()));
        Interval::from_bounds(self.lo(), hi).saturate(target)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Split a divisor interval at zero, dropping the zero point. Returns up
/// to two non-empty sub-intervals; none when the divisor is exactly `{0}`.
fn split_about_zero(divisor: &Interval) -> impl Iterator<Item = Interval> {
    let negative = divisor.intersect_with(&Interval::half_above(-1));
    let positive = divisor.intersect_with(&Interval::half_below(1));
    [negative, positive].into_iter().filter(|i| !i.is_empty())
}

/// Largest magnitude a remainder can take for this divisor: the maximum of
/// `|c|` and `|d|` over the non-zero corners, or `None` for a `{0}` divisor.
fn rem_magnitude(divisor: &Interval) -> Option<Bound> {
    let mut m: Option<Bound> = None;
    for part in split_about_zero(divisor) {
        for corner in [part.lo(), part.hi()] {
            let mag = match corner {
                Bound::Finite(v) => Bound::Finite(v.abs()),
                _ => Bound::PosInf,
            };
            m = Some(match m {
                Some(prev) => prev.max(mag),
                None => mag,
            });
        }
    }
    m
}

/// Finite shift amounts `(c, d)` with `0 <= c <= d < bits`, or `None` when
/// the shift interval leaves the defined range.
fn shift_amounts(amount: &Interval, w: Width) -> Option<(u32, u32)> {
    let c = amount.lo().as_finite()?;
    let d = amount.hi().as_finite()?;
    if c < 0 || d >= w.bits() as i128 {
        return None;
    }
    Some((c as u32, d as u32))
}

/// Minimum-cover mask of a non-negative finite interval: the smallest
/// all-ones mask that covers every value up to the interval's maximum.
fn mask_cover(interval: &Interval) -> Option<i128> {
    if !interval.is_non_negative() {
        return None;
    }
    let hi = interval.hi().as_finite()?;
    if hi == 0 {
        return Some(0);
    }
    Some(((1u128 << (128 - (hi as u128).leading_zeros())) - 1) as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Width = Width::W32;

    #[test]
    fn add_saturates_at_width() {
        let a = Interval::new(i32::MAX as i128 - 1, i32::MAX as i128);
        let b = Interval::constant(10);
        let r = a.add(&b, W);
        assert_eq!(r.lo(), Bound::PosInf);
        assert_eq!(r.hi(), Bound::PosInf);
    }

    #[test]
    fn sdiv_splits_divisor_straddling_zero() {
        let a = Interval::new(10, 20);
        let b = Interval::new(-2, 2);
        // [10,20] / [-2,-1] = [-20,-5], [10,20] / [1,2] = [5,20]
        assert_eq!(a.sdiv(&b, W), Interval::new(-20, 20));
    }

    #[test]
    fn sdiv_by_zero_singleton_is_full() {
        let a = Interval::new(1, 5);
        assert!(a.sdiv(&Interval::constant(0), W).is_max_range());
    }

    #[test]
    fn sdiv_int_min_by_minus_one_pins_high() {
        let a = Interval::constant(W.signed_min());
        let r = a.sdiv(&Interval::constant(-1), W);
        assert_eq!(r.hi(), Bound::PosInf);
    }

    #[test]
    fn srem_sign_follows_dividend() {
        let ten = Interval::constant(10);
        assert_eq!(Interval::full().srem(&ten, W), Interval::new(-9, 9));
        assert_eq!(Interval::half_below(0).srem(&ten, W), Interval::new(0, 9));
        assert_eq!(Interval::half_above(0).srem(&ten, W), Interval::new(-9, 0));
    }

    #[test]
    fn urem_clamps_to_dividend() {
        let a = Interval::new(0, 3);
        let b = Interval::constant(10);
        assert_eq!(a.urem(&b, W), Interval::new(0, 3));
    }

    #[test]
    fn shl_is_scaled_multiplication() {
        let a = Interval::new(1, 3);
        let k = Interval::new(1, 2);
        assert_eq!(a.shl(&k, W), Interval::new(2, 12));
    }

    #[test]
    fn shl_out_of_range_amount_is_full() {
        let a = Interval::new(1, 3);
        assert!(a.shl(&Interval::new(0, 40), W).is_max_range());
        assert!(a.shl(&Interval::new(-1, 1), W).is_max_range());
    }

    #[test]
    fn lshr_clamps_at_zero() {
        let a = Interval::new(8, 64);
        let k = Interval::new(2, 3);
        assert_eq!(a.lshr(&k, W), Interval::new(1, 16));
        assert!(Interval::new(-8, 8).lshr(&k, W).is_max_range());
    }

    #[test]
    fn ashr_preserves_sign() {
        let a = Interval::new(-16, 16);
        let k = Interval::constant(2);
        assert_eq!(a.ashr(&k, W), Interval::new(-4, 4));
    }

    #[test]
    fn bit_and_capped_by_nonnegative_operand() {
        let a = Interval::new(0, 15);
        assert_eq!(a.bit_and(&Interval::full(), W), Interval::new(0, 15));
        assert_eq!(
            Interval::new(-5, 100).bit_and(&a, W),
            Interval::new(0, 15)
        );
        assert!(Interval::new(-5, 5)
            .bit_and(&Interval::new(-1, 1), W)
            .is_max_range());
    }

    #[test]
    fn bit_or_uses_cover_masks() {
        let a = Interval::new(1, 5);
        let b = Interval::new(2, 9);
        // covers: 7 and 15 -> hi = 15; lo = max(1, 2) = 2
        assert_eq!(a.bit_or(&b, W), Interval::new(2, 15));
        assert!(a.bit_or(&Interval::new(-1, 1), W).is_max_range());
    }

    #[test]
    fn bit_xor_cover_bound() {
        let a = Interval::new(0, 5);
        let b = Interval::new(0, 2);
        assert_eq!(a.bit_xor(&b, W), Interval::new(0, 7));
    }

    #[test]
    fn truncate_keeps_fitting_ranges() {
        let a = Interval::new(-100, 100);
        assert_eq!(a.truncate(Width::W8), a);
        let b = Interval::new(0, 300);
        assert_eq!(b.truncate(Width::W8), Interval::new(-128, 127));
        assert_eq!(Interval::full().truncate(Width::W8), Interval::new(-128, 127));
    }

    #[test]
    fn zero_extend_clamps() {
        // A possibly-negative source covers the whole unsigned range.
        let a = Interval::new(-10, 10);
        assert_eq!(a.zero_extend(Width::W8, W), Interval::new(0, 255));
        assert_eq!(
            Interval::full().zero_extend(Width::W8, W),
            Interval::new(0, 255)
        );
        assert_eq!(
            Interval::new(1, 10).zero_extend(Width::W8, W),
            Interval::new(1, 10)
        );
    }
}
