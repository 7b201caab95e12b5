use crate::lattice::{AbstractDomain, HasBottom, HasTop, Lattice};
use crate::{Bound, Width};

/// A closed interval `[lo, hi]` over the extended integer line.
///
/// The empty interval is canonically `[+inf, -inf]`; every constructor
/// collapses any `lo > hi` pair to that encoding, so two empty intervals
/// always compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    lo: Bound,
    hi: Bound,
}

impl Interval {
    /// Interval from raw endpoints. `lo > hi` collapses to empty.
    pub fn from_bounds(lo: Bound, hi: Bound) -> Self {
        if lo.less_eq(hi) {
            Interval { lo, hi }
        } else {
            Self::empty()
        }
    }

    /// Finite interval `[lo, hi]`. `lo > hi` collapses to empty.
    pub fn new(lo: i128, hi: i128) -> Self {
        Self::from_bounds(Bound::Finite(lo), Bound::Finite(hi))
    }

    /// The singleton `[v, v]`.
    pub fn constant(v: i128) -> Self {
        Interval::new(v, v)
    }

    pub fn empty() -> Self {
        Interval {
            lo: Bound::PosInf,
            hi: Bound::NegInf,
        }
    }

    /// The maximal interval `[-inf, +inf]`.
    pub fn full() -> Self {
        Interval {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    pub fn half_above(hi: i128) -> Self {
        Interval {
            lo: Bound::NegInf,
            hi: Bound::Finite(hi),
        }
    }

    pub fn half_below(lo: i128) -> Self {
        Interval {
            lo: Bound::Finite(lo),
            hi: Bound::PosInf,
        }
    }

    /// The full signed range of width `w`.
    pub fn signed_range(w: Width) -> Self {
        Interval::new(w.signed_min(), w.signed_max())
    }

    pub fn lo(&self) -> Bound {
        self.lo
    }

    pub fn hi(&self) -> Bound {
        self.hi
    }

    pub fn is_empty(&self) -> bool {
        !self.lo.less_eq(self.hi)
    }

    pub fn is_max_range(&self) -> bool {
        self.lo == Bound::NegInf && self.hi == Bound::PosInf
    }

    pub fn is_singleton(&self) -> bool {
        self.lo.is_finite() && self.lo == self.hi
    }

    pub fn contains(&self, v: i128) -> bool {
        self.lo.less_eq(Bound::Finite(v)) && Bound::Finite(v).less_eq(self.hi)
    }

    /// True if every value in the interval is `>= 0`.
    pub fn is_non_negative(&self) -> bool {
        !self.is_empty() && Bound::Finite(0).less_eq(self.lo)
    }

    /// True if every value in the interval is `<= 0`.
    pub fn is_non_positive(&self) -> bool {
        !self.is_empty() && self.hi.less_eq(Bound::Finite(0))
    }

    /// `[max(a,c), min(b,d)]`, empty on disjoint operands.
    pub fn intersect_with(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::empty();
        }
        Self::from_bounds(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    /// `[min(a,c), max(b,d)]`; empty is the identity.
    pub fn union_with(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Pin endpoints outside the signed range of `w` to infinity.
    pub fn saturate(&self, w: Width) -> Self {
        if self.is_empty() {
            return *self;
        }
        Interval {
            lo: self.lo.saturate(w),
            hi: self.hi.saturate(w),
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::empty()
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "empty")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

// ============================================================================
// Lattice structure
// ============================================================================

impl Lattice for Interval {
    fn join(&self, other: &Self) -> Self {
        self.union_with(other)
    }

    fn meet(&self, other: &Self) -> Self {
        self.intersect_with(other)
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        if other.is_empty() {
            return false;
        }
        other.lo.less_eq(self.lo) && self.hi.less_eq(other.hi)
    }
}

impl HasBottom for Interval {
    fn bottom() -> Self {
        Interval::empty()
    }
}

impl HasTop for Interval {
    fn top() -> Self {
        Interval::full()
    }
}

impl AbstractDomain for Interval {
    /// Jump-to-infinity widening: a lower bound that still decreases goes
    /// to `-inf`, an upper bound that still increases goes to `+inf`.
    fn widen(&self, next: &Self) -> Self {
        if self.is_empty() {
            return *next;
        }
        if next.is_empty() {
            return *self;
        }
        let lo = if next.lo.less_than(self.lo) {
            Bound::NegInf
        } else {
            self.lo
        };
        let hi = if self.hi.less_than(next.hi) {
            Bound::PosInf
        } else {
            self.hi
        };
        Interval { lo, hi }
    }

    /// Narrowing refines only infinite endpoints; finite endpoints are
    /// already justified and stay put.
    fn narrow(&self, next: &Self) -> Self {
        if self.is_empty() || next.is_empty() {
            return *self;
        }
        let lo = match self.lo {
            Bound::NegInf => next.lo,
            other => other,
        };
        let hi = match self.hi {
            Bound::PosInf => next.hi,
            other => other,
        };
        Interval::from_bounds(lo, hi)
    }
}
