//! Signed comparison predicates and their interval semantics.

use crate::{Bound, Interval};

/// Signed comparison predicate of a compare instruction.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl Predicate {
    /// The predicate that holds when this one does not.
    pub fn negate(self) -> Self {
        match self {
            Predicate::Eq => Predicate::Ne,
            Predicate::Ne => Predicate::Eq,
            Predicate::Slt => Predicate::Sge,
            Predicate::Sle => Predicate::Sgt,
            Predicate::Sgt => Predicate::Sle,
            Predicate::Sge => Predicate::Slt,
        }
    }

    /// The predicate with its operands exchanged: `x p y` iff `y swap(p) x`.
    pub fn swap(self) -> Self {
        match self {
            Predicate::Eq => Predicate::Eq,
            Predicate::Ne => Predicate::Ne,
            Predicate::Slt => Predicate::Sgt,
            Predicate::Sle => Predicate::Sge,
            Predicate::Sgt => Predicate::Slt,
            Predicate::Sge => Predicate::Sle,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Slt => "slt",
            Predicate::Sle => "sle",
            Predicate::Sgt => "sgt",
            Predicate::Sge => "sge",
        };
        write!(f, "{s}")
    }
}

impl Interval {
    /// Decide `self pred other` when the two intervals permit only one
    /// outcome; `None` when both outcomes are possible (or an operand is
    /// empty).
    pub fn decide(&self, pred: Predicate, other: &Self) -> Option<bool> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        match pred {
            Predicate::Slt => {
                if self.hi().less_than(other.lo()) {
                    Some(true)
                } else if other.hi().less_eq(self.lo()) {
                    Some(false)
                } else {
                    None
                }
            }
            Predicate::Sle => {
                if self.hi().less_eq(other.lo()) {
                    Some(true)
                } else if other.hi().less_than(self.lo()) {
                    Some(false)
                } else {
                    None
                }
            }
            Predicate::Sgt => other.decide(Predicate::Slt, self),
            Predicate::Sge => other.decide(Predicate::Sle, self),
            Predicate::Eq => {
                if self.is_singleton() && other.is_singleton() && self == other {
                    Some(true)
                } else if self.intersect_with(other).is_empty() {
                    Some(false)
                } else {
                    None
                }
            }
            Predicate::Ne => self.decide(Predicate::Eq, other).map(|b| !b),
        }
    }

    /// The interval of values `x` that can satisfy `x pred b` for some `b`
    /// drawn from `bound`. `Ne` admits everything: a punctured line is not
    /// expressible as one interval.
    pub fn satisfying(pred: Predicate, bound: &Self) -> Self {
        if bound.is_empty() {
            return Self::empty();
        }
        match pred {
            Predicate::Slt => Interval::from_bounds(Bound::NegInf, bound.hi().pred()),
            Predicate::Sle => Interval::from_bounds(Bound::NegInf, bound.hi()),
            Predicate::Sgt => Interval::from_bounds(bound.lo().succ(), Bound::PosInf),
            Predicate::Sge => Interval::from_bounds(bound.lo(), Bound::PosInf),
            Predicate::Eq => *bound,
            Predicate::Ne => Self::full(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_round_trips() {
        for p in [
            Predicate::Eq,
            Predicate::Ne,
            Predicate::Slt,
            Predicate::Sle,
            Predicate::Sgt,
            Predicate::Sge,
        ] {
            assert_eq!(p.negate().negate(), p);
            assert_eq!(p.swap().swap(), p);
        }
    }

    #[test]
    fn decide_disjoint_ranges() {
        let a = Interval::new(0, 5);
        let b = Interval::new(10, 20);
        assert_eq!(a.decide(Predicate::Slt, &b), Some(true));
        assert_eq!(b.decide(Predicate::Slt, &a), Some(false));
        assert_eq!(a.decide(Predicate::Eq, &b), Some(false));
        assert_eq!(a.decide(Predicate::Ne, &b), Some(true));
        assert_eq!(a.decide(Predicate::Slt, &Interval::new(3, 4)), None);
    }

    #[test]
    fn decide_singletons() {
        let c = Interval::constant(7);
        assert_eq!(c.decide(Predicate::Eq, &Interval::constant(7)), Some(true));
        assert_eq!(c.decide(Predicate::Sle, &Interval::constant(7)), Some(true));
        assert_eq!(c.decide(Predicate::Slt, &Interval::constant(7)), Some(false));
    }

    #[test]
    fn satisfying_strict_bounds_step_inward() {
        let b = Interval::new(1, 50);
        assert_eq!(
            Interval::satisfying(Predicate::Slt, &b),
            Interval::half_above(49)
        );
        assert_eq!(
            Interval::satisfying(Predicate::Sge, &b),
            Interval::half_below(1)
        );
        assert_eq!(Interval::satisfying(Predicate::Eq, &b), b);
        assert!(Interval::satisfying(Predicate::Ne, &b).is_max_range());
    }
}
