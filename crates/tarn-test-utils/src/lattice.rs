//! Assertion helpers for lattice and widening/narrowing algebraic laws.
//!
//! Violations over the given sample elements are collected into a single
//! combined report so a broken implementation shows every failing law at
//! once.

use std::fmt::{Debug, Write};

use tarn_interval::{AbstractDomain, HasBottom, HasTop, Lattice};

fn report(violations: Vec<String>) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{} lattice law violation(s):\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(msg, "  {}. {}", i + 1, v);
    }
    panic!("{msg}");
}

/// Check join/meet laws, absorption, ordering consistency, and the bottom
/// and top element laws over the given elements. Bottom and top are tested
/// in addition to the provided sample.
pub fn assert_lattice_laws<L>(elements: &[L])
where
    L: HasBottom + HasTop + PartialEq + Debug,
{
    let mut v = Vec::new();

    for a in elements {
        if a.join(a) != *a {
            v.push(format!("join not idempotent for {a:?}"));
        }
        if a.meet(a) != *a {
            v.push(format!("meet not idempotent for {a:?}"));
        }
        for b in elements {
            if a.join(b) != b.join(a) {
                v.push(format!("join not commutative for {a:?}, {b:?}"));
            }
            if a.meet(b) != b.meet(a) {
                v.push(format!("meet not commutative for {a:?}, {b:?}"));
            }
            if a.join(&a.meet(b)) != *a || a.meet(&a.join(b)) != *a {
                v.push(format!("absorption violated for {a:?}, {b:?}"));
            }
            let sub = a.is_subseteq(b);
            if sub != (a.join(b) == *b) || sub != (a.meet(b) == *a) {
                v.push(format!(
                    "ordering inconsistent with join/meet for {a:?}, {b:?}"
                ));
            }
            for c in elements {
                if a.join(b).join(c) != a.join(&b.join(c)) {
                    v.push(format!("join not associative for {a:?}, {b:?}, {c:?}"));
                }
                if a.meet(b).meet(c) != a.meet(&b.meet(c)) {
                    v.push(format!("meet not associative for {a:?}, {b:?}, {c:?}"));
                }
            }
        }
    }

    let bot = L::bottom();
    let top = L::top();
    for x in elements {
        if !bot.is_subseteq(x) || bot.join(x) != *x || bot.meet(x) != bot {
            v.push(format!("bottom laws violated against {x:?}"));
        }
        if !x.is_subseteq(&top) || top.join(x) != top || top.meet(x) != *x {
            v.push(format!("top laws violated against {x:?}"));
        }
    }

    report(v);
}

/// Check the widening and narrowing contracts over the given elements:
/// widening covers both arguments, narrowing stays between the meet and
/// the first argument.
pub fn assert_widening_laws<L>(elements: &[L])
where
    L: AbstractDomain + Clone + PartialEq + Debug,
{
    let mut v = Vec::new();
    for x in elements {
        for y in elements {
            let w = x.widen(y);
            if !x.is_subseteq(&w) || !y.is_subseteq(&w) {
                v.push(format!("widen does not cover its arguments: {x:?}, {y:?}"));
            }
            let n = x.narrow(y);
            if !x.meet(y).is_subseteq(&n) {
                v.push(format!("narrow below meet for {x:?}, {y:?}"));
            }
            if !n.is_subseteq(x) {
                v.push(format!("narrow enlarges its subject for {x:?}, {y:?}"));
            }
        }
    }
    report(v);
}
