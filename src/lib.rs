//! Integer range analysis for an SSA-form IR.
//!
//! `tarn` assigns to every integer value of a function a sound interval
//! `[lo, hi]` over an extended integer line with explicit infinities. The
//! workspace splits along the natural seams:
//!
//! - [`interval`] — the interval domain: saturating arithmetic transfer
//!   functions, lattice operations, widening and narrowing.
//! - [`ir`] — the arena-allocated SSA IR the analysis consumes, with a
//!   builder, verifier and dominator tree.
//! - [`analysis`] — extended-SSA refinement copies, the constraint graph,
//!   strongly-connected-component enumeration and the fixed-point solver.
//!
//! ```
//! use tarn::analysis::RangeAnalysis;
//! use tarn::interval::{Interval, Predicate, Width};
//! use tarn::ir::{BinaryOp, FunctionBuilder};
//!
//! // if (i < 10) { a = i + 1 }
//! let mut b = FunctionBuilder::new("refine");
//! let i = b.arg(Width::W32, "i");
//! let entry = b.block();
//! let then = b.block();
//! let other = b.block();
//! b.switch_to(entry);
//! let ten = b.constant(10, Width::W32);
//! let one = b.constant(1, Width::W32);
//! let c = b.cmp(Predicate::Slt, i, ten);
//! b.cond_br(c, then, other);
//! b.switch_to(then);
//! let a = b.binary(BinaryOp::Add, i, one);
//! b.ret(Some(a));
//! b.switch_to(other);
//! b.ret(Some(i));
//! let mut func = b.finish().unwrap();
//!
//! let result = RangeAnalysis::new().run(&mut func);
//! assert_eq!(result.interval(a), Interval::half_above(10));
//! ```

pub use tarn_analysis as analysis;
pub use tarn_interval as interval;
pub use tarn_ir as ir;
