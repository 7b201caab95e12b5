//! Interval range analysis over the SSA IR.
//!
//! The pipeline: insert sigma refinement copies on comparison-guarded
//! branch edges, build the constraint graph, enumerate its strongly
//! connected components, then solve each component with widening followed
//! by narrowing. The result maps every integer value of the function to a
//! sound interval.
//!
//! ```
//! use tarn_analysis::RangeAnalysis;
//! use tarn_interval::{Interval, Predicate, Width};
//! use tarn_ir::{BinaryOp, FunctionBuilder};
//!
//! // y = 5; z = y * y - 1
//! let mut b = FunctionBuilder::new("example");
//! b.block();
//! let y = b.constant(5, Width::W32);
//! let one = b.constant(1, Width::W32);
//! let sq = b.binary(BinaryOp::Mul, y, y);
//! let z = b.binary(BinaryOp::Sub, sq, one);
//! b.ret(Some(z));
//! let mut func = b.finish().unwrap();
//!
//! let result = RangeAnalysis::new().run(&mut func);
//! assert_eq!(result.interval(z), Interval::constant(24));
//! ```

mod essa;
mod graph;
mod scc;
mod solver;

pub use essa::{insert_sigma_nodes, BranchRefinement, SigmaConstraints};
pub use graph::{BinaryKind, Constraint, ConstraintGraph, OpId, OpKind, Operation, UnaryKind, VarNode};
pub use scc::strongly_connected_components;

use fxhash::FxHashMap;
use tarn_interval::{Interval, Width};
use tarn_ir::{Function, Value};
use tracing::debug;

/// The analysis entry point.
///
/// Narrowing is enabled by default; disabling it keeps the coarser
/// post-widening intervals.
#[derive(Clone, Copy, Debug)]
pub struct RangeAnalysis {
    narrowing: bool,
}

impl RangeAnalysis {
    pub fn new() -> Self {
        RangeAnalysis { narrowing: true }
    }

    pub fn with_narrowing(mut self, enabled: bool) -> Self {
        self.narrowing = enabled;
        self
    }

    /// Analyze one function. The function is rewritten into extended SSA
    /// (sigma copies on refined branch edges) as a side effect, so the
    /// result also covers the inserted copies.
    pub fn run(&self, func: &mut Function) -> AnalysisResult {
        let sigma = essa::insert_sigma_nodes(func);
        debug!(
            function = func.name(),
            sigmas = sigma.len(),
            "running range analysis"
        );
        let mut graph = ConstraintGraph::build(func, &sigma);
        graph.find_intervals(self.narrowing);
        AnalysisResult::from_graph(&graph)
    }
}

impl Default for RangeAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

/// The computed interval for every integer value of one function.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    width: Width,
    intervals: FxHashMap<Value, Interval>,
}

impl AnalysisResult {
    fn from_graph(graph: &ConstraintGraph) -> Self {
        AnalysisResult {
            width: graph.width(),
            intervals: graph.values().map(|v| (v, graph.interval(v))).collect(),
        }
    }

    /// The width the analysis ran at.
    pub fn width(&self) -> Width {
        self.width
    }

    /// The interval of a value. Values the analysis never saw (nothing
    /// defines or uses them) are unconstrained.
    pub fn interval(&self, v: Value) -> Interval {
        self.intervals
            .get(&v)
            .copied()
            .unwrap_or_else(Interval::full)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Value, Interval)> + '_ {
        self.intervals.iter().map(|(v, itv)| (*v, *itv))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
