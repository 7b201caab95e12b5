//! The constraint graph: one node per SSA variable, one operation per
//! instruction, plus the def/use/symbolic maps the solver walks.

use fxhash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tarn_interval::{HasTop, Interval, Lattice, Predicate, Width};
use tarn_ir::{Function, InstKind, UnaryOp, Value};
use tracing::trace;

use crate::essa::SigmaConstraints;

/// Index of an operation in the graph's operation table.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct OpId(pub(crate) usize);

/// The interval intersected into an operation's result.
///
/// A symbolic constraint refers to the interval of another variable through
/// a comparison predicate; it behaves as the maximal interval until the
/// solver resolves it in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    Basic(Interval),
    Symbolic { bound: Value, pred: Predicate },
}

impl Constraint {
    pub fn as_interval(&self) -> Interval {
        match self {
            Constraint::Basic(itv) => *itv,
            Constraint::Symbolic { .. } => Interval::full(),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Constraint::Symbolic { .. })
    }
}

/// Unary transfers, with the width bookkeeping casts need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryKind {
    Copy,
    Neg,
    Trunc(Width),
    Sext,
    Zext { from: Width },
}

/// Binary transfers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Srem,
    Urem,
    Shl,
    Lshr,
    Ashr,
    And,
    Or,
    Xor,
}

/// The four operation shapes of the graph. `ControlDep` is synthetic: it
/// exists only while strongly connected components are being enumerated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpKind {
    Unary {
        op: UnaryKind,
        source: Value,
    },
    Binary {
        op: BinaryKind,
        lhs: Value,
        rhs: Value,
    },
    Cmp {
        pred: Predicate,
        lhs: Value,
        rhs: Value,
    },
    Phi {
        sources: SmallVec<[Value; 2]>,
    },
    ControlDep {
        source: Value,
    },
}

/// A constraint: `sink = kind(sources) ∩ intersect`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub sink: Value,
    pub intersect: Constraint,
}

impl Operation {
    pub fn sources(&self) -> SmallVec<[Value; 2]> {
        match &self.kind {
            OpKind::Unary { source, .. } | OpKind::ControlDep { source } => {
                SmallVec::from_slice(&[*source])
            }
            OpKind::Binary { lhs, rhs, .. } | OpKind::Cmp { lhs, rhs, .. } => {
                SmallVec::from_slice(&[*lhs, *rhs])
            }
            OpKind::Phi { sources } => sources.clone(),
        }
    }
}

/// One SSA variable and its interval as currently known.
#[derive(Clone, Debug)]
pub struct VarNode {
    pub value: Value,
    pub interval: Interval,
}

/// The whole graph. Owns the variable nodes and operations; every edge is
/// an id into the two tables.
#[derive(Debug)]
pub struct ConstraintGraph {
    width: Width,
    pub(crate) vars: FxHashMap<Value, VarNode>,
    pub(crate) oprs: Vec<Operation>,
    pub(crate) def_map: FxHashMap<Value, OpId>,
    pub(crate) use_map: FxHashMap<Value, FxHashSet<OpId>>,
    pub(crate) symb_map: FxHashMap<Value, FxHashSet<OpId>>,
}

impl ConstraintGraph {
    /// Build the graph for a function whose sigma copies carry the given
    /// constraints.
    pub fn build(func: &Function, sigma: &SigmaConstraints) -> Self {
        let mut graph = ConstraintGraph {
            width: func.max_width(),
            vars: FxHashMap::default(),
            oprs: Vec::new(),
            def_map: FxHashMap::default(),
            use_map: FxHashMap::default(),
            symb_map: FxHashMap::default(),
        };

        for block in func.blocks() {
            for inst in func.block_insts(block) {
                match &func.inst(inst).kind {
                    &InstKind::Binary { op, lhs, rhs, result } => {
                        let kind = OpKind::Binary {
                            op: binary_kind(op),
                            lhs,
                            rhs,
                        };
                        graph.add_operation(kind, result, Constraint::Basic(Interval::full()));
                    }
                    &InstKind::Unary { op, operand, result } => {
                        let kind = OpKind::Unary {
                            op: unary_kind(op, func, operand, result),
                            source: operand,
                        };
                        graph.add_operation(kind, result, Constraint::Basic(Interval::full()));
                    }
                    &InstKind::Cmp { pred, lhs, rhs, result } => {
                        let kind = OpKind::Cmp { pred, lhs, rhs };
                        graph.add_operation(kind, result, Constraint::Basic(Interval::full()));
                    }
                    InstKind::Phi { incoming, result } => {
                        let kind = OpKind::Phi {
                            sources: incoming.iter().map(|(_, v)| *v).collect(),
                        };
                        graph.add_operation(kind, *result, Constraint::Basic(Interval::full()));
                    }
                    &InstKind::Sigma { operand, result } => {
                        let constraint = sigma
                            .get(inst)
                            .copied()
                            .unwrap_or(Constraint::Basic(Interval::full()));
                        let id = graph.add_operation(
                            OpKind::Unary {
                                op: UnaryKind::Copy,
                                source: operand,
                            },
                            result,
                            constraint,
                        );
                        if let Constraint::Symbolic { bound, .. } = constraint {
                            graph.add_var(bound);
                            graph.symb_map.entry(bound).or_default().insert(id);
                        }
                    }
                    // Control transfer defines nothing; branch conditions
                    // enter the graph through their comparison.
                    InstKind::Branch { .. }
                    | InstKind::CondBranch { .. }
                    | InstKind::Return { .. } => {}
                }
            }
        }

        graph.init_intervals(func);
        // Graph-build invariant: every operation's endpoints are variable
        // nodes, and every defined variable has exactly one defining
        // operation.
        debug_assert!(graph.oprs.iter().all(|op| {
            graph.vars.contains_key(&op.sink)
                && op.sources().iter().all(|s| graph.vars.contains_key(s))
        }));
        debug_assert_eq!(
            graph.def_map.len(),
            graph.oprs.len(),
            "every operation defines a distinct sink"
        );
        graph
    }

    /// The analysis width: the widest integer in the function.
    pub fn width(&self) -> Width {
        self.width
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_operations(&self) -> usize {
        self.oprs.len()
    }

    /// Variable ids in the graph, unordered.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.vars.keys().copied()
    }

    pub fn interval(&self, v: Value) -> Interval {
        self.vars[&v].interval
    }

    pub fn operation(&self, id: OpId) -> &Operation {
        &self.oprs[id.0]
    }

    fn add_var(&mut self, v: Value) {
        self.vars.entry(v).or_insert(VarNode {
            value: v,
            interval: Interval::empty(),
        });
        self.use_map.entry(v).or_default();
    }

    fn add_operation(&mut self, kind: OpKind, sink: Value, intersect: Constraint) -> OpId {
        let id = OpId(self.oprs.len());
        let op = Operation {
            kind,
            sink,
            intersect,
        };
        self.add_var(sink);
        for source in op.sources() {
            self.add_var(source);
            self.use_map.entry(source).or_default().insert(id);
        }
        self.oprs.push(op);
        self.def_map.insert(sink, id);
        id
    }

    /// Starting intervals: constants are singletons, variables with no
    /// defining operation (arguments, anything the graph does not model)
    /// are the maximal interval and stay fixed, everything else is empty
    /// until the solver reaches it.
    fn init_intervals(&mut self, func: &Function) {
        for node in self.vars.values_mut() {
            node.interval = match func.constant_value(node.value) {
                Some(c) => Interval::constant(c),
                None if !self.def_map.contains_key(&node.value) => Interval::top(),
                None => Interval::empty(),
            };
        }
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate an operation against the current variable intervals,
    /// including its intersection constraint (symbolic constraints behave
    /// as the maximal interval until resolved).
    pub fn eval(&self, id: OpId) -> Interval {
        let op = &self.oprs[id.0];
        let w = self.width;
        let val = |v: Value| self.vars[&v].interval;
        let derived = match &op.kind {
            OpKind::Unary { op, source } => {
                let src = val(*source);
                match op {
                    UnaryKind::Copy => src,
                    UnaryKind::Neg => src.neg(w),
                    UnaryKind::Trunc(to) => src.truncate(*to),
                    UnaryKind::Sext => src.sign_extend(w),
                    UnaryKind::Zext { from } => src.zero_extend(*from, w),
                }
            }
            OpKind::Binary { op, lhs, rhs } => {
                let (a, b) = (val(*lhs), val(*rhs));
                match op {
                    BinaryKind::Add => a.add(&b, w),
                    BinaryKind::Sub => a.sub(&b, w),
                    BinaryKind::Mul => a.mul(&b, w),
                    BinaryKind::Sdiv => a.sdiv(&b, w),
                    BinaryKind::Udiv => a.udiv(&b, w),
                    BinaryKind::Srem => a.srem(&b, w),
                    BinaryKind::Urem => a.urem(&b, w),
                    BinaryKind::Shl => a.shl(&b, w),
                    BinaryKind::Lshr => a.lshr(&b, w),
                    BinaryKind::Ashr => a.ashr(&b, w),
                    BinaryKind::And => a.bit_and(&b, w),
                    BinaryKind::Or => a.bit_or(&b, w),
                    BinaryKind::Xor => a.bit_xor(&b, w),
                }
            }
            OpKind::Cmp { pred, lhs, rhs } => {
                let (a, b) = (val(*lhs), val(*rhs));
                if a.is_empty() || b.is_empty() {
                    Interval::empty()
                } else {
                    match a.decide(*pred, &b) {
                        Some(true) => Interval::constant(1),
                        Some(false) => Interval::constant(0),
                        None => Interval::new(0, 1),
                    }
                }
            }
            OpKind::Phi { sources } => sources
                .iter()
                .map(|v| val(*v))
                .fold(Interval::empty(), |acc, itv| acc.join(&itv)),
            OpKind::ControlDep { source } => val(*source),
        };
        derived.intersect_with(&op.intersect.as_interval())
    }

    // ------------------------------------------------------------------
    // Transient control-dependence edges
    // ------------------------------------------------------------------

    /// Add a synthetic edge from every symbolic bound to the sink of each
    /// operation constrained by it, so the component enumeration sees the
    /// dependency.
    pub(crate) fn add_control_dependence_edges(&mut self) {
        let mut bounds: Vec<Value> = self.symb_map.keys().copied().collect();
        bounds.sort();
        for bound in bounds {
            let mut ops: Vec<OpId> = self.symb_map[&bound].iter().copied().collect();
            ops.sort();
            for op in ops {
                let sink = self.oprs[op.0].sink;
                let id = OpId(self.oprs.len());
                trace!(?bound, ?sink, "control dependence edge");
                self.oprs.push(Operation {
                    kind: OpKind::ControlDep { source: bound },
                    sink,
                    intersect: Constraint::Basic(Interval::full()),
                });
                self.use_map.entry(bound).or_default().insert(id);
            }
        }
    }

    /// Remove every synthetic edge added by
    /// [`add_control_dependence_edges`](Self::add_control_dependence_edges).
    pub(crate) fn remove_control_dependence_edges(&mut self) {
        while let Some(op) = self.oprs.last() {
            let &OpKind::ControlDep { source } = &op.kind else {
                break;
            };
            let id = OpId(self.oprs.len() - 1);
            if let Some(uses) = self.use_map.get_mut(&source) {
                uses.remove(&id);
            }
            self.oprs.pop();
        }
    }
}

fn binary_kind(op: tarn_ir::BinaryOp) -> BinaryKind {
    use tarn_ir::BinaryOp::*;
    match op {
        Add => BinaryKind::Add,
        Sub => BinaryKind::Sub,
        Mul => BinaryKind::Mul,
        Sdiv => BinaryKind::Sdiv,
        Udiv => BinaryKind::Udiv,
        Srem => BinaryKind::Srem,
        Urem => BinaryKind::Urem,
        Shl => BinaryKind::Shl,
        Lshr => BinaryKind::Lshr,
        Ashr => BinaryKind::Ashr,
        And => BinaryKind::And,
        Or => BinaryKind::Or,
        Xor => BinaryKind::Xor,
    }
}

fn unary_kind(op: UnaryOp, func: &Function, operand: Value, result: Value) -> UnaryKind {
    match op {
        UnaryOp::Copy => UnaryKind::Copy,
        UnaryOp::Neg => UnaryKind::Neg,
        UnaryOp::Trunc => UnaryKind::Trunc(func.value_width(result)),
        UnaryOp::Sext => UnaryKind::Sext,
        UnaryOp::Zext => UnaryKind::Zext {
            from: func.value_width(operand),
        },
    }
}
