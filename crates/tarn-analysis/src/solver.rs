//! The per-component fixed-point solver.
//!
//! Components are processed in reverse topological order. Inside one
//! component the solver runs a widening worklist to a post-fixed point,
//! resolves symbolic constraints against the now-stable bounds, then runs
//! a narrowing worklist to pull infinite endpoints back in. Finally every
//! operation leaving the component is evaluated once to seed the
//! components downstream.

use fxhash::{FxHashMap, FxHashSet};
use tarn_interval::{AbstractDomain, Interval};
use tarn_ir::Value;
use tracing::{debug, trace};

use crate::graph::{Constraint, ConstraintGraph, OpId};
use crate::scc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Meet {
    Widen,
    Narrow,
}

impl ConstraintGraph {
    /// Run the analysis to completion. With `narrowing` disabled the
    /// post-widening result is kept (symbolic constraints still resolve,
    /// but widened infinities are not pulled back in).
    pub fn find_intervals(&mut self, narrowing: bool) {
        let components = scc::strongly_connected_components(self);
        debug!(components = components.len(), "solving");
        for component in &components {
            self.solve_component(component, narrowing);
        }
    }

    fn solve_component(&mut self, component: &[Value], narrowing: bool) {
        let members: FxHashSet<Value> = component.iter().copied().collect();
        let local_use = self.component_use_map(&members);
        let seeds = self.entry_points(component, &members);
        trace!(?component, ?seeds, "widening");
        self.update(&local_use, seeds.clone(), Meet::Widen);

        let resolved = self.fix_intersects(component);
        if narrowing {
            let mut seeds = seeds;
            seeds.extend(resolved);
            seeds.sort();
            seeds.dedup();
            trace!(?component, "narrowing");
            self.update(&local_use, seeds, Meet::Narrow);
        }

        self.propagate_to_next_scc(&members, component);
    }

    /// The restriction of the use map to operations whose sink stays in
    /// the component: propagation during widening and narrowing never
    /// leaves the component.
    fn component_use_map(&self, members: &FxHashSet<Value>) -> FxHashMap<Value, Vec<OpId>> {
        let mut local: FxHashMap<Value, Vec<OpId>> = FxHashMap::default();
        for &v in members {
            let mut ops: Vec<OpId> = self.use_map[&v]
                .iter()
                .copied()
                .filter(|op| members.contains(&self.operation(*op).sink))
                .collect();
            ops.sort();
            local.insert(v, ops);
        }
        local
    }

    /// Worklist seeds: members whose defining operation reads a value
    /// outside the component, plus members that already carry an interval
    /// (constants, and sinks seeded by an upstream component).
    fn entry_points(&self, component: &[Value], members: &FxHashSet<Value>) -> Vec<Value> {
        let mut seeds: Vec<Value> = component
            .iter()
            .copied()
            .filter(|v| {
                if !self.interval(*v).is_empty() {
                    return true;
                }
                match self.def_map.get(v) {
                    Some(op) => self
                        .operation(*op)
                        .sources()
                        .iter()
                        .any(|src| !members.contains(src)),
                    None => true,
                }
            })
            .collect();
        seeds.sort();
        seeds
    }

    fn update(&mut self, local_use: &FxHashMap<Value, Vec<OpId>>, seeds: Vec<Value>, meet: Meet) {
        let mut worklist = seeds;
        while let Some(v) = worklist.pop() {
            let Some(ops) = local_use.get(&v) else {
                continue;
            };
            for &op in ops {
                let changed = match meet {
                    Meet::Widen => self.widen(op),
                    Meet::Narrow => self.narrow(op),
                };
                if changed {
                    worklist.push(self.operation(op).sink);
                }
            }
        }
    }

    /// One widening step on an operation's sink. A still-growing bound is
    /// pushed to infinity so that each variable changes at most three
    /// times per side.
    fn widen(&mut self, op: OpId) -> bool {
        let evaluated = self.eval(op);
        let sink = self.operation(op).sink;
        let old = self.interval(sink);
        let updated = old.widen(&evaluated);
        if updated == old {
            return false;
        }
        trace!(?sink, %old, %updated, "widen");
        self.vars.get_mut(&sink).expect("sink var").interval = updated;
        true
    }

    /// One narrowing step: only infinite endpoints move, and only inward.
    fn narrow(&mut self, op: OpId) -> bool {
        let evaluated = self.eval(op);
        let sink = self.operation(op).sink;
        let old = self.interval(sink);
        let updated = old.narrow(&evaluated);
        if updated == old {
            return false;
        }
        trace!(?sink, %old, %updated, "narrow");
        self.vars.get_mut(&sink).expect("sink var").interval = updated;
        true
    }

    /// Replace every symbolic constraint on an operation in the component
    /// with the concrete interval obtained from the bound's (now final)
    /// interval, and meet it into the sink immediately so that singleton
    /// components observe it too. Returns the affected sinks.
    fn fix_intersects(&mut self, component: &[Value]) -> Vec<Value> {
        let mut resolved = Vec::new();
        for &v in component {
            let Some(&op_id) = self.def_map.get(&v) else {
                continue;
            };
            let Constraint::Symbolic { bound, pred } = self.operation(op_id).intersect else {
                continue;
            };
            let concrete = Interval::satisfying(pred, &self.interval(bound));
            trace!(?v, ?bound, %concrete, "resolved symbolic constraint");
            self.oprs[op_id.0].intersect = Constraint::Basic(concrete);
            let met = self.interval(v).intersect_with(&concrete);
            self.vars.get_mut(&v).expect("sink var").interval = met;
            resolved.push(v);
        }
        resolved
    }

    /// Evaluate every operation that reads the finished component and
    /// writes outside it, seeding the downstream components.
    fn propagate_to_next_scc(&mut self, members: &FxHashSet<Value>, component: &[Value]) {
        let mut crossing: Vec<OpId> = Vec::new();
        for &v in component {
            for &op in self.use_map[&v].iter() {
                if !members.contains(&self.operation(op).sink) {
                    crossing.push(op);
                }
            }
        }
        crossing.sort();
        crossing.dedup();
        for op in crossing {
            let sink = self.operation(op).sink;
            let evaluated = self.eval(op);
            trace!(?sink, %evaluated, "cross-component propagation");
            self.vars.get_mut(&sink).expect("sink var").interval = evaluated;
        }
    }
}
