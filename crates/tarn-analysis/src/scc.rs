//! Nuutila's variant of Tarjan's strongly-connected-component algorithm
//! over the constraint graph.
//!
//! Arcs follow the use map: variable → operations reading it → their
//! sinks. Before the traversal, transient control-dependence edges connect
//! every symbolic bound to the operations it constrains, so that a bound
//! and its dependents land in compatible component order; the edges are
//! removed again right after.

use fxhash::{FxHashMap, FxHashSet};
use tarn_ir::Value;
use tracing::debug;

use crate::graph::ConstraintGraph;

/// Enumerate components in reverse topological order: components with no
/// dependencies first, dependents after everything they read.
pub fn strongly_connected_components(graph: &mut ConstraintGraph) -> Vec<Vec<Value>> {
    graph.add_control_dependence_edges();
    let components = Nuutila::run(graph);
    graph.remove_control_dependence_edges();
    components
}

struct Nuutila {
    index: i64,
    dfs: FxHashMap<Value, i64>,
    root: FxHashMap<Value, Value>,
    in_component: FxHashSet<Value>,
    components: FxHashMap<Value, Vec<Value>>,
    /// Component roots in completion order; reversed at the end.
    worklist: Vec<Value>,
    stack: Vec<Value>,
}

struct Frame {
    value: Value,
    successors: Vec<Value>,
    next: usize,
}

impl Nuutila {
    fn run(graph: &ConstraintGraph) -> Vec<Vec<Value>> {
        let mut values: Vec<Value> = graph.values().collect();
        values.sort();

        let mut n = Nuutila {
            index: 0,
            dfs: values.iter().map(|v| (*v, -1)).collect(),
            root: FxHashMap::default(),
            in_component: FxHashSet::default(),
            components: FxHashMap::default(),
            worklist: Vec::new(),
            stack: Vec::new(),
        };

        for v in &values {
            if n.dfs[v] < 0 {
                n.visit(graph, *v);
            }
        }

        let components: Vec<Vec<Value>> = n
            .worklist
            .iter()
            .rev()
            .map(|root| n.components.remove(root).expect("root without component"))
            .collect();
        debug!(
            vars = values.len(),
            sccs = components.len(),
            "component enumeration finished"
        );
        components
    }

    /// Iterative depth-first search. The explicit frame stack mirrors the
    /// recursion of the textbook formulation; a child's root is folded into
    /// its parent when the child's frame completes.
    fn visit(&mut self, graph: &ConstraintGraph, start: Value) {
        let mut call_stack = vec![self.push_frame(graph, start)];

        while let Some(frame) = call_stack.last_mut() {
            if frame.next < frame.successors.len() {
                let succ = frame.successors[frame.next];
                frame.next += 1;
                let parent = frame.value;
                if self.dfs[&succ] < 0 {
                    call_stack.push(self.push_frame(graph, succ));
                } else {
                    self.fold_root(parent, succ);
                }
            } else {
                let value = frame.value;
                call_stack.pop();
                if let Some(parent) = call_stack.last() {
                    self.fold_root(parent.value, value);
                }
                self.finish(value);
            }
        }
    }

    fn push_frame(&mut self, graph: &ConstraintGraph, value: Value) -> Frame {
        self.dfs.insert(value, self.index);
        self.index += 1;
        self.root.insert(value, value);

        let mut successors: Vec<Value> = graph.use_map[&value]
            .iter()
            .map(|op| graph.operation(*op).sink)
            .collect();
        successors.sort();
        successors.dedup();
        Frame {
            value,
            successors,
            next: 0,
        }
    }

    /// `root[v] = root[w]` when `w`'s root was reached earlier and `w` is
    /// still on the open path.
    fn fold_root(&mut self, v: Value, w: Value) {
        if !self.in_component.contains(&w) && self.dfs[&self.root[&v]] >= self.dfs[&self.root[&w]] {
            let new_root = self.root[&w];
            self.root.insert(v, new_root);
        }
    }

    fn finish(&mut self, value: Value) {
        if self.root[&value] == value {
            self.worklist.push(value);
            let mut component = vec![value];
            self.in_component.insert(value);
            while let Some(&top) = self.stack.last() {
                if self.dfs[&top] > self.dfs[&value] {
                    self.stack.pop();
                    self.in_component.insert(top);
                    component.push(top);
                } else {
                    break;
                }
            }
            component.sort();
            self.components.insert(value, component);
        } else {
            self.stack.push(value);
        }
    }
}
