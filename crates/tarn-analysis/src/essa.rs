//! Extended-SSA construction.
//!
//! For every conditional branch controlled by an integer comparison, a
//! sigma copy of each compared variable is inserted at the entry of the
//! true and false targets, and every use dominated by a target is rewritten
//! to the copy. The copy's path constraint is the interval satisfying the
//! comparison on that side: concrete when the other operand is a constant,
//! symbolic (resolved later against the bound's computed interval) when it
//! is a variable.

use fxhash::FxHashMap;
use tarn_interval::{Interval, Predicate};
use tarn_ir::{Block, DominatorTree, Function, Inst, InstKind, Value};
use tracing::debug;

use crate::graph::Constraint;

/// Path constraints attached to the sigma instructions of a function.
#[derive(Debug, Default)]
pub struct SigmaConstraints {
    constraints: FxHashMap<Inst, Constraint>,
}

impl SigmaConstraints {
    pub fn get(&self, inst: Inst) -> Option<&Constraint> {
        self.constraints.get(&inst)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

struct BranchSite {
    pred: Predicate,
    lhs: Value,
    rhs: Value,
    true_target: Block,
    false_target: Block,
}

/// The two sides of one branch refinement for one compared operand.
#[derive(Debug, Clone, Copy)]
pub struct BranchRefinement {
    pub on_true: Constraint,
    pub on_false: Constraint,
}

impl BranchRefinement {
    /// The refinement of `operand` under `operand pred other`: concrete
    /// intervals against a constant, a symbolic pair against a variable.
    fn new(func: &Function, pred: Predicate, other: Value) -> Self {
        match func.constant_value(other) {
            Some(k) => {
                let bound = Interval::constant(k);
                BranchRefinement {
                    on_true: Constraint::Basic(Interval::satisfying(pred, &bound)),
                    on_false: Constraint::Basic(Interval::satisfying(pred.negate(), &bound)),
                }
            }
            None => BranchRefinement {
                on_true: Constraint::Symbolic { bound: other, pred },
                on_false: Constraint::Symbolic {
                    bound: other,
                    pred: pred.negate(),
                },
            },
        }
    }

    fn side(&self, on_true: bool) -> Constraint {
        if on_true {
            self.on_true
        } else {
            self.on_false
        }
    }
}

/// Insert sigma copies for every comparison-guarded branch and return the
/// constraints attached to them.
pub fn insert_sigma_nodes(func: &mut Function) -> SigmaConstraints {
    let dom = DominatorTree::compute(func);
    let preds = func.predecessors();
    let branch_blocks: Vec<Block> = func.blocks().collect();

    let mut out = SigmaConstraints::default();
    for block in branch_blocks {
        // Read the site from the current function state: an earlier
        // refinement may have rewritten this comparison's operands, and
        // the copies must chain off the rewritten values.
        let Some(site) = branch_site(func, block) else {
            continue;
        };
        for (operand, other) in [(site.lhs, site.rhs), (site.rhs, site.lhs)] {
            if func.constant_value(operand).is_some() {
                continue;
            }
            let pred = if operand == site.rhs {
                site.pred.swap()
            } else {
                site.pred
            };
            let refinement = BranchRefinement::new(func, pred, other);
            for (target, on_true) in [(site.true_target, true), (site.false_target, false)] {
                // A sigma is only the unique definition on this edge when
                // the target has the branch block as sole predecessor.
                if preds[&target].len() != 1 {
                    continue;
                }
                let name = sigma_name(func, operand, on_true);
                let (inst, copy) = func.insert_sigma(target, operand, name);
                rewrite_dominated_uses(func, &dom, operand, copy, target, inst);
                out.constraints.insert(inst, refinement.side(on_true));
            }
        }
    }
    debug!(sigmas = out.len(), "sigma insertion finished");
    out
}

fn branch_site(func: &Function, block: Block) -> Option<BranchSite> {
    let term = func.block(block).terminator?;
    let &InstKind::CondBranch {
        condition,
        true_target,
        false_target,
    } = &func.inst(term).kind
    else {
        return None;
    };
    let def = func.defining_inst(condition)?;
    let &InstKind::Cmp { pred, lhs, rhs, .. } = &func.inst(def).kind else {
        return None;
    };
    Some(BranchSite {
        pred,
        lhs,
        rhs,
        true_target,
        false_target,
    })
}

fn sigma_name(func: &Function, operand: Value, on_true: bool) -> Option<String> {
    let suffix = if on_true { "t" } else { "f" };
    func.value(operand)
        .name
        .as_ref()
        .map(|n| format!("{n}.{suffix}"))
}

/// Rewrite uses of `from` into `to` in every location dominated by
/// `target`. Phi uses live on their incoming edge, so they are judged by
/// the predecessor block carrying the edge.
fn rewrite_dominated_uses(
    func: &mut Function,
    dom: &DominatorTree,
    from: Value,
    to: Value,
    target: Block,
    sigma: Inst,
) {
    let all_insts: Vec<Inst> = func
        .blocks()
        .flat_map(|b| func.block_insts(b).collect::<Vec<_>>())
        .collect();
    for inst in all_insts {
        if inst == sigma {
            continue;
        }
        let block = func.inst(inst).block;
        if func.inst(inst).kind.is_phi() {
            if let InstKind::Phi { incoming, .. } = &mut func.inst_mut(inst).kind {
                for (pred_block, value) in incoming.iter_mut() {
                    if *value == from && dom.dominates(target, *pred_block) {
                        *value = to;
                    }
                }
            }
        } else if dom.dominates(target, block) {
            func.replace_uses_in(inst, from, to);
        }
    }
}
