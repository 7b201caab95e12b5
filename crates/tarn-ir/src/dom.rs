//! Dominator tree, computed with the iterative two-finger algorithm over
//! reverse postorder.

use fxhash::FxHashMap;

use crate::{Block, Function};

#[derive(Debug)]
pub struct DominatorTree {
    idom: FxHashMap<Block, Block>,
    rpo_index: FxHashMap<Block, usize>,
    entry: Block,
}

impl DominatorTree {
    pub fn compute(func: &Function) -> Self {
        let rpo = func.reverse_postorder();
        let rpo_index: FxHashMap<Block, usize> =
            rpo.iter().enumerate().map(|(i, b)| (*b, i)).collect();
        let preds = func.predecessors();
        let entry = func.entry();

        let mut idom: FxHashMap<Block, Block> = FxHashMap::default();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let mut new_idom: Option<Block> = None;
                for &pred in preds[&block].iter() {
                    // Only predecessors that already have a dominator (and
                    // are reachable at all) participate.
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(other) => intersect(&idom, &rpo_index, pred, other),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&block) != Some(&new_idom) {
                        idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }

        DominatorTree {
            idom,
            rpo_index,
            entry,
        }
    }

    /// Immediate dominator; `None` for the entry and unreachable blocks.
    pub fn idom(&self, block: Block) -> Option<Block> {
        if block == self.entry {
            return None;
        }
        self.idom.get(&block).copied()
    }

    pub fn is_reachable(&self, block: Block) -> bool {
        self.rpo_index.contains_key(&block)
    }

    /// Reflexive dominance: `a` dominates `b`.
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut cursor = b;
        loop {
            if cursor == a {
                return true;
            }
            if cursor == self.entry {
                return false;
            }
            cursor = self.idom[&cursor];
        }
    }
}

fn intersect(
    idom: &FxHashMap<Block, Block>,
    rpo_index: &FxHashMap<Block, usize>,
    mut a: Block,
    mut b: Block,
) -> Block {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}
