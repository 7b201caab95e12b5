//! The function: arenas for values, instructions and blocks, plus the
//! control-flow queries the analysis needs.

use fxhash::FxHashMap;
use smallvec::SmallVec;
use tarn_interval::Width;

use crate::arena::Arena;
use crate::inst::{InstData, InstKind, ValueData, ValueKind};
use crate::{identifier, Inst, Value};

identifier! {
    /// A basic block.
    struct Block, "bb"
}

/// Straight-line instruction list plus a terminator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockData {
    pub insts: Vec<Inst>,
    pub terminator: Option<Inst>,
}

/// A function in SSA form. Owns every value, instruction and block;
/// everything else refers to them by id.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    pub(crate) values: Arena<ValueData, Value>,
    pub(crate) insts: Arena<InstData, Inst>,
    pub(crate) blocks: Arena<BlockData, Block>,
    pub(crate) layout: Vec<Block>,
    pub(crate) args: Vec<Value>,
    pub(crate) constants: FxHashMap<(i128, Width), Value>,
}

impl Function {
    pub(crate) fn new(name: &str) -> Self {
        Function {
            name: name.to_string(),
            values: Arena::default(),
            insts: Arena::default(),
            blocks: Arena::default(),
            layout: Vec::new(),
            args: Vec::new(),
            constants: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry block. Panics on a function with no blocks.
    pub fn entry(&self) -> Block {
        self.layout[0]
    }

    /// Blocks in layout order, entry first.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.layout.iter().copied()
    }

    pub fn num_blocks(&self) -> usize {
        self.layout.len()
    }

    pub fn block(&self, b: Block) -> &BlockData {
        &self.blocks[b]
    }

    /// All instructions of a block, terminator last.
    pub fn block_insts(&self, b: Block) -> impl Iterator<Item = Inst> + '_ {
        let data = &self.blocks[b];
        data.insts.iter().copied().chain(data.terminator)
    }

    pub fn inst(&self, i: Inst) -> &InstData {
        &self.insts[i]
    }

    /// Mutable instruction access, used by the refinement-insertion pass.
    pub fn inst_mut(&mut self, i: Inst) -> &mut InstData {
        &mut self.insts[i]
    }

    pub fn value(&self, v: Value) -> &ValueData {
        &self.values[v]
    }

    /// All values in allocation order.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.values.ids()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn value_width(&self, v: Value) -> Width {
        self.values[v].width
    }

    /// The constant payload of a value, if it is one.
    pub fn constant_value(&self, v: Value) -> Option<i128> {
        match self.values[v].kind {
            ValueKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// The unique defining instruction; `None` for arguments and constants.
    pub fn defining_inst(&self, v: Value) -> Option<Inst> {
        match self.values[v].kind {
            ValueKind::Result(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn successors(&self, b: Block) -> SmallVec<[Block; 2]> {
        match self.blocks[b].terminator {
            Some(t) => self.insts[t].kind.successors(),
            None => SmallVec::new(),
        }
    }

    /// Predecessor lists for every block, in layout order.
    pub fn predecessors(&self) -> FxHashMap<Block, SmallVec<[Block; 2]>> {
        let mut preds: FxHashMap<Block, SmallVec<[Block; 2]>> = FxHashMap::default();
        for b in self.blocks() {
            preds.entry(b).or_default();
        }
        for b in self.blocks() {
            for succ in self.successors(b) {
                preds.entry(succ).or_default().push(b);
            }
        }
        preds
    }

    /// Blocks in reverse postorder from the entry. Unreachable blocks are
    /// absent.
    pub fn reverse_postorder(&self) -> Vec<Block> {
        let mut postorder = Vec::with_capacity(self.layout.len());
        let mut visited = vec![false; self.blocks.len()];
        // Iterative DFS; the second stack entry marks "children done".
        let mut stack = vec![(self.entry(), false)];
        while let Some((block, done)) = stack.pop() {
            if done {
                postorder.push(block);
                continue;
            }
            let seen = &mut visited[crate::arena::Id::from(block).raw()];
            if *seen {
                continue;
            }
            *seen = true;
            stack.push((block, true));
            for succ in self.successors(block) {
                if !visited[crate::arena::Id::from(succ).raw()] {
                    stack.push((succ, false));
                }
            }
        }
        postorder.reverse();
        postorder
    }

    /// The width the analysis runs at: the maximum width of any integer
    /// value in the function. Defaults to 32 bits for a function with no
    /// values.
    pub fn max_width(&self) -> Width {
        self.values
            .iter()
            .map(|(_, data)| data.width)
            .max()
            .unwrap_or(Width::W32)
    }

    /// A printable name for diagnostics: the value's name if it has one,
    /// its id otherwise.
    pub fn display_value(&self, v: Value) -> String {
        match &self.values[v].name {
            Some(name) => format!("%{name}"),
            None => format!("%{}", crate::arena::Id::from(v).raw()),
        }
    }

    // ------------------------------------------------------------------
    // Mutation used by refinement insertion
    // ------------------------------------------------------------------

    /// Insert a sigma copy of `operand` at the top of `block` (after any
    /// leading phis), returning the instruction and its freshly minted
    /// result value.
    pub fn insert_sigma(
        &mut self,
        block: Block,
        operand: Value,
        name: Option<String>,
    ) -> (Inst, Value) {
        let width = self.values[operand].width;
        let inst = self.insts.next_id();
        let result = self.values.alloc(ValueData {
            width,
            kind: ValueKind::Result(inst),
            name,
        });
        let allocated = self.insts.alloc(InstData {
            block,
            kind: InstKind::Sigma { operand, result },
        });
        debug_assert_eq!(allocated, inst);
        let at = self.blocks[block]
            .insts
            .iter()
            .take_while(|i| self.insts[**i].kind.is_phi())
            .count();
        self.blocks[block].insts.insert(at, inst);
        (inst, result)
    }

    /// Rewrite non-phi uses of `from` into `to` inside `inst`.
    pub fn replace_uses_in(&mut self, inst: Inst, from: Value, to: Value) {
        self.insts[inst].kind.replace_uses(from, to);
    }
}
