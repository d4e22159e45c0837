use ssair_graph::{EdgeKind, NodeId};

use crate::arena::Handle;
use crate::function::FunctionId;
use crate::instruction::InsnId;
use crate::program::Program;
use crate::types::Operation;

pub type BlockId = Handle<BasicBlock>;

/// Basic block. Instructions form a doubly linked list in which all phis
/// precede the first non-phi: `phi` is the first phi, `entry` the first
/// non-phi and `exit` the last instruction of either kind.
pub struct BasicBlock {
    pub id: i32,
    pub(crate) func: FunctionId,
    pub(crate) cfg: NodeId,
    pub(crate) dom: Option<NodeId>,
    pub(crate) phi: Option<InsnId>,
    pub(crate) entry: Option<InsnId>,
    pub(crate) exit: Option<InsnId>,
    pub(crate) num_insns: usize,
    /// Instruction that records where the divergent paths through this
    /// block join again.
    pub join_at: Option<InsnId>,
    pub(crate) df: Vec<BlockId>,
}

impl BasicBlock {
    pub fn func(&self) -> FunctionId {
        self.func
    }

    pub fn cfg_node(&self) -> NodeId {
        self.cfg
    }

    pub fn dom_node(&self) -> Option<NodeId> {
        self.dom
    }

    pub fn phi(&self) -> Option<InsnId> {
        self.phi
    }

    pub fn entry(&self) -> Option<InsnId> {
        self.entry
    }

    pub fn exit(&self) -> Option<InsnId> {
        self.exit
    }

    pub fn first_insn(&self) -> Option<InsnId> {
        self.phi.or(self.entry)
    }

    pub fn num_insns(&self) -> usize {
        self.num_insns
    }

    pub fn is_empty(&self) -> bool {
        self.num_insns == 0
    }

    /// Dominance frontier computed with the dominator tree.
    pub fn dominance_frontier(&self) -> &[BlockId] {
        &self.df
    }
}

/// Walks the instructions of a block from the first phi to the exit.
pub struct BlockInsns<'a> {
    prog: &'a Program,
    current: Option<InsnId>,
}

impl<'a> Iterator for BlockInsns<'a> {
    type Item = InsnId;

    fn next(&mut self) -> Option<InsnId> {
        let current = self.current?;
        self.current = self.prog.insns[current].next;
        Some(current)
    }
}

impl Program {
    pub fn new_block(&mut self, func: FunctionId) -> BlockId {
        let id = self.functions[func].next_block_id;
        self.functions[func].next_block_id += 1;

        let bb = self.blocks.alloc(BasicBlock {
            id,
            func,
            cfg: NodeId(u32::MAX),
            dom: None,
            phi: None,
            entry: None,
            exit: None,
            num_insns: 0,
            join_at: None,
            df: Vec::new(),
        });

        let function = &mut self.functions[func];
        let node = function.cfg.add_node(bb);
        function.blocks.push(bb);
        self.blocks[bb].cfg = node;
        bb
    }

    pub fn block(&self, bb: BlockId) -> &BasicBlock {
        &self.blocks[bb]
    }

    pub fn block_mut(&mut self, bb: BlockId) -> &mut BasicBlock {
        &mut self.blocks[bb]
    }

    pub fn contains_block(&self, bb: BlockId) -> bool {
        self.blocks.contains(bb)
    }

    pub fn block_insns(&self, bb: BlockId) -> BlockInsns<'_> {
        BlockInsns {
            prog: self,
            current: self.blocks[bb].first_insn(),
        }
    }

    fn claim_insn(&mut self, bb: BlockId, insn: InsnId) {
        let data = &mut self.insns[insn];
        debug_assert!(
            data.next.is_none() && data.prev.is_none() && data.bb.is_none(),
            "instruction %{} is already linked",
            data.id
        );
        data.bb = Some(bb);
        self.blocks[bb].num_insns += 1;
    }

    fn link_first(&mut self, bb: BlockId, insn: InsnId, is_phi: bool) {
        debug_assert!(self.blocks[bb].exit.is_none());
        self.claim_insn(bb, insn);

        let block = &mut self.blocks[bb];
        if is_phi {
            block.phi = Some(insn);
        } else {
            block.entry = Some(insn);
        }
        block.exit = Some(insn);
    }

    /// Inserts at the head of the phi segment for phis, at the head of the
    /// non-phi segment otherwise.
    pub fn insert_head(&mut self, bb: BlockId, insn: InsnId) {
        let is_phi = self.insns[insn].op == Operation::Phi;
        let block = &self.blocks[bb];

        if is_phi {
            match (block.phi, block.entry) {
                (Some(phi), _) => self.insert_before(phi, insn),
                (None, Some(entry)) => self.insert_before(entry, insn),
                (None, None) => self.link_first(bb, insn, true),
            }
        } else {
            match (block.entry, block.exit) {
                (Some(entry), _) => self.insert_before(entry, insn),
                (None, Some(last_phi)) => self.insert_after(last_phi, insn),
                (None, None) => self.link_first(bb, insn, false),
            }
        }
    }

    /// Inserts at the end of the phi segment for phis, at the end of the
    /// block otherwise.
    pub fn insert_tail(&mut self, bb: BlockId, insn: InsnId) {
        let is_phi = self.insns[insn].op == Operation::Phi;
        let block = &self.blocks[bb];

        if is_phi {
            match (block.entry, block.exit) {
                (Some(entry), _) => self.insert_before(entry, insn),
                (None, Some(last_phi)) => self.insert_after(last_phi, insn),
                (None, None) => self.link_first(bb, insn, true),
            }
        } else {
            match block.exit {
                Some(exit) => self.insert_after(exit, insn),
                None => self.link_first(bb, insn, false),
            }
        }
    }

    /// Inserts `p` in front of `q`.
    pub fn insert_before(&mut self, q: InsnId, p: InsnId) {
        let bb = match self.insns[q].bb {
            Some(bb) => bb,
            None => panic!("insert before unlinked instruction %{}", self.insns[q].id),
        };
        let p_is_phi = self.insns[p].op == Operation::Phi;
        debug_assert!(p_is_phi || self.insns[q].op != Operation::Phi, "non-phi before phi");
        self.claim_insn(bb, p);

        let block = &mut self.blocks[bb];
        if block.entry == Some(q) {
            if p_is_phi {
                if block.phi.is_none() {
                    block.phi = Some(p);
                }
            } else {
                block.entry = Some(p);
            }
        } else if block.phi == Some(q) {
            block.phi = Some(p);
        }

        let prev = self.insns[q].prev;
        self.insns[p].next = Some(q);
        self.insns[p].prev = prev;
        if let Some(prev) = prev {
            self.insns[prev].next = Some(p);
        }
        self.insns[q].prev = Some(p);
    }

    /// Inserts `q` behind `p`.
    pub fn insert_after(&mut self, p: InsnId, q: InsnId) {
        let bb = match self.insns[p].bb {
            Some(bb) => bb,
            None => panic!("insert after unlinked instruction %{}", self.insns[p].id),
        };
        let p_is_phi = self.insns[p].op == Operation::Phi;
        let q_is_phi = self.insns[q].op == Operation::Phi;
        debug_assert!(!q_is_phi || p_is_phi, "phi after non-phi");
        self.claim_insn(bb, q);

        let block = &mut self.blocks[bb];
        if block.exit == Some(p) {
            block.exit = Some(q);
        }
        if p_is_phi && !q_is_phi {
            debug_assert!(
                block.entry.is_none() || block.entry == self.insns[p].next,
                "non-phi inserted among phis"
            );
            block.entry = Some(q);
        }

        let next = self.insns[p].next;
        self.insns[q].prev = Some(p);
        self.insns[q].next = next;
        if let Some(next) = next {
            self.insns[next].prev = Some(q);
        }
        self.insns[p].next = Some(q);
    }

    /// Unlinks the instruction from its block. The instruction stays alive.
    pub fn remove_insn(&mut self, bb: BlockId, insn: InsnId) {
        debug_assert_eq!(Some(bb), self.insns[insn].bb);

        let prev = self.insns[insn].prev;
        let next = self.insns[insn].next;

        if let Some(prev) = prev {
            self.insns[prev].next = next;
        }
        if let Some(next) = next {
            self.insns[next].prev = prev;
        }

        let next_is_phi = next.map_or(false, |n| self.insns[n].op == Operation::Phi);
        let block = &mut self.blocks[bb];
        if next.is_none() {
            block.exit = prev;
        }
        if block.entry == Some(insn) {
            block.entry = next;
        }
        if block.phi == Some(insn) {
            block.phi = if next_is_phi { next } else { None };
        }
        block.num_insns -= 1;

        let data = &mut self.insns[insn];
        data.bb = None;
        data.next = None;
        data.prev = None;
    }

    /// Swaps two adjacent non-phi instructions.
    pub fn permute_adjacent(&mut self, a: InsnId, b: InsnId) {
        debug_assert_eq!(self.insns[a].bb, self.insns[b].bb);
        let (a, b) = if self.insns[a].next == Some(b) { (a, b) } else { (b, a) };
        assert_eq!(Some(b), self.insns[a].next, "permuting non-adjacent instructions");
        debug_assert!(self.insns[a].op != Operation::Phi && self.insns[b].op != Operation::Phi);

        if let Some(bb) = self.insns[a].bb {
            let block = &mut self.blocks[bb];
            if block.exit == Some(b) {
                block.exit = Some(a);
            }
            if block.entry == Some(a) {
                block.entry = Some(b);
            }
        }

        let before = self.insns[a].prev;
        let after = self.insns[b].next;
        self.insns[b].prev = before;
        self.insns[a].next = after;
        self.insns[b].next = Some(a);
        self.insns[a].prev = Some(b);

        if let Some(before) = before {
            self.insns[before].next = Some(b);
        }
        if let Some(after) = after {
            self.insns[after].prev = Some(a);
        }
    }

    /// Moves `insn` and everything after it into a new block, which takes
    /// over all outgoing edges. With `attach` a TREE edge links the two.
    pub fn split_before(&mut self, bb: BlockId, insn: Option<InsnId>, attach: bool) -> BlockId {
        debug_assert!(insn.map_or(true, |i| self.insns[i].op != Operation::Phi));
        self.split_common(bb, insn, attach)
    }

    /// Moves everything after `insn` into a new block, which takes over all
    /// outgoing edges. With `attach` a TREE edge links the two.
    pub fn split_after(&mut self, bb: BlockId, insn: Option<InsnId>, attach: bool) -> BlockId {
        debug_assert!(insn.map_or(true, |i| self.insns[i].op != Operation::Phi));
        let start = insn.and_then(|i| self.insns[i].next);
        self.split_common(bb, start, attach)
    }

    fn split_common(&mut self, bb: BlockId, start: Option<InsnId>, attach: bool) -> BlockId {
        let func = self.blocks[bb].func;
        let new_bb = self.new_block(func);

        self.blocks[new_bb].join_at = self.blocks[bb].join_at.take();

        if let Some(start) = start {
            debug_assert_eq!(Some(bb), self.insns[start].bb);
            let prev = self.insns[start].prev.take();

            {
                let block = &mut self.blocks[bb];
                block.exit = prev;
                if block.entry == Some(start) {
                    block.entry = None;
                }
            }
            if let Some(prev) = prev {
                self.insns[prev].next = None;
            }

            self.blocks[new_bb].entry = Some(start);
            let mut cursor = Some(start);
            while let Some(insn) = cursor {
                self.insns[insn].bb = Some(new_bb);
                self.blocks[bb].num_insns -= 1;
                self.blocks[new_bb].num_insns += 1;
                self.blocks[new_bb].exit = Some(insn);
                cursor = self.insns[insn].next;
            }
        }

        let from = self.blocks[bb].cfg;
        let to = self.blocks[new_bb].cfg;
        let cfg = &mut self.functions[func].cfg;
        let edges: Vec<_> = cfg.outgoing(from).collect();
        for edge in edges {
            let data = cfg.edge(edge);
            cfg.attach(to, data.target, data.kind);
            cfg.remove_edge(edge);
        }

        if attach {
            cfg.attach(from, to, EdgeKind::Tree);
        }
        self.functions[func].has_dom = false;

        log::trace!(
            "split BB:{} into BB:{} ({} instructions moved)",
            self.blocks[bb].id,
            self.blocks[new_bb].id,
            self.blocks[new_bb].num_insns
        );

        new_bb
    }

    /// Whether `bb` is dominated by `other`. Needs the dominator tree.
    pub fn dominated_by(&self, bb: BlockId, other: BlockId) -> bool {
        let func = &self.functions[self.blocks[bb].func];
        let target = match self.blocks[other].dom {
            Some(node) => node,
            None => return false,
        };

        let mut node = self.blocks[bb].dom;
        while let Some(current) = node {
            if current == target {
                return true;
            }
            node = func.dom.parent(current);
        }

        false
    }

    /// Immediate dominator. Needs the dominator tree.
    pub fn idom(&self, bb: BlockId) -> Option<BlockId> {
        let func = &self.functions[self.blocks[bb].func];
        let node = self.blocks[bb].dom?;
        func.dom.parent(node).map(|parent| *func.dom.payload(parent))
    }

    /// Shape of an if without loops starting at `bb`, with the then branch
    /// on the first outgoing edge and the else branch (or join) on the
    /// second. 1: then falls into else, 2: then leaves by a cross or back
    /// edge, 3: both join in the same block, 0: anything else.
    pub fn initiates_simple_conditional(&self, bb: BlockId) -> u32 {
        let cfg = &self.functions[self.blocks[bb].func].cfg;
        let node = self.blocks[bb].cfg;

        if cfg.out_count(node) != 2 {
            return 0;
        }
        let succ: Vec<NodeId> = cfg.successors(node).collect();
        let (then, other) = (succ[0], succ[1]);

        if let Some(edge) = cfg.first_outgoing(then) {
            if edge.kind == EdgeKind::Cross || edge.kind == EdgeKind::Back {
                return 2;
            }
        }

        if cfg.out_count(then) != 1 {
            return 0;
        }
        let join = cfg.successors(then).next();
        if join == Some(other) {
            return 1;
        }
        if cfg.out_count(other) == 1 && cfg.successors(other).next() == join {
            return 3;
        }

        0
    }

    /// Deletes the block with all its instructions and edges.
    pub fn delete_block(&mut self, bb: BlockId) {
        let insns: Vec<InsnId> = self.block_insns(bb).collect();
        for insn in insns {
            self.delete_insn(insn);
        }

        let func = self.blocks[bb].func;
        let node = self.blocks[bb].cfg;
        let function = &mut self.functions[func];
        function.cfg.cut(node);
        function.blocks.retain(|&b| b != bb);
        function.order.retain(|&b| b != bb);
        if function.exit == Some(bb) {
            function.exit = None;
        }
        function.has_dom = false;

        self.blocks.free(bb);
    }
}
