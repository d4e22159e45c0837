use ssair_graph::{EdgeKind, Graph, NodeId};

use crate::block::BlockId;
use crate::instruction::InsnId;
use crate::program::Program;
use crate::value::ValueId;

pub type FunctionId = id_arena::Id<Function>;

pub struct Function {
    pub name: String,
    pub label: u32,
    pub(crate) cfg: Graph<BlockId>,
    pub(crate) dom: Graph<BlockId>,
    pub(crate) has_dom: bool,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) lvalues: Vec<ValueId>,
    pub(crate) exit: Option<BlockId>,
    pub(crate) call: NodeId,
    pub(crate) order: Vec<BlockId>,
    pub(crate) next_block_id: i32,
    /// Values passed in and returned by calls.
    pub ins: Vec<ValueId>,
    pub outs: Vec<ValueId>,
}

impl Function {
    fn new(name: &str, label: u32, call: NodeId) -> Function {
        Function {
            name: name.to_string(),
            label,
            cfg: Graph::new(),
            dom: Graph::new(),
            has_dom: false,
            blocks: Vec::new(),
            lvalues: Vec::new(),
            exit: None,
            call,
            order: Vec::new(),
            next_block_id: 0,
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    pub fn cfg(&self) -> &Graph<BlockId> {
        &self.cfg
    }

    pub fn dom_tree(&self) -> Option<&Graph<BlockId>> {
        if self.has_dom {
            Some(&self.dom)
        } else {
            None
        }
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.cfg.root().map(|node| *self.cfg.payload(node))
    }

    pub fn exit(&self) -> Option<BlockId> {
        self.exit
    }

    /// Every block created for this function, in creation order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn lvalues(&self) -> &[ValueId] {
        &self.lvalues
    }

    /// Block order computed by the last `order_instructions`.
    pub fn block_order(&self) -> &[BlockId] {
        &self.order
    }

    pub fn call_node(&self) -> NodeId {
        self.call
    }
}

impl Program {
    /// Creates a function and adds it to the call graph. The first function
    /// becomes the program's main function.
    pub fn new_function(&mut self, name: &str, label: u32) -> FunctionId {
        let func = self.functions.alloc_with_id(|id| {
            let call = self.calls.add_node(id);
            Function::new(name, label, call)
        });

        let call = self.functions[func].call;
        self.calls.insert(call);
        if self.main.is_none() {
            self.main = Some(func);
        }
        func
    }

    pub fn function(&self, func: FunctionId) -> &Function {
        &self.functions[func]
    }

    pub fn function_mut(&mut self, func: FunctionId) -> &mut Function {
        &mut self.functions[func]
    }

    /// Records that `caller` calls `callee`.
    pub fn add_call(&mut self, caller: FunctionId, callee: FunctionId) {
        let from = self.functions[caller].call;
        let to = self.functions[callee].call;
        if self.calls.successors(from).any(|node| node == to) {
            return;
        }
        self.calls.attach(from, to, EdgeKind::Tree);
    }

    /// Makes `bb` the entry block. Fails if an entry has already been set.
    pub fn set_entry(&mut self, func: FunctionId, bb: BlockId) -> bool {
        let node = self.blocks[bb].cfg;
        let function = &mut self.functions[func];
        if function.cfg.root().is_some() {
            return false;
        }
        if !function.cfg.contains(node) {
            function.cfg.insert(node);
        }
        function.has_dom = false;
        true
    }

    /// Makes `bb` the exit block. Fails if an exit has already been set.
    pub fn set_exit(&mut self, func: FunctionId, bb: BlockId) -> bool {
        let function = &mut self.functions[func];
        if function.exit.is_some() {
            return false;
        }
        function.exit = Some(bb);
        true
    }

    /// Adds a CFG edge between two blocks of the same function.
    pub fn attach_blocks(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        let func = self.blocks[from].func;
        debug_assert_eq!(func, self.blocks[to].func);
        let origin = self.blocks[from].cfg;
        let target = self.blocks[to].cfg;

        let function = &mut self.functions[func];
        function.cfg.attach(origin, target, kind);
        function.has_dom = false;
    }

    /// Removes the first CFG edge between two blocks.
    pub fn detach_blocks(&mut self, from: BlockId, to: BlockId) {
        let func = self.blocks[from].func;
        let origin = self.blocks[from].cfg;
        let target = self.blocks[to].cfg;

        let function = &mut self.functions[func];
        function.cfg.detach(origin, target);
        function.has_dom = false;
    }

    /// Relabels every CFG edge of the function from a fresh depth-first walk.
    /// Needed after attaching edges with a guessed kind.
    pub fn classify_edges(&mut self, func: FunctionId) {
        log::trace!("classifying edges of {}", self.functions[func].name);
        self.functions[func].cfg.classify_edges();
    }

    pub fn successors(&self, bb: BlockId) -> Vec<BlockId> {
        let cfg = &self.functions[self.blocks[bb].func].cfg;
        cfg.successors(self.blocks[bb].cfg)
            .map(|node| *cfg.payload(node))
            .collect()
    }

    pub fn predecessors(&self, bb: BlockId) -> Vec<BlockId> {
        let cfg = &self.functions[self.blocks[bb].func].cfg;
        cfg.predecessors(self.blocks[bb].cfg)
            .map(|node| *cfg.payload(node))
            .collect()
    }

    /// Blocks in CFG order: every block after all of its forward
    /// predecessors.
    pub fn cfg_order(&self, func: FunctionId) -> Vec<BlockId> {
        let cfg = &self.functions[func].cfg;
        cfg.iter_cfg().map(|node| *cfg.payload(node)).collect()
    }

    /// Blocks in depth-first order.
    pub fn dfs_order(&self, func: FunctionId, preorder: bool) -> Vec<BlockId> {
        let cfg = &self.functions[func].cfg;
        cfg.iter_dfs(preorder)
            .map(|node| *cfg.payload(node))
            .collect()
    }

    /// Numbers every instruction in CFG block order starting at 0 and returns
    /// the flattened sequence.
    pub fn order_instructions(&mut self, func: FunctionId) -> Vec<InsnId> {
        let order = self.cfg_order(func);
        let mut result = Vec::new();

        for &bb in &order {
            let insns: Vec<InsnId> = self.block_insns(bb).collect();
            for insn in insns {
                self.insns[insn].serial = result.len() as i32;
                result.push(insn);
            }
        }

        log::debug!(
            "ordered {} instructions in {} blocks of {}",
            result.len(),
            order.len(),
            self.functions[func].name
        );
        self.functions[func].order = order;
        result
    }
}
