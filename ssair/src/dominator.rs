use ssair_graph::{EdgeKind, Graph, NodeId};

use crate::block::BlockId;
use crate::function::FunctionId;
use crate::program::Program;

const NONE: usize = usize::MAX;

/// Lengauer-Tarjan state, indexed by DFS preorder number.
struct LengauerTarjan {
    parent: Vec<usize>,
    semi: Vec<usize>,
    ancestor: Vec<usize>,
    label: Vec<usize>,
    idom: Vec<usize>,
    bucket: Vec<Vec<usize>>,
}

impl LengauerTarjan {
    fn new(parent: Vec<usize>) -> LengauerTarjan {
        let n = parent.len();
        LengauerTarjan {
            parent,
            semi: (0..n).collect(),
            ancestor: vec![NONE; n],
            label: (0..n).collect(),
            idom: vec![NONE; n],
            bucket: vec![Vec::new(); n],
        }
    }

    fn compress(&mut self, v: usize) {
        let mut path = Vec::new();
        let mut x = v;
        while self.ancestor[self.ancestor[x]] != NONE {
            path.push(x);
            x = self.ancestor[x];
        }

        for &y in path.iter().rev() {
            let a = self.ancestor[y];
            if self.semi[self.label[a]] < self.semi[self.label[y]] {
                self.label[y] = self.label[a];
            }
            self.ancestor[y] = self.ancestor[a];
        }
    }

    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v]
    }

    fn run(&mut self, preds: &[Vec<usize>]) {
        let n = self.parent.len();

        for w in (1..n).rev() {
            for &v in &preds[w] {
                let u = self.eval(v);
                if self.semi[u] < self.semi[w] {
                    self.semi[w] = self.semi[u];
                }
            }
            let semi = self.semi[w];
            self.bucket[semi].push(w);

            let p = self.parent[w];
            self.ancestor[w] = p;

            let bucket = std::mem::take(&mut self.bucket[p]);
            for v in bucket {
                let u = self.eval(v);
                self.idom[v] = if self.semi[u] < self.semi[v] { u } else { p };
            }
        }

        for w in 1..n {
            if self.idom[w] != self.semi[w] {
                self.idom[w] = self.idom[self.idom[w]];
            }
        }
    }
}

// Preorder of the nodes reachable from the root, with the DFS tree parent
// of each (by preorder number).
fn dfs_preorder(cfg: &Graph<BlockId>, root: NodeId) -> (Vec<NodeId>, Vec<usize>, Vec<usize>) {
    let mut number = vec![NONE; cfg.node_capacity()];
    let mut vertex = Vec::new();
    let mut parent = Vec::new();

    let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();
    number[root.index()] = 0;
    vertex.push(root);
    parent.push(NONE);
    stack.push((root, cfg.successors(root).collect(), 0));

    while let Some((node, succs, pos)) = stack.last_mut() {
        if *pos == succs.len() {
            stack.pop();
            continue;
        }
        let next = succs[*pos];
        *pos += 1;

        if number[next.index()] == NONE {
            let from = number[node.index()];
            number[next.index()] = vertex.len();
            vertex.push(next);
            parent.push(from);
            let succs = cfg.successors(next).collect();
            stack.push((next, succs, 0));
        }
    }

    (vertex, parent, number)
}

impl Program {
    /// Builds the dominator tree of the function into its second graph and
    /// records the dominance frontier of every reachable block.
    pub fn build_dominator_tree(&mut self, func: FunctionId) {
        let root = match self.functions[func].cfg.root() {
            Some(root) => root,
            None => return,
        };

        let (vertex, parent, number) = dfs_preorder(&self.functions[func].cfg, root);
        let cfg = &self.functions[func].cfg;
        let preds: Vec<Vec<usize>> = vertex
            .iter()
            .map(|&node| {
                cfg.predecessors(node)
                    .map(|p| number[p.index()])
                    .filter(|&p| p != NONE)
                    .collect()
            })
            .collect();

        let mut lt = LengauerTarjan::new(parent);
        lt.run(&preds);

        let mut dom: Graph<BlockId> = Graph::new();
        let nodes: Vec<NodeId> = vertex
            .iter()
            .map(|&node| dom.add_node(*cfg.payload(node)))
            .collect();
        dom.insert(nodes[0]);
        for w in 1..vertex.len() {
            dom.attach(nodes[lt.idom[w]], nodes[w], EdgeKind::Tree);
        }

        let blocks: Vec<BlockId> = self.functions[func].blocks.clone();
        for bb in blocks {
            self.blocks[bb].dom = None;
            self.blocks[bb].df.clear();
        }
        for (w, &node) in vertex.iter().enumerate() {
            let bb = *self.functions[func].cfg.payload(node);
            self.blocks[bb].dom = Some(nodes[w]);
        }

        let function = &mut self.functions[func];
        function.dom = dom;
        function.has_dom = true;

        log::debug!(
            "dominator tree of {}: {} of {} blocks reachable",
            function.name,
            vertex.len(),
            function.blocks.len()
        );

        self.find_dominance_frontiers(func);
    }

    fn find_dominance_frontiers(&mut self, func: FunctionId) {
        let order: Vec<BlockId> = {
            let dom = &self.functions[func].dom;
            dom.iter_dfs(false).map(|node| *dom.payload(node)).collect()
        };

        for bb in order {
            let mut df: Vec<BlockId> = Vec::new();

            for succ in self.successors(bb) {
                if self.blocks[succ].dom.is_none() {
                    continue;
                }
                if self.idom(succ) != Some(bb) && !df.contains(&succ) {
                    df.push(succ);
                }
            }

            for child in self.dom_children(bb) {
                for &up in &self.blocks[child].df {
                    if self.idom(up) != Some(bb) && !df.contains(&up) {
                        df.push(up);
                    }
                }
            }

            self.blocks[bb].df = df;
        }
    }

    /// Blocks immediately dominated by `bb`.
    pub fn dom_children(&self, bb: BlockId) -> Vec<BlockId> {
        let dom = &self.functions[self.blocks[bb].func].dom;
        match self.blocks[bb].dom {
            Some(node) => dom.successors(node).map(|n| *dom.payload(n)).collect(),
            None => Vec::new(),
        }
    }

    pub fn has_dominator_tree(&self, func: FunctionId) -> bool {
        self.functions[func].has_dom
    }
}
