use std::fmt;

use fixedbitset::FixedBitSet;

mod iter;
mod query;
#[cfg(test)]
mod tests;

pub use iter::NodeIter;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EdgeId(u32);

impl EdgeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EdgeKind {
    Tree,
    Forward,
    Back,
    Cross,
    // structural edge that is never followed by the traversals
    Dummy,
    Unknown,
}

impl EdgeKind {
    pub fn is_back(self) -> bool {
        self == EdgeKind::Back
    }

    pub fn is_dummy(self) -> bool {
        self == EdgeKind::Dummy
    }

    pub fn name(self) -> &'static str {
        match self {
            EdgeKind::Tree => "tree",
            EdgeKind::Forward => "forward",
            EdgeKind::Back => "back",
            EdgeKind::Cross => "cross",
            EdgeKind::Dummy => "dummy",
            EdgeKind::Unknown => "unknown",
        }
    }
}

/// Snapshot of a single edge.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Edge {
    pub origin: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

const OUT: usize = 0;
const IN: usize = 1;

struct NodeData<N> {
    payload: N,
    // heads of the circular outgoing/incoming edge lists
    heads: [Option<EdgeId>; 2],
    out_count: u32,
    in_count: u32,
    registered: bool,
    discovery: u32,
}

struct EdgeData {
    origin: NodeId,
    target: NodeId,
    kind: EdgeKind,
    // index OUT links the origin's outgoing list, IN the target's incoming list
    next: [EdgeId; 2],
    prev: [EdgeId; 2],
    live: bool,
}

/// Directed multigraph over opaque node payloads.
///
/// Nodes are allocated with `add_node` and only become part of the graph once
/// they are inserted, either explicitly or by attaching an edge to them. The
/// first inserted node becomes the root. Edges live in per-node circular lists
/// and are addressed by stable `EdgeId`s; removed edge slots are recycled.
pub struct Graph<N> {
    nodes: Vec<NodeData<N>>,
    edges: Vec<EdgeData>,
    free_edges: Vec<u32>,
    root: Option<NodeId>,
    size: usize,
}

impl<N> Graph<N> {
    pub fn new() -> Graph<N> {
        Graph {
            nodes: Vec::new(),
            edges: Vec::new(),
            free_edges: Vec::new(),
            root: None,
            size: 0,
        }
    }

    pub fn add_node(&mut self, payload: N) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            payload,
            heads: [None, None],
            out_count: 0,
            in_count: 0,
            registered: false,
            discovery: 0,
        });
        id
    }

    pub fn insert(&mut self, node: NodeId) {
        let data = &mut self.nodes[node.index()];
        debug_assert!(!data.registered, "node {} already in graph", node);
        if data.registered {
            return;
        }
        data.registered = true;
        self.size += 1;

        if self.root.is_none() {
            self.root = Some(node);
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes currently inserted into the graph.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of allocated node slots, inserted or not.
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes[node.index()].registered
    }

    pub fn payload(&self, node: NodeId) -> &N {
        &self.nodes[node.index()].payload
    }

    pub fn payload_mut(&mut self, node: NodeId) -> &mut N {
        &mut self.nodes[node.index()].payload
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, data)| data.registered)
            .map(|(idx, _)| NodeId(idx as u32))
    }

    /// Discovery number assigned by the last `classify_edges`, 0 if the
    /// node was not reached.
    pub fn discovery(&self, node: NodeId) -> u32 {
        self.nodes[node.index()].discovery
    }

    pub fn attach(&mut self, origin: NodeId, target: NodeId, kind: EdgeKind) -> EdgeId {
        let id = self.alloc_edge(origin, target, kind);

        self.link(id, origin, OUT);
        self.link(id, target, IN);

        self.nodes[origin.index()].out_count += 1;
        self.nodes[target.index()].in_count += 1;

        if !self.contains(origin) {
            self.insert(origin);
        }
        if !self.contains(target) {
            self.insert(target);
        }

        if kind == EdgeKind::Unknown {
            self.classify_edges();
        }

        id
    }

    /// Removes the first edge from `origin` to `target`.
    pub fn detach(&mut self, origin: NodeId, target: NodeId) {
        let edge = self
            .outgoing(origin)
            .find(|&e| self.edges[e.index()].target == target);

        match edge {
            Some(edge) => self.remove_edge(edge),
            None => debug_assert!(false, "no edge {} -> {}", origin, target),
        }
    }

    pub fn remove_edge(&mut self, edge: EdgeId) {
        let data = &self.edges[edge.index()];
        assert!(data.live, "edge already removed");
        let origin = data.origin;
        let target = data.target;

        self.unlink(edge, origin, OUT);
        self.unlink(edge, target, IN);

        self.nodes[origin.index()].out_count -= 1;
        self.nodes[target.index()].in_count -= 1;

        self.edges[edge.index()].live = false;
        self.free_edges.push(edge.0);
    }

    /// Removes every edge of `node` and takes it out of the graph.
    pub fn cut(&mut self, node: NodeId) {
        while let Some(edge) = self.nodes[node.index()].heads[OUT] {
            self.remove_edge(edge);
        }
        while let Some(edge) = self.nodes[node.index()].heads[IN] {
            self.remove_edge(edge);
        }

        let data = &mut self.nodes[node.index()];
        if data.registered {
            data.registered = false;
            self.size -= 1;
        }

        if self.root == Some(node) {
            self.root = None;
        }
    }

    pub fn edge(&self, edge: EdgeId) -> Edge {
        let data = &self.edges[edge.index()];
        debug_assert!(data.live);
        Edge {
            origin: data.origin,
            target: data.target,
            kind: data.kind,
        }
    }

    pub fn set_kind(&mut self, edge: EdgeId, kind: EdgeKind) {
        self.edges[edge.index()].kind = kind;
    }

    pub fn outgoing(&self, node: NodeId) -> EdgeIter<'_, N> {
        EdgeIter::new(self, self.nodes[node.index()].heads[OUT], OUT)
    }

    pub fn incident(&self, node: NodeId) -> EdgeIter<'_, N> {
        EdgeIter::new(self, self.nodes[node.index()].heads[IN], IN)
    }

    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing(node).map(move |e| self.edges[e.index()].target)
    }

    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incident(node).map(move |e| self.edges[e.index()].origin)
    }

    pub fn first_outgoing(&self, node: NodeId) -> Option<Edge> {
        self.nodes[node.index()].heads[OUT].map(|e| self.edge(e))
    }

    pub fn out_count(&self, node: NodeId) -> usize {
        self.nodes[node.index()].out_count as usize
    }

    pub fn in_count(&self, node: NodeId) -> usize {
        self.nodes[node.index()].in_count as usize
    }

    /// Number of incoming edges that are neither BACK nor DUMMY.
    pub fn incident_count_fwd(&self, node: NodeId) -> usize {
        self.incident(node)
            .filter(|&e| {
                let kind = self.edges[e.index()].kind;
                !kind.is_back() && !kind.is_dummy()
            })
            .count()
    }

    /// Origin of the first incoming edge. In a tree this is the parent.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].heads[IN].map(|e| self.edges[e.index()].origin)
    }

    /// Classifies every edge reachable from the root as TREE, FORWARD, BACK
    /// or CROSS with one depth-first search. DUMMY edges keep their kind.
    pub fn classify_edges(&mut self) {
        for node in &mut self.nodes {
            node.discovery = 0;
        }

        let root = match self.root {
            Some(root) => root,
            None => return,
        };

        let mut seq = 0;
        let mut on_path = FixedBitSet::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, Option<EdgeId>)> = Vec::new();

        seq += 1;
        self.nodes[root.index()].discovery = seq;
        on_path.insert(root.index());
        stack.push((root, self.nodes[root.index()].heads[OUT]));

        while let Some(top) = stack.last_mut() {
            let (curr, cursor) = *top;

            let edge = match cursor {
                Some(edge) => edge,
                None => {
                    on_path.set(curr.index(), false);
                    stack.pop();
                    continue;
                }
            };

            top.1 = self.next_in_list(curr, edge, OUT);

            if self.edges[edge.index()].kind.is_dummy() {
                continue;
            }

            let target = self.edges[edge.index()].target;
            let target_seq = self.nodes[target.index()].discovery;
            let curr_seq = self.nodes[curr.index()].discovery;

            let kind = if target_seq == 0 {
                seq += 1;
                self.nodes[target.index()].discovery = seq;
                on_path.insert(target.index());
                stack.push((target, self.nodes[target.index()].heads[OUT]));
                EdgeKind::Tree
            } else if target_seq > curr_seq {
                EdgeKind::Forward
            } else if on_path.contains(target.index()) {
                EdgeKind::Back
            } else {
                EdgeKind::Cross
            };

            self.edges[edge.index()].kind = kind;
        }

        log::trace!("classified edges of {} nodes, {} discovered", self.size, seq);
    }

    fn alloc_edge(&mut self, origin: NodeId, target: NodeId, kind: EdgeKind) -> EdgeId {
        let data = EdgeData {
            origin,
            target,
            kind,
            next: [EdgeId(0); 2],
            prev: [EdgeId(0); 2],
            live: true,
        };

        if let Some(idx) = self.free_edges.pop() {
            self.edges[idx as usize] = data;
            EdgeId(idx)
        } else {
            let idx = self.edges.len() as u32;
            self.edges.push(data);
            EdgeId(idx)
        }
    }

    // Appends `edge` at the tail of the node's list in direction `dir`.
    fn link(&mut self, edge: EdgeId, node: NodeId, dir: usize) {
        match self.nodes[node.index()].heads[dir] {
            Some(head) => {
                let tail = self.edges[head.index()].prev[dir];
                self.edges[edge.index()].next[dir] = head;
                self.edges[edge.index()].prev[dir] = tail;
                self.edges[tail.index()].next[dir] = edge;
                self.edges[head.index()].prev[dir] = edge;
            }

            None => {
                self.edges[edge.index()].next[dir] = edge;
                self.edges[edge.index()].prev[dir] = edge;
                self.nodes[node.index()].heads[dir] = Some(edge);
            }
        }
    }

    fn unlink(&mut self, edge: EdgeId, node: NodeId, dir: usize) {
        let next = self.edges[edge.index()].next[dir];
        let prev = self.edges[edge.index()].prev[dir];

        if next == edge {
            self.nodes[node.index()].heads[dir] = None;
        } else {
            self.edges[prev.index()].next[dir] = next;
            self.edges[next.index()].prev[dir] = prev;

            if self.nodes[node.index()].heads[dir] == Some(edge) {
                self.nodes[node.index()].heads[dir] = Some(next);
            }
        }
    }

    fn next_in_list(&self, node: NodeId, edge: EdgeId, dir: usize) -> Option<EdgeId> {
        let next = self.edges[edge.index()].next[dir];
        if Some(next) == self.nodes[node.index()].heads[dir] {
            None
        } else {
            Some(next)
        }
    }
}

impl<N> Default for Graph<N> {
    fn default() -> Graph<N> {
        Graph::new()
    }
}

impl<N: fmt::Debug> fmt::Debug for Graph<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "graph ({} nodes, root {:?})", self.size, self.root)?;
        for node in self.nodes() {
            write!(f, "  {} {:?} ->", node, self.payload(node))?;
            for edge in self.outgoing(node) {
                let edge = self.edge(edge);
                write!(f, " {}:{}", edge.target, edge.kind.name())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Walks one circular edge list, in insertion order.
pub struct EdgeIter<'a, N> {
    graph: &'a Graph<N>,
    first: Option<EdgeId>,
    current: Option<EdgeId>,
    dir: usize,
}

impl<'a, N> EdgeIter<'a, N> {
    fn new(graph: &'a Graph<N>, first: Option<EdgeId>, dir: usize) -> EdgeIter<'a, N> {
        EdgeIter {
            graph,
            first,
            current: first,
            dir,
        }
    }
}

impl<'a, N> Iterator for EdgeIter<'a, N> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<EdgeId> {
        let current = self.current?;
        let next = self.graph.edges[current.index()].next[self.dir];
        self.current = if Some(next) == self.first {
            None
        } else {
            Some(next)
        };
        Some(current)
    }
}
