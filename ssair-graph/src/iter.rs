use fixedbitset::FixedBitSet;

use crate::{EdgeId, EdgeKind, Graph, NodeId, OUT};

/// Node sequence computed up front, so the graph may be mutated while the
/// sequence is consumed.
pub struct NodeIter {
    nodes: Vec<NodeId>,
    pos: usize,
}

impl NodeIter {
    fn new(nodes: Vec<NodeId>) -> NodeIter {
        NodeIter { nodes, pos: 0 }
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes[self.pos..]
    }
}

impl Iterator for NodeIter {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.nodes.get(self.pos).copied()?;
        self.pos += 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.nodes.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NodeIter {}

impl<N> Graph<N> {
    /// Depth-first order from the root, following every outgoing edge.
    pub fn iter_dfs(&self, preorder: bool) -> NodeIter {
        let mut result = Vec::with_capacity(self.size);

        if let Some(root) = self.root {
            let mut visited = FixedBitSet::with_capacity(self.nodes.len());
            let mut stack: Vec<(NodeId, Option<EdgeId>)> = Vec::new();

            visited.insert(root.index());
            if preorder {
                result.push(root);
            }
            stack.push((root, self.nodes[root.index()].heads[OUT]));

            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;

                let edge = match cursor {
                    Some(edge) => edge,
                    None => {
                        if !preorder {
                            result.push(node);
                        }
                        stack.pop();
                        continue;
                    }
                };

                top.1 = self.next_in_list(node, edge, OUT);

                let target = self.edges[edge.index()].target;
                if !visited.put(target.index()) {
                    if preorder {
                        result.push(target);
                    }
                    stack.push((target, self.nodes[target.index()].heads[OUT]));
                }
            }
        }

        NodeIter::new(result)
    }

    /// Orders the nodes reachable from the root so that a node comes after all
    /// of its TREE, FORWARD and CROSS predecessors; BACK and DUMMY edges are
    /// ignored. Expects up-to-date edge classification.
    ///
    /// Nodes completed through a TREE/FORWARD edge are ready immediately,
    /// nodes completed through a CROSS edge wait until no ready node is left.
    /// Both lists are stacks.
    pub fn iter_cfg(&self) -> NodeIter {
        let root = match self.root {
            Some(root) => root,
            None => return NodeIter::new(Vec::new()),
        };

        let preorder = self.iter_dfs(true);
        let mut reachable = FixedBitSet::with_capacity(self.nodes.len());
        for node in preorder.as_slice() {
            reachable.insert(node.index());
        }

        let mut expected = vec![0u32; self.nodes.len()];
        for &node in preorder.as_slice() {
            expected[node.index()] = self
                .incident(node)
                .filter(|&e| {
                    let edge = &self.edges[e.index()];
                    !edge.kind.is_back()
                        && !edge.kind.is_dummy()
                        && reachable.contains(edge.origin.index())
                })
                .count() as u32;
        }

        let mut pending = vec![0u32; self.nodes.len()];
        let mut emitted = FixedBitSet::with_capacity(self.nodes.len());
        let mut result = Vec::with_capacity(preorder.len());
        let mut ready = vec![root];
        let mut deferred: Vec<NodeId> = Vec::new();

        loop {
            let node = match ready.pop() {
                Some(node) => node,
                None if !deferred.is_empty() => {
                    ready.extend(deferred.drain(..).rev());
                    continue;
                }
                None => {
                    // stale classification left a cycle without BACK edge
                    match preorder
                        .as_slice()
                        .iter()
                        .find(|n| !emitted.contains(n.index()))
                    {
                        Some(&node) => {
                            log::debug!("cfg order: forcing {} out of a cycle", node);
                            node
                        }
                        None => break,
                    }
                }
            };

            if emitted.put(node.index()) {
                continue;
            }
            result.push(node);

            for edge in self.outgoing(node) {
                let edge = &self.edges[edge.index()];
                let target = edge.target;

                match edge.kind {
                    EdgeKind::Back | EdgeKind::Dummy => continue,
                    EdgeKind::Tree | EdgeKind::Forward | EdgeKind::Unknown => {
                        pending[target.index()] += 1;
                        if pending[target.index()] == expected[target.index()] {
                            ready.push(target);
                        }
                    }
                    EdgeKind::Cross => {
                        pending[target.index()] += 1;
                        if pending[target.index()] == expected[target.index()] {
                            deferred.push(target);
                        }
                    }
                }
            }
        }

        NodeIter::new(result)
    }
}
