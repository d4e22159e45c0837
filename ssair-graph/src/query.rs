use fixedbitset::FixedBitSet;

use crate::{Graph, NodeId};

impl<N> Graph<N> {
    /// Whether `node` can be reached from `from` without following BACK or
    /// DUMMY edges. The search does not expand past `term`.
    pub fn reachable_by(&self, node: NodeId, from: NodeId, term: Option<NodeId>) -> bool {
        let mut visited = FixedBitSet::with_capacity(self.nodes.len());
        let mut stack = vec![from];

        while let Some(pos) = stack.pop() {
            if pos == node {
                return true;
            }
            if Some(pos) == term {
                continue;
            }

            for edge in self.outgoing(pos) {
                let edge = self.edge(edge);
                if edge.kind.is_back() || edge.kind.is_dummy() {
                    continue;
                }
                if !visited.put(edge.target.index()) {
                    stack.push(edge.target);
                }
            }
        }

        false
    }

    /// Minimum over all BACK-free paths from `a` to `b` of the summed weights
    /// of the nodes on the path, `b` itself excluded. `weights` is indexed by
    /// node index and must cover every node. Returns `None` if there is no
    /// such path.
    pub fn find_lightest_path_weight(&self, a: NodeId, b: NodeId, weights: &[i32]) -> Option<i32> {
        const UNREACHED: i32 = i32::MAX;
        debug_assert!(
            weights.len() >= self.nodes.len(),
            "{} weights for {} nodes",
            weights.len(),
            self.nodes.len()
        );

        let mut path = vec![UNREACHED; self.nodes.len()];
        let mut visited = FixedBitSet::with_capacity(self.nodes.len());
        let mut frontier: Vec<NodeId> = Vec::new();

        path[a.index()] = 0;
        let mut current = Some(a);

        while let Some(c) = current {
            if c == b {
                break;
            }

            let weight = path[c.index()].saturating_add(weights[c.index()]);

            for edge in self.outgoing(c) {
                let edge = self.edge(edge);
                if edge.kind.is_back() || edge.kind.is_dummy() {
                    continue;
                }

                let t = edge.target.index();
                if visited.contains(t) {
                    continue;
                }
                if path[t] == UNREACHED {
                    frontier.push(edge.target);
                }
                if weight < path[t] {
                    path[t] = weight;
                }
            }

            visited.insert(c.index());
            frontier.retain(|&n| n != c);

            current = frontier.iter().copied().min_by_key(|n| path[n.index()]);
        }

        match path[b.index()] {
            UNREACHED => None,
            weight => Some(weight),
        }
    }
}
