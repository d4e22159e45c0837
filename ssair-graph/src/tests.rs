use crate::{EdgeKind, Graph, NodeId};

fn nodes(graph: &mut Graph<&'static str>, names: &[&'static str]) -> Vec<NodeId> {
    names.iter().map(|name| graph.add_node(*name)).collect()
}

fn count_kinds(graph: &Graph<&'static str>, kind: EdgeKind) -> usize {
    graph
        .nodes()
        .flat_map(|n| graph.outgoing(n).collect::<Vec<_>>())
        .filter(|&e| graph.edge(e).kind == kind)
        .count()
}

fn kind_of(graph: &Graph<&'static str>, origin: NodeId, target: NodeId) -> EdgeKind {
    graph
        .outgoing(origin)
        .map(|e| graph.edge(e))
        .find(|e| e.target == target)
        .expect("missing edge")
        .kind
}

// A -> B, A -> C, B -> D, C -> D
fn diamond() -> (Graph<&'static str>, Vec<NodeId>) {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.insert(n[0]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[2], EdgeKind::Tree);
    graph.attach(n[1], n[3], EdgeKind::Tree);
    graph.attach(n[2], n[3], EdgeKind::Tree);
    (graph, n)
}

#[test]
fn test_first_insert_becomes_root() {
    let mut graph: Graph<()> = Graph::new();
    let a = graph.add_node(());
    let b = graph.add_node(());
    assert!(graph.is_empty());

    graph.attach(a, b, EdgeKind::Tree);
    assert_eq!(Some(a), graph.root());
    assert_eq!(2, graph.size());
    assert!(graph.contains(b));
}

#[test]
fn test_edges_iterate_in_insertion_order() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[2], EdgeKind::Tree);
    graph.attach(n[0], n[3], EdgeKind::Tree);

    let succs: Vec<NodeId> = graph.successors(n[0]).collect();
    assert_eq!(vec![n[1], n[2], n[3]], succs);
    assert_eq!(3, graph.out_count(n[0]));
    assert_eq!(Some(n[0]), graph.parent(n[3]));
}

#[test]
fn test_detach_keeps_remaining_order() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[2], EdgeKind::Tree);
    graph.attach(n[0], n[3], EdgeKind::Tree);

    graph.detach(n[0], n[2]);
    let succs: Vec<NodeId> = graph.successors(n[0]).collect();
    assert_eq!(vec![n[1], n[3]], succs);
    assert_eq!(0, graph.in_count(n[2]));

    graph.detach(n[0], n[1]);
    let succs: Vec<NodeId> = graph.successors(n[0]).collect();
    assert_eq!(vec![n[3]], succs);
}

#[test]
fn test_multigraph_detach_removes_one_edge() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[1], EdgeKind::Forward);
    assert_eq!(2, graph.out_count(n[0]));

    graph.detach(n[0], n[1]);
    assert_eq!(1, graph.out_count(n[0]));
    assert_eq!(1, graph.in_count(n[1]));
}

#[test]
fn test_cut_removes_node_and_edges() {
    let (mut graph, n) = diamond();
    graph.cut(n[1]);

    assert!(!graph.contains(n[1]));
    assert_eq!(3, graph.size());
    assert_eq!(1, graph.out_count(n[0]));
    assert_eq!(1, graph.in_count(n[3]));

    graph.cut(n[0]);
    assert_eq!(None, graph.root());
}

#[test]
fn test_edge_slots_are_recycled() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B"]);
    let e1 = graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.remove_edge(e1);
    let e2 = graph.attach(n[1], n[0], EdgeKind::Tree);
    assert_eq!(e1, e2);
    assert_eq!(n[1], graph.edge(e2).origin);
}

#[test]
fn test_classify_diamond() {
    let (mut graph, n) = diamond();
    graph.classify_edges();

    assert_eq!(3, count_kinds(&graph, EdgeKind::Tree));
    assert_eq!(1, count_kinds(&graph, EdgeKind::Cross));
    assert_eq!(EdgeKind::Tree, kind_of(&graph, n[1], n[3]));
    assert_eq!(EdgeKind::Cross, kind_of(&graph, n[2], n[3]));

    assert_eq!(1, graph.discovery(n[0]));
    assert_eq!(2, graph.discovery(n[1]));
    assert_eq!(3, graph.discovery(n[3]));
    assert_eq!(4, graph.discovery(n[2]));
}

#[test]
fn test_classify_loop_and_forward() {
    // A -> B -> C -> B, A -> C
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C"]);
    graph.attach(n[0], n[1], EdgeKind::Unknown);
    graph.attach(n[1], n[2], EdgeKind::Unknown);
    graph.attach(n[2], n[1], EdgeKind::Unknown);
    graph.attach(n[0], n[2], EdgeKind::Unknown);

    assert_eq!(EdgeKind::Tree, kind_of(&graph, n[0], n[1]));
    assert_eq!(EdgeKind::Tree, kind_of(&graph, n[1], n[2]));
    assert_eq!(EdgeKind::Back, kind_of(&graph, n[2], n[1]));
    assert_eq!(EdgeKind::Forward, kind_of(&graph, n[0], n[2]));
}

#[test]
fn test_classify_self_loop_is_back() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[1], n[1], EdgeKind::Tree);
    graph.classify_edges();
    assert_eq!(EdgeKind::Back, kind_of(&graph, n[1], n[1]));
}

#[test]
fn test_classify_keeps_dummy() {
    let (mut graph, n) = diamond();
    graph.attach(n[3], n[0], EdgeKind::Dummy);
    graph.classify_edges();
    assert_eq!(EdgeKind::Dummy, kind_of(&graph, n[3], n[0]));
}

#[test]
fn test_dfs_orders() {
    let (graph, n) = diamond();
    let pre: Vec<NodeId> = graph.iter_dfs(true).collect();
    assert_eq!(vec![n[0], n[1], n[3], n[2]], pre);

    let post: Vec<NodeId> = graph.iter_dfs(false).collect();
    assert_eq!(vec![n[3], n[1], n[2], n[0]], post);
}

#[test]
fn test_dfs_skips_unreachable() {
    let (mut graph, n) = diamond();
    let lonely = graph.add_node("E");
    graph.insert(lonely);
    assert_eq!(5, graph.size());
    assert_eq!(Some(n[0]), graph.root());
    assert_eq!(4, graph.iter_dfs(true).count());
    assert!(!graph.iter_dfs(true).any(|node| node == lonely));
}

#[test]
fn test_cfg_order_diamond() {
    let (mut graph, n) = diamond();
    graph.classify_edges();
    let order: Vec<NodeId> = graph.iter_cfg().collect();
    assert_eq!(4, order.len());
    assert_eq!(n[0], order[0]);
    assert_eq!(n[3], order[3]);
}

#[test]
fn test_cfg_order_respects_forward_edges() {
    // A -> B -> C -> D, A -> D (forward)
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[3], EdgeKind::Tree);
    graph.attach(n[1], n[2], EdgeKind::Tree);
    graph.attach(n[2], n[3], EdgeKind::Tree);
    graph.classify_edges();

    let order: Vec<NodeId> = graph.iter_cfg().collect();
    assert_eq!(vec![n[0], n[1], n[2], n[3]], order);
}

#[test]
fn test_cfg_order_ignores_back_edges() {
    // A -> B -> C -> B, C -> D
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[1], n[2], EdgeKind::Tree);
    graph.attach(n[2], n[1], EdgeKind::Tree);
    graph.attach(n[2], n[3], EdgeKind::Tree);
    graph.classify_edges();

    let order: Vec<NodeId> = graph.iter_cfg().collect();
    assert_eq!(vec![n[0], n[1], n[2], n[3]], order);
}

#[test]
fn test_cfg_order_cross_edge_arriving_last() {
    // A -> B, A -> C, B -> D, C -> D, C -> B
    // B is completed by the CROSS edge from C and must still be emitted.
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C", "D"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[0], n[2], EdgeKind::Tree);
    graph.attach(n[1], n[3], EdgeKind::Tree);
    graph.attach(n[2], n[3], EdgeKind::Tree);
    graph.attach(n[2], n[1], EdgeKind::Tree);
    graph.classify_edges();
    assert_eq!(EdgeKind::Cross, kind_of(&graph, n[2], n[1]));

    let order: Vec<NodeId> = graph.iter_cfg().collect();
    assert_eq!(vec![n[0], n[2], n[1], n[3]], order);
}

#[test]
fn test_cfg_order_is_deterministic() {
    let (mut graph, _) = diamond();
    graph.classify_edges();
    let first: Vec<NodeId> = graph.iter_cfg().collect();
    let second: Vec<NodeId> = graph.iter_cfg().collect();
    assert_eq!(first, second);
}

#[test]
fn test_reachable_by() {
    let (mut graph, n) = diamond();
    graph.classify_edges();

    assert!(graph.reachable_by(n[3], n[0], None));
    assert!(!graph.reachable_by(n[0], n[3], None));
    // the path over C avoids B
    assert!(graph.reachable_by(n[3], n[0], Some(n[1])));
    assert!(graph.reachable_by(n[1], n[0], Some(n[1])));
}

#[test]
fn test_reachable_by_stops_at_term() {
    // A -> B -> C
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B", "C"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[1], n[2], EdgeKind::Tree);
    graph.classify_edges();

    assert!(graph.reachable_by(n[2], n[0], None));
    assert!(!graph.reachable_by(n[2], n[0], Some(n[1])));
}

#[test]
fn test_reachable_by_ignores_back_edges() {
    let mut graph = Graph::new();
    let n = nodes(&mut graph, &["A", "B"]);
    graph.attach(n[0], n[1], EdgeKind::Tree);
    graph.attach(n[1], n[0], EdgeKind::Tree);
    graph.classify_edges();
    assert!(!graph.reachable_by(n[0], n[1], None));
}

#[test]
fn test_lightest_path() {
    let (mut graph, n) = diamond();
    graph.classify_edges();

    let weights = [1, 10, 3, 100];
    assert_eq!(Some(4), graph.find_lightest_path_weight(n[0], n[3], &weights));
    assert_eq!(Some(0), graph.find_lightest_path_weight(n[0], n[0], &weights));
    assert_eq!(Some(1), graph.find_lightest_path_weight(n[0], n[1], &weights));
}

#[test]
fn test_lightest_path_no_path() {
    let (mut graph, n) = diamond();
    graph.classify_edges();
    let weights = [1, 1, 1, 1];
    assert_eq!(None, graph.find_lightest_path_weight(n[3], n[0], &weights));
    assert_eq!(None, graph.find_lightest_path_weight(n[1], n[2], &weights));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "3 weights for 4 nodes")]
fn test_lightest_path_short_weights() {
    let (mut graph, n) = diamond();
    graph.classify_edges();
    let weights = [1, 1, 1];
    graph.find_lightest_path_weight(n[0], n[3], &weights);
}
