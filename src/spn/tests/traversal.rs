use super::build_two_var_spn;
use crate::assert_err;
use crate::spn::{GDLearning, GDLearningConfig, Input, SpnError, SpnGraph};
use std::collections::HashMap;

#[test]
fn test_traverse_visits_shared_nodes_once() {
    let spn = build_two_var_spn(1, false);
    let inner = spn.graph.inner();

    let mut visits = HashMap::new();
    inner
        .traverse_graph(spn.root, |id| {
            *visits.entry(id).or_insert(0) += 1;
            Ok(())
        })
        .unwrap();

    // leaf、sums_a、sums_b 与 3 个权重节点、products、root
    assert_eq!(visits.len(), 8);
    assert!(visits.values().all(|&count| count == 1));
    assert_eq!(inner.nodes_count(), 8);
}

#[test]
fn test_topological_order_puts_children_first() {
    let spn = build_two_var_spn(1, false);
    let inner = spn.graph.inner();
    let order = inner.topological_order(spn.root).unwrap();
    let position = |id| order.iter().position(|&x| x == id).unwrap();

    assert_eq!(*order.last().unwrap(), spn.root);
    assert!(position(spn.leaf) < position(spn.sums_a));
    assert!(position(spn.leaf) < position(spn.sums_b));
    assert!(position(spn.sums_a) < position(spn.products));
    assert!(position(spn.sums_b) < position(spn.products));
    assert!(position(spn.products) < position(spn.root));
}

#[test]
fn test_traverse_stops_on_visitor_error() {
    let spn = build_two_var_spn(1, false);
    let inner = spn.graph.inner();
    let mut count = 0;
    let result = inner.traverse_graph(spn.root, |_| {
        count += 1;
        Err(SpnError::InvalidOperation("停止".to_string()))
    });
    assert_err!(result, SpnError::InvalidOperation("停止"));
    assert_eq!(count, 1);
}

#[test]
fn test_cycle_detected() {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(1, 2, "X").unwrap();
    let p1 = graph.product(&[Input::all(leaf)], "p1").unwrap();
    let p2 = graph.product(&[Input::all(p1)], "p2").unwrap();
    // p1 -> p2 -> p1
    graph.add_values(p1, &[Input::all(p2)]).unwrap();

    assert_err!(
        graph.inner().traverse_graph(p2, |_| Ok(())),
        SpnError::CycleDetected(_)
    );
    assert_err!(graph.inner().topological_order(p1), SpnError::CycleDetected(_));
    assert_err!(
        GDLearning::new(&graph, p2, GDLearningConfig::default()),
        SpnError::CycleDetected(_)
    );
}

#[test]
fn test_self_loop_detected() {
    let graph = SpnGraph::new();
    let leaf = graph.indicator_leaf(1, 2, "X").unwrap();
    let p = graph.product(&[Input::all(leaf)], "p").unwrap();
    graph.add_values(p, &[Input::all(p)]).unwrap();
    assert_err!(graph.inner().topological_order(p), SpnError::CycleDetected(id) if *id == p);
}

#[test]
fn test_traverse_unknown_root() {
    let spn = build_two_var_spn(1, false);
    let unknown = crate::spn::NodeId(999);
    assert_err!(
        spn.graph.inner().traverse_graph(unknown, |_| Ok(())),
        SpnError::NodeNotFound(id) if *id == unknown
    );
}
