use super::*;
use crate::payload::Record;

fn line(pts: &[(f64, f64)]) -> Vec<Coordinate> {
    pts.iter().map(|&p| Coordinate::from(p)).collect()
}

fn road(id: &str) -> Record {
    Record::new(id, "road").with_attribute("name", "Main St")
}

fn graph() -> Graph<Record> {
    Graph::new(PrecisionModel::fixed(1000.0))
}

#[test]
fn test_node_identity_under_snapping() {
    let mut g = graph();
    let a = g.get_or_create_node(&Coordinate::new(1.0001, 2.0004));
    let b = g.get_or_create_node(&Coordinate::new(0.9999, 1.9996));
    let c = g.get_or_create_node(&Coordinate::new(1.002, 2.0));
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.node_at(&Coordinate::new(1.0, 2.0)), Some(a));
}

#[test]
fn test_add_edge_links_endpoints() {
    let mut g = graph();
    let e1 = g.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), road("1")).unwrap();
    let e2 = g.add_edge(line(&[(5.0, 0.0), (5.0, 5.0)]), road("2")).unwrap();

    let shared = g.node_at(&Coordinate::new(5.0, 0.0)).unwrap();
    assert_eq!(g.node(shared).unwrap().degree(), 2);
    assert_eq!(g.node(shared).unwrap().incident_edges(), &[e1, e2]);
    assert_eq!(g.edge(e1).unwrap().to_node(), shared);
    assert_eq!(g.edge(e2).unwrap().from_node(), shared);
    // Payload geometry follows the snapped line
    assert_eq!(g.edge(e2).unwrap().payload().geometry.len(), 2);
    assert!(g.invariant_violations().is_empty());

    let err = g.add_edge(line(&[(1.0, 1.0)]), road("3")).unwrap_err();
    assert_eq!(err, GraphError::DegenerateLine { points: 1 });
}

#[test]
fn test_remove_edge_destroys_orphan_nodes() {
    let mut g = graph();
    let e1 = g.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), road("1")).unwrap();
    g.add_edge(line(&[(5.0, 0.0), (5.0, 5.0)]), road("2")).unwrap();
    g.remove_edge(e1).unwrap();

    assert!(g.node_at(&Coordinate::new(0.0, 0.0)).is_none());
    assert!(g.node_at(&Coordinate::new(5.0, 0.0)).is_some());
    assert_eq!(g.edge_count(), 1);
    assert!(g.edge(e1).unwrap().is_removed());
    assert!(g.live_edge(e1).is_none());
    assert!(g.edges_in(g.edge(e1).unwrap().envelope()).iter().all(|&e| e != e1));
    assert_eq!(g.remove_edge(e1), Err(GraphError::EdgeRemoved(e1)));
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_replace_edge_keeps_payload() {
    let mut g = graph();
    let e1 = g.add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), road("1")).unwrap();
    let e2 = g
        .replace_edge(e1, line(&[(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)]))
        .unwrap();
    assert_ne!(e1, e2);
    let edge = g.live_edge(e2).unwrap();
    assert_eq!(edge.payload().id, "1");
    assert_eq!(edge.line().len(), 3);
    assert_eq!(g.node_count(), 2);
    assert!(g.events().contains(&GraphEvent::EdgeChanged {
        old: e1,
        new: vec![e2]
    }));
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_split_with_no_nodes_is_identity() {
    let mut g = graph();
    let e = g.add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), road("1")).unwrap();
    assert_eq!(g.split_edge(e, &[]).unwrap(), vec![e]);
    assert!(g.live_edge(e).is_some());

    // Endpoint nodes never cut
    let start = g.node_at(&Coordinate::new(0.0, 0.0)).unwrap();
    assert_eq!(g.split_edge(e, &[start]).unwrap(), vec![e]);
}

#[test]
fn test_split_orders_cuts_along_the_line() {
    let mut g = graph();
    let e = g
        .add_edge(line(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]), road("1"))
        .unwrap();
    let far = g.get_or_create_node(&Coordinate::new(10.0, 5.0));
    let near = g.get_or_create_node(&Coordinate::new(4.0, 0.0));
    let corner = g.get_or_create_node(&Coordinate::new(10.0, 0.0));

    let parts = g.split_edge(e, &[far, near, corner]).unwrap();
    assert_eq!(parts.len(), 4);
    let lines: Vec<Vec<Coordinate>> = parts
        .iter()
        .map(|&id| g.live_edge(id).unwrap().line().to_vec())
        .collect();
    assert_eq!(lines[0], line(&[(0.0, 0.0), (4.0, 0.0)]));
    assert_eq!(lines[1], line(&[(4.0, 0.0), (10.0, 0.0)]));
    assert_eq!(lines[2], line(&[(10.0, 0.0), (10.0, 5.0)]));
    assert_eq!(lines[3], line(&[(10.0, 5.0), (10.0, 10.0)]));
    for &id in &parts {
        assert_eq!(g.live_edge(id).unwrap().payload().id, "1");
    }
    assert_eq!(g.node(near).unwrap().degree(), 2);
    assert!(g.live_edge(e).is_none());
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_split_snaps_fragment_ends_to_off_line_node() {
    let mut g = graph();
    let e = g.add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), road("1")).unwrap();
    let node = g.get_or_create_node(&Coordinate::new(5.0, 0.004));
    let parts = g.split_edge(e, &[node]).unwrap();
    assert_eq!(parts.len(), 2);
    assert!(g.live_edge(parts[0]).unwrap().last().eq_2d(&Coordinate::new(5.0, 0.004)));
    assert_eq!(g.live_edge(parts[1]).unwrap().from_node(), node);
}

#[test]
fn test_merge_concatenates_without_duplicate_vertex() {
    let mut g = graph();
    let a = g.add_edge(line(&[(0.0, 0.0), (5.0, 5.0)]), road("a")).unwrap();
    let b = g.add_edge(line(&[(5.0, 5.0), (10.0, 10.0)]), road("b")).unwrap();
    let mid = g.node_at(&Coordinate::new(5.0, 5.0)).unwrap();

    let merged = g.merge(mid, a, b).unwrap();
    let edge = g.live_edge(merged).unwrap();
    assert_eq!(edge.line(), line(&[(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]).as_slice());
    assert_eq!(edge.payload().id, "a");
    assert!(g.node(mid).is_none());
    assert_eq!(g.node_count(), 2);
    assert_eq!(g.edge_count(), 1);
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_merge_orients_reversed_edges() {
    let mut g = graph();
    // Both stored pointing away from the shared node
    let a = g.add_edge(line(&[(5.0, 0.0), (0.0, 0.0)]), road("a")).unwrap();
    let b = g.add_edge(line(&[(5.0, 0.0), (10.0, 0.0)]), road("b")).unwrap();
    let mid = g.node_at(&Coordinate::new(5.0, 0.0)).unwrap();
    let merged = g.merge(mid, a, b).unwrap();
    assert_eq!(
        g.live_edge(merged).unwrap().line(),
        line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]).as_slice()
    );
}

#[test]
fn test_invalid_merge_leaves_graph_untouched() {
    let mut g = graph();
    let a = g.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), road("a")).unwrap();
    let b = g.add_edge(line(&[(20.0, 0.0), (25.0, 0.0)]), road("b")).unwrap();
    let node = g.node_at(&Coordinate::new(5.0, 0.0)).unwrap();

    let err = g.merge(node, a, b).unwrap_err();
    assert!(matches!(err, GraphError::InvalidMerge { .. }));
    assert!(matches!(g.merge(node, a, a), Err(GraphError::InvalidMerge { .. })));
    assert_eq!(g.edge_count(), 2);
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_move_node_updates_incident_lines() {
    let mut g = graph();
    let a = g.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), road("a")).unwrap();
    let b = g.add_edge(line(&[(5.0, 0.0), (5.0, 5.0)]), road("b")).unwrap();
    let node = g.node_at(&Coordinate::new(5.0, 0.0)).unwrap();

    let kept = g.move_node(node, &Coordinate::new(5.5, 0.5)).unwrap();
    assert_eq!(kept, node);
    assert!(g.live_edge(a).unwrap().last().eq_2d(&Coordinate::new(5.5, 0.5)));
    assert!(g.live_edge(b).unwrap().first().eq_2d(&Coordinate::new(5.5, 0.5)));
    assert!(g.node_at(&Coordinate::new(5.0, 0.0)).is_none());
    assert_eq!(g.find_node(&Coordinate::new(5.4, 0.4), 0.2), Some(node));
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_move_node_onto_existing_node_coalesces() {
    let mut g = graph();
    g.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), road("a")).unwrap();
    g.add_edge(line(&[(5.2, 0.0), (10.0, 0.0)]), road("b")).unwrap();
    let left = g.node_at(&Coordinate::new(5.0, 0.0)).unwrap();
    let right = g.node_at(&Coordinate::new(5.2, 0.0)).unwrap();

    let mid = Coordinate::new(5.1, 0.0);
    let first = g.move_node(left, &mid).unwrap();
    let second = g.move_node(right, &mid).unwrap();
    assert_eq!(first, left);
    assert_eq!(second, left);
    assert!(g.node(right).is_none());
    assert_eq!(g.node(left).unwrap().degree(), 2);
    assert!(g.invariant_violations().is_empty());
}

#[test]
fn test_find_node_picks_closest() {
    let mut g = graph();
    let a = g.get_or_create_node(&Coordinate::new(0.0, 0.0));
    let b = g.get_or_create_node(&Coordinate::new(1.0, 0.0));
    assert_eq!(g.find_node(&Coordinate::new(0.7, 0.0), 1.0), Some(b));
    assert_eq!(g.find_node(&Coordinate::new(0.2, 0.0), 1.0), Some(a));
    assert_eq!(g.find_node(&Coordinate::new(5.0, 5.0), 1.0), None);
    assert_eq!(g.node_count(), 2);
}

#[test]
fn test_loop_edge_counts_twice() {
    let mut g = graph();
    let ring = g
        .add_edge(
            line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]),
            road("ring"),
        )
        .unwrap();
    let node = g.node_at(&Coordinate::new(0.0, 0.0)).unwrap();
    assert_eq!(g.node(node).unwrap().degree(), 2);
    assert!(g.invariant_violations().is_empty());
    g.remove_edge(ring).unwrap();
    assert_eq!(g.node_count(), 0);
}

#[test]
fn test_from_payloads_reports_degenerate_features() {
    let good = road("1").with_geometry(line(&[(0.0, 0.0), (1.0, 1.0)]));
    let bad = road("2").with_geometry(line(&[(3.0, 3.0)]));
    let (g, rejected) = Graph::from_payloads(PrecisionModel::floating(), vec![good, bad]);
    assert_eq!(g.edge_count(), 1);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, "road:2");
}
