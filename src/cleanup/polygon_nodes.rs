use super::pseudo_nodes::{merge_pairs, pair_edges};
use super::{CleanupPass, PassContext, PassStats, node_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::graph::Graph;
use crate::payload::Payload;
use itertools::Itertools;

/// Pseudo-node removal for ring boundaries.
///
/// At each node every edge looks for the one edge with matching attributes
/// running the opposite way around the boundary. Pairs whose match is unique
/// on both sides are merged forwards into backwards, so a ring cut into arcs
/// closes back into one loop edge. Edges with several candidates stay put
/// and the node is reported, but other unique pairs at the same node are
/// still merged.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolygonNodeRemoval;

impl<T: Payload> CleanupPass<T> for PolygonNodeRemoval {
    fn name(&self) -> &'static str {
        "polygon-nodes"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        for node in graph.node_ids() {
            if graph.node(node).is_none_or(|n| n.degree() <= 1) {
                continue;
            }
            stats.visited += 1;
            let pairing = pair_edges(graph, node, ctx);
            if !pairing.ambiguous.is_empty() {
                ctx.emit(Diagnostic::review(
                    Category::AmbiguousMerge,
                    node_subject(graph, node),
                    format!(
                        "ring arcs {} have several matching continuations",
                        pairing.ambiguous.iter().join(", ")
                    ),
                ));
            }
            merge_pairs(graph, node, &pairing.pairs, ctx, &mut stats);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AttributeMatcher, Record};
    use crate::precision::{Coordinate, PrecisionModel};

    fn line(pts: &[(f64, f64)]) -> Vec<Coordinate> {
        pts.iter().map(|&p| Coordinate::from(p)).collect()
    }

    fn parcel(id: &str, owner: &str) -> Record {
        Record::new(id, "parcel").with_attribute("owner", owner)
    }

    #[test]
    fn test_ring_arcs_close_into_one_loop() {
        let mut graph = Graph::new(PrecisionModel::floating());
        graph
            .add_edge(line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]), parcel("a", "x"))
            .unwrap();
        graph
            .add_edge(line(&[(4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]), parcel("b", "x"))
            .unwrap();

        let matcher = AttributeMatcher::for_records();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut ctx = PassContext::new(&matcher, &mut sink);
        let stats = PolygonNodeRemoval.run(&mut graph, &mut ctx);

        assert_eq!(stats.merged, 1);
        assert_eq!(graph.edge_count(), 1);
        let ring = graph.edges().next().unwrap();
        assert!(ring.is_loop());
        assert_eq!(ring.line().len(), 5);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.invariant_violations().is_empty());
    }

    #[test]
    fn test_unique_pairs_merge_beside_an_ambiguous_edge() {
        let mut graph = Graph::new(PrecisionModel::floating());
        // Shared node (5, 0): one owner-y pair, and an owner-x edge that could
        // continue into either of two owner-x edges
        graph.add_edge(line(&[(0.0, 0.0), (5.0, 0.0)]), parcel("y1", "y")).unwrap();
        graph.add_edge(line(&[(5.0, 0.0), (5.0, -5.0)]), parcel("y2", "y")).unwrap();
        graph.add_edge(line(&[(0.0, 5.0), (5.0, 0.0)]), parcel("x1", "x")).unwrap();
        graph.add_edge(line(&[(5.0, 0.0), (10.0, 0.0)]), parcel("x2", "x")).unwrap();
        graph.add_edge(line(&[(5.0, 0.0), (10.0, 5.0)]), parcel("x3", "x")).unwrap();

        let matcher = AttributeMatcher::for_records();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut ctx = PassContext::new(&matcher, &mut sink);
        let stats = PolygonNodeRemoval.run(&mut graph, &mut ctx);

        assert_eq!(stats.merged, 1);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].category, Category::AmbiguousMerge);
    }
}
