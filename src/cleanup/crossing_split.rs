use super::{CleanupPass, PassContext, PassStats, edge_subject, node_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::error::GraphError;
use crate::geometry::crossing_points;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::payload::Payload;
use crate::precision::PrecisionModel;
use log::debug;
use std::collections::VecDeque;
use std::f64::consts::SQRT_2;

/// Split every live edge passing within `tolerance` of `node` at its nearest
/// point to the node. Edges already ending at the node are skipped, as are
/// edges whose nearest point is one of their own endpoints.
///
/// Returns each edge that was cut together with its fragments.
pub fn split_edges_near_node<T: Payload>(
    graph: &mut Graph<T>,
    node: NodeId,
    tolerance: f64,
) -> Result<Vec<(EdgeId, Vec<EdgeId>)>, GraphError> {
    let at = *graph.node(node).ok_or(GraphError::UnknownNode(node))?.coordinate();
    let mut cut = Vec::new();
    for id in graph.edges_near(&at, tolerance) {
        let Some(edge) = graph.live_edge(id) else {
            continue;
        };
        if edge.from_node() == node || edge.to_node() == node {
            continue;
        }
        let parts = graph.split_edge(id, &[node])?;
        if parts.len() > 1 {
            cut.push((id, parts));
        }
    }
    Ok(cut)
}

/// Nodes every proper crossing between two edges and splits both edges
/// there, along with any other edge passing within `tolerance` of the new
/// node.
///
/// The crossing point is snapped before the node is made, so the reach used
/// for the near-node split never drops below the snap displacement of the
/// graph's precision grid.
#[derive(Clone, Copy, Debug)]
pub struct CrossingEdgeSplitter {
    pub tolerance: f64,
}

impl Default for CrossingEdgeSplitter {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

impl CrossingEdgeSplitter {
    pub fn reach(&self, precision: &PrecisionModel) -> f64 {
        self.tolerance.max(precision.half_cell() * SQRT_2)
    }
}

impl<T: Payload> CleanupPass<T> for CrossingEdgeSplitter {
    fn name(&self) -> &'static str {
        "crossing-split"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        let reach = self.reach(graph.precision());
        // Fragments go back on the queue, they may cross something further along
        let mut queue: VecDeque<EdgeId> = graph.edge_ids().into();

        while let Some(id) = queue.pop_front() {
            let Some(edge) = graph.live_edge(id) else {
                continue;
            };
            stats.visited += 1;
            let candidates: Vec<EdgeId> = graph
                .edges_in(edge.envelope())
                .into_iter()
                .filter(|&c| c != id)
                .collect();

            for other in candidates {
                let points = match (graph.live_edge(id), graph.live_edge(other)) {
                    (Some(a), Some(b)) => crossing_points(a.line(), b.line(), graph.precision()),
                    (None, _) => break,
                    _ => continue,
                };
                for point in points {
                    let node = graph.get_or_create_node(&point);
                    let mut cut_any = false;
                    match split_edges_near_node(graph, node, reach) {
                        Ok(cut) => {
                            for (old, parts) in cut {
                                debug!("crossing at {} split {} into {} parts", point, old, parts.len());
                                stats.split += 1;
                                cut_any = true;
                                queue.extend(parts);
                            }
                        }
                        Err(err) => ctx.operation_failed(edge_subject(graph, id), &err),
                    }

                    // The crossing pair itself is always cut, however far the snap moved the point
                    for crossing in [id, other] {
                        let Some(e) = graph.live_edge(crossing) else {
                            continue;
                        };
                        if e.from_node() == node || e.to_node() == node {
                            continue;
                        }
                        match graph.split_edge(crossing, &[node]) {
                            Ok(parts) if parts.len() > 1 => {
                                stats.split += 1;
                                cut_any = true;
                                queue.extend(parts);
                            }
                            Ok(_) => {}
                            Err(err) => ctx.operation_failed(edge_subject(graph, crossing), &err),
                        }
                    }

                    if !cut_any {
                        let other_label = graph
                            .edge(other)
                            .map(|e| e.payload().label())
                            .unwrap_or_else(|| other.to_string());
                        ctx.emit(Diagnostic::review(
                            Category::IntersectingEdges,
                            edge_subject(graph, id),
                            format!("crosses {} at {} but neither edge could be split there", other_label, point),
                        ));
                    }
                    // A crossing that cut nothing leaves an isolated node behind
                    if let Err(err) = graph.prune_node(node) {
                        ctx.operation_failed(node_subject(graph, node), &err);
                    }
                }
            }
        }
        stats
    }
}
