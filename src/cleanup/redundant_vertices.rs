use super::{CleanupPass, PassContext, PassStats, edge_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::graph::Graph;
use crate::payload::Payload;
use crate::precision::Coordinate;

/// Drops repeated vertices, A-B-A spikes and, optionally, exactly collinear
/// vertices that carry no elevation. Endpoints never move.
#[derive(Clone, Copy, Debug, Default)]
pub struct RedundantVertexRemoval {
    pub drop_collinear: bool,
}

fn is_between_collinear(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> bool {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if cross != 0.0 {
        return false;
    }
    // b must sit on the segment a-c, not beyond either end
    let dot = (b.x - a.x) * (c.x - a.x) + (b.y - a.y) * (c.y - a.y);
    let len_sq = (c.x - a.x).powi(2) + (c.y - a.y).powi(2);
    dot > 0.0 && dot < len_sq
}

/// The simplified line. It always starts and ends where `line` does.
pub(crate) fn simplify_line(line: &[Coordinate], drop_collinear: bool) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(line.len());
    for v in line {
        if let Some(last) = out.last_mut() {
            if last.eq_2d(v) {
                if last.is_z_missing() && !v.is_z_missing() {
                    last.z = v.z;
                }
                continue;
            }
        }
        let n = out.len();
        if n >= 2 && out[n - 2].eq_2d(v) {
            // Spike: drop the tip, the base already equals v
            out.pop();
            continue;
        }
        out.push(*v);
        let n = out.len();
        if drop_collinear && n >= 3 && !out[n - 2].has_z() && is_between_collinear(&out[n - 3], &out[n - 2], &out[n - 1]) {
            out.remove(n - 2);
        }
    }
    out
}

impl<T: Payload> CleanupPass<T> for RedundantVertexRemoval {
    fn name(&self) -> &'static str {
        "redundant-vertices"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        for id in graph.edge_ids() {
            let Some(edge) = graph.live_edge(id) else {
                continue;
            };
            stats.visited += 1;
            let simplified = simplify_line(edge.line(), self.drop_collinear);
            if simplified.len() == edge.line().len() {
                continue;
            }
            if simplified.len() < 2 {
                ctx.emit(Diagnostic::error(
                    Category::DegenerateEdge,
                    edge_subject(graph, id),
                    format!("{} vertices collapse onto a single point", edge.line().len()),
                ));
                continue;
            }
            match graph.replace_edge(id, simplified) {
                Ok(_) => stats.changed += 1,
                Err(err) => ctx.operation_failed(edge_subject(graph, id), &err),
            }
        }
        stats
    }
}
