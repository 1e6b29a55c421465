use super::traversal::ProcessedPairs;
use super::{CleanupPass, PassContext, PassStats, edge_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::geometry::measure::{direction, point_segment_distance, segment_distance, undirected_angle};
use crate::geometry::{expand, line_envelope};
use crate::graph::{EdgeId, Graph};
use crate::payload::Payload;
use crate::precision::Coordinate;
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::f64::consts::FRAC_PI_6;

/// The closest segment pairing between a target line and one edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NearParallelMatch {
    pub edge: EdgeId,
    /// Segment index on the edge.
    pub segment: usize,
    /// Segment index on the target line.
    pub target_segment: usize,
    pub distance: f64,
    /// Radians, in [0, PI/2].
    pub angle: f64,
}

/// Read-only search for edges running alongside a line.
#[derive(Clone, Copy, Debug)]
pub struct NearParallelFinder {
    pub max_distance: f64,
    pub max_angle: f64,
}

impl NearParallelFinder {
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            max_angle: FRAC_PI_6,
        }
    }

    pub fn with_max_angle(mut self, radians: f64) -> Self {
        self.max_angle = radians;
        self
    }

    fn segment_gap(a0: &Coordinate, a1: &Coordinate, b0: &Coordinate, b1: &Coordinate) -> f64 {
        // Segments meeting at a vertex only count if their far ends stay close
        let shared = [(a0, b0), (a0, b1), (a1, b0), (a1, b1)]
            .into_iter()
            .position(|(p, q)| p.eq_2d(q));
        match shared {
            Some(0) => point_segment_distance(a1, b0, b1).min(point_segment_distance(b1, a0, a1)),
            Some(1) => point_segment_distance(a1, b0, b1).min(point_segment_distance(b0, a0, a1)),
            Some(2) => point_segment_distance(a0, b0, b1).min(point_segment_distance(b1, a0, a1)),
            Some(_) => point_segment_distance(a0, b0, b1).min(point_segment_distance(b0, a0, a1)),
            None => segment_distance(a0, a1, b0, b1),
        }
    }

    /// Edges with a segment within `max_distance` of a segment of `target`
    /// and heading within `max_angle` of it, best match per edge, by edge id.
    pub fn find<T: Payload>(&self, graph: &Graph<T>, target: &[Coordinate], exclude: Option<EdgeId>) -> Vec<NearParallelMatch> {
        let mut best: AHashMap<EdgeId, NearParallelMatch> = AHashMap::new();
        for (ti, t) in target.windows(2).enumerate() {
            let Some(heading) = direction(&t[0], &t[1]) else {
                continue;
            };
            let search = expand(&line_envelope(t), self.max_distance);
            for id in graph.edges_in(&search) {
                if Some(id) == exclude {
                    continue;
                }
                let Some(edge) = graph.live_edge(id) else {
                    continue;
                };
                for (si, s) in edge.line().windows(2).enumerate() {
                    let Some(other) = direction(&s[0], &s[1]) else {
                        continue;
                    };
                    let angle = undirected_angle(heading, other);
                    if angle > self.max_angle {
                        continue;
                    }
                    let distance = Self::segment_gap(&t[0], &t[1], &s[0], &s[1]);
                    if distance > self.max_distance {
                        continue;
                    }
                    let candidate = NearParallelMatch {
                        edge: id,
                        segment: si,
                        target_segment: ti,
                        distance,
                        angle,
                    };
                    best.entry(id)
                        .and_modify(|m| {
                            let key = |m: &NearParallelMatch| (OrderedFloat(m.distance), OrderedFloat(m.angle));
                            if key(&candidate) < key(m) {
                                *m = candidate;
                            }
                        })
                        .or_insert(candidate);
                }
            }
        }
        let mut matches: Vec<NearParallelMatch> = best.into_values().collect();
        matches.sort_by_key(|m| m.edge);
        matches
    }

    pub fn find_for_edge<T: Payload>(&self, graph: &Graph<T>, id: EdgeId) -> Vec<NearParallelMatch> {
        match graph.live_edge(id) {
            Some(edge) => self.find(graph, edge.line(), Some(id)),
            None => Vec::new(),
        }
    }
}

/// Reports each near-parallel edge pair once. Never mutates.
#[derive(Clone, Copy, Debug)]
pub struct NearParallelReport {
    pub finder: NearParallelFinder,
}

impl<T: Payload> CleanupPass<T> for NearParallelReport {
    fn name(&self) -> &'static str {
        "near-parallel"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        let mut seen = ProcessedPairs::new();
        for id in graph.edge_ids() {
            stats.visited += 1;
            for m in self.finder.find_for_edge(graph, id) {
                if !seen.mark(id, m.edge) {
                    continue;
                }
                let other = graph.edge(m.edge).map(|e| e.payload().label()).unwrap_or_default();
                ctx.emit(Diagnostic::review(
                    Category::NearParallel,
                    edge_subject(graph, id),
                    format!(
                        "runs {:.3} from {} ({}) at {:.1} degrees",
                        m.distance,
                        other,
                        m.edge,
                        m.angle.to_degrees()
                    ),
                ));
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AttributeMatcher, Record};
    use crate::precision::PrecisionModel;

    fn line(pts: &[(f64, f64)]) -> Vec<Coordinate> {
        pts.iter().map(|&p| Coordinate::from(p)).collect()
    }

    fn sample() -> (Graph<Record>, EdgeId, EdgeId, EdgeId, EdgeId) {
        let mut graph = Graph::new(PrecisionModel::floating());
        let base = graph
            .add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), Record::new("base", "road"))
            .unwrap();
        let close = graph
            .add_edge(line(&[(1.0, 0.5), (9.0, 0.8)]), Record::new("close", "road"))
            .unwrap();
        let steep = graph
            .add_edge(line(&[(4.0, 0.5), (6.0, 3.0)]), Record::new("steep", "road"))
            .unwrap();
        let far = graph
            .add_edge(line(&[(0.0, 3.0), (10.0, 3.0)]), Record::new("far", "road"))
            .unwrap();
        (graph, base, close, steep, far)
    }

    #[test]
    fn test_finds_close_shallow_edges_only() {
        let (graph, base, close, _, _) = sample();
        let finder = NearParallelFinder::new(1.0);
        let found = finder.find_for_edge(&graph, base);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].edge, close);
        assert!((found[0].distance - 0.5).abs() < 1e-9);
        assert!(found[0].angle < FRAC_PI_6);
    }

    #[test]
    fn test_shared_vertex_measures_far_ends() {
        let mut graph = Graph::new(PrecisionModel::floating());
        let a = graph
            .add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), Record::new("a", "road"))
            .unwrap();
        graph
            .add_edge(line(&[(0.0, 0.0), (10.0, 3.0)]), Record::new("fan", "road"))
            .unwrap();
        let finder = NearParallelFinder::new(1.0);
        assert!(finder.find_for_edge(&graph, a).is_empty());
    }

    #[test]
    fn test_report_names_each_pair_once() {
        let (mut graph, ..) = sample();
        let matcher = AttributeMatcher::for_records();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut ctx = PassContext::new(&matcher, &mut sink);
        let pass = NearParallelReport {
            finder: NearParallelFinder::new(1.0),
        };
        let edges_before = graph.edge_count();
        pass.run(&mut graph, &mut ctx);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].category, Category::NearParallel);
        assert_eq!(graph.edge_count(), edges_before);
    }
}
