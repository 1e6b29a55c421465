use super::traversal::Processed;
use super::{CleanupPass, PassContext, PassStats, edge_subject};
use crate::diagnostics::{Category, Diagnostic};
use crate::geometry::{LineCorrespondence, line_correspondence};
use crate::graph::{EdgeId, Graph};
use crate::payload::Payload;
use crate::precision::Coordinate;
use log::debug;

/// Removes edges whose line repeats another same-kind edge vertex for vertex,
/// in either direction. The first edge met survives.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqualLineDedup;

/// Elevations on the duplicate disagree with the keeper at a vertex.
#[derive(Debug, PartialEq)]
pub(crate) struct ZConflict {
    pub vertex: usize,
    pub keeper: f64,
    pub duplicate: f64,
}

/// Fill the keeper's unknown elevations from the duplicate. Returns the
/// updated keeper line, or None when nothing needed filling.
pub(crate) fn reconcile_z(
    keeper: &[Coordinate],
    duplicate: &[Coordinate],
    corr: &LineCorrespondence,
) -> Result<Option<Vec<Coordinate>>, ZConflict> {
    let n = keeper.len();
    let mut merged = keeper.to_vec();
    let mut filled = false;
    for (i, k) in keeper.iter().enumerate() {
        let d = &duplicate[corr.map(i, n)];
        match (k.is_z_missing(), d.is_z_missing()) {
            (true, false) => {
                merged[i].z = d.z;
                filled = true;
            }
            (false, false) if k.z != d.z => {
                return Err(ZConflict {
                    vertex: i,
                    keeper: k.z,
                    duplicate: d.z,
                });
            }
            _ => {}
        }
    }
    Ok(filled.then_some(merged))
}

impl<T: Payload> CleanupPass<T> for EqualLineDedup {
    fn name(&self) -> &'static str {
        "equal-lines"
    }

    fn run(&self, graph: &mut Graph<T>, ctx: &mut PassContext<'_, T>) -> PassStats {
        let mut stats = PassStats::new(CleanupPass::<T>::name(self));
        let mut processed: Processed<EdgeId> = Processed::new();

        for start in graph.edge_ids() {
            if processed.contains(start) || graph.live_edge(start).is_none() {
                continue;
            }
            processed.mark(start);
            stats.visited += 1;
            let mut keeper = start;

            let candidates: Vec<(EdgeId, LineCorrespondence)> = {
                let Some(edge) = graph.live_edge(keeper) else {
                    continue;
                };
                graph
                    .edges_in(edge.envelope())
                    .into_iter()
                    .filter(|&c| c != keeper && !processed.contains(c))
                    .filter_map(|c| {
                        let other = graph.live_edge(c)?;
                        if other.payload().kind() != edge.payload().kind() {
                            return None;
                        }
                        line_correspondence(edge.line(), other.line()).map(|corr| (c, corr))
                    })
                    .collect()
            };

            for (dup, corr) in candidates {
                let (Some(k), Some(d)) = (graph.live_edge(keeper), graph.live_edge(dup)) else {
                    continue;
                };
                if !ctx.matcher.matches(k.payload(), d.payload()) {
                    ctx.emit(Diagnostic::error(
                        Category::EqualGeometryDifferentAttributes,
                        edge_subject(graph, keeper),
                        format!("same line as {} ({}) but attributes differ", d.payload().label(), dup),
                    ));
                    continue;
                }

                let filled = match reconcile_z(k.line(), d.line(), &corr) {
                    Ok(filled) => filled,
                    Err(conflict) => {
                        ctx.emit(Diagnostic::error(
                            Category::ElevationConflict,
                            edge_subject(graph, keeper),
                            format!(
                                "vertex {} has z {} here but {} on {} ({})",
                                conflict.vertex,
                                conflict.keeper,
                                conflict.duplicate,
                                d.payload().label(),
                                dup
                            ),
                        ));
                        continue;
                    }
                };

                if let Some(line) = filled {
                    match graph.replace_edge(keeper, line) {
                        Ok(new_id) => {
                            processed.mark(new_id);
                            stats.changed += 1;
                            keeper = new_id;
                        }
                        Err(err) => {
                            ctx.operation_failed(edge_subject(graph, keeper), &err);
                            continue;
                        }
                    }
                }
                match graph.remove_edge(dup) {
                    Ok(()) => {
                        debug!("removed {} as a duplicate of {}", dup, keeper);
                        processed.mark(dup);
                        stats.removed += 1;
                    }
                    Err(err) => ctx.operation_failed(edge_subject(graph, dup), &err),
                }
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

    fn run(graph: &mut Graph<Record>) -> (PassStats, Vec<Diagnostic>) {
        let matcher = AttributeMatcher::for_records();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut ctx = PassContext::new(&matcher, &mut sink);
        let stats = EqualLineDedup.run(graph, &mut ctx);
        (stats, sink)
    }

    #[test]
    fn test_reconcile_fills_missing_and_flags_conflicts() {
        let keeper = vec![Coordinate::new(0.0, 0.0), Coordinate::with_z(1.0, 0.0, 0.0)];
        let dup = vec![Coordinate::with_z(1.0, 0.0, 4.0), Coordinate::with_z(0.0, 0.0, 3.0)];
        let corr = line_correspondence(&keeper, &dup).unwrap();
        let filled = reconcile_z(&keeper, &dup, &corr).unwrap().unwrap();
        assert_eq!(filled[0].z, 3.0);
        assert_eq!(filled[1].z, 4.0);

        let clash = vec![Coordinate::with_z(0.0, 0.0, 5.0), Coordinate::with_z(1.0, 0.0, 4.0)];
        let corr = line_correspondence(&filled, &clash).unwrap();
        assert_eq!(
            reconcile_z(&filled, &clash, &corr),
            Err(ZConflict {
                vertex: 0,
                keeper: 3.0,
                duplicate: 5.0
            })
        );
        assert_eq!(reconcile_z(&filled, &filled, &corr_identity()), Ok(None));
    }

    fn corr_identity() -> LineCorrespondence {
        LineCorrespondence {
            reversed: false,
            offset: 0,
            ring: false,
        }
    }

    #[test]
    fn test_different_attributes_keep_both() {
        let mut graph = Graph::new(PrecisionModel::floating());
        let pts = line(&[(0.0, 0.0), (1.0, 1.0)]);
        graph.add_edge(pts.clone(), Record::new("1", "road").with_attribute("name", "A")).unwrap();
        graph.add_edge(pts, Record::new("2", "road").with_attribute("name", "B")).unwrap();

        let (stats, diagnostics) = run(&mut graph);
        assert_eq!(stats.removed, 0);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].category, Category::EqualGeometryDifferentAttributes);
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let mut graph = Graph::new(PrecisionModel::floating());
        let pts = line(&[(0.0, 0.0), (1.0, 1.0)]);
        graph.add_edge(pts.clone(), Record::new("1", "road")).unwrap();
        graph.add_edge(pts, Record::new("2", "rail")).unwrap();

        let (stats, diagnostics) = run(&mut graph);
        assert_eq!(stats.removed, 0);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_rings_match_from_any_start_vertex() {
        let mut graph = Graph::new(PrecisionModel::floating());
        graph
            .add_edge(
                line(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 0.0)]),
                Record::new("1", "parcel"),
            )
            .unwrap();
        graph
            .add_edge(
                line(&[(2.0, 2.0), (2.0, 0.0), (0.0, 0.0), (2.0, 2.0)]),
                Record::new("2", "parcel"),
            )
            .unwrap();

        let (stats, _) = run(&mut graph);
        assert_eq!(stats.removed, 1);
        assert_eq!(graph.edges().next().unwrap().payload().id, "1");
        assert!(graph.invariant_violations().is_empty());
    }
}
