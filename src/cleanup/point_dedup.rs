use crate::diagnostics::{Category, Diagnostic, DiagnosticSink, Subject};
use crate::graph::{Graph, NodeId};
use crate::payload::{AttributeMatcher, Payload};
use ahash::AHashMap;
use log::info;

/// Point features that survived deduplication, each with the node marking
/// its location.
#[derive(Debug)]
pub struct PointDedup<T> {
    pub kept: Vec<(NodeId, T)>,
    pub duplicates: usize,
}

/// Deduplicate point features by location.
///
/// Each feature's first coordinate is resolved to a node. Features at a node
/// already holding an attribute-equal feature are dropped. Features at an
/// occupied node whose attributes match nothing there are kept and reported.
pub fn dedup_points<T: Payload>(
    graph: &mut Graph<T>,
    points: impl IntoIterator<Item = T>,
    matcher: &AttributeMatcher<T>,
    sink: &mut dyn DiagnosticSink,
) -> PointDedup<T> {
    let mut result = PointDedup {
        kept: Vec::new(),
        duplicates: 0,
    };
    let mut at_node: AHashMap<NodeId, Vec<usize>> = AHashMap::new();

    for point in points {
        let Some(coord) = point.geometry().first().copied() else {
            sink.emit(Diagnostic::error(
                Category::InvalidOperation,
                Subject::Feature { label: point.label() },
                "point feature has no coordinate",
            ));
            continue;
        };
        let node = graph.get_or_create_node(&coord);
        let here = at_node.entry(node).or_default();
        if here.iter().any(|&k| matcher.matches(&result.kept[k].1, &point)) {
            result.duplicates += 1;
            continue;
        }
        if let Some(&first) = here.first() {
            let at = graph.node(node).map_or(coord, |n| *n.coordinate());
            sink.emit(Diagnostic::error(
                Category::EqualLocationDifferentAttributes,
                Subject::Node { id: node, at },
                format!(
                    "{} shares its location with {} but attributes differ",
                    point.label(),
                    result.kept[first].1.label()
                ),
            ));
        }
        here.push(result.kept.len());
        result.kept.push((node, point));
    }
    info!(
        "point dedup: kept {}, dropped {} duplicates",
        result.kept.len(),
        result.duplicates
    );
    result
}
