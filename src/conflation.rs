// ===========================================================================
// Conflation
// ===========================================================================
//
// Matches the edges of two independently built graphs of the same area,
// using the same line equality and overlap predicates as the cleanup passes.
// ===========================================================================

use crate::error::ConflationError;
use crate::geometry::predicates::{linear_overlap, lines_equal};
use crate::graph::{Edge, EdgeId, Graph};
use crate::payload::{AttributeMatcher, Payload};
use ahash::AHashSet;
use log::info;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Equal line and equal attributes.
    Identical,
    /// Equal line, attributes differ.
    AttributesChanged,
    /// Same-kind edges overlapping along part of their length.
    GeometryChanged,
    /// Left edge with no counterpart on the right.
    Removed,
    /// Right edge nothing on the left matched.
    Added,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchedEdge {
    pub id: EdgeId,
    pub label: String,
}

impl MatchedEdge {
    fn of<T: Payload>(edge: &Edge<T>) -> Self {
        Self {
            id: edge.id(),
            label: edge.payload().label(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConflationMatch {
    pub kind: MatchKind,
    pub left: Option<MatchedEdge>,
    pub right: Vec<MatchedEdge>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConflationReport {
    pub matches: Vec<ConflationMatch>,
}

impl ConflationReport {
    pub fn count(&self, kind: MatchKind) -> usize {
        self.matches.iter().filter(|m| m.kind == kind).count()
    }

    pub fn of_kind(&self, kind: MatchKind) -> impl Iterator<Item = &ConflationMatch> {
        self.matches.iter().filter(move |m| m.kind == kind)
    }
}

pub struct Conflator<T> {
    matcher: AttributeMatcher<T>,
}

impl<T: Payload> Conflator<T> {
    pub fn new(matcher: AttributeMatcher<T>) -> Self {
        Self { matcher }
    }

    /// Classify every live left edge against `right`, then list the right
    /// edges nothing claimed as added.
    ///
    /// Equal lines are preferred over overlaps. Among equal lines an
    /// attribute-equal, not yet claimed edge wins.
    pub fn match_graphs(&self, left: &Graph<T>, right: &Graph<T>) -> Result<ConflationReport, ConflationError> {
        if left.precision() != right.precision() {
            return Err(ConflationError::PrecisionMismatch {
                left: *left.precision(),
                right: *right.precision(),
            });
        }

        let mut report = ConflationReport::default();
        let mut claimed: AHashSet<EdgeId> = AHashSet::new();

        for edge in left.edges() {
            let same_kind: Vec<&Edge<T>> = right
                .edges_in(edge.envelope())
                .into_iter()
                .filter_map(|id| right.live_edge(id))
                .filter(|other| other.payload().kind() == edge.payload().kind())
                .collect();

            let equal: Vec<&Edge<T>> = same_kind
                .iter()
                .copied()
                .filter(|other| lines_equal(edge.line(), other.line()))
                .collect();
            let identical = equal
                .iter()
                .copied()
                .filter(|other| self.matcher.matches(edge.payload(), other.payload()))
                .min_by_key(|other| claimed.contains(&other.id()));

            let (kind, matched): (MatchKind, Vec<&Edge<T>>) = if let Some(other) = identical {
                (MatchKind::Identical, vec![other])
            } else if let Some(other) = equal.iter().copied().min_by_key(|o| claimed.contains(&o.id())) {
                (MatchKind::AttributesChanged, vec![other])
            } else {
                let overlapping: Vec<&Edge<T>> = same_kind
                    .iter()
                    .copied()
                    .filter(|other| linear_overlap(edge.line(), other.line()))
                    .collect();
                if overlapping.is_empty() {
                    (MatchKind::Removed, Vec::new())
                } else {
                    (MatchKind::GeometryChanged, overlapping)
                }
            };

            claimed.extend(matched.iter().map(|e| e.id()));
            report.matches.push(ConflationMatch {
                kind,
                left: Some(MatchedEdge::of(edge)),
                right: matched.into_iter().map(MatchedEdge::of).collect(),
            });
        }

        for edge in right.edges().filter(|e| !claimed.contains(&e.id())) {
            report.matches.push(ConflationMatch {
                kind: MatchKind::Added,
                left: None,
                right: vec![MatchedEdge::of(edge)],
            });
        }

        info!(
            "conflation: {} identical, {} attributes changed, {} geometry changed, {} removed, {} added",
            report.count(MatchKind::Identical),
            report.count(MatchKind::AttributesChanged),
            report.count(MatchKind::GeometryChanged),
            report.count(MatchKind::Removed),
            report.count(MatchKind::Added)
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Record;
    use crate::precision::{Coordinate, PrecisionModel};

    fn line(pts: &[(f64, f64)]) -> Vec<Coordinate> {
        pts.iter().map(|&p| Coordinate::from(p)).collect()
    }

    fn road(id: &str, surface: &str) -> Record {
        Record::new(id, "road").with_attribute("surface", surface)
    }

    #[test]
    fn test_classifies_all_five_outcomes() {
        let pm = PrecisionModel::fixed(100.0);
        let mut left = Graph::new(pm);
        let mut right = Graph::new(pm);

        left.add_edge(line(&[(0.0, 0.0), (10.0, 0.0)]), road("same", "paved")).unwrap();
        right.add_edge(line(&[(10.0, 0.0), (0.0, 0.0)]), road("same", "paved")).unwrap();

        left.add_edge(line(&[(0.0, 5.0), (10.0, 5.0)]), road("resurfaced", "gravel")).unwrap();
        right.add_edge(line(&[(0.0, 5.0), (10.0, 5.0)]), road("resurfaced", "paved")).unwrap();

        left.add_edge(line(&[(0.0, 10.0), (10.0, 10.0)]), road("extended", "paved")).unwrap();
        right.add_edge(line(&[(0.0, 10.0), (14.0, 10.0)]), road("extended", "paved")).unwrap();

        left.add_edge(line(&[(0.0, 20.0), (10.0, 20.0)]), road("demolished", "paved")).unwrap();
        right.add_edge(line(&[(0.0, 30.0), (10.0, 30.0)]), road("new", "paved")).unwrap();

        let report = Conflator::new(AttributeMatcher::for_records())
            .match_graphs(&left, &right)
            .unwrap();
        let kinds: Vec<MatchKind> = report.matches.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MatchKind::Identical,
                MatchKind::AttributesChanged,
                MatchKind::GeometryChanged,
                MatchKind::Removed,
                MatchKind::Added
            ]
        );
        assert_eq!(report.matches[4].right[0].label, "road:new");
        assert!(report.matches[3].right.is_empty());
    }

    #[test]
    fn test_precision_must_agree() {
        let left: Graph<Record> = Graph::new(PrecisionModel::fixed(100.0));
        let right: Graph<Record> = Graph::new(PrecisionModel::floating());
        let err = Conflator::new(AttributeMatcher::for_records())
            .match_graphs(&left, &right)
            .unwrap_err();
        assert!(matches!(err, ConflationError::PrecisionMismatch { .. }));
    }
}
