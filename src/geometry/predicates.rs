use crate::precision::{CoordKey, Coordinate, PrecisionModel};
use ahash::AHashSet;
use geo::Line;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};

/// Vertex-for-vertex mapping from one line onto an equal line.
///
/// Open lines map either straight through or reversed. Closed rings may
/// also start at a different vertex, recorded in `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCorrespondence {
    pub reversed: bool,
    pub offset: usize,
    pub ring: bool,
}

impl LineCorrespondence {
    /// Index in the other line matching vertex `i` of this one.
    pub fn map(&self, i: usize, len: usize) -> usize {
        if self.ring {
            let r = len - 1;
            let i = i % r;
            if self.reversed {
                (self.offset + r - i) % r
            } else {
                (self.offset + i) % r
            }
        } else if self.reversed {
            len - 1 - i
        } else {
            i
        }
    }
}

fn is_closed(line: &[Coordinate]) -> bool {
    line.len() > 2 && line[0].eq_2d(&line[line.len() - 1])
}

/// Find how `b` lines up with `a` when both have the same vertices in the
/// plane, in either direction. Z and M are not compared.
pub fn line_correspondence(a: &[Coordinate], b: &[Coordinate]) -> Option<LineCorrespondence> {
    let n = a.len();
    if n != b.len() || n < 2 {
        return None;
    }

    if is_closed(a) && is_closed(b) {
        let r = n - 1;
        // Linear scan for the vertex of b where a starts
        for offset in (0..r).filter(|&k| b[k].eq_2d(&a[0])) {
            for reversed in [false, true] {
                let corr = LineCorrespondence {
                    reversed,
                    offset,
                    ring: true,
                };
                if (0..r).all(|i| a[i].eq_2d(&b[corr.map(i, n)])) {
                    return Some(corr);
                }
            }
        }
        return None;
    }

    // A reversed ordering starts where the other line ends
    let reversed = !a[0].eq_2d(&b[0]) && a[0].eq_2d(&b[n - 1]);
    let corr = LineCorrespondence {
        reversed,
        offset: 0,
        ring: false,
    };
    if (0..n).all(|i| a[i].eq_2d(&b[corr.map(i, n)])) {
        return Some(corr);
    }
    // Palindromic start/end (a == b at both ends): try the other orientation too
    let flipped = LineCorrespondence {
        reversed: !reversed,
        ..corr
    };
    if (0..n).all(|i| a[i].eq_2d(&b[flipped.map(i, n)])) {
        return Some(flipped);
    }
    None
}

/// Planar equality of two lines, ignoring direction.
pub fn lines_equal(a: &[Coordinate], b: &[Coordinate]) -> bool {
    line_correspondence(a, b).is_some()
}

/// Two lines with the same vertex count whose interior vertices match in
/// some orientation, while the endpoints may differ. Returns whether `b`
/// runs reversed relative to `a`.
pub fn interior_correspondence(a: &[Coordinate], b: &[Coordinate]) -> Option<bool> {
    let n = a.len();
    if n != b.len() || n < 2 {
        return None;
    }
    let forward = (1..n - 1).all(|i| a[i].eq_2d(&b[i]));
    let reversed = (1..n - 1).all(|i| a[i].eq_2d(&b[n - 1 - i]));
    match (forward, reversed) {
        (true, false) => Some(false),
        (false, true) => Some(true),
        (false, false) => None,
        (true, true) => {
            let fwd = a[0].distance_2d(&b[0]) + a[n - 1].distance_2d(&b[n - 1]);
            let rev = a[0].distance_2d(&b[n - 1]) + a[n - 1].distance_2d(&b[0]);
            Some(rev < fwd)
        }
    }
}

fn segment(a: &Coordinate, b: &Coordinate) -> Option<Line<f64>> {
    if a.eq_2d(b) {
        None
    } else {
        Some(Line::new(a.to_geo(), b.to_geo()))
    }
}

/// True when the two lines share a collinear stretch of positive length.
pub fn linear_overlap(a: &[Coordinate], b: &[Coordinate]) -> bool {
    for wa in a.windows(2) {
        let Some(sa) = segment(&wa[0], &wa[1]) else {
            continue;
        };
        for wb in b.windows(2) {
            let Some(sb) = segment(&wb[0], &wb[1]) else {
                continue;
            };
            if let Some(LineIntersection::Collinear { intersection }) = line_intersection(sa, sb) {
                if intersection.start != intersection.end {
                    return true;
                }
            }
        }
    }
    false
}

/// Snapped points where `a` and `b` cross, excluding points that coincide
/// with an endpoint of either line. Collinear overlaps are not crossings.
pub fn crossing_points(a: &[Coordinate], b: &[Coordinate], precision: &PrecisionModel) -> Vec<Coordinate> {
    let (Some(a_first), Some(a_last), Some(b_first), Some(b_last)) =
        (a.first(), a.last(), b.first(), b.last())
    else {
        return Vec::new();
    };
    let endpoints = [
        precision.snap(a_first),
        precision.snap(a_last),
        precision.snap(b_first),
        precision.snap(b_last),
    ];

    let mut seen: AHashSet<CoordKey> = AHashSet::new();
    let mut points = Vec::new();
    for wa in a.windows(2) {
        let Some(sa) = segment(&wa[0], &wa[1]) else {
            continue;
        };
        for wb in b.windows(2) {
            let Some(sb) = segment(&wb[0], &wb[1]) else {
                continue;
            };
            if let Some(LineIntersection::SinglePoint { intersection, .. }) = line_intersection(sa, sb) {
                let p = precision.snap(&Coordinate::from(intersection));
                if endpoints.iter().any(|e| e.eq_2d(&p)) {
                    continue;
                }
                if seen.insert(CoordKey::of(&p)) {
                    points.push(p);
                }
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pts: &[(f64, f64)]) -> Vec<Coordinate> {
        pts.iter().map(|&p| Coordinate::from(p)).collect()
    }

    #[test]
    fn test_equal_ignoring_direction() {
        let a = line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let b = line(&[(10.0, 0.0), (5.0, 0.0), (0.0, 0.0)]);
        let corr = line_correspondence(&a, &b).unwrap();
        assert!(corr.reversed);
        assert_eq!(corr.map(0, 3), 2);
        assert!(lines_equal(&a, &a));
        assert!(!lines_equal(&a, &line(&[(0.0, 0.0), (5.0, 1.0), (10.0, 0.0)])));
        assert!(!lines_equal(&a, &line(&[(0.0, 0.0), (10.0, 0.0)])));
    }

    #[test]
    fn test_rotated_ring_is_equal() {
        let a = line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]);
        let b = line(&[(4.0, 4.0), (4.0, 0.0), (0.0, 0.0), (0.0, 4.0), (4.0, 4.0)]);
        let corr = line_correspondence(&a, &b).unwrap();
        assert!(corr.ring);
        assert!(corr.reversed);
        for i in 0..a.len() {
            assert!(a[i].eq_2d(&b[corr.map(i, a.len())]));
        }
    }

    #[test]
    fn test_linear_overlap() {
        let a = line(&[(0.0, 0.0), (10.0, 0.0)]);
        let b = line(&[(5.0, 0.0), (15.0, 0.0), (15.0, 5.0)]);
        assert!(linear_overlap(&a, &b));
        let touching = line(&[(10.0, 0.0), (10.0, 5.0)]);
        assert!(!linear_overlap(&a, &touching));
    }

    #[test]
    fn test_crossing_points_skip_endpoints() {
        let pm = PrecisionModel::fixed(1000.0);
        let a = line(&[(0.0, 0.0), (10.0, 10.0)]);
        let b = line(&[(0.0, 10.0), (10.0, 0.0)]);
        let pts = crossing_points(&a, &b, &pm);
        assert_eq!(pts.len(), 1);
        assert!(pts[0].eq_2d(&Coordinate::new(5.0, 5.0)));

        // T junction: b ends on a
        let t = line(&[(5.0, 5.0), (5.0, 20.0)]);
        assert!(crossing_points(&a, &t, &pm).is_empty());
    }

    #[test]
    fn test_interior_correspondence() {
        let a = line(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let b = line(&[(10.0, 1.0), (5.0, 0.0), (0.5, 0.0)]);
        assert_eq!(interior_correspondence(&a, &b), Some(true));
        let c = line(&[(0.0, 0.0), (6.0, 0.0), (10.0, 0.0)]);
        assert_eq!(interior_correspondence(&a, &c), None);
    }
}
