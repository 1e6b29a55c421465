use crate::precision::Coordinate;
use geo::Line;
use geo::algorithm::line_intersection::line_intersection;
use std::f64::consts::PI;

pub fn segment_length(a: &Coordinate, b: &Coordinate) -> f64 {
    a.distance_2d(b)
}

/// Sum of segment lengths in the plane.
pub fn line_length(line: &[Coordinate]) -> f64 {
    line.windows(2).map(|w| segment_length(&w[0], &w[1])).sum()
}

/// Closest point to `p` on segment `a`-`b`, with its parameter in [0, 1].
/// Z is interpolated when both segment ends carry one.
pub fn closest_point_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> (Coordinate, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= 0.0 {
        return (*a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let point = Coordinate::with_z(a.x + dx * t, a.y + dy * t, interpolate_z(a, b, t));
    (point, t)
}

pub fn interpolate_z(a: &Coordinate, b: &Coordinate, t: f64) -> f64 {
    if a.has_z() && b.has_z() {
        a.z + (b.z - a.z) * t
    } else {
        f64::NAN
    }
}

pub fn point_segment_distance(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    p.distance_2d(&closest)
}

/// Where a point projects onto a line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinePosition {
    /// Index of the segment (vertex `segment` to vertex `segment + 1`).
    pub segment: usize,
    /// Parameter along that segment, in [0, 1].
    pub fraction: f64,
    /// Distance from the start of the line, measured along it.
    pub distance_along: f64,
    /// Planar distance from the point to the line.
    pub distance: f64,
    /// The projected point.
    pub point: Coordinate,
}

/// Nearest position on `line` to `p`. Ties go to the earliest segment.
pub fn locate_point(line: &[Coordinate], p: &Coordinate) -> Option<LinePosition> {
    if line.len() < 2 {
        return None;
    }
    let mut best: Option<LinePosition> = None;
    let mut walked = 0.0;
    for (i, w) in line.windows(2).enumerate() {
        let (point, t) = closest_point_on_segment(p, &w[0], &w[1]);
        let distance = p.distance_2d(&point);
        let seg_len = segment_length(&w[0], &w[1]);
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(LinePosition {
                segment: i,
                fraction: t,
                distance_along: walked + seg_len * t,
                distance,
                point,
            });
        }
        walked += seg_len;
    }
    best
}

/// Distance from a point to the nearest segment of a line.
pub fn point_line_distance(p: &Coordinate, line: &[Coordinate]) -> f64 {
    match line.len() {
        0 => f64::INFINITY,
        1 => p.distance_2d(&line[0]),
        _ => line
            .windows(2)
            .map(|w| point_segment_distance(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Minimum distance between two segments. Zero when they intersect.
pub fn segment_distance(a0: &Coordinate, a1: &Coordinate, b0: &Coordinate, b1: &Coordinate) -> f64 {
    if line_intersection(Line::new(a0.to_geo(), a1.to_geo()), Line::new(b0.to_geo(), b1.to_geo()))
        .is_some()
    {
        return 0.0;
    }
    point_segment_distance(a0, b0, b1)
        .min(point_segment_distance(a1, b0, b1))
        .min(point_segment_distance(b0, a0, a1))
        .min(point_segment_distance(b1, a0, a1))
}

/// Heading of the segment in radians, or None for a zero-length segment.
pub fn direction(a: &Coordinate, b: &Coordinate) -> Option<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    Some(dy.atan2(dx))
}

/// Angle between two headings ignoring orientation, in [0, PI/2].
pub fn undirected_angle(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % PI;
    if diff > PI / 2.0 { PI - diff } else { diff }
}
