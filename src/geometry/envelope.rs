use crate::precision::Coordinate;
use rstar::AABB;

/// Axis-aligned bounding box in the plane.
pub type Envelope = AABB<[f64; 2]>;

/// Bounding box of a line's vertices. An empty line yields an empty
/// envelope at the origin.
pub fn line_envelope(line: &[Coordinate]) -> Envelope {
    if line.is_empty() {
        return AABB::from_point([0.0, 0.0]);
    }
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for pt in line {
        min_x = min_x.min(pt.x);
        min_y = min_y.min(pt.y);
        max_x = max_x.max(pt.x);
        max_y = max_y.max(pt.y);
    }
    AABB::from_corners([min_x, min_y], [max_x, max_y])
}

pub fn point_envelope(c: &Coordinate) -> Envelope {
    AABB::from_point([c.x, c.y])
}

/// Grow an envelope by `distance` on every side.
pub fn expand(envelope: &Envelope, distance: f64) -> Envelope {
    let lower = envelope.lower();
    let upper = envelope.upper();
    AABB::from_corners(
        [lower[0] - distance, lower[1] - distance],
        [upper[0] + distance, upper[1] + distance],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_envelope() {
        let line = vec![
            Coordinate::new(3.0, -1.0),
            Coordinate::new(-2.0, 4.0),
            Coordinate::new(0.0, 0.0),
        ];
        let env = line_envelope(&line);
        assert_eq!(env.lower(), [-2.0, -1.0]);
        assert_eq!(env.upper(), [3.0, 4.0]);

        let grown = expand(&env, 0.5);
        assert_eq!(grown.lower(), [-2.5, -1.5]);
        assert_eq!(grown.upper(), [3.5, 4.5]);
    }
}
