// ===========================================================================
// Coordinates and Precision Snapping
// ===========================================================================
//
// Every coordinate that enters a Graph is snapped onto a fixed grid first.
// Node identity, line equality and crossing detection all compare snapped
// values with exact floating point equality.
// ===========================================================================

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2 to 4 axis position. Absent `z`/`m` values are stored as NaN.
#[derive(Clone, Copy, Debug)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: f64::NAN,
            m: f64::NAN,
        }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            m: f64::NAN,
        }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self { x, y, z, m }
    }

    pub fn has_z(&self) -> bool {
        !self.z.is_nan()
    }

    pub fn has_m(&self) -> bool {
        !self.m.is_nan()
    }

    /// Elevation is treated as unknown when it is NaN or exactly zero.
    pub fn is_z_missing(&self) -> bool {
        self.z.is_nan() || self.z == 0.0
    }

    /// Planar equality, ignoring z and m.
    pub fn eq_2d(&self, other: &Coordinate) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn distance_2d(&self, other: &Coordinate) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Midpoint in the plane. Z is averaged when both sides carry one,
    /// otherwise whichever side has it wins.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        let z = match (self.has_z(), other.has_z()) {
            (true, true) => (self.z + other.z) / 2.0,
            (true, false) => self.z,
            (false, true) => other.z,
            (false, false) => f64::NAN,
        };
        Coordinate {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z,
            m: f64::NAN,
        }
    }

    /// Same planar position, keeping this coordinate's z and m.
    pub fn moved_to(&self, target: &Coordinate) -> Coordinate {
        Coordinate {
            x: target.x,
            y: target.y,
            z: self.z,
            m: self.m,
        }
    }

    pub fn to_geo(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Coordinate::new(c.x, c.y)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Coordinate::new(x, y)
    }
}

impl From<(f64, f64, f64)> for Coordinate {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Coordinate::with_z(x, y, z)
    }
}

fn axis_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Per-axis exact equality. Two absent (NaN) values compare equal.
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && axis_eq(self.z, other.z) && axis_eq(self.m, other.m)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}", self.x, self.y)?;
        if self.has_z() {
            write!(f, ", z={}", self.z)?;
        }
        if self.has_m() {
            write!(f, ", m={}", self.m)?;
        }
        write!(f, ")")
    }
}

// Serialized as a GeoJSON-like position: [x, y], [x, y, z] or [x, y, z|null, m].
impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.has_m() {
            4
        } else if self.has_z() {
            3
        } else {
            2
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.x)?;
        seq.serialize_element(&self.y)?;
        if len >= 3 {
            seq.serialize_element(&self.has_z().then_some(self.z))?;
        }
        if len == 4 {
            seq.serialize_element(&self.m)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PositionVisitor;

        impl<'de> Visitor<'de> for PositionVisitor {
            type Value = Coordinate;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a position of 2 to 4 numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Coordinate, A::Error> {
                let x: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let y: f64 = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let z: Option<f64> = seq.next_element::<Option<f64>>()?.flatten();
                let m: Option<f64> = seq.next_element::<Option<f64>>()?.flatten();
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(5, &self));
                }
                Ok(Coordinate::xyzm(
                    x,
                    y,
                    z.unwrap_or(f64::NAN),
                    m.unwrap_or(f64::NAN),
                ))
            }
        }

        deserializer.deserialize_seq(PositionVisitor)
    }
}

/// Hashable key of a snapped planar position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CoordKey(u64, u64);

impl CoordKey {
    pub(crate) fn of(c: &Coordinate) -> Self {
        // -0.0 and 0.0 must hash the same
        let norm = |v: f64| if v == 0.0 { 0.0f64 } else { v };
        CoordKey(norm(c.x).to_bits(), norm(c.y).to_bits())
    }
}

/// Grid snapping with an independent scale per axis.
///
/// A scale of `1000.0` keeps three decimal places. A scale of zero (or any
/// non-finite or negative scale) leaves that axis untouched.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrecisionModel {
    #[serde(default)]
    pub xy: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub m: f64,
}

impl Default for PrecisionModel {
    fn default() -> Self {
        Self::floating()
    }
}

impl PrecisionModel {
    /// No snapping on any axis.
    pub fn floating() -> Self {
        Self {
            xy: 0.0,
            z: 0.0,
            m: 0.0,
        }
    }

    /// Snap x and y to `1 / scale`; z and m are left alone.
    pub fn fixed(scale: f64) -> Self {
        Self {
            xy: scale,
            z: 0.0,
            m: 0.0,
        }
    }

    pub fn with_z_scale(mut self, scale: f64) -> Self {
        self.z = scale;
        self
    }

    pub fn with_m_scale(mut self, scale: f64) -> Self {
        self.m = scale;
        self
    }

    pub fn is_floating(&self) -> bool {
        !Self::active(self.xy)
    }

    fn active(scale: f64) -> bool {
        scale.is_finite() && scale > 0.0
    }

    pub fn snap_value(value: f64, scale: f64) -> f64 {
        if !Self::active(scale) || !value.is_finite() {
            return value;
        }
        let snapped = (value * scale).round() / scale;
        if snapped == 0.0 { 0.0 } else { snapped }
    }

    pub fn snap(&self, c: &Coordinate) -> Coordinate {
        Coordinate {
            x: Self::snap_value(c.x, self.xy),
            y: Self::snap_value(c.y, self.xy),
            z: Self::snap_value(c.z, self.z),
            m: Self::snap_value(c.m, self.m),
        }
    }

    pub fn snap_line(&self, line: &[Coordinate]) -> Vec<Coordinate> {
        line.iter().map(|c| self.snap(c)).collect()
    }

    /// Half the grid spacing in the plane, the largest planar move a snap can make per axis.
    pub fn half_cell(&self) -> f64 {
        if Self::active(self.xy) {
            0.5 / self.xy
        } else {
            0.0
        }
    }
}
