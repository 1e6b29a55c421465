//! Planar helpers shared by the graph and the cleanup passes.

pub mod envelope;
pub mod measure;
pub mod predicates;

pub use envelope::{Envelope, expand, line_envelope, point_envelope};
pub use measure::{LinePosition, line_length, locate_point, point_segment_distance};
pub use predicates::{LineCorrespondence, crossing_points, line_correspondence, lines_equal};
