// ===========================================================================
// Cleanup configuration
// ===========================================================================

use crate::error::ConfigError;
use crate::payload::FieldSet;
use crate::precision::PrecisionModel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One cleanup pass, as named in a config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassKind {
    RedundantVertices,
    EqualLines,
    LinearOverlap,
    PseudoNodes,
    PolygonNodes,
    CrossingSplit,
    NearParallel,
}

/// Which side of an unresolved overlap a review diagnostic points at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapRule {
    #[default]
    RemoveShorter,
    RemoveLonger,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub precision: PrecisionModel,
    /// Largest gap between mismatched overlap endpoints that gets snapped shut.
    pub snap_tolerance: f64,
    /// Reach of the split-near-node step after a crossing is found.
    pub split_tolerance: f64,
    pub near_parallel_distance: f64,
    pub near_parallel_max_angle_deg: f64,
    pub drop_collinear: bool,
    pub overlap_rule: OverlapRule,
    /// Attribute names ignored on top of `id` and `geometry`.
    pub excluded_fields: Vec<String>,
    pub passes: Vec<PassKind>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            precision: PrecisionModel::floating(),
            snap_tolerance: 2.0,
            split_tolerance: 0.01,
            near_parallel_distance: 1.0,
            near_parallel_max_angle_deg: 30.0,
            drop_collinear: false,
            overlap_rule: OverlapRule::RemoveShorter,
            excluded_fields: Vec::new(),
            passes: vec![
                PassKind::RedundantVertices,
                PassKind::EqualLines,
                PassKind::LinearOverlap,
                PassKind::PseudoNodes,
                PassKind::CrossingSplit,
            ],
        }
    }
}

impl CleanupConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn field_set(&self) -> FieldSet {
        FieldSet::with(self.excluded_fields.iter().cloned())
    }

    pub fn near_parallel_max_angle(&self) -> f64 {
        self.near_parallel_max_angle_deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg = CleanupConfig::from_ron_str(
            r#"(
                precision: (xy: 1000.0),
                snap_tolerance: 0.5,
                excluded_fields: ["source", "updated"],
                passes: [EqualLines, PseudoNodes],
            )"#,
        )
        .unwrap();
        assert_eq!(cfg.precision, PrecisionModel::fixed(1000.0));
        assert_eq!(cfg.snap_tolerance, 0.5);
        assert_eq!(cfg.split_tolerance, 0.01);
        assert_eq!(cfg.passes, vec![PassKind::EqualLines, PassKind::PseudoNodes]);
        let fields = cfg.field_set();
        assert!(fields.contains("source"));
        assert!(fields.contains("id"));
        assert!((cfg.near_parallel_max_angle() - std::f64::consts::FRAC_PI_6).abs() < 1e-12);
    }

    #[test]
    fn test_bad_config_is_a_parse_error() {
        let err = CleanupConfig::from_ron_str("(snap_tolerance: \"far\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = CleanupConfig::from_ron_file("/nonexistent/linework.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
