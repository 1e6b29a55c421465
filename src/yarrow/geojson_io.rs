use anyhow::{Context, Result, bail};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use linework::{Coordinate, Record};
use log::{debug, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Features read from one GeoJSON file, split by what the graph does with them.
#[derive(Debug, Default)]
pub struct Features {
    /// One record per line string part or polygon ring.
    pub lines: Vec<Record>,
    pub points: Vec<Record>,
    pub skipped: usize,
}

fn coordinate(position: &[f64]) -> Option<Coordinate> {
    match position {
        [x, y] => Some(Coordinate::new(*x, *y)),
        [x, y, z] => Some(Coordinate::with_z(*x, *y, *z)),
        [x, y, z, m, ..] => Some(Coordinate::xyzm(*x, *y, *z, *m)),
        _ => None,
    }
}

fn coordinates(positions: &[Vec<f64>]) -> Option<Vec<Coordinate>> {
    positions.iter().map(|p| coordinate(p)).collect()
}

fn position(c: &Coordinate) -> Vec<f64> {
    let mut p = vec![c.x, c.y];
    if c.has_z() {
        p.push(c.z);
        if c.has_m() {
            p.push(c.m);
        }
    }
    p
}

fn feature_id(feature: &Feature, index: usize) -> String {
    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => match feature.property("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => index.to_string(),
        },
    }
}

fn lines(ls: &[Vec<Vec<f64>>]) -> Option<Vec<(bool, Vec<Coordinate>)>> {
    ls.iter().map(|l| coordinates(l).map(|c| (false, c))).collect()
}

/// Parts of a geometry as (is_point, coordinates).
fn parts(value: &Value) -> Option<Vec<(bool, Vec<Coordinate>)>> {
    match value {
        Value::Point(p) => Some(vec![(true, vec![coordinate(p)?])]),
        Value::MultiPoint(ps) => ps.iter().map(|p| Some((true, vec![coordinate(p)?]))).collect(),
        Value::LineString(l) => Some(vec![(false, coordinates(l)?)]),
        Value::MultiLineString(ls) => lines(ls),
        Value::Polygon(rings) => lines(rings),
        Value::MultiPolygon(polys) => {
            let mut all = Vec::new();
            for rings in polys {
                all.extend(lines(rings)?);
            }
            Some(all)
        }
        Value::GeometryCollection(_) => None,
    }
}

pub fn read_features(path: &Path, kind_field: &str) -> Result<Features> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("parsing GeoJSON in {}", path.display()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => bail!("{} holds a bare geometry, expected features", path.display()),
    };

    let mut out = Features::default();
    for (index, feature) in collection.iter().enumerate() {
        let id = feature_id(feature, index);
        let Some(geometry) = &feature.geometry else {
            warn!("feature {} has no geometry, skipped", id);
            out.skipped += 1;
            continue;
        };
        let Some(parts) = parts(&geometry.value) else {
            warn!("feature {} has an unsupported or malformed geometry, skipped", id);
            out.skipped += 1;
            continue;
        };

        let kind = match feature.property(kind_field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "feature".to_string(),
        };
        let mut record = Record::new(id.clone(), kind);
        if let Some(properties) = &feature.properties {
            record.attributes = properties.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }

        let count = parts.len();
        for (i, (is_point, coords)) in parts.into_iter().enumerate() {
            let mut part = record.clone().with_geometry(coords);
            if count > 1 {
                part.id = format!("{}#{}", id, i);
            }
            if is_point {
                out.points.push(part);
            } else {
                out.lines.push(part);
            }
        }
    }
    debug!(
        "read {} line parts and {} points from {}",
        out.lines.len(),
        out.points.len(),
        path.display()
    );
    Ok(out)
}

fn to_feature(record: &Record) -> Feature {
    let value = match record.geometry.as_slice() {
        [single] => Value::Point(position(single)),
        line => Value::LineString(line.iter().map(position).collect()),
    };
    let properties: JsonObject = record
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(record.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn write_features<'a>(path: &Path, records: impl IntoIterator<Item = &'a Record>) -> Result<()> {
    let geojson = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: records.into_iter().map(to_feature).collect(),
        foreign_members: None,
    });
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &geojson)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_split_multi_geometries() {
        let value = Value::MultiLineString(vec![
            vec![vec![0.0, 0.0], vec![1.0, 1.0, 5.0]],
            vec![vec![2.0, 2.0], vec![3.0, 3.0]],
        ]);
        let split = parts(&value).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].1[1].z, 5.0);
        assert!(!split[1].0);
        assert!(parts(&Value::LineString(vec![vec![0.0]])).is_none());
    }

    #[test]
    fn test_position_keeps_elevation_only_when_present() {
        assert_eq!(position(&Coordinate::new(1.0, 2.0)), vec![1.0, 2.0]);
        assert_eq!(position(&Coordinate::with_z(1.0, 2.0, 3.0)), vec![1.0, 2.0, 3.0]);
    }
}
