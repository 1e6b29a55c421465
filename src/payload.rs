// ===========================================================================
// Feature payloads and attribute equality
// ===========================================================================

use crate::precision::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The opaque feature carried by every edge.
///
/// The graph keeps `geometry` in step with the edge line, so a payload read
/// back after cleanup always describes the surviving geometry.
pub trait Payload: Clone {
    /// Logical feature type. Only features of the same kind are deduplicated
    /// or compared for overlap.
    fn kind(&self) -> &str;

    /// Short human-readable identity used in diagnostics.
    fn label(&self) -> String;

    fn geometry(&self) -> &[Coordinate];

    fn set_geometry(&mut self, line: Vec<Coordinate>);
}

/// Attribute names an equality check ignores. `id` and `geometry` are always in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSet(BTreeSet<String>);

impl FieldSet {
    pub const ALWAYS: [&'static str; 2] = ["id", "geometry"];

    pub fn new() -> Self {
        Self(Self::ALWAYS.iter().map(|s| s.to_string()).collect())
    }

    pub fn with<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        set.0.extend(fields.into_iter().map(Into::into));
        set
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::new()
    }
}

pub type EqualityFn<T> = dyn Fn(&T, &T, &FieldSet) -> bool;

/// Caller-supplied attribute equality plus the fields it ignores.
pub struct AttributeMatcher<T> {
    predicate: Box<EqualityFn<T>>,
    excluded: FieldSet,
}

impl<T: Payload> AttributeMatcher<T> {
    pub fn new(predicate: impl Fn(&T, &T, &FieldSet) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            excluded: FieldSet::new(),
        }
    }

    pub fn excluding(mut self, excluded: FieldSet) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn excluded(&self) -> &FieldSet {
        &self.excluded
    }

    /// Same kind and equal attributes outside the excluded set.
    pub fn matches(&self, a: &T, b: &T) -> bool {
        a.kind() == b.kind() && (self.predicate)(a, b, &self.excluded)
    }
}

impl AttributeMatcher<Record> {
    pub fn for_records() -> Self {
        Self::new(Record::attributes_equal)
    }
}

/// A ready-made payload: an identified, typed bag of JSON attribute values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
}

impl Record {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            attributes: BTreeMap::new(),
            geometry: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<Coordinate>) -> Self {
        self.geometry = geometry;
        self
    }

    /// Attribute equality over the union of both key sets. A key missing on
    /// one side equals an explicit JSON null on the other.
    pub fn attributes_equal(a: &Record, b: &Record, excluded: &FieldSet) -> bool {
        let null = serde_json::Value::Null;
        a.attributes
            .keys()
            .chain(b.attributes.keys())
            .filter(|k| !excluded.contains(k))
            .all(|k| a.attributes.get(k).unwrap_or(&null) == b.attributes.get(k).unwrap_or(&null))
    }
}

impl Payload for Record {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn label(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }

    fn geometry(&self) -> &[Coordinate] {
        &self.geometry
    }

    fn set_geometry(&mut self, line: Vec<Coordinate>) {
        self.geometry = line;
    }
}
