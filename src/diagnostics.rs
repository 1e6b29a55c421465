// ===========================================================================
// Diagnostics
// ===========================================================================
//
// Cleanup passes never abort on an irreconcilable item. They leave the
// candidates in place and emit a diagnostic to a caller-supplied sink.
// ===========================================================================

use crate::graph::{EdgeId, NodeId};
use crate::precision::Coordinate;
use log::{error, warn};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// Ambiguous geometry an operator has to look at.
    Review,
    /// Conflicting values or a failed operation.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AmbiguousMerge,
    EqualGeometryDifferentAttributes,
    ElevationConflict,
    IntersectingEdges,
    NearParallel,
    DegenerateEdge,
    InvalidOperation,
    EqualLocationDifferentAttributes,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AmbiguousMerge => "ambiguous-merge",
            Category::EqualGeometryDifferentAttributes => "equal-geometry-different-attributes",
            Category::ElevationConflict => "elevation-conflict",
            Category::IntersectingEdges => "intersecting-edges",
            Category::NearParallel => "near-parallel",
            Category::DegenerateEdge => "degenerate-edge",
            Category::InvalidOperation => "invalid-operation",
            Category::EqualLocationDifferentAttributes => "equal-location-different-attributes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a diagnostic is about: a feature on an edge, a node, or a bare location.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    Edge { id: EdgeId, label: String },
    Node { id: NodeId, at: Coordinate },
    Location { at: Coordinate },
    Feature { label: String },
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Edge { id, label } => write!(f, "{} ({})", label, id),
            Subject::Node { id, at } => write!(f, "node {} at {}", id, at),
            Subject::Location { at } => write!(f, "{}", at),
            Subject::Feature { label } => f.write_str(label),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub subject: Subject,
    pub detail: String,
}

impl Diagnostic {
    pub fn review(category: Category, subject: Subject, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Review,
            category,
            subject,
            detail: detail.into(),
        }
    }

    pub fn error(category: Category, subject: Subject, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            subject,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {} {}: {}", self.severity, self.category, self.subject, self.detail)
    }
}

/// Receives diagnostics as passes produce them.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards every diagnostic to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Review => warn!("{}", diagnostic),
            Severity::Error => error!("{}", diagnostic),
        }
    }
}

/// Collects diagnostics and logs them as they arrive.
#[derive(Debug, Default)]
pub struct Collector {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for Collector {
    fn emit(&mut self, diagnostic: Diagnostic) {
        LogSink.emit(diagnostic.clone());
        self.diagnostics.push(diagnostic);
    }
}

impl Collector {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}
