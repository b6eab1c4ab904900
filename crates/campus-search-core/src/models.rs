//! Core data models that flow through search and ingestion.
//!
//! Documents are schemaless JSON objects keyed by `(collection, id)`.
//! Only [`ProjectedRecord`]s ever leave the system; raw documents stay
//! inside the store and the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Collection written by the ingestion job and read by the upcoming events query.
pub const EVENTS_COLLECTION: &str = "events";

/// A searchable domain. Its vector namespace and document collection
/// share the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainTag {
    Courses,
    Clubs,
    Professors,
}

impl DomainTag {
    pub const ALL: [DomainTag; 3] = [DomainTag::Courses, DomainTag::Clubs, DomainTag::Professors];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainTag::Courses => "courses",
            DomainTag::Clubs => "clubs",
            DomainTag::Professors => "professors",
        }
    }

    /// Vector index namespace searched for this domain.
    pub fn namespace(&self) -> &'static str {
        self.as_str()
    }

    /// Document store collection hydrated for this domain.
    pub fn collection(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "courses" | "classes" => Ok(DomainTag::Courses),
            "clubs" => Ok(DomainTag::Clubs),
            "professors" => Ok(DomainTag::Professors),
            other => Err(Error::bad_request(format!(
                "unknown domain '{}'. Use courses, clubs, or professors.",
                other
            ))),
        }
    }
}

/// One nearest-neighbor hit from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier shared with the document store.
    pub id: String,
    /// Provider-defined similarity, higher is closer.
    pub score: f64,
}

impl Match {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// A stored document: an id plus a JSON object of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON value. Non-object values produce an
    /// empty field map.
    pub fn from_value(id: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Public output shape for one search hit or one upcoming event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedRecord(Map<String, Value>);

impl ProjectedRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The `score` field, present on every search projection.
    pub fn score(&self) -> Option<f64> {
        self.0.get("score").and_then(Value::as_f64)
    }
}
