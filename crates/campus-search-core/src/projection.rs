//! Domain projections: stored document → public record.
//!
//! Each domain is described as data ([`Projection`]) rather than code:
//! a whitelist of copied fields, optional fields, and derived fields built
//! from `{field}` templates. The retrieval pipeline only sees the
//! [`DomainProjector`] capability.
//!
//! # Field rules
//!
//! | Kind | Present in document | Absent (or `null` for optional) |
//! |------|---------------------|---------------------------------|
//! | `fields` | copied verbatim | omitted |
//! | `optional` | copied verbatim | omitted |
//! | `derived` | template rendered | rendered with `""` substituted, logged at `warn` |
//!
//! Search projections always carry `score`.

use serde_json::Value;
use tracing::warn;

use crate::models::{Document, DomainTag, ProjectedRecord};

/// Capability the pipeline uses to shape a hydrated document.
pub trait DomainProjector: Send + Sync {
    /// Build the public record for `doc`, setting `score` to the match score.
    fn project(&self, doc: &Document, score: f64) -> ProjectedRecord;
}

/// A `{field}` template such as `https://host/course/{mnemonic}/{number}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Field(String),
}

impl Template {
    /// Parse a template. An unmatched `{` is kept as literal text.
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            parts.push(Part::Field(rest[open + 1..open + close].to_string()));
            rest = &rest[open + close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }
        Self { parts }
    }

    /// Render against `doc`, returning the text and the fields that were missing.
    pub fn render(&self, doc: &Document) -> (String, Vec<&str>) {
        let mut out = String::new();
        let mut missing = Vec::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Field(name) => match doc.get(name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Null) | None => missing.push(name.as_str()),
                    Some(other) => out.push_str(&other.to_string()),
                },
            }
        }
        (out, missing)
    }
}

/// Declarative projection for one domain.
#[derive(Debug, Clone)]
pub struct Projection {
    name: &'static str,
    fields: Vec<String>,
    optional: Vec<String>,
    derived: Vec<(String, Template)>,
}

impl Projection {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            optional: Vec::new(),
            derived: Vec::new(),
        }
    }

    pub fn fields(mut self, names: &[&str]) -> Self {
        self.fields.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn optional(mut self, names: &[&str]) -> Self {
        self.optional.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn derived(mut self, name: &str, template: &str) -> Self {
        self.derived
            .push((name.to_string(), Template::parse(template)));
        self
    }

    /// Apply the projection without a score (used for event listings).
    pub fn apply(&self, doc: &Document) -> ProjectedRecord {
        let mut record = ProjectedRecord::new();

        for field in &self.fields {
            if let Some(value) = doc.get(field) {
                record.insert(field.clone(), value.clone());
            }
        }

        for field in &self.optional {
            match doc.get(field) {
                Some(Value::Null) | None => {}
                Some(value) => record.insert(field.clone(), value.clone()),
            }
        }

        for (name, template) in &self.derived {
            let (rendered, missing) = template.render(doc);
            if !missing.is_empty() {
                warn!(
                    projection = self.name,
                    doc_id = %doc.id,
                    field = %name,
                    missing = ?missing,
                    "derived field rendered with missing source values"
                );
            }
            record.insert(name.clone(), Value::String(rendered));
        }

        record
    }
}

impl DomainProjector for Projection {
    fn project(&self, doc: &Document, score: f64) -> ProjectedRecord {
        let mut record = self.apply(doc);
        record.insert("score", Value::from(score));
        record
    }
}

const PRESENCE_CAMPUS_ID: &str = "cea28f2b-baa9-4c47-8879-da8d675e4471";

pub fn courses() -> Projection {
    Projection::new("courses")
        .fields(&["title", "description", "avg_rating"])
        .derived(
            "url",
            "https://thecourseforum.com/course/{mnemonic}/{number}",
        )
        .derived("ref", "{mnemonic} {number}")
}

pub fn clubs() -> Projection {
    Projection::new("clubs")
        .fields(&[
            "memberCount",
            "regularMeetingLocation",
            "description",
            "regularMeetingTime",
            "name",
            "categories",
        ])
        .optional(&["cover"])
        .derived(
            "photo",
            &format!(
                "https://virginia-cdn.presence.io/organization-photos/{}/{{photoUri}}",
                PRESENCE_CAMPUS_ID
            ),
        )
        .derived("url", "https://virginia.presence.io/organization/{uri}")
}

pub fn professors() -> Projection {
    Projection::new("professors")
        .fields(&["name", "credentials", "title", "bio"])
        .optional(&["headshot", "googleScholar", "email"])
}

pub fn events() -> Projection {
    Projection::new("events")
        .fields(&[
            "eventName",
            "organizationName",
            "startDateTimeUtc",
            "endDateTimeUtc",
            "description",
            "location",
        ])
        .derived(
            "org_url",
            "https://virginia.presence.io/organization/{organizationUri}",
        )
        .derived(
            "photo",
            &format!(
                "https://virginia-cdn.presence.io/event-photos/{}/{{photoUri}}",
                PRESENCE_CAMPUS_ID
            ),
        )
}

/// Default projection for a search domain.
pub fn for_domain(domain: DomainTag) -> Projection {
    match domain {
        DomainTag::Courses => courses(),
        DomainTag::Clubs => clubs(),
        DomainTag::Professors => professors(),
    }
}
