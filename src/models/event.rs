//! Provider change events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A provider-reported mutation record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    /// `create`, `update` or `delete`
    #[serde(rename = "type")]
    pub kind: String,

    /// Typed reference, `{kind}:{id}`
    pub element_id: String,

    pub created_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn is_create(&self) -> bool {
        self.kind == "create"
    }

    pub fn element(&self) -> Option<ElementRef<'_>> {
        ElementRef::parse(&self.element_id)
    }

    /// Whether the referenced element is an OSM node.
    pub fn targets_node(&self) -> bool {
        self.element().is_some_and(|r| r.kind == ElementKind::Node)
    }
}

/// Decode an events payload record by record.
///
/// A malformed record that could not be a node creation is skipped. A
/// malformed `create` of a node is an error, so no candidate is lost.
pub fn decode_events(records: Vec<Value>) -> Result<Vec<ChangeEvent>> {
    let mut events = Vec::with_capacity(records.len());
    for record in records {
        let candidate = record.get("type").and_then(Value::as_str) == Some("create")
            && record
                .get("element_id")
                .and_then(Value::as_str)
                .and_then(ElementRef::parse)
                .is_some_and(|r| r.kind == ElementKind::Node);

        match serde_json::from_value::<ChangeEvent>(record) {
            Ok(event) => events.push(event),
            Err(e) if candidate => return Err(e.into()),
            Err(e) => log::debug!("Skipping unreadable non-create event: {}", e),
        }
    }
    Ok(events)
}

/// OSM element kind named in an element reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            "relation" => Some(Self::Relation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

/// Borrowed, parsed `{kind}:{id}` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRef<'a> {
    pub kind: ElementKind,
    pub id: &'a str,
}

impl<'a> ElementRef<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        let (kind, id) = raw.split_once(':')?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            kind: ElementKind::from_str(kind)?,
            id,
        })
    }
}

impl fmt::Display for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
