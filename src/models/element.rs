//! Resolved provider elements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Display name used when a node carries no `name` tag.
pub const UNNAMED: &str = "Unnamed business";

/// Raw element record from `GET /elements/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub osm_json: OsmJson,
}

/// The embedded OSM node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmJson {
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub lon: f64,
    pub lat: f64,
}

/// A longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

/// A point-of-interest ready for geofencing and announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier, e.g. `node:123`
    pub id: String,
    pub name: String,
    pub location: Coordinate,
}

impl From<Element> for Entity {
    fn from(element: Element) -> Self {
        let OsmJson { mut tags, lon, lat } = element.osm_json;
        let name = tags
            .remove("name")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNNAMED.to_string());

        Self {
            id: element.id,
            name,
            location: Coordinate { lon, lat },
        }
    }
}
