//! Community (area) data as returned by the provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// A named geographic region, the unit of geofencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Human-assigned slug, e.g. `bitcoin-island-philippines`
    pub id: String,

    #[serde(default)]
    pub tags: AreaTags,
}

/// Area metadata. Only the keys the notifier reads are typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaTags {
    #[serde(default)]
    pub name: Option<String>,

    /// Boundary as raw GeoJSON
    #[serde(default)]
    pub geo_json: Option<Value>,
}

impl Community {
    /// Display name, falling back to the slug.
    pub fn display_name(&self) -> &str {
        self.tags
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// The boundary GeoJSON, or a terminal error when the area has none.
    pub fn boundary(&self) -> Result<&Value> {
        match &self.tags.geo_json {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(AppError::MissingBoundary(self.id.clone())),
        }
    }
}
