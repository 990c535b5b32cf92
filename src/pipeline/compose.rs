// src/pipeline/compose.rs

//! Announcement text rendering.

use crate::models::{Announcement, Entity, MessageConfig};

/// Renders announcements from a template.
///
/// Supported placeholders: `{community}`, `{name}`, `{link}`, `{id}`.
/// Substituted values are inserted as-is; the publisher receives the text as
/// one opaque argument.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    template: String,
    merchant_url: String,
}

impl MessageComposer {
    pub fn new(template: impl Into<String>, merchant_url: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            merchant_url: merchant_url.into(),
        }
    }

    pub fn from_config(config: &MessageConfig) -> Self {
        Self::new(&config.template, &config.merchant_url)
    }

    /// Public merchant page for an element id.
    pub fn canonical_link(&self, entity_id: &str) -> String {
        format!("{}{}", self.merchant_url, entity_id)
    }

    /// Render the message text for one entity.
    pub fn compose(&self, community_name: &str, entity: &Entity) -> String {
        let link = self.canonical_link(&entity.id);
        // Single pass, so placeholder-like text inside a name stays literal.
        let mut out = String::with_capacity(self.template.len() + entity.name.len() + link.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let value = match tail.find('}').map(|end| &tail[..=end]) {
                Some("{community}") => Some(community_name),
                Some("{name}") => Some(entity.name.as_str()),
                Some("{link}") => Some(link.as_str()),
                Some("{id}") => Some(entity.id.as_str()),
                _ => None,
            };
            match value {
                Some(value) => {
                    out.push_str(value);
                    rest = &tail[tail.find('}').map_or(1, |end| end + 1)..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Render and tag with the entity id.
    pub fn announce(&self, community_name: &str, entity: &Entity) -> Announcement {
        Announcement {
            entity_id: entity.id.clone(),
            text: self.compose(community_name, entity),
        }
    }
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::from_config(&MessageConfig::default())
    }
}
