//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{AreaTags, ChangeEvent, Community, Element, OsmJson};
use crate::services::{DirectoryProvider, Publisher};

pub fn ts(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

/// Square from (0,0) to (10,10).
pub fn square() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
    })
}

pub fn community(id: &str, name: &str, boundary: Option<Value>) -> Community {
    Community {
        id: id.into(),
        tags: AreaTags {
            name: Some(name.into()),
            geo_json: boundary,
        },
    }
}

pub fn event(kind: &str, element_id: &str, created_at: &str) -> ChangeEvent {
    ChangeEvent {
        kind: kind.into(),
        element_id: element_id.into(),
        created_at: ts(created_at),
    }
}

pub fn element(id: &str, name: &str, lon: f64, lat: f64) -> Element {
    Element {
        id: id.into(),
        osm_json: OsmJson {
            tags: HashMap::from([("name".to_string(), name.to_string())]),
            lon,
            lat,
        },
    }
}

/// Scripted provider that records every call.
#[derive(Default)]
pub struct FakeProvider {
    areas: HashMap<String, Community>,
    events: Vec<ChangeEvent>,
    elements: HashMap<String, Element>,
    event_failures: Mutex<u32>,
    element_failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, community: Community) -> Self {
        self.areas.insert(community.id.clone(), community);
        self
    }

    pub fn with_event(mut self, event: ChangeEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.insert(element.id.clone(), element);
        self
    }

    /// Make the next `times` events fetches fail.
    pub fn failing_events(self, times: u32) -> Self {
        *self.event_failures.lock().unwrap() = times;
        self
    }

    /// Make the next `times` lookups of `element_id` fail.
    pub fn failing_element(self, element_id: &str, times: u32) -> Self {
        self.element_failures
            .lock()
            .unwrap()
            .insert(element_id.to_string(), times);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DirectoryProvider for FakeProvider {
    async fn fetch_area(&self, name: &str) -> Result<Community> {
        self.record(format!("area {name}"));
        self.areas
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::CommunityNotFound(name.to_string()))
    }

    async fn fetch_events(&self, since: NaiveDate) -> Result<Vec<ChangeEvent>> {
        self.record(format!("events {since}"));
        let mut failures = self.event_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(AppError::Provider {
                status: 502,
                url: "events".into(),
            });
        }
        Ok(self.events.clone())
    }

    async fn fetch_element(&self, element_id: &str) -> Result<Element> {
        self.record(format!("element {element_id}"));
        if let Some(left) = self.element_failures.lock().unwrap().get_mut(element_id) {
            if *left > 0 {
                *left -= 1;
                return Err(AppError::Provider {
                    status: 503,
                    url: element_id.to_string(),
                });
            }
        }
        self.elements
            .get(element_id)
            .cloned()
            .ok_or_else(|| AppError::Provider {
                status: 404,
                url: element_id.to_string(),
            })
    }
}

/// Publisher that fails scripted messages and records every attempt.
#[derive(Default)]
pub struct FakePublisher {
    /// Remaining failures keyed by a substring of the message
    failures: Mutex<Vec<(String, u32)>>,
    attempts: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` attempts of any message containing `needle`.
    pub fn failing(self, needle: &str, times: u32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((needle.to_string(), times));
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        self.attempts.lock().unwrap().push(message.to_string());
        let mut failures = self.failures.lock().unwrap();
        for (needle, left) in failures.iter_mut() {
            if *left > 0 && message.contains(needle.as_str()) {
                *left -= 1;
                return Err(AppError::publish("exit status: 1"));
            }
        }
        Ok(())
    }
}
