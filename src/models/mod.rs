// src/models/mod.rs

//! Domain models for the notifier.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod checkpoint;
mod community;
mod config;
mod delivery;
mod element;
mod event;

// Re-export all public types
pub use checkpoint::Checkpoint;
pub use community::{AreaTags, Community};
pub use config::{
    ApiConfig, Config, DeliveryConfig, LoggingConfig, MessageConfig, PathsConfig,
    PublisherConfig,
};
pub use delivery::{Announcement, DeliveryOutcome, DeliveryReport};
pub use element::{Coordinate, Element, Entity, OsmJson, UNNAMED};
pub use event::{ChangeEvent, ElementKind, ElementRef, decode_events};
