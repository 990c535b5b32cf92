//! Service layer: the two external collaborators.
//!
//! - Directory provider reads (`DirectoryProvider`, `BtcMapClient`)
//! - Message publishing (`Publisher`, `CommandPublisher`)

mod provider;
mod publisher;

pub use provider::{BtcMapClient, DirectoryProvider};
pub use publisher::{CommandPublisher, Publisher};
