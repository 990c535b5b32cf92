//! Checkpoint persistence.
//!
//! The only state carried between runs is a single timestamp: the instant
//! through which change events were fully announced.
//!
//! ## Layout
//!
//! ```text
//! {working dir}/
//! └── .last_execution_time   # 2024-01-01T00:00:00.000000Z
//! ```
//!
//! Nothing here locks; at most one run may use a store at a time.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Checkpoint;

// Re-export for convenience
pub use local::LocalCheckpointStore;

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the stored checkpoint, `None` when nothing was ever saved.
    async fn read(&self) -> Result<Option<Checkpoint>>;

    /// Replace the stored checkpoint. Readers never see a partial value.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Stored checkpoint, or the start of today (UTC) on a first run.
    async fn load(&self) -> Result<Checkpoint> {
        match self.read().await? {
            Some(checkpoint) => Ok(checkpoint),
            None => {
                let fallback = Checkpoint::start_of_today();
                log::info!("No checkpoint stored yet, starting from {}", fallback);
                Ok(fallback)
            }
        }
    }
}
