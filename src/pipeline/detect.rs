// src/pipeline/detect.rs

//! Change detection.
//!
//! Two-stage filter: the provider narrows events by calendar date only, so
//! the exact sub-second cutoff against the checkpoint is applied here.
//! Surviving events are resolved one by one, in provider order, and each
//! element at most once per run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, Checkpoint, Entity};
use crate::services::DirectoryProvider;
use crate::utils::{RetryPolicy, with_retry};

/// Whether an event announces a node created after the checkpoint.
pub fn is_new_node(event: &ChangeEvent, checkpoint: &Checkpoint) -> bool {
    event.is_create() && event.targets_node() && checkpoint.precedes(&event.created_at)
}

/// Finds entities created since a checkpoint.
pub struct ChangeDetector {
    provider: Arc<dyn DirectoryProvider>,
    retry: RetryPolicy,
}

impl ChangeDetector {
    pub fn new(provider: Arc<dyn DirectoryProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Fetch and filter events, then lazily resolve each survivor.
    ///
    /// Fails only if the events list itself cannot be fetched. A failed
    /// element lookup surfaces as an `Err` item and the stream continues.
    pub async fn detect(
        &self,
        checkpoint: Checkpoint,
    ) -> Result<impl Stream<Item = Result<Entity>> + '_> {
        let since = checkpoint.date();
        let fetched = with_retry(&self.retry, "Fetching events", || {
            self.provider.fetch_events(since)
        })
        .await;
        let events = fetched.result?;
        let total = events.len();

        let mut seen = HashSet::new();
        let candidates: Vec<ChangeEvent> = events
            .into_iter()
            .filter(|event| is_new_node(event, &checkpoint))
            .filter(|event| seen.insert(event.element_id.clone()))
            .collect();

        log::info!(
            "{} of {} events since {} are new nodes",
            candidates.len(),
            total,
            since
        );

        Ok(stream::iter(candidates).then(move |event| self.resolve(event)))
    }

    /// Look up the full entity behind an event.
    async fn resolve(&self, event: ChangeEvent) -> Result<Entity> {
        let element_id = event.element_id;
        let label = format!("Resolving {element_id}");
        let fetched = with_retry(&self.retry, &label, || {
            self.provider.fetch_element(&element_id)
        })
        .await;

        match fetched.result {
            Ok(element) => Ok(Entity::from(element)),
            Err(error) => Err(AppError::resolution(element_id, error)),
        }
    }
}
