// src/pipeline/run.rs

//! Run coordination.
//!
//! One run walks `Idle → Validating → Detecting → Filtering → Composing →
//! Delivering → Committing → Done`. Bad input found while validating or
//! detecting moves the run to `Aborted` and nothing is delivered.
//!
//! The checkpoint is advanced to the instant the run started, and only when
//! every detected entity was resolved and every announcement delivered.
//! Otherwise the old checkpoint stays and the next run repeats the window.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;

use crate::error::{AppError, Result};
use crate::models::{Announcement, Checkpoint, Community, Config, DeliveryReport, Entity};
use crate::pipeline::compose::MessageComposer;
use crate::pipeline::deliver::DeliveryEngine;
use crate::pipeline::detect::ChangeDetector;
use crate::pipeline::geofence::Geofence;
use crate::services::{DirectoryProvider, Publisher};
use crate::storage::CheckpointStore;
use crate::utils::RetryPolicy;

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Detecting,
    Filtering,
    Composing,
    Delivering,
    Committing,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Current phase plus transition logging.
#[derive(Debug)]
struct Phase(RunState);

impl Phase {
    fn enter(&mut self, next: RunState) {
        log::debug!("Run state: {} -> {}", self.0, next);
        self.0 = next;
    }

    fn abort(&mut self, error: AppError) -> AppError {
        log::error!("Run aborted while {}: {}", self.0, error);
        self.0 = RunState::Aborted;
        error
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Community display name
    pub community: String,
    /// Checkpoint loaded at start; events after it were considered
    pub window_start: Checkpoint,
    /// Instant captured before any processing; the value committed on success
    pub execution_start: Checkpoint,
    pub announcements: Vec<Announcement>,
    /// Detected entities whose lookup failed after retries
    pub resolution_failures: usize,
    /// `None` on a dry run
    pub delivery: Option<DeliveryReport>,
    /// Whether the checkpoint was advanced and persisted
    pub committed: bool,
    pub dry_run: bool,
    pub state: RunState,
}

impl RunReport {
    /// A non-dry run that left the checkpoint behind and will be repeated.
    pub fn needs_rerun(&self) -> bool {
        !self.dry_run && !self.committed
    }
}

/// Orchestrates one synchronization run for one community.
pub struct RunCoordinator {
    provider: Arc<dyn DirectoryProvider>,
    store: Arc<dyn CheckpointStore>,
    detector: ChangeDetector,
    composer: MessageComposer,
    delivery: DeliveryEngine,
    dry_run: bool,
}

impl RunCoordinator {
    pub fn new(
        config: &Config,
        provider: Arc<dyn DirectoryProvider>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.delivery);
        Self {
            detector: ChangeDetector::new(Arc::clone(&provider), retry),
            composer: MessageComposer::from_config(&config.message),
            delivery: DeliveryEngine::new(publisher, retry),
            provider,
            store,
            dry_run: false,
        }
    }

    /// Compose but neither publish nor commit.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute one run for `community_name`.
    ///
    /// Returns `Err` only when the run was aborted. Delivery and commit
    /// failures are reported through [`RunReport::committed`].
    pub async fn run(&self, community_name: &str) -> Result<RunReport> {
        let mut phase = Phase(RunState::Idle);
        let execution_start = Checkpoint::now();

        phase.enter(RunState::Validating);
        let (window_start, community, geofence) = match self.validate(community_name).await {
            Ok(validated) => validated,
            Err(error) => return Err(phase.abort(error)),
        };
        let community_label = community.display_name().to_string();

        phase.enter(RunState::Detecting);
        let entities = match self.detector.detect(window_start).await {
            Ok(entities) => entities,
            Err(error) => return Err(phase.abort(error)),
        };

        phase.enter(RunState::Filtering);
        let mut entities = pin!(entities);
        let mut local: Vec<Entity> = Vec::new();
        let mut resolution_failures = 0;
        while let Some(item) = entities.next().await {
            match item {
                Ok(entity) if geofence.contains(&entity.location) => local.push(entity),
                Ok(entity) => log::debug!("{} ({}) is outside the boundary", entity.id, entity.name),
                Err(error) => {
                    resolution_failures += 1;
                    log::warn!("{}", error);
                }
            }
        }

        log::info!(
            "Found {} new local businesses in {} since {}",
            local.len(),
            community_label,
            window_start
        );

        phase.enter(RunState::Composing);
        let announcements: Vec<Announcement> = local
            .iter()
            .map(|entity| self.composer.announce(&community_label, entity))
            .collect();

        phase.enter(RunState::Delivering);
        let delivery = if self.dry_run {
            for announcement in &announcements {
                log::info!("[dry run] {}", announcement.text);
            }
            None
        } else {
            Some(self.delivery.deliver(&announcements).await)
        };

        phase.enter(RunState::Committing);
        let committed = self
            .commit(&execution_start, delivery.as_ref(), resolution_failures)
            .await;

        phase.enter(RunState::Done);
        Ok(RunReport {
            community: community_label,
            window_start,
            execution_start,
            announcements,
            resolution_failures,
            delivery,
            committed,
            dry_run: self.dry_run,
            state: phase.0,
        })
    }

    /// Load the checkpoint and the community boundary.
    async fn validate(&self, community_name: &str) -> Result<(Checkpoint, Community, Geofence)> {
        let checkpoint = self.store.load().await?;
        let community = self.provider.fetch_area(community_name).await?;
        let geofence = Geofence::from_geojson(community.boundary()?)?;
        log::debug!(
            "Boundary of {} has {} polygon(s)",
            community.id,
            geofence.polygon_count()
        );
        Ok((checkpoint, community, geofence))
    }

    /// Persist `execution_start` if the run was complete. Returns whether it was.
    async fn commit(
        &self,
        execution_start: &Checkpoint,
        delivery: Option<&DeliveryReport>,
        resolution_failures: usize,
    ) -> bool {
        let Some(delivery) = delivery else {
            log::info!("Dry run, checkpoint not advanced");
            return false;
        };

        if !delivery.all_succeeded() || resolution_failures > 0 {
            log::warn!(
                "Checkpoint not advanced: {} undelivered, {} unresolved",
                delivery.failed(),
                resolution_failures
            );
            return false;
        }

        match self.store.save(execution_start).await {
            Ok(()) => {
                log::info!("Checkpoint advanced to {}", execution_start);
                true
            }
            Err(error) => {
                log::error!("Failed to save checkpoint: {}", error);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{
        FakePublisher, FakeProvider, community, element, event, square,
    };
    use crate::storage::LocalCheckpointStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct Harness {
        _tmp: TempDir,
        store: Arc<LocalCheckpointStore>,
        provider: Arc<FakeProvider>,
        publisher: Arc<FakePublisher>,
    }

    impl Harness {
        fn new(provider: FakeProvider, publisher: FakePublisher) -> Self {
            let tmp = TempDir::new().unwrap();
            let store = Arc::new(LocalCheckpointStore::new(tmp.path().join(".last_execution_time")));
            Self {
                _tmp: tmp,
                store,
                provider: Arc::new(provider),
                publisher: Arc::new(publisher),
            }
        }

        async fn seed(&self, checkpoint: &str) {
            self.store
                .save(&Checkpoint::parse(checkpoint).unwrap())
                .await
                .unwrap();
        }

        fn coordinator(&self) -> RunCoordinator {
            RunCoordinator::new(
                &Config::default(),
                self.provider.clone(),
                self.publisher.clone(),
                self.store.clone(),
            )
        }

        async fn stored(&self) -> Option<Checkpoint> {
            self.store.read().await.unwrap()
        }
    }

    fn testville() -> FakeProvider {
        FakeProvider::new().with_area(community("testville", "Test Ville", Some(square())))
    }

    #[tokio::test]
    async fn test_first_run_without_events() {
        let h = Harness::new(testville(), FakePublisher::new());
        assert!(h.stored().await.is_none());

        let before = chrono::Utc::now().date_naive();
        let report = h.coordinator().run("testville").await.unwrap();
        let after = chrono::Utc::now().date_naive();

        assert!(report.announcements.is_empty());
        assert!(report.committed);
        assert_eq!(report.state, RunState::Done);
        let day = report.window_start.date();
        assert!(day == before || day == after);
        assert_eq!(report.window_start, Checkpoint::start_of_day(day));
        assert_eq!(h.stored().await, Some(report.execution_start));
        assert!(h.publisher.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_new_local_business_announced() {
        let provider = testville()
            .with_event(event("create", "node:42", "2024-01-02T00:00:00.000000Z"))
            .with_element(element("node:42", "Corner Cafe", 5.0, 5.0));
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;

        let report = h.coordinator().run("testville").await.unwrap();

        assert_eq!(report.announcements.len(), 1);
        let text = &report.announcements[0].text;
        assert!(text.contains("Corner Cafe"));
        assert!(text.contains("https://btcmap.org/merchant/node:42"));
        assert!(text.contains("Test Ville"));

        let delivery = report.delivery.as_ref().unwrap();
        assert_eq!(delivery.outcomes[0].attempts, 1);
        assert!(report.committed);
        assert_eq!(h.stored().await, Some(report.execution_start));
        assert_eq!(h.publisher.attempts(), vec![text.clone()]);
        assert!(h.provider.calls().contains(&"events 2024-01-01".to_string()));
    }

    #[tokio::test]
    async fn test_business_outside_boundary_dropped() {
        let provider = testville()
            .with_event(event("create", "node:42", "2024-01-02T00:00:00.000000Z"))
            .with_element(element("node:42", "Far Away Cafe", 50.0, 50.0));
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;

        let report = h.coordinator().run("testville").await.unwrap();

        assert!(report.announcements.is_empty());
        assert!(h.publisher.attempts().is_empty());
        assert!(report.committed);
        assert_eq!(h.stored().await, Some(report.execution_start));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_checkpoint() {
        let provider = testville()
            .with_event(event("create", "node:1", "2024-01-02T00:00:00Z"))
            .with_event(event("create", "node:2", "2024-01-02T01:00:00Z"))
            .with_element(element("node:1", "Good Shop", 1.0, 1.0))
            .with_element(element("node:2", "Unlucky Shop", 2.0, 2.0));
        let h = Harness::new(provider, FakePublisher::new().failing("Unlucky", 3));
        h.seed("2024-01-01T00:00:00.000000Z").await;
        let before = h.stored().await;

        let report = h.coordinator().run("testville").await.unwrap();

        let delivery = report.delivery.as_ref().unwrap();
        assert!(!delivery.all_succeeded());
        assert!(delivery.outcomes[0].succeeded);
        assert!(!delivery.outcomes[1].succeeded);
        assert_eq!(delivery.outcomes[1].attempts, 3);
        assert!(!report.committed);
        assert!(report.needs_rerun());
        assert_eq!(report.state, RunState::Done);
        assert_eq!(h.stored().await, before);
    }

    #[tokio::test]
    async fn test_unknown_community_aborts() {
        let h = Harness::new(testville(), FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;
        let before = h.stored().await;

        let err = h.coordinator().run("nowhere").await.unwrap_err();

        assert!(matches!(err, AppError::CommunityNotFound(ref name) if name == "nowhere"));
        assert!(err.is_configuration());
        assert_eq!(h.provider.calls(), vec!["area nowhere"]);
        assert!(h.publisher.attempts().is_empty());
        assert_eq!(h.stored().await, before);
    }

    #[tokio::test]
    async fn test_missing_boundary_aborts() {
        let provider = FakeProvider::new().with_area(community("testville", "Test Ville", None));
        let h = Harness::new(provider, FakePublisher::new());

        let err = h.coordinator().run("testville").await.unwrap_err();

        assert!(matches!(err, AppError::MissingBoundary(_)));
        assert_eq!(h.provider.calls(), vec!["area testville"]);
        assert!(h.stored().await.is_none());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let provider = testville()
            .with_event(event("create", "node:42", "2024-01-02T00:00:00Z"))
            .with_element(element("node:42", "Corner Cafe", 5.0, 5.0));
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;

        let first = h.coordinator().run("testville").await.unwrap();
        let second = h.coordinator().run("testville").await.unwrap();

        assert_eq!(first.announcements.len(), 1);
        assert!(second.announcements.is_empty());
        assert_eq!(h.publisher.attempts().len(), 1);
        assert_eq!(second.window_start, first.execution_start);
        assert!(second.execution_start >= first.execution_start);
        assert_eq!(h.stored().await, Some(second.execution_start));
    }

    #[tokio::test]
    async fn test_repeated_create_announced_once() {
        let provider = testville()
            .with_event(event("create", "node:42", "2024-01-02T00:00:00Z"))
            .with_event(event("create", "node:42", "2024-01-02T05:00:00Z"))
            .with_element(element("node:42", "Corner Cafe", 5.0, 5.0));
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;

        let report = h.coordinator().run("testville").await.unwrap();

        assert_eq!(report.announcements.len(), 1);
        assert_eq!(h.publisher.attempts().len(), 1);
        assert!(report.committed);
    }

    #[tokio::test]
    async fn test_unresolved_entity_blocks_commit() {
        let provider = testville()
            .with_event(event("create", "node:1", "2024-01-02T00:00:00Z"))
            .with_event(event("create", "node:2", "2024-01-02T00:00:00Z"))
            .with_element(element("node:2", "Reachable", 1.0, 1.0))
            .failing_element("node:1", 10);
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;
        let before = h.stored().await;

        let report = h.coordinator().run("testville").await.unwrap();

        assert_eq!(report.resolution_failures, 1);
        assert_eq!(report.announcements.len(), 1);
        assert!(report.delivery.as_ref().unwrap().all_succeeded());
        assert!(!report.committed);
        assert_eq!(h.stored().await, before);
    }

    #[tokio::test]
    async fn test_events_outage_aborts() {
        let h = Harness::new(testville().failing_events(3), FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;
        let before = h.stored().await;

        assert!(h.coordinator().run("testville").await.is_err());
        assert_eq!(h.stored().await, before);
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let provider = testville()
            .with_event(event("create", "node:42", "2024-01-02T00:00:00Z"))
            .with_element(element("node:42", "Corner Cafe", 5.0, 5.0));
        let h = Harness::new(provider, FakePublisher::new());
        h.seed("2024-01-01T00:00:00.000000Z").await;
        let before = h.stored().await;

        let report = h.coordinator().with_dry_run(true).run("testville").await.unwrap();

        assert_eq!(report.announcements.len(), 1);
        assert!(report.delivery.is_none());
        assert!(!report.committed);
        assert!(!report.needs_rerun());
        assert!(h.publisher.attempts().is_empty());
        assert_eq!(h.stored().await, before);
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl CheckpointStore for ReadOnlyStore {
        async fn read(&self) -> Result<Option<Checkpoint>> {
            Ok(None)
        }

        async fn save(&self, _checkpoint: &Checkpoint) -> Result<()> {
            Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[tokio::test]
    async fn test_save_failure_reported_as_uncommitted() {
        let coordinator = RunCoordinator::new(
            &Config::default(),
            Arc::new(testville()),
            Arc::new(FakePublisher::new()),
            Arc::new(ReadOnlyStore),
        );

        let report = coordinator.run("testville").await.unwrap();

        assert!(report.delivery.as_ref().unwrap().all_succeeded());
        assert!(!report.committed);
        assert!(report.needs_rerun());
    }
}
