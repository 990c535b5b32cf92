// src/pipeline/deliver.rs

//! Announcement delivery with bounded per-message retry.
//!
//! Messages are sent strictly one after another. A message that exhausts its
//! attempts is recorded as failed and delivery moves on to the next one.
//! No deduplication happens here.

use std::sync::Arc;

use crate::models::{Announcement, DeliveryOutcome, DeliveryReport};
use crate::services::Publisher;
use crate::utils::{RetryPolicy, with_retry};

/// Sends announcements through a [`Publisher`].
pub struct DeliveryEngine {
    publisher: Arc<dyn Publisher>,
    retry: RetryPolicy,
}

impl DeliveryEngine {
    pub fn new(publisher: Arc<dyn Publisher>, retry: RetryPolicy) -> Self {
        Self { publisher, retry }
    }

    /// Deliver every announcement; the report says whether all went out.
    pub async fn deliver(&self, announcements: &[Announcement]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let total = announcements.len();

        for (index, announcement) in announcements.iter().enumerate() {
            let outcome = self.deliver_one(announcement).await;
            if outcome.succeeded {
                log::info!(
                    "[{}/{}] Published {} (attempt {})",
                    index + 1,
                    total,
                    outcome.entity_id,
                    outcome.attempts
                );
            } else {
                log::warn!(
                    "[{}/{}] Gave up on {} after {} attempts: {}",
                    index + 1,
                    total,
                    outcome.entity_id,
                    outcome.attempts,
                    outcome.last_error.as_deref().unwrap_or("unknown error")
                );
            }
            report.outcomes.push(outcome);
        }

        report
    }

    async fn deliver_one(&self, announcement: &Announcement) -> DeliveryOutcome {
        let label = format!("Publishing {}", announcement.entity_id);
        let sent = with_retry(&self.retry, &label, || {
            self.publisher.publish(&announcement.text)
        })
        .await;

        let (succeeded, last_error) = match sent.result {
            Ok(()) => (true, None),
            Err(error) => (false, Some(error.to_string())),
        };

        DeliveryOutcome {
            entity_id: announcement.entity_id.clone(),
            attempts: sent.attempts,
            succeeded,
            last_error,
        }
    }
}
