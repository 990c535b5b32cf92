//! Announcements and their delivery results.

/// A rendered message plus the entity it announces.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub entity_id: String,
    pub text: String,
}

/// Result of delivering one announcement after retries.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub entity_id: String,
    /// Attempts made, at most the retry budget
    pub attempts: u32,
    pub succeeded: bool,
    /// Error from the final attempt when every attempt failed
    pub last_error: Option<String>,
}

/// Aggregate result of a delivery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    /// True iff every message went out. An empty pass counts as success.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded)
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}
