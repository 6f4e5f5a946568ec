//! Duplicate suppression for status notifications.

use std::collections::HashMap;

use crate::status::ReviewStatus;

/// Remembers the last status announced for each homework.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_notified: HashMap<String, ReviewStatus>,
}

impl ChangeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `status` for `name` is news.
    ///
    /// Returns `true` for a first sighting or a different status, and records
    /// `status` as the last one announced for `name`.
    pub fn should_notify(&mut self, name: &str, status: ReviewStatus) -> bool {
        if self.last_notified.get(name) == Some(&status) {
            return false;
        }
        self.last_notified.insert(name.to_string(), status);
        true
    }

    /// Last status announced for `name`.
    #[must_use]
    pub fn last_status(&self, name: &str) -> Option<ReviewStatus> {
        self.last_notified.get(name).copied()
    }
}
