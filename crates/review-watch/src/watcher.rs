//! The poll/compare/notify loop.
//!
//! Each cycle walks `POLL → VALIDATE → MAP → NOTIFY_DECISION` and then the
//! watcher sleeps for the fixed interval. A failed poll or a malformed
//! response leaves the cursor where it was; once a response passes
//! validation the cursor follows the server even if individual records or
//! deliveries fail.

use std::collections::HashSet;
use std::time::Duration;

use notify::Notifier;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::RETRY_INTERVAL;
use crate::detector::ChangeDetector;
use crate::error::WatchError;
use crate::poller::ReviewClient;
use crate::status::StatusCatalog;
use crate::validator;

const HOMEWORK_NAME_KEY: &str = "homework_name";

/// Prefix of failure reports relayed to the chat.
pub const FAILURE_PREFIX: &str = "Проблема с ботом";

/// What a successfully parsed poll produced.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Cursor after the cycle.
    pub cursor: i64,
    /// Records in the response.
    pub records: usize,
    /// Status messages delivered.
    pub sent: usize,
    /// Records whose status had already been announced.
    pub unchanged: usize,
    /// Per-record and delivery failures.
    pub failures: Vec<WatchError>,
}

impl CycleReport {
    /// The server had nothing new.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.records == 0
    }
}

/// Drives the review watch loop for one recipient.
pub struct Watcher {
    client: ReviewClient,
    notifier: Notifier,
    catalog: StatusCatalog,
    detector: ChangeDetector,
    cursor: i64,
    interval: Duration,
    last_report: Option<String>,
}

impl Watcher {
    /// Create a watcher starting at `cursor`.
    #[must_use]
    pub fn new(
        client: ReviewClient,
        notifier: Notifier,
        catalog: StatusCatalog,
        cursor: i64,
    ) -> Self {
        Self {
            client,
            notifier,
            catalog,
            detector: ChangeDetector::new(),
            cursor,
            interval: RETRY_INTERVAL,
            last_report: None,
        }
    }

    /// Override the pause between cycles.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    #[must_use]
    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// Run one poll cycle without reporting failures to the chat.
    ///
    /// Fails only when the response cannot be fetched or validated.
    pub async fn poll_once(&mut self) -> Result<CycleReport, WatchError> {
        let payload = self.client.fetch(self.cursor).await?;
        let records = validator::validate(&payload)?;

        self.cursor = validator::next_cursor(&payload, self.cursor);

        let mut report = CycleReport {
            cursor: self.cursor,
            records: records.len(),
            ..CycleReport::default()
        };

        // The API lists the newest entry first.
        let mut seen = HashSet::new();

        for record in &records {
            if let Some(name) = record.get(HOMEWORK_NAME_KEY).and_then(Value::as_str) {
                if !seen.insert(name.to_string()) {
                    debug!(homework = name, "Ignoring older entry");
                    continue;
                }
            }

            let update = match self.catalog.render(record) {
                Ok(update) => update,
                Err(e) => {
                    warn!(error = %e, "Skipping homework record");
                    report.failures.push(e);
                    continue;
                }
            };

            if !self
                .detector
                .should_notify(&update.homework_name, update.status)
            {
                debug!(
                    homework = %update.homework_name,
                    status = %update.status,
                    "Status unchanged"
                );
                report.unchanged += 1;
                continue;
            }

            info!(
                homework = %update.homework_name,
                status = %update.status,
                "Homework status changed"
            );

            match self.notifier.notify(&update.message).await {
                Ok(()) => report.sent += 1,
                Err(e) => report.failures.push(WatchError::Send(e)),
            }
        }

        if report.is_idle() {
            debug!(cursor = self.cursor, "No homework updates");
        }

        Ok(report)
    }

    /// Run one cycle, logging failures and relaying them to the chat.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, WatchError> {
        let result = self.poll_once().await;

        let failure = match &result {
            Ok(report) => {
                info!(
                    cursor = report.cursor,
                    records = report.records,
                    sent = report.sent,
                    unchanged = report.unchanged,
                    failures = report.failures.len(),
                    "Poll cycle complete"
                );
                report.failures.iter().find(|e| e.is_reportable())
            }
            Err(e) => {
                error!(error = %e, cursor = self.cursor, "Poll cycle failed");
                Some(e)
            }
        };

        match failure.map(|e| format!("{FAILURE_PREFIX}: {e}")) {
            Some(text) => self.report_failure(text).await,
            None => {
                if result.as_ref().is_ok_and(|r| r.failures.is_empty()) {
                    self.last_report = None;
                }
            }
        }

        result
    }

    /// Poll forever, sleeping the fixed interval between cycles.
    ///
    /// Returns only when the process receives Ctrl-C, which also interrupts
    /// a cycle in flight.
    pub async fn run(mut self) {
        info!(
            cursor = self.cursor,
            interval_secs = self.interval.as_secs(),
            "Watching homework statuses"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.run_cycle() => {
                    if let Err(e) = result {
                        debug!(error = %e, "Retrying after the interval");
                    }
                }
                _ = &mut shutdown => break,
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!(cursor = self.cursor, "Shutdown requested, stopping watcher");
    }

    /// Best-effort delivery of a failure report, skipping repeats.
    async fn report_failure(&mut self, text: String) {
        if self.last_report.as_deref() == Some(text.as_str()) {
            debug!("Failure already reported, not repeating");
            return;
        }

        match self.notifier.notify(&text).await {
            Ok(()) => self.last_report = Some(text),
            Err(e) => warn!(error = %e, "Could not report failure to chat"),
        }
    }
}
