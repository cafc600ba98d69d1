//! Open recording: dedup, log, directory lookup, notification

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::{OpenEvent, TrackOutcome};
use crate::observability::TrackerStats;
use crate::services::{DedupCache, OpenLog, OpenNotifier, SenderDirectory};

#[derive(Clone)]
pub struct TrackingService {
    dedup: Arc<DedupCache>,
    open_log: Arc<OpenLog>,
    directory: SenderDirectory,
    notifier: Arc<dyn OpenNotifier>,
    stats: Arc<TrackerStats>,
}

impl TrackingService {
    pub fn new(
        dedup: Arc<DedupCache>,
        open_log: Arc<OpenLog>,
        directory: SenderDirectory,
        notifier: Arc<dyn OpenNotifier>,
        stats: Arc<TrackerStats>,
    ) -> Self {
        Self {
            dedup,
            open_log,
            directory,
            notifier,
            stats,
        }
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    pub fn stats(&self) -> &Arc<TrackerStats> {
        &self.stats
    }

    /// Record one beacon fetch. Never fails: every problem is logged, counted
    /// and reported through the returned outcome only.
    pub async fn record_open(&self, event: OpenEvent) -> TrackOutcome {
        if self.dedup.check_and_mark(event.dedup_key(), event.timestamp) {
            self.stats.record_duplicate();
            return TrackOutcome::Duplicate;
        }

        info!("{}", event.log_line());

        if let Err(e) = self.open_log.append(&event).await {
            self.stats.record_log_write_failure();
            error!(
                path = %self.open_log.path().display(),
                sender = %event.sender,
                message_id = %event.message_id,
                "Failed to append open log entry: {}",
                e
            );
            return TrackOutcome::LogWriteFailed;
        }
        self.stats.record_open();

        let sender = match self.directory.lookup(&event.sender).await {
            Ok(Some(sender)) => sender,
            Ok(None) => {
                self.stats.record_unknown_sender();
                warn!(sender = %event.sender, "Unknown sender");
                return TrackOutcome::UnknownSender;
            }
            Err(e) => {
                self.stats.record_unknown_sender();
                warn!(
                    sender = %event.sender,
                    path = %self.directory.path().display(),
                    "Sender directory unreadable, treating sender as unknown: {}",
                    e
                );
                return TrackOutcome::UnknownSender;
            }
        };

        match self.notifier.notify(&sender, &event.notice()).await {
            Ok(()) => {
                self.stats.record_notification_sent(self.notifier.name());
                TrackOutcome::Notified
            }
            Err(e) => {
                self.stats
                    .record_notification_failed(self.notifier.name(), e.kind());
                warn!(
                    sender = %sender.identity,
                    notifier = self.notifier.name(),
                    kind = e.kind(),
                    "Failed to send open notification: {}",
                    e
                );
                TrackOutcome::NotificationFailed
            }
        }
    }
}
