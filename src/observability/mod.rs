//! Tracker counters
//!
//! Every counter is kept twice: an atomic that `/health` can snapshot, and an
//! OpenTelemetry instrument for whatever meter provider is installed.

use anyhow::Result;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Meter, MeterProvider},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

const METER_NAME: &str = "pixel-tracker";

/// Install the process-wide meter provider
pub fn init_meter_provider() -> Result<SdkMeterProvider> {
    let provider = SdkMeterProvider::builder().build();
    global::set_meter_provider(provider.clone());
    info!("OpenTelemetry configured: local metrics only");
    Ok(provider)
}

struct TrackedCounter {
    value: AtomicU64,
    instrument: Counter<u64>,
}

impl TrackedCounter {
    fn new(meter: &Meter, name: &'static str, description: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            instrument: meter.u64_counter(name).with_description(description).build(),
        }
    }

    fn incr(&self, attributes: &[KeyValue]) {
        self.value.fetch_add(1, Ordering::Relaxed);
        self.instrument.add(1, attributes);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

pub struct TrackerStats {
    opens_recorded: TrackedCounter,
    duplicates_suppressed: TrackedCounter,
    unknown_senders: TrackedCounter,
    notifications_sent: TrackedCounter,
    notifications_failed: TrackedCounter,
    log_write_failures: TrackedCounter,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub opens_recorded: u64,
    pub duplicates_suppressed: u64,
    pub unknown_senders: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub log_write_failures: u64,
}

impl TrackerStats {
    pub fn new(meter: &Meter) -> Self {
        Self {
            opens_recorded: TrackedCounter::new(
                meter,
                "tracker_opens_recorded_total",
                "Opens written to the open log",
            ),
            duplicates_suppressed: TrackedCounter::new(
                meter,
                "tracker_duplicates_suppressed_total",
                "Repeat opens suppressed by the dedup window",
            ),
            unknown_senders: TrackedCounter::new(
                meter,
                "tracker_unknown_senders_total",
                "Opens whose sender is not in the directory",
            ),
            notifications_sent: TrackedCounter::new(
                meter,
                "tracker_notifications_sent_total",
                "Open notifications delivered to the mail server",
            ),
            notifications_failed: TrackedCounter::new(
                meter,
                "tracker_notifications_failed_total",
                "Open notifications that could not be delivered",
            ),
            log_write_failures: TrackedCounter::new(
                meter,
                "tracker_log_write_failures_total",
                "Opens that could not be written to the open log",
            ),
        }
    }

    /// Stats bound to the global meter provider
    pub fn from_global() -> Self {
        let meter = global::meter_provider().meter(METER_NAME);
        Self::new(&meter)
    }

    pub fn record_open(&self) {
        self.opens_recorded.incr(&[]);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_suppressed.incr(&[]);
    }

    pub fn record_unknown_sender(&self) {
        self.unknown_senders.incr(&[]);
    }

    pub fn record_notification_sent(&self, notifier: &'static str) {
        self.notifications_sent
            .incr(&[KeyValue::new("notifier", notifier)]);
    }

    pub fn record_notification_failed(&self, notifier: &'static str, kind: &'static str) {
        self.notifications_failed.incr(&[
            KeyValue::new("notifier", notifier),
            KeyValue::new("kind", kind),
        ]);
    }

    pub fn record_log_write_failure(&self) {
        self.log_write_failures.incr(&[]);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            opens_recorded: self.opens_recorded.get(),
            duplicates_suppressed: self.duplicates_suppressed.get(),
            unknown_senders: self.unknown_senders.get(),
            notifications_sent: self.notifications_sent.get(),
            notifications_failed: self.notifications_failed.get(),
            log_write_failures: self.log_write_failures.get(),
        }
    }
}

impl Default for TrackerStats {
    fn default() -> Self {
        Self::from_global()
    }
}
