//! Suppression of repeated opens within a fixed window
//!
//! A single mutex covers the whole check-and-mark sequence, so two
//! concurrent requests for the same key can never both be treated as new.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::models::DedupKey;

#[derive(Debug)]
pub struct DedupCache {
    window: TimeDelta,
    max_entries: usize,
    entries: Mutex<HashMap<DedupKey, DateTime<Utc>>>,
}

impl DedupCache {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` when `key` was already seen inside the window.
    ///
    /// A non-duplicate overwrites the entry with `now`; a duplicate leaves the
    /// stored timestamp untouched.
    pub fn check_and_mark(&self, key: DedupKey, now: DateTime<Utc>) -> bool {
        let mut entries = self.lock();

        if let Some(last_seen) = entries.get(&key)
            && now.signed_duration_since(*last_seen) < self.window
        {
            trace!(sender = %key.sender, message_id = %key.message_id, "Duplicate open suppressed");
            return true;
        }

        entries.insert(key, now);

        if entries.len() > self.max_entries {
            let removed = Self::sweep_locked(&mut entries, now, self.window);
            debug!(removed, remaining = entries.len(), "Dedup cache over capacity, swept expired entries");
            if entries.len() > self.max_entries {
                warn!(
                    entries = entries.len(),
                    max_entries = self.max_entries,
                    "Dedup cache still over capacity after sweep; all entries are inside the window"
                );
            }
        }

        false
    }

    /// Drop entries whose window has elapsed, returning how many were removed
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        Self::sweep_locked(&mut entries, now, self.window)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep_locked(
        entries: &mut HashMap<DedupKey, DateTime<Utc>>,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, last_seen| now.signed_duration_since(*last_seen) < window);
        before - entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DedupKey, DateTime<Utc>>> {
        // The map holds no invariants a panicking holder could break
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Background task that periodically sweeps expired dedup entries
pub struct DedupSweeper {
    cache: Arc<DedupCache>,
    interval: Duration,
}

impl DedupSweeper {
    pub fn new(cache: Arc<DedupCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Start the sweeper loop; runs until the runtime shuts down
    pub async fn start(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting dedup cache sweeper with interval: {}",
            humantime::format_duration(self.interval)
        );

        loop {
            ticker.tick().await;
            self.run_once(Utc::now());
        }
    }

    pub fn run_once(&self, now: DateTime<Utc>) -> usize {
        let removed = self.cache.sweep(now);
        if removed > 0 {
            debug!(removed, remaining = self.cache.len(), "Dedup cache sweep completed");
        } else {
            trace!("Dedup cache sweep completed: nothing expired");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(ip: &str) -> DedupKey {
        DedupKey {
            sender: "alice@example.com".to_string(),
            message_id: "msg123".to_string(),
            subject: "Hello".to_string(),
            client_ip: ip.to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn cache() -> DedupCache {
        DedupCache::new(Duration::from_secs(300), 1_000)
    }

    #[test]
    fn test_first_sighting_is_not_duplicate() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_repeat_inside_window_is_duplicate() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        assert!(cache.check_and_mark(key("1.2.3.4"), t0() + TimeDelta::milliseconds(10)));
        assert!(cache.check_and_mark(key("1.2.3.4"), t0() + TimeDelta::seconds(299)));
    }

    #[test]
    fn test_repeat_at_window_boundary_is_new() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0() + TimeDelta::seconds(300)));
    }

    #[test]
    fn test_duplicates_do_not_extend_window() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        assert!(cache.check_and_mark(key("1.2.3.4"), t0() + TimeDelta::seconds(200)));
        // Measured from the first sighting, not the suppressed repeat
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0() + TimeDelta::seconds(301)));
    }

    #[test]
    fn test_new_event_restarts_window() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        let second = t0() + TimeDelta::seconds(400);
        assert!(!cache.check_and_mark(key("1.2.3.4"), second));
        assert!(cache.check_and_mark(key("1.2.3.4"), second + TimeDelta::seconds(250)));
    }

    #[test]
    fn test_different_ip_is_separate_key() {
        let cache = cache();
        assert!(!cache.check_and_mark(key("1.2.3.4"), t0()));
        assert!(!cache.check_and_mark(key("5.6.7.8"), t0()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let cache = cache();
        cache.check_and_mark(key("1.1.1.1"), t0());
        cache.check_and_mark(key("2.2.2.2"), t0() + TimeDelta::seconds(200));

        let removed = cache.sweep(t0() + TimeDelta::seconds(350));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.check_and_mark(key("2.2.2.2"), t0() + TimeDelta::seconds(360)));
    }

    #[test]
    fn test_capacity_overflow_triggers_sweep() {
        let cache = DedupCache::new(Duration::from_secs(300), 2);
        cache.check_and_mark(key("1.1.1.1"), t0());
        cache.check_and_mark(key("2.2.2.2"), t0());

        cache.check_and_mark(key("3.3.3.3"), t0() + TimeDelta::seconds(301));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_never_evicts_live_entries() {
        let cache = DedupCache::new(Duration::from_secs(300), 1);
        cache.check_and_mark(key("1.1.1.1"), t0());
        cache.check_and_mark(key("2.2.2.2"), t0() + TimeDelta::seconds(1));

        assert_eq!(cache.len(), 2);
        assert!(cache.check_and_mark(key("1.1.1.1"), t0() + TimeDelta::seconds(2)));
    }

    #[test]
    fn test_concurrent_duplicates_mark_once() {
        let cache = Arc::new(cache());
        let now = t0();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.check_and_mark(key("1.2.3.4"), now))
            })
            .collect();

        let new_events = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|duplicate| !duplicate)
            .count();
        assert_eq!(new_events, 1);
    }

    #[test]
    fn test_sweeper_run_once() {
        let cache = Arc::new(cache());
        cache.check_and_mark(key("1.1.1.1"), t0());
        let sweeper = DedupSweeper::new(Arc::clone(&cache), Duration::from_secs(60));

        assert_eq!(sweeper.run_once(t0() + TimeDelta::seconds(10)), 0);
        assert_eq!(sweeper.run_once(t0() + TimeDelta::seconds(600)), 1);
        assert!(cache.is_empty());
    }
}
