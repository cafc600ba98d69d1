//! Tracking services
//!
//! - [`SenderDirectory`]: sender identities and their mail credentials
//! - [`DedupCache`] / [`DedupSweeper`]: repeat-open suppression
//! - [`OpenLog`]: append-only open record and tail reader
//! - [`OpenNotifier`]: alert delivery to the sender
//! - [`TrackingService`]: orchestration behind the tracking endpoint

pub mod dedup_cache;
pub mod notifier;
pub mod open_log;
pub mod sender_directory;
pub mod tracker;

pub use dedup_cache::{DedupCache, DedupSweeper};
pub use notifier::{DisabledNotifier, OpenNotifier, SmtpNotifier, notifier_from_config};
pub use open_log::OpenLog;
pub use sender_directory::SenderDirectory;
pub use tracker::TrackingService;
