/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

// Storage defaults
pub const DEFAULT_SENDERS_FILE: &str = "senders.txt";
pub const DEFAULT_OPEN_LOG_FILE: &str = "opens.log";
pub const DEFAULT_PIXEL_FILE: &str = "pixel.png";

// Tracking defaults
pub const DEFAULT_DEDUP_WINDOW: &str = "5m";
pub const DEFAULT_SWEEP_INTERVAL: &str = "1m";
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 100_000;
pub const DEFAULT_LOG_TAIL_LINES: usize = 100;

// Notification defaults
pub const DEFAULT_NOTIFICATIONS_ENABLED: bool = true;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_SMTP_TIMEOUT: &str = "10s";
