//! Centralized error handling for the pixel tracker
//!
//! # Error Categories
//!
//! - **I/O Errors**: sender directory, open log and pixel file access
//! - **Image Errors**: encoding the beacon pixel
//! - **Configuration Errors**: invalid or unreadable settings
//! - **Notification Errors**: building or submitting the open alert email
//!
//! Notification errors never reach an HTTP caller; the tracking service
//! logs and counts them instead.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for notifier Results
pub type NotificationResult<T> = Result<T, NotificationError>;
