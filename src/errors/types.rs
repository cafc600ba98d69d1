//! Error type definitions for the pixel tracker

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// File system errors (sender directory, open log, pixel)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Beacon image encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Errors raised while alerting a sender about an open
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Sender identity is not a usable mailbox
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    /// The alert message could not be assembled
    #[error("Message build failed: {0}")]
    Message(#[from] lettre::error::Error),

    /// Connection, TLS, authentication or submission failure
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// Submission did not finish within the configured deadline
    #[error("SMTP submission timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl NotificationError {
    /// Short label used for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::Message(_) => "message",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
        }
    }
}
