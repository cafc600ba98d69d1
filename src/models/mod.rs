//! Domain types shared by the tracking services and the web layer

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Timestamp layout used in open log lines
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A sender allowed to receive open notifications
#[derive(Clone, PartialEq, Eq)]
pub struct SenderRecord {
    /// Email address, unique key of the directory
    pub identity: String,
    pub display_name: String,
    /// Outbound-mail secret for `identity`
    pub credential: String,
}

impl SenderRecord {
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for SenderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderRecord")
            .field("identity", &self.identity)
            .field("display_name", &self.display_name)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// One recorded fetch of the beacon image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEvent {
    pub sender: String,
    pub message_id: String,
    pub subject: String,
    pub client_ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl OpenEvent {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            sender: self.sender.clone(),
            message_id: self.message_id.clone(),
            subject: self.subject.clone(),
            client_ip: self.client_ip.clone(),
        }
    }

    /// Render the event as a single open log line, without the trailing newline
    ///
    /// Control characters in any field are escaped, so a decoded `%0A` in the
    /// URL cannot split one event across several lines.
    pub fn log_line(&self) -> String {
        format!(
            "[{}] Opened by {} | Subject: {} | IP: {} | UA: {} | Sender: {}",
            self.timestamp.format(LOG_TIMESTAMP_FORMAT),
            escape_control(&self.message_id),
            escape_control(&self.subject),
            escape_control(&self.client_ip),
            escape_control(&self.user_agent),
            escape_control(&self.sender)
        )
    }

    pub fn notice(&self) -> OpenNotice {
        OpenNotice {
            opened_by: self.message_id.clone(),
            subject: self.subject.clone(),
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Replace control characters with their `\n`, `\r`, `\u{..}` escapes
pub fn escape_control(value: &str) -> Cow<'_, str> {
    if !value.chars().any(char::is_control) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

/// Composite key used to suppress repeated opens
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub sender: String,
    pub message_id: String,
    pub subject: String,
    pub client_ip: String,
}

/// What the notifier tells a sender about an open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenNotice {
    /// Recipient identifier taken from the tracking URL
    pub opened_by: String,
    pub subject: String,
    pub client_ip: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

/// What the tracking service did with a request
///
/// Internal only; every outcome produces the same HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOutcome {
    Duplicate,
    Notified,
    UnknownSender,
    NotificationFailed,
    LogWriteFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event() -> OpenEvent {
        OpenEvent {
            sender: "alice@example.com".to_string(),
            message_id: "msg123".to_string(),
            subject: "Hello".to_string(),
            client_ip: "1.2.3.4".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        }
    }

    #[test]
    fn test_log_line_format() {
        assert_eq!(
            sample_event().log_line(),
            "[2024-03-09 14:05:07.000000] Opened by msg123 | Subject: Hello | IP: 1.2.3.4 | UA: Mozilla/5.0 | Sender: alice@example.com"
        );
    }

    #[test]
    fn test_log_line_escapes_line_breaks_in_every_field() {
        let mut event = sample_event();
        event.subject = "Hi\n[2024-01-01] Opened by forged".to_string();
        event.message_id = "msg\r1".to_string();
        event.user_agent = "UA\u{1b}[31m".to_string();
        event.sender = "alice@example.com\n".to_string();

        let line = event.log_line();

        assert_eq!(line.lines().count(), 1);
        assert!(!line.chars().any(char::is_control));
        assert!(line.contains("Opened by msg\\r1 "));
        assert!(line.contains("Subject: Hi\\n[2024-01-01] Opened by forged "));
        assert!(line.contains("UA: UA\\u{1b}[31m "));
        assert!(line.ends_with("Sender: alice@example.com\\n"));
    }

    #[test]
    fn test_escape_control_borrows_clean_values() {
        assert!(matches!(escape_control("Quarterly Report"), Cow::Borrowed(_)));
        assert_eq!(escape_control("a\tb"), "a\\tb");
    }

    #[test]
    fn test_dedup_key_ignores_user_agent_and_time() {
        let first = sample_event();
        let mut second = sample_event();
        second.user_agent = "Outlook".to_string();
        second.timestamp = first.timestamp + chrono::Duration::seconds(3);

        assert_eq!(first.dedup_key(), second.dedup_key());

        second.client_ip = "5.6.7.8".to_string();
        assert_ne!(first.dedup_key(), second.dedup_key());
    }

    #[test]
    fn test_sender_debug_redacts_credential() {
        let sender = SenderRecord::new("alice@example.com", "Alice", "secret123");
        let rendered = format!("{sender:?}");
        assert!(rendered.contains("alice@example.com"));
        assert!(!rendered.contains("secret123"));
    }
}
