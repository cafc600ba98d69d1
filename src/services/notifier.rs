//! Open notifications sent back to the tracked email's sender
//!
//! The SMTP notifier authenticates as the sender, using the identity as the
//! username and the directory credential as the password, and mails the alert
//! to that same address. Anyone who can read the sender directory can send
//! mail as every sender in it; keep the file readable by the service only.

use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{NotificationConfig, SmtpTls};
use crate::errors::{NotificationError, NotificationResult};
use crate::models::{OpenNotice, SenderRecord};

const NOTICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Delivers an alert about an open to the sender of the tracked email
#[async_trait]
pub trait OpenNotifier: Send + Sync {
    async fn notify(&self, sender: &SenderRecord, notice: &OpenNotice) -> NotificationResult<()>;

    fn name(&self) -> &'static str;
}

/// Build the notifier selected by configuration
pub fn notifier_from_config(config: &NotificationConfig) -> std::sync::Arc<dyn OpenNotifier> {
    if config.enabled {
        std::sync::Arc::new(SmtpNotifier::from_config(config))
    } else {
        std::sync::Arc::new(DisabledNotifier)
    }
}

/// Authenticated SMTP submission using the sender's own credential
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    host: String,
    port: u16,
    tls: SmtpTls,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            tls: config.tls,
            timeout: config.timeout,
        }
    }

    fn transport(&self, sender: &SenderRecord) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match self.tls {
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?,
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.host),
        };

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                sender.identity.clone(),
                sender.credential.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl OpenNotifier for SmtpNotifier {
    async fn notify(&self, sender: &SenderRecord, notice: &OpenNotice) -> NotificationResult<()> {
        let message = build_message(sender, notice)?;
        let transport = self.transport(sender)?;

        debug!(
            sender = %sender.identity,
            host = %self.host,
            port = self.port,
            "Submitting open notification"
        );

        match tokio::time::timeout(self.timeout, transport.send(message)).await {
            Ok(result) => {
                result?;
                info!(sender = %sender.identity, "Open notification sent");
                Ok(())
            }
            Err(_) => Err(NotificationError::Timeout { after: self.timeout }),
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Used when notifications are switched off in configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl OpenNotifier for DisabledNotifier {
    async fn notify(&self, sender: &SenderRecord, _notice: &OpenNotice) -> NotificationResult<()> {
        debug!(sender = %sender.identity, "Notifications disabled, skipping alert");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Assemble the alert email the sender receives about an open
pub fn build_message(sender: &SenderRecord, notice: &OpenNotice) -> NotificationResult<Message> {
    let address: Address = sender.identity.parse()?;
    let from = Mailbox::new(Some(sender.display_name.clone()), address.clone());
    let to = Mailbox::new(None, address);

    let body = format!(
        "Open Tracking Notification:\n\
         \n\
         Recipient: {}\n\
         Subject: {}\n\
         IP Address: {}\n\
         User-Agent: {}\n\
         Time: {}\n\
         Sent by: {} <{}>\n",
        notice.opened_by,
        notice.subject,
        notice.client_ip,
        notice.user_agent,
        notice.timestamp.format(NOTICE_TIME_FORMAT),
        sender.display_name,
        sender.identity,
    );

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(format!("📬 Email Opened by {} | {}", notice.opened_by, notice.subject))
        .header(ContentType::TEXT_PLAIN)
        .body(body)?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alice() -> SenderRecord {
        SenderRecord::new("alice@example.com", "Alice", "secret123")
    }

    fn notice() -> OpenNotice {
        OpenNotice {
            opened_by: "msg123".to_string(),
            subject: "Hello".to_string(),
            client_ip: "1.2.3.4".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap(),
        }
    }

    #[test]
    fn test_build_message_headers() {
        let message = build_message(&alice(), &notice()).unwrap();
        let envelope = message.envelope();

        assert_eq!(envelope.from().map(|a| a.to_string()), Some("alice@example.com".to_string()));
        assert_eq!(envelope.to().len(), 1);
        assert_eq!(envelope.to()[0].to_string(), "alice@example.com");

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: Alice <alice@example.com>"));
        assert!(raw.contains("To: alice@example.com"));
    }

    #[test]
    fn test_build_message_body_describes_open() {
        let raw = String::from_utf8(build_message(&alice(), &notice()).unwrap().formatted()).unwrap();

        assert!(raw.contains("Recipient: msg123"));
        assert!(raw.contains("IP Address: 1.2.3.4"));
        assert!(raw.contains("User-Agent: Mozilla/5.0"));
        assert!(raw.contains("Time: 2024-02-29 23:59:01"));
        assert!(!raw.contains("secret123"));
    }

    #[test]
    fn test_build_message_rejects_bad_identity() {
        let sender = SenderRecord::new("not-an-address", "Nobody", "pw");
        let err = build_message(&sender, &notice()).unwrap_err();
        assert_eq!(err.kind(), "invalid_address");
    }

    #[tokio::test]
    async fn test_disabled_notifier_succeeds() {
        let notifier = DisabledNotifier;
        assert!(notifier.notify(&alice(), &notice()).await.is_ok());
        assert_eq!(notifier.name(), "disabled");
    }

    #[test]
    fn test_notifier_from_config() {
        let mut config = NotificationConfig::default();
        assert_eq!(notifier_from_config(&config).name(), "smtp");

        config.enabled = false;
        assert_eq!(notifier_from_config(&config).name(), "disabled");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_error() {
        let notifier = SmtpNotifier {
            host: "127.0.0.1".to_string(),
            port: 1,
            tls: SmtpTls::None,
            timeout: Duration::from_secs(2),
        };

        assert!(notifier.notify(&alice(), &notice()).await.is_err());
    }
}
