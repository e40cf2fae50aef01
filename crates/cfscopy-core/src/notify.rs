//! Run notifications
//!
//! A [`Notifier`] receives a subject and body when a run finishes or fails.
//! Delivery is best effort: the controller records a failed delivery in the
//! run log and carries on.

use thiserror::Error;

/// Errors raised while building or using a notifier
#[derive(Error, Debug)]
pub enum NotifyError {
    /// A sender or recipient address is malformed
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Required settings are missing
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    /// The message could not be assembled
    #[error("Failed to build message: {0}")]
    Message(String),

    /// The relay rejected or dropped the message
    #[error("Unable to send email: {0}")]
    Transport(String),
}

/// Something that can deliver a short run report
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send {
    /// Deliver `body` under `subject`
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Settings needed to reach an SMTP relay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpTarget {
    /// Relay as `host` or `host:port`
    pub relay: String,
    /// Sender address
    pub sender: String,
    /// Recipient addresses
    pub recipients: Vec<String>,
}

impl SmtpTarget {
    /// Relay host and port (port 25 when omitted)
    pub fn host_port(&self) -> Result<(String, u16), NotifyError> {
        let relay = self.relay.trim();
        if relay.is_empty() {
            return Err(NotifyError::NotConfigured("SMTP server not set".to_string()));
        }
        match relay.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port = port.parse::<u16>().map_err(|_| {
                    NotifyError::NotConfigured(format!("invalid SMTP port in '{}'", relay))
                })?;
                Ok((host.to_string(), port))
            }
            _ => Ok((relay.to_string(), 25)),
        }
    }
}

#[cfg(feature = "email")]
mod smtp {
    use super::{Notifier, NotifyError, SmtpTarget};
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::{Message, SmtpTransport, Transport};

    /// Plain SMTP notifier
    pub struct SmtpNotifier {
        sender: Mailbox,
        recipients: Vec<Mailbox>,
        transport: SmtpTransport,
    }

    impl std::fmt::Debug for SmtpNotifier {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SmtpNotifier")
                .field("sender", &self.sender.to_string())
                .field("recipients", &self.recipients.len())
                .finish()
        }
    }

    fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
        addr.trim()
            .parse::<Mailbox>()
            .map_err(|_| NotifyError::InvalidAddress(addr.to_string()))
    }

    impl SmtpNotifier {
        /// Validate the target and prepare a transport
        pub fn new(target: &SmtpTarget) -> Result<Self, NotifyError> {
            if target.recipients.is_empty() {
                return Err(NotifyError::NotConfigured("Receivers not set".to_string()));
            }
            if target.sender.trim().is_empty() {
                return Err(NotifyError::NotConfigured("Sender not set".to_string()));
            }

            let (host, port) = target.host_port()?;
            let sender = parse_mailbox(&target.sender)?;
            let recipients = target
                .recipients
                .iter()
                .map(|r| parse_mailbox(r))
                .collect::<Result<Vec<_>, _>>()?;

            let transport = SmtpTransport::builder_dangerous(host).port(port).build();

            Ok(Self {
                sender,
                recipients,
                transport,
            })
        }

        /// Assemble the message for `subject` and `body`
        pub fn message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
            let mut builder = Message::builder()
                .from(self.sender.clone())
                .subject(subject)
                .header(ContentType::TEXT_PLAIN);
            for recipient in &self.recipients {
                builder = builder.to(recipient.clone());
            }
            builder
                .body(body.to_string())
                .map_err(|e| NotifyError::Message(e.to_string()))
        }
    }

    impl Notifier for SmtpNotifier {
        fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
            let message = self.message(subject, body)?;
            self.transport
                .send(&message)
                .map_err(|e| NotifyError::Transport(e.to_string()))?;
            tracing::info!("Successfully sent mail.");
            Ok(())
        }
    }
}

#[cfg(feature = "email")]
pub use smtp::SmtpNotifier;

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SmtpTarget {
        SmtpTarget {
            relay: "mail.example.com:2525".to_string(),
            sender: "cfscopy@example.com".to_string(),
            recipients: vec!["ops@example.com".to_string(), "qa@example.org".to_string()],
        }
    }

    #[test]
    fn test_host_port() {
        assert_eq!(
            target().host_port().unwrap(),
            ("mail.example.com".to_string(), 2525)
        );

        let t = SmtpTarget {
            relay: "relay".to_string(),
            ..target()
        };
        assert_eq!(t.host_port().unwrap(), ("relay".to_string(), 25));

        let t = SmtpTarget {
            relay: "relay:abc".to_string(),
            ..target()
        };
        assert!(matches!(t.host_port(), Err(NotifyError::NotConfigured(_))));

        let t = SmtpTarget {
            relay: "  ".to_string(),
            ..target()
        };
        assert!(matches!(t.host_port(), Err(NotifyError::NotConfigured(_))));
    }

    #[test]
    fn test_error_display() {
        let err = NotifyError::InvalidAddress("nobody".to_string());
        assert_eq!(err.to_string(), "Invalid email address: nobody");
    }

    #[cfg(feature = "email")]
    #[test]
    fn test_smtp_notifier_validates_addresses() {
        assert!(SmtpNotifier::new(&target()).is_ok());

        let bad_sender = SmtpTarget {
            sender: "not-an-address".to_string(),
            ..target()
        };
        assert!(matches!(
            SmtpNotifier::new(&bad_sender),
            Err(NotifyError::InvalidAddress(_))
        ));

        let bad_recipient = SmtpTarget {
            recipients: vec!["ops@example.com".to_string(), "broken@".to_string()],
            ..target()
        };
        assert!(matches!(
            SmtpNotifier::new(&bad_recipient),
            Err(NotifyError::InvalidAddress(_))
        ));

        let nobody = SmtpTarget {
            recipients: Vec::new(),
            ..target()
        };
        assert!(matches!(
            SmtpNotifier::new(&nobody),
            Err(NotifyError::NotConfigured(_))
        ));
    }

    #[cfg(feature = "email")]
    #[test]
    fn test_smtp_message_headers() {
        let notifier = SmtpNotifier::new(&target()).unwrap();
        let message = notifier.message("cfscopy Finished!", "all done").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: cfscopy Finished!"));
        assert!(raw.contains("From: cfscopy@example.com"));
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("qa@example.org"));
        assert!(raw.contains("all done"));
    }
}
