use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use wadash_core::SmtpConfig;

use crate::templates::Email;
use crate::NotifyError;

const IMPLICIT_TLS_PORT: u16 = 465;
const LOG_ONLY_SENDER: &str = "WhatsApp Analytics <noreply@localhost>";

/// Delivers rendered emails over SMTP, or logs them when no relay is configured.
pub enum Mailer {
    Smtp {
        transport: Box<SmtpTransport>,
        from: Mailbox,
    },
    Log {
        from: String,
    },
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mailer::Smtp { from, .. } => f.debug_struct("Smtp").field("from", from).finish(),
            Mailer::Log { from } => f.debug_struct("Log").field("from", from).finish(),
        }
    }
}

impl Mailer {
    /// SMTP when `smtp` is set, log-only otherwise. Port 465 uses implicit
    /// TLS; every other port upgrades with STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Address`] for an unparseable sender and
    /// [`NotifyError::Transport`] if the relay cannot be configured.
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, NotifyError> {
        let Some(smtp) = smtp else {
            return Ok(Self::log_only());
        };
        let from = parse_mailbox(&smtp.from)?;
        let builder = if smtp.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&smtp.host)?
        } else {
            SmtpTransport::starttls_relay(&smtp.host)?
        };
        let mut builder = builder.port(smtp.port);
        if let Some(username) = &smtp.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                smtp.password.clone().unwrap_or_default(),
            ));
        }
        Ok(Mailer::Smtp {
            transport: Box::new(builder.build()),
            from,
        })
    }

    #[must_use]
    pub fn log_only() -> Self {
        Mailer::Log {
            from: LOG_ONLY_SENDER.to_string(),
        }
    }

    #[must_use]
    pub fn sender(&self) -> String {
        match self {
            Mailer::Smtp { from, .. } => from.to_string(),
            Mailer::Log { from } => from.clone(),
        }
    }

    #[must_use]
    pub fn is_log_only(&self) -> bool {
        matches!(self, Mailer::Log { .. })
    }

    /// # Errors
    ///
    /// Returns [`NotifyError::Address`] for a bad recipient,
    /// [`NotifyError::Build`] if the message cannot be assembled, and
    /// [`NotifyError::Transport`] if the relay rejects it.
    pub fn send(&self, to: &str, email: &Email) -> Result<(), NotifyError> {
        let to_mailbox = parse_mailbox(to)?;
        match self {
            Mailer::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(to_mailbox)
                    .subject(email.subject.as_str())
                    .header(ContentType::TEXT_HTML)
                    .body(email.html.clone())?;
                transport.send(&message)?;
                tracing::info!(to, subject = %email.subject, "email sent");
            }
            Mailer::Log { .. } => {
                tracing::info!(to, subject = %email.subject, "smtp not configured; email logged only");
            }
        }
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| NotifyError::Address {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    #[test]
    fn missing_smtp_config_logs_only() {
        let mailer = Mailer::from_config(None).unwrap();
        assert!(mailer.is_log_only());
        mailer
            .send("ops@example.com", &templates::welcome("ops"))
            .unwrap();
    }

    #[test]
    fn bad_recipient_is_rejected_even_when_logging() {
        let err = Mailer::log_only()
            .send("not an address", &templates::welcome("x"))
            .unwrap_err();
        assert!(matches!(err, NotifyError::Address { .. }));
    }

    #[test]
    fn smtp_config_builds_transport_without_connecting() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            from: "Dashboard <dash@example.com>".to_string(),
        };
        let mailer = Mailer::from_config(Some(&smtp)).unwrap();
        assert!(!mailer.is_log_only());
        assert_eq!(mailer.sender(), "Dashboard <dash@example.com>");
    }
}
