//! Outgoing mail
//!
//! Builds lettre transports from stored SMTP configs and sends test
//! messages.

use crate::error::{validation_error, AppError};
use crate::models::smtp::SmtpConfig;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transport security
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// Plain connection, no TLS
    None,
    /// Implicit TLS (usually port 465)
    Ssl,
    /// STARTTLS upgrade (usually port 587)
    #[default]
    Starttls,
}

impl Encryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encryption::None => "none",
            Encryption::Ssl => "ssl",
            Encryption::Starttls => "starttls",
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encryption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Encryption::None),
            "ssl" | "tls" => Ok(Encryption::Ssl),
            "starttls" => Ok(Encryption::Starttls),
            other => Err(validation_error(format!(
                "Unknown encryption '{}', expected none, ssl or starttls",
                other
            ))),
        }
    }
}

pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Build a transport for a config. Does not open a connection.
pub fn build_transport(config: &SmtpConfig, timeout: Duration) -> Result<SmtpTransport, AppError> {
    let port = u16::try_from(config.port)
        .map_err(|_| validation_error(format!("Invalid SMTP port {}", config.port)))?;

    let builder = match config.encryption {
        Encryption::Ssl => SmtpTransport::relay(&config.host),
        Encryption::Starttls => SmtpTransport::starttls_relay(&config.host),
        Encryption::None => Ok(SmtpTransport::builder_dangerous(&config.host)),
    }
    .map_err(|e| validation_error(format!("Invalid SMTP host '{}': {}", config.host, e)))?;

    let mut builder = builder.port(port).timeout(Some(timeout));
    if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
        let password = config.password.clone().unwrap_or_default();
        builder = builder.credentials(Credentials::new(username.to_string(), password));
    }
    Ok(builder.build())
}

/// Mailbox of the configured sender
fn sender(config: &SmtpConfig) -> Result<Mailbox, AppError> {
    let address = config
        .from_email
        .parse()
        .map_err(|e| validation_error(format!("Invalid from address '{}': {}", config.from_email, e)))?;
    Ok(Mailbox::new(config.from_name.clone(), address))
}

/// Plain-text test message from the config's sender
pub fn build_test_message(config: &SmtpConfig, to: &str, site_name: &str) -> Result<Message, AppError> {
    let recipient: Mailbox = to
        .parse()
        .map_err(|e| validation_error(format!("Invalid recipient '{}': {}", to, e)))?;

    let body = format!(
        "This is a test email from the {site} admin panel.\n\n\
         SMTP configuration: {name}\n\
         Server: {host}:{port} ({encryption})\n\n\
         If you received this message, the configuration works.",
        site = site_name,
        name = config.name,
        host = config.host,
        port = config.port,
        encryption = config.encryption,
    );

    Message::builder()
        .from(sender(config)?)
        .to(recipient)
        .subject(format!("{} SMTP test", site_name))
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build message: {}", e)))
}

/// Connect and authenticate without sending anything
pub async fn test_connection(config: &SmtpConfig, timeout: Duration) -> Result<(), AppError> {
    let transport = build_transport(config, timeout)?;
    debug!("Testing SMTP connection to {}:{}", config.host, config.port);
    match transport.test_connection().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::Upstream(format!(
            "SMTP server {}:{} did not accept the connection",
            config.host, config.port
        ))),
        Err(e) => {
            warn!("SMTP connection test failed for {}: {}", config.host, e);
            Err(AppError::Upstream(format!("SMTP connection failed: {}", e)))
        }
    }
}

pub async fn send(config: &SmtpConfig, message: Message, timeout: Duration) -> Result<(), AppError> {
    let transport = build_transport(config, timeout)?;
    let response = transport.send(message).await.map_err(|e| {
        warn!("SMTP send failed via {}: {}", config.host, e);
        AppError::Upstream(format!("Failed to send email: {}", e))
    })?;
    info!("📧 Mail accepted by {} ({})", config.host, response.code());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn config(encryption: Encryption) -> SmtpConfig {
        SmtpConfig {
            id: 1,
            name: "Primary".into(),
            host: "smtp.example.com".into(),
            port: 587,
            username: Some("mailer".into()),
            password: Some("hunter2".into()),
            encryption,
            from_email: "noreply@hackerthink.com".into(),
            from_name: Some("HackerThink".into()),
            is_default: true,
            is_active: true,
            last_tested_at: None,
            last_test_ok: None,
            last_test_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_encryption_parsing() {
        assert_eq!("STARTTLS".parse::<Encryption>().unwrap(), Encryption::Starttls);
        assert_eq!("tls".parse::<Encryption>().unwrap(), Encryption::Ssl);
        assert_eq!("none".parse::<Encryption>().unwrap(), Encryption::None);
        assert!("smime".parse::<Encryption>().is_err());
        assert_eq!(Encryption::default(), Encryption::Starttls);
    }

    #[test]
    fn test_build_test_message() {
        let message = build_test_message(&config(Encryption::Starttls), "admin@hackerthink.com", "HackerThink")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: HackerThink SMTP test"));
        assert!(raw.contains("To: admin@hackerthink.com"));
        assert!(raw.contains("noreply@hackerthink.com"));
        assert!(raw.contains("smtp.example.com:587 (starttls)"));
    }

    #[test]
    fn test_build_test_message_rejects_bad_recipient() {
        let result = build_test_message(&config(Encryption::None), "nobody", "HackerThink");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_build_transport_for_each_encryption() {
        for encryption in [Encryption::None, Encryption::Ssl, Encryption::Starttls] {
            assert!(build_transport(&config(encryption), Duration::from_secs(5)).is_ok());
        }
    }

    #[test]
    fn test_build_transport_rejects_bad_port() {
        let mut bad = config(Encryption::None);
        bad.port = 70000;
        assert!(build_transport(&bad, Duration::from_secs(5)).is_err());
    }
}
