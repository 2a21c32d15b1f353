//! SMTP configuration models

use crate::mail::Encryption;
use crate::models::SECRET_MASK;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// SMTP config row. The password never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct SmtpConfig {
    pub id: i32,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub encryption: Encryption,
    pub from_email: String,
    pub from_name: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_ok: Option<bool>,
    pub last_test_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SMTP config as returned to clients
#[derive(Debug, Serialize)]
pub struct SmtpConfigView {
    #[serde(flatten)]
    pub config: SmtpConfig,
    pub has_password: bool,
    /// Always the mask, present only when a password is stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
}

impl From<SmtpConfig> for SmtpConfigView {
    fn from(config: SmtpConfig) -> Self {
        let has_password = config.password.as_deref().is_some_and(|p| !p.is_empty());
        Self {
            config,
            has_password,
            password: has_password.then_some(SECRET_MASK),
        }
    }
}

fn validate_host(host: &str) -> Result<(), ValidationError> {
    let host = host.trim();
    if host.is_empty() || host.contains(char::is_whitespace) || host.contains('/') {
        let mut err = ValidationError::new("host");
        err.message = Some("Host must be a hostname or IP address".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSmtpConfigRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 255), custom(function = "validate_host"))]
    pub host: String,
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: i32,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub encryption: Encryption,
    #[validate(email(message = "From email must be a valid email address"))]
    pub from_email: String,
    #[validate(length(max = 255))]
    pub from_name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSmtpConfigRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255), custom(function = "validate_host"))]
    pub host: Option<String>,
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: Option<i32>,
    pub username: Option<String>,
    /// The mask keeps the stored password, an empty string clears it
    pub password: Option<String>,
    pub encryption: Option<Encryption>,
    #[validate(email(message = "From email must be a valid email address"))]
    pub from_email: Option<String>,
    #[validate(length(max = 255))]
    pub from_name: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateSmtpConfigRequest {
    /// Password change requested by this update, if any
    pub fn password_change(&self) -> Option<Option<&str>> {
        match self.password.as_deref() {
            None | Some(SECRET_MASK) => None,
            Some("") => Some(None),
            Some(password) => Some(Some(password)),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendTestRequest {
    #[validate(email(message = "Recipient must be a valid email address"))]
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request(value: serde_json::Value) -> CreateSmtpConfigRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_request_validation() {
        let ok = create_request(json!({
            "name": "Primary",
            "host": "smtp.example.com",
            "port": 587,
            "from_email": "noreply@hackerthink.com"
        }));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.encryption, Encryption::Starttls);
        assert!(ok.is_active);

        let bad_port = create_request(json!({
            "name": "Primary", "host": "smtp.example.com", "port": 70000,
            "from_email": "noreply@hackerthink.com"
        }));
        assert!(bad_port.validate().is_err());

        let bad_host = create_request(json!({
            "name": "Primary", "host": "  ", "port": 25,
            "from_email": "noreply@hackerthink.com"
        }));
        assert!(bad_host.validate().is_err());

        let bad_email = create_request(json!({
            "name": "Primary", "host": "smtp.example.com", "port": 25,
            "from_email": "not-an-email"
        }));
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_unknown_encryption_is_rejected() {
        let result = serde_json::from_value::<CreateSmtpConfigRequest>(json!({
            "name": "Primary", "host": "smtp.example.com", "port": 25,
            "from_email": "noreply@hackerthink.com", "encryption": "tls13"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_password_change() {
        let update = |password: Option<&str>| UpdateSmtpConfigRequest {
            name: None,
            host: None,
            port: None,
            username: None,
            password: password.map(str::to_string),
            encryption: None,
            from_email: None,
            from_name: None,
            is_active: None,
        };
        assert_eq!(update(None).password_change(), None);
        assert_eq!(update(Some(SECRET_MASK)).password_change(), None);
        assert_eq!(update(Some("")).password_change(), Some(None));
        assert_eq!(update(Some("hunter2")).password_change(), Some(Some("hunter2")));
    }

    #[test]
    fn test_view_masks_password() {
        let config = SmtpConfig {
            id: 1,
            name: "Primary".into(),
            host: "smtp.example.com".into(),
            port: 587,
            username: Some("mailer".into()),
            password: Some("hunter2".into()),
            encryption: Encryption::Starttls,
            from_email: "noreply@hackerthink.com".into(),
            from_name: None,
            is_default: true,
            is_active: true,
            last_tested_at: None,
            last_test_ok: None,
            last_test_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(SmtpConfigView::from(config)).unwrap();
        assert_eq!(json["password"], SECRET_MASK);
        assert_eq!(json["has_password"], true);
        assert!(!json.to_string().contains("hunter2"));
    }
}
