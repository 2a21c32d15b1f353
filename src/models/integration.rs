//! Integration models

use crate::integrations::providers::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Integration row, secrets included. Never serialized directly.
#[derive(Debug, Clone)]
pub struct Integration {
    pub id: i32,
    pub provider: Provider,
    pub name: String,
    pub enabled: bool,
    pub config: Value,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_ok: Option<bool>,
    pub last_test_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Integration as returned to clients, secrets masked
#[derive(Debug, Serialize)]
pub struct IntegrationView {
    pub id: i32,
    pub provider: Provider,
    pub provider_label: &'static str,
    pub name: String,
    pub enabled: bool,
    pub config: Value,
    /// Short hashes of stored secrets so the UI can tell whether they changed
    pub secret_fingerprints: BTreeMap<String, String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_ok: Option<bool>,
    pub last_test_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIntegrationRequest {
    pub provider: Provider,
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Value,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateIntegrationRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub config: Option<Value>,
}

/// Outcome of an integration or SMTP connection test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    pub tested_at: DateTime<Utc>,
}
