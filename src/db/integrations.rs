// Integration repository
//
// Provider configs are stored unmasked in `integrations.config`; masking
// happens when rows are turned into views.

use crate::error::{not_found_error, AppError};
use crate::integrations::providers::{mask_config, secret_fingerprints, Provider};
use crate::models::integration::{Integration, IntegrationView, TestResult};
use deadpool_postgres::Pool;
use serde_json::Value;
use tokio_postgres::Row;

const INTEGRATION_COLUMNS: &str = "id, provider, name, enabled, config, last_tested_at, \
     last_test_ok, last_test_message, created_at, updated_at";

fn from_row(row: &Row) -> Result<Integration, AppError> {
    let provider: String = row.get("provider");
    Ok(Integration {
        id: row.get("id"),
        provider: provider.parse()?,
        name: row.get("name"),
        enabled: row.get("enabled"),
        config: row.get("config"),
        last_tested_at: row.get("last_tested_at"),
        last_test_ok: row.get("last_test_ok"),
        last_test_message: row.get("last_test_message"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl Integration {
    /// Client-facing view with secrets masked
    pub fn view(&self) -> IntegrationView {
        IntegrationView {
            id: self.id,
            provider: self.provider,
            provider_label: self.provider.spec().label,
            name: self.name.clone(),
            enabled: self.enabled,
            config: mask_config(self.provider, &self.config),
            secret_fingerprints: secret_fingerprints(self.provider, &self.config),
            last_tested_at: self.last_tested_at,
            last_test_ok: self.last_test_ok,
            last_test_message: self.last_test_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct IntegrationRepository {
    pool: Pool,
}

impl IntegrationRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Integration>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                format!("SELECT {} FROM integrations ORDER BY provider, name", INTEGRATION_COLUMNS).as_str(),
                &[],
            )
            .await?;
        rows.iter().map(from_row).collect()
    }

    pub async fn find(&self, id: i32) -> Result<Integration, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {} FROM integrations WHERE id = $1", INTEGRATION_COLUMNS).as_str(),
                &[&id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("Integration {} not found", id)))?;
        from_row(&row)
    }

    /// Most recently updated enabled integration of a provider
    pub async fn find_enabled_by_provider(&self, provider: Provider) -> Result<Option<Integration>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!(
                    "SELECT {} FROM integrations
                     WHERE provider = $1 AND enabled
                     ORDER BY updated_at DESC
                     LIMIT 1",
                    INTEGRATION_COLUMNS
                )
                .as_str(),
                &[&provider.as_str()],
            )
            .await?;
        row.as_ref().map(from_row).transpose()
    }

    pub async fn create(
        &self,
        provider: Provider,
        name: &str,
        enabled: bool,
        config: &Value,
    ) -> Result<Integration, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                format!(
                    "INSERT INTO integrations (provider, name, enabled, config)
                     VALUES ($1, $2, $3, $4)
                     RETURNING {}",
                    INTEGRATION_COLUMNS
                )
                .as_str(),
                &[&provider.as_str(), &name, &enabled, config],
            )
            .await?;
        from_row(&row)
    }

    /// Update name/enabled/config. `config` must already be merged.
    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        enabled: Option<bool>,
        config: Option<&Value>,
    ) -> Result<Integration, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!(
                    "UPDATE integrations
                     SET name = COALESCE($1, name),
                         enabled = COALESCE($2, enabled),
                         config = COALESCE($3, config),
                         updated_at = NOW()
                     WHERE id = $4
                     RETURNING {}",
                    INTEGRATION_COLUMNS
                )
                .as_str(),
                &[&name, &enabled, &config, &id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("Integration {} not found", id)))?;
        from_row(&row)
    }

    pub async fn delete(&self, id: i32) -> Result<Integration, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("DELETE FROM integrations WHERE id = $1 RETURNING {}", INTEGRATION_COLUMNS).as_str(),
                &[&id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("Integration {} not found", id)))?;
        from_row(&row)
    }

    pub async fn record_test(&self, id: i32, result: &TestResult) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE integrations
                 SET last_tested_at = $1, last_test_ok = $2, last_test_message = $3
                 WHERE id = $4",
                &[&result.tested_at, &result.ok, &result.message, &id],
            )
            .await?;
        Ok(())
    }
}
