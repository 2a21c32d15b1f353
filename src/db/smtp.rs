// SMTP configuration repository
//
// At most one row has `is_default = true`; switching the default happens in
// a single transaction.

use crate::error::{not_found_error, AppError};
use crate::models::integration::TestResult;
use crate::models::smtp::{CreateSmtpConfigRequest, SmtpConfig, UpdateSmtpConfigRequest};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tracing::info;

const SMTP_COLUMNS: &str = "id, name, host, port, username, password, encryption, from_email, \
     from_name, is_default, is_active, last_tested_at, last_test_ok, last_test_message, \
     created_at, updated_at";

fn from_row(row: &Row) -> Result<SmtpConfig, AppError> {
    let encryption: String = row.get("encryption");
    Ok(SmtpConfig {
        id: row.get("id"),
        name: row.get("name"),
        host: row.get("host"),
        port: row.get("port"),
        username: row.get("username"),
        password: row.get("password"),
        encryption: encryption.parse()?,
        from_email: row.get("from_email"),
        from_name: row.get("from_name"),
        is_default: row.get("is_default"),
        is_active: row.get("is_active"),
        last_tested_at: row.get("last_tested_at"),
        last_test_ok: row.get("last_test_ok"),
        last_test_message: row.get("last_test_message"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub struct SmtpRepository {
    pool: Pool,
}

impl SmtpRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<SmtpConfig>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                format!("SELECT {} FROM smtp_configs ORDER BY is_default DESC, name", SMTP_COLUMNS).as_str(),
                &[],
            )
            .await?;
        rows.iter().map(from_row).collect()
    }

    pub async fn find(&self, id: i32) -> Result<SmtpConfig, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {} FROM smtp_configs WHERE id = $1", SMTP_COLUMNS).as_str(),
                &[&id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("SMTP configuration {} not found", id)))?;
        from_row(&row)
    }

    /// Insert a config. The first config, or one flagged default, becomes the default.
    pub async fn create(&self, request: &CreateSmtpConfigRequest) -> Result<SmtpConfig, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let existing: i64 = tx
            .query_one("SELECT COUNT(*) FROM smtp_configs", &[])
            .await?
            .get(0);
        let is_default = request.is_default || existing == 0;
        if is_default {
            tx.execute("UPDATE smtp_configs SET is_default = FALSE WHERE is_default", &[])
                .await?;
        }

        let password = request.password.as_deref().filter(|p| !p.is_empty());
        let row = tx
            .query_one(
                format!(
                    "INSERT INTO smtp_configs
                        (name, host, port, username, password, encryption, from_email, from_name, is_default, is_active)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                     RETURNING {}",
                    SMTP_COLUMNS
                )
                .as_str(),
                &[
                    &request.name.trim(),
                    &request.host.trim(),
                    &request.port,
                    &request.username,
                    &password,
                    &request.encryption.as_str(),
                    &request.from_email.trim(),
                    &request.from_name,
                    &is_default,
                    &request.is_active,
                ],
            )
            .await?;
        tx.commit().await?;

        from_row(&row)
    }

    /// Partial update. A masked password keeps the stored one.
    pub async fn update(&self, id: i32, request: &UpdateSmtpConfigRequest) -> Result<SmtpConfig, AppError> {
        let (password_changed, password) = match request.password_change() {
            Some(password) => (true, password),
            None => (false, None),
        };
        let encryption = request.encryption.map(|e| e.as_str());
        let host = request.host.as_deref().map(str::trim);

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!(
                    "UPDATE smtp_configs
                     SET name = COALESCE($1, name),
                         host = COALESCE($2, host),
                         port = COALESCE($3, port),
                         username = COALESCE($4, username),
                         password = CASE WHEN $5 THEN $6 ELSE password END,
                         encryption = COALESCE($7, encryption),
                         from_email = COALESCE($8, from_email),
                         from_name = COALESCE($9, from_name),
                         is_active = COALESCE($10, is_active),
                         updated_at = NOW()
                     WHERE id = $11
                     RETURNING {}",
                    SMTP_COLUMNS
                )
                .as_str(),
                &[
                    &request.name,
                    &host,
                    &request.port,
                    &request.username,
                    &password_changed,
                    &password,
                    &encryption,
                    &request.from_email,
                    &request.from_name,
                    &request.is_active,
                    &id,
                ],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("SMTP configuration {} not found", id)))?;
        from_row(&row)
    }

    /// Delete a config. When it was the default, the oldest remaining one takes over.
    pub async fn delete(&self, id: i32) -> Result<SmtpConfig, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                format!("DELETE FROM smtp_configs WHERE id = $1 RETURNING {}", SMTP_COLUMNS).as_str(),
                &[&id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("SMTP configuration {} not found", id)))?;
        let deleted = from_row(&row)?;

        if deleted.is_default {
            tx.execute(
                "UPDATE smtp_configs SET is_default = TRUE
                 WHERE id = (SELECT id FROM smtp_configs ORDER BY created_at, id LIMIT 1)",
                &[],
            )
            .await?;
        }
        tx.commit().await?;

        Ok(deleted)
    }

    pub async fn set_default(&self, id: i32) -> Result<SmtpConfig, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        tx.execute(
            "UPDATE smtp_configs SET is_default = FALSE WHERE is_default AND id <> $1",
            &[&id],
        )
        .await?;
        let row = tx
            .query_opt(
                format!(
                    "UPDATE smtp_configs SET is_default = TRUE, updated_at = NOW()
                     WHERE id = $1
                     RETURNING {}",
                    SMTP_COLUMNS
                )
                .as_str(),
                &[&id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("SMTP configuration {} not found", id)))?;
        tx.commit().await?;

        info!("✅ SMTP configuration {} is now the default", id);
        from_row(&row)
    }

    pub async fn record_test(&self, id: i32, result: &TestResult) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE smtp_configs
                 SET last_tested_at = $1, last_test_ok = $2, last_test_message = $3
                 WHERE id = $4",
                &[&result.tested_at, &result.ok, &result.message, &id],
            )
            .await?;
        Ok(())
    }
}
