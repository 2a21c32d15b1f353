// Role repository
//
// Roles and their permission lists live in the `roles` table.

use crate::error::{conflict_error, not_found_error, AppError};
use crate::models::role::Role;
use deadpool_postgres::Pool;

const ROLE_COLUMNS: &str = "id, name, description, permissions, is_system, created_at, updated_at";

pub struct RoleRepository {
    pool: Pool,
}

impl RoleRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                format!("SELECT {} FROM roles ORDER BY is_system DESC, name", ROLE_COLUMNS).as_str(),
                &[],
            )
            .await?;
        Ok(rows.iter().map(Role::from).collect())
    }

    pub async fn find(&self, id: i32) -> Result<Option<Role>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS).as_str(),
                &[&id],
            )
            .await?;
        Ok(row.as_ref().map(Role::from))
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
    ) -> Result<Role, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!(
                    "INSERT INTO roles (name, description, permissions) VALUES ($1, $2, $3)
                     ON CONFLICT (name) DO NOTHING
                     RETURNING {}",
                    ROLE_COLUMNS
                )
                .as_str(),
                &[&name, &description, &permissions],
            )
            .await?
            .ok_or_else(|| conflict_error(format!("Role '{}' already exists", name)))?;
        Ok(Role::from(&row))
    }

    pub async fn update(
        &self,
        id: i32,
        name: Option<&str>,
        description: Option<&str>,
        permissions: Option<&[String]>,
    ) -> Result<Role, AppError> {
        let existing = self
            .find(id)
            .await?
            .ok_or_else(|| not_found_error(format!("Role {} not found", id)))?;

        if existing.is_system && name.is_some_and(|n| n != existing.name) {
            return Err(conflict_error(format!(
                "System role '{}' cannot be renamed",
                existing.name
            )));
        }

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!(
                    "UPDATE roles
                     SET name = COALESCE($1, name),
                         description = COALESCE($2, description),
                         permissions = COALESCE($3, permissions),
                         updated_at = NOW()
                     WHERE id = $4
                     RETURNING {}",
                    ROLE_COLUMNS
                )
                .as_str(),
                &[&name, &description, &permissions, &id],
            )
            .await?
            .ok_or_else(|| not_found_error(format!("Role {} not found", id)))?;
        Ok(Role::from(&row))
    }

    pub async fn delete(&self, id: i32) -> Result<Role, AppError> {
        let existing = self
            .find(id)
            .await?
            .ok_or_else(|| not_found_error(format!("Role {} not found", id)))?;

        if existing.is_system {
            return Err(conflict_error(format!(
                "System role '{}' cannot be deleted",
                existing.name
            )));
        }

        let client = self.pool.get().await?;
        client
            .execute("DELETE FROM roles WHERE id = $1 AND is_system = FALSE", &[&id])
            .await?;
        Ok(existing)
    }
}
