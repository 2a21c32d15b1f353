//! Role and permission models

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub static ROLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]{1,49}$").expect("valid regex"));

/// Role as stored in the `roles` table
#[derive(Debug, Clone, Serialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&tokio_postgres::Row> for Role {
    fn from(row: &tokio_postgres::Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            permissions: row.get("permissions"),
            is_system: row.get("is_system"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Request to create a role
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(regex(
        path = *ROLE_NAME,
        message = "Role name must be 2-50 lowercase letters, digits, '-' or '_' and start with a letter"
    ))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Request to update a role
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(regex(
        path = *ROLE_NAME,
        message = "Role name must be 2-50 lowercase letters, digits, '-' or '_' and start with a letter"
    ))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// A permission in the catalog, grouped for the admin UI
#[derive(Debug, Clone, Serialize)]
pub struct PermissionInfo {
    pub name: String,
    pub group: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_validation() {
        let ok = CreateRoleRequest {
            name: "content-editor".into(),
            description: None,
            permissions: vec![],
        };
        assert!(ok.validate().is_ok());

        for bad in ["Admin", "x", "9lives", "has space"] {
            let req = CreateRoleRequest { name: bad.into(), description: None, permissions: vec![] };
            assert!(req.validate().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_update_allows_missing_name() {
        let req = UpdateRoleRequest { name: None, description: Some("x".into()), permissions: None };
        assert!(req.validate().is_ok());
    }
}
