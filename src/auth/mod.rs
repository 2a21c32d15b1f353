//! Authentication and authorization module
//!
//! Verifies tokens from the external auth provider and checks
//! role/permission grants.

mod grants;
mod jwt;
mod middleware;

#[cfg(test)]
pub use jwt::test_support;
pub use grants::RoleGrants;
pub use jwt::{decode_token, Claims};
pub use middleware::{auth_middleware, require_admin, require_permission};

use crate::content::registry::{Access, RESOURCES};
use crate::models::role::PermissionInfo;

pub const ROLES_MANAGE: &str = "roles:manage";
pub const INTEGRATIONS_MANAGE: &str = "integrations:manage";
pub const SMTP_MANAGE: &str = "smtp:manage";

/// Every permission a role may carry
pub fn permission_catalog() -> Vec<PermissionInfo> {
    let mut catalog = Vec::new();
    for resource in RESOURCES {
        catalog.push(PermissionInfo {
            name: resource.permission(Access::Read),
            group: "content".to_string(),
            description: format!("View {} in the admin area", resource.label.to_lowercase()),
        });
        catalog.push(PermissionInfo {
            name: resource.permission(Access::Write),
            group: "content".to_string(),
            description: format!("Create, edit and delete {}", resource.label.to_lowercase()),
        });
    }
    for (name, description) in [
        (ROLES_MANAGE, "Manage roles and permissions"),
        (INTEGRATIONS_MANAGE, "Manage third-party integrations"),
        (SMTP_MANAGE, "Manage SMTP configurations"),
    ] {
        catalog.push(PermissionInfo {
            name: name.to_string(),
            group: "settings".to_string(),
            description: description.to_string(),
        });
    }
    catalog
}

/// Deduplicate and sort permissions, rejecting unknown names
pub fn normalize_permissions(requested: &[String]) -> Result<Vec<String>, String> {
    let known: std::collections::HashSet<String> =
        permission_catalog().into_iter().map(|p| p.name).collect();
    let mut permissions: Vec<String> = Vec::with_capacity(requested.len());
    for permission in requested {
        let permission = permission.trim();
        if !known.contains(permission) {
            return Err(format!("Unknown permission '{}'", permission));
        }
        permissions.push(permission.to_string());
    }
    permissions.sort();
    permissions.dedup();
    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_contains_content_and_settings() {
        let names: Vec<String> = permission_catalog().into_iter().map(|p| p.name).collect();
        assert!(names.contains(&"articles:read".to_string()));
        assert!(names.contains(&"course-chapters:write".to_string()));
        assert!(names.contains(&SMTP_MANAGE.to_string()));
        assert_eq!(names.len(), RESOURCES.len() * 2 + 3);
    }

    #[test]
    fn test_admin_and_permission_checks() {
        use test_support::{issue_token, TEST_SECRET};
        let admin = decode_token(&issue_token("admin", &[], 600), TEST_SECRET).unwrap();
        let editor =
            decode_token(&issue_token("editor", &["articles:write"], 600), TEST_SECRET).unwrap();

        assert!(require_admin(&admin).is_ok());
        assert!(require_admin(&editor).is_err());
        assert!(require_permission(&admin, SMTP_MANAGE).is_ok());
        assert!(require_permission(&editor, "articles:write").is_ok());
        assert!(require_permission(&editor, "articles:read").is_err());
    }

    #[test]
    fn test_normalize_permissions() {
        let requested = vec![
            "news:write".to_string(),
            " articles:read ".to_string(),
            "news:write".to_string(),
        ];
        assert_eq!(
            normalize_permissions(&requested).unwrap(),
            vec!["articles:read".to_string(), "news:write".to_string()]
        );
        assert!(normalize_permissions(&["everything".to_string()]).is_err());
    }
}
