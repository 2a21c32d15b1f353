//! Role grants
//!
//! Permission lists stored on roles, held in memory so the auth gate can
//! merge them into token claims without a database round trip. Reloaded
//! at startup and after every role write.

use crate::auth::Claims;
use crate::models::role::Role;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RoleGrants {
    by_role: RwLock<HashMap<String, Vec<String>>>,
}

impl RoleGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with the given roles
    pub async fn replace(&self, roles: &[Role]) {
        let table: HashMap<String, Vec<String>> = roles
            .iter()
            .map(|role| (role.name.clone(), role.permissions.clone()))
            .collect();
        debug!("Loaded grants for {} roles", table.len());
        *self.by_role.write().await = table;
    }

    /// Add the stored permissions of the token's role to its claims
    pub async fn apply(&self, claims: &mut Claims) {
        let table = self.by_role.read().await;
        let Some(granted) = table.get(&claims.role) else {
            return;
        };
        for permission in granted {
            if !claims.permissions.contains(permission) {
                claims.permissions.push(permission.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::decode_token;
    use crate::auth::test_support::{issue_token, TEST_SECRET};
    use pretty_assertions::assert_eq;

    fn role(name: &str, permissions: &[&str]) -> Role {
        Role {
            id: 1,
            name: name.to_string(),
            description: None,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_system: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn claims(role: &str, permissions: &[&str]) -> Claims {
        decode_token(&issue_token(role, permissions, 600), TEST_SECRET).unwrap()
    }

    #[tokio::test]
    async fn test_role_permissions_are_merged() {
        let grants = RoleGrants::new();
        grants
            .replace(&[role("editor", &["articles:read", "articles:write"])])
            .await;

        let mut editor = claims("editor", &["articles:read", "news:write"]);
        assert!(!editor.has_permission("articles:write"));
        grants.apply(&mut editor).await;
        assert!(editor.has_permission("articles:write"));
        assert!(editor.has_permission("news:write"));
        assert_eq!(editor.permissions.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_role_gets_token_permissions_only() {
        let grants = RoleGrants::new();
        grants.replace(&[role("editor", &["articles:write"])]).await;

        let mut guest = claims("guest", &["news:read"]);
        grants.apply(&mut guest).await;
        assert_eq!(guest.permissions, vec!["news:read".to_string()]);
    }

    #[tokio::test]
    async fn test_replace_drops_revoked_permissions() {
        let grants = RoleGrants::new();
        grants.replace(&[role("editor", &["articles:write"])]).await;
        grants.replace(&[role("editor", &[])]).await;

        let mut editor = claims("editor", &[]);
        grants.apply(&mut editor).await;
        assert!(!editor.has_permission("articles:write"));
    }
}
