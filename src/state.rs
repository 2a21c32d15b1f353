//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::auth::RoleGrants;
use crate::config::Settings;
use crate::db::{ContentRepository, IntegrationRepository, RoleRepository, SmtpRepository};
use crate::error::AppError;
use deadpool_postgres::Pool;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
pub struct AppState {
    /// Database connection pool
    pub db_pool: Pool,

    pub settings: Settings,

    /// Outbound HTTP client for provider probes and HuggingFace
    pub http: reqwest::Client,

    pub content: ContentRepository,
    pub roles: RoleRepository,
    pub integrations: IntegrationRepository,
    pub smtp: SmtpRepository,

    /// Stored role permissions, merged into claims by the auth middleware
    pub grants: RoleGrants,
}

impl AppState {
    pub fn new(pool: Pool, settings: Settings) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.content.http_timeout_secs))
            .user_agent(concat!("hackerthink-cms/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            content: ContentRepository::new(pool.clone(), settings.content.slug_max_attempts),
            roles: RoleRepository::new(pool.clone()),
            integrations: IntegrationRepository::new(pool.clone()),
            smtp: SmtpRepository::new(pool.clone()),
            grants: RoleGrants::new(),
            db_pool: pool,
            settings,
            http,
        })
    }

    /// Reload role grants from the `roles` table
    pub async fn refresh_grants(&self) -> Result<(), AppError> {
        let roles = self.roles.list().await?;
        self.grants.replace(&roles).await;
        Ok(())
    }

    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.content.smtp_timeout_secs)
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
