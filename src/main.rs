//! HackerThink CMS API
//!
//! Admin and public JSON API for the HackerThink learning and news site:
//! content CRUD for every content type, roles and permissions, SMTP and
//! third-party integration settings, HuggingFace model import and the
//! read-only public endpoints.

mod auth;
mod config;
mod content;
mod db;
mod error;
mod integrations;
mod mail;
mod models;
mod pages;
mod routes;
mod state;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting HackerThink CMS API...");

    // Load configuration
    let settings = Settings::load()?;
    crate::error::set_expose_error_details(settings.environment.is_development());
    info!(
        "📋 Configuration loaded ({:?}, TLS to database: {})",
        settings.environment, settings.database.require_tls
    );

    let pool = db::create_pool(&settings.database)?;
    if let Err(e) = db::verify_connection(&pool).await {
        error!("❌ FATAL: Failed to connect to the database: {}", e);
        error!("DATABASE_URL (or DB_HOST/DB_USER/...) must point at a reachable PostgreSQL");
        return Err(e.into());
    }

    // Create tables if they don't exist
    db::schema::bootstrap(&pool).await?;

    let state = Arc::new(AppState::new(pool, settings.clone())?);
    state.refresh_grants().await?;

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Public ───");
    info!("   GET  /api/content/{{resource}}          - Published items");
    info!("   GET  /api/content/{{resource}}/{{slug}}   - Published item with children");
    info!("   GET  /api/commands                     - Commands library");
    info!("   GET  /api/stories                      - Stories");
    info!("   GET  /api/pages/privacy-policy         - Privacy policy");
    info!("");
    info!("   ─── Content (auth) ───");
    info!("   GET|POST /api/admin/content/{{resource}}            - List / create");
    info!("   GET|PUT|PATCH|DELETE /api/admin/content/{{resource}}/{{id}}");
    info!("   POST /api/admin/content/{{resource}}/bulk           - Bulk actions");
    info!("   GET  /api/admin/content/{{resource}}/slug-check     - Slug availability");
    info!("   POST /api/admin/ai-models/import                  - HuggingFace import");
    info!("   GET  /api/admin/dashboard                         - Totals");
    info!("");
    info!("   ─── Settings (auth) ───");
    info!("   /api/admin/roles, /api/admin/permissions");
    info!("   /api/admin/integrations, /api/admin/integrations/{{id}}/test");
    info!("   /api/admin/smtp, /api/admin/smtp/{{id}}/default|test|send-test");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing; `LOG_FORMAT=json` switches to JSON lines
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hackerthink_cms=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
