//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod content;
mod huggingface;
mod integrations;
mod public;
mod roles;
mod smtp;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::error::ApiResult;
use crate::state::SharedState;
use axum::{
    extract::State,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware_stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/health/db", get(health_check_db))
        .merge(public_routes())
        .merge(admin_routes(state.clone()))
        .layer(middleware_stack)
        .with_state(state)
}

/// Read-only routes for the public site, no token required
fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/content/{resource}", get(public::list_content))
        .route("/api/content/{resource}/{slug}", get(public::get_content))
        .route("/api/commands", get(public::list_commands))
        .route("/api/commands/categories", get(public::command_categories))
        .route("/api/stories", get(public::list_stories))
        .route("/api/pages/privacy-policy", get(public::privacy_policy))
}

/// Admin routes; every matched route passes the token check first
fn admin_routes(state: SharedState) -> Router<SharedState> {
    Router::new()
        // Content
        .route(
            "/api/admin/content/{resource}",
            get(content::list_items).post(content::create_item),
        )
        .route("/api/admin/content/{resource}/bulk", post(content::bulk_action))
        .route("/api/admin/content/{resource}/slug-check", get(content::slug_check))
        .route(
            "/api/admin/content/{resource}/{id}",
            get(content::get_item)
                .put(content::update_item)
                .patch(content::update_item)
                .delete(content::delete_item),
        )
        .route("/api/admin/resources", get(content::list_resources))
        .route("/api/admin/dashboard", get(content::dashboard))
        .route("/api/admin/ai-models/import", post(huggingface::import_model))
        // Roles
        .route("/api/admin/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/api/admin/roles/{id}",
            get(roles::get_role).put(roles::update_role).delete(roles::delete_role),
        )
        .route("/api/admin/permissions", get(roles::list_permissions))
        // Integrations
        .route(
            "/api/admin/integrations",
            get(integrations::list_integrations).post(integrations::create_integration),
        )
        .route("/api/admin/integrations/providers", get(integrations::list_providers))
        .route(
            "/api/admin/integrations/{id}",
            get(integrations::get_integration)
                .put(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
        .route("/api/admin/integrations/{id}/test", post(integrations::test_integration))
        // SMTP
        .route("/api/admin/smtp", get(smtp::list_configs).post(smtp::create_config))
        .route(
            "/api/admin/smtp/{id}",
            get(smtp::get_config).put(smtp::update_config).delete(smtp::delete_config),
        )
        .route("/api/admin/smtp/{id}/default", post(smtp::set_default))
        .route("/api/admin/smtp/{id}/test", post(smtp::test_config))
        .route("/api/admin/smtp/{id}/send-test", post(smtp::send_test))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Database health check
async fn health_check_db(State(state): State<SharedState>) -> ApiResult<Json<serde_json::Value>> {
    let client = state.db_pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    let status = state.db_pool.status();
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Database connection is healthy.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "pool": {
            "size": status.size,
            "available": status.available,
            "max_size": status.max_size
        }
    })))
}
