//! Third-party integration route handlers

use crate::auth::{require_permission, Claims, INTEGRATIONS_MANAGE};
use crate::error::{validation_error, ApiResult, AppError};
use crate::integrations::providers::{self, ProviderSpec, ALL_PROVIDERS};
use crate::models::integration::{
    CreateIntegrationRequest, IntegrationView, TestResult, UpdateIntegrationRequest,
};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;
use tracing::{info, warn};
use validator::Validate;

pub async fn list_providers(
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<ProviderSpec>>>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;
    let specs: Vec<ProviderSpec> = ALL_PROVIDERS.iter().map(|p| p.spec()).collect();
    Ok(Json(SuccessResponse::with_data(
        format!("{} providers", specs.len()),
        specs,
    )))
}

pub async fn list_integrations(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<IntegrationView>>>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;

    let integrations: Vec<IntegrationView> = state
        .integrations
        .list()
        .await?
        .iter()
        .map(|i| i.view())
        .collect();
    Ok(Json(SuccessResponse::with_data(
        format!("Retrieved {} integrations", integrations.len()),
        integrations,
    )))
}

pub async fn get_integration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<IntegrationView>>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;

    let integration = state.integrations.find(id).await?;
    Ok(Json(SuccessResponse::with_data(
        "Integration retrieved",
        integration.view(),
    )))
}

pub async fn create_integration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateIntegrationRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<IntegrationView>>)> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let config = match &payload.config {
        Value::Null => Value::Object(Default::default()),
        config => config.clone(),
    };
    providers::validate_config(payload.provider, &config)?;

    let integration = state
        .integrations
        .create(payload.provider, payload.name.trim(), payload.enabled, &config)
        .await?;
    info!(
        "✅ Integration {} ({}) created by {}",
        integration.id, integration.provider, claims.sub
    );
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Integration created", integration.view())),
    ))
}

pub async fn update_integration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateIntegrationRequest>,
) -> ApiResult<Json<SuccessResponse<IntegrationView>>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let existing = state.integrations.find(id).await?;
    let config = match &payload.config {
        Some(incoming) => {
            let merged = providers::merge_config(existing.provider, &existing.config, incoming)?;
            providers::validate_config(existing.provider, &merged)?;
            Some(merged)
        }
        None => None,
    };

    let integration = state
        .integrations
        .update(
            id,
            payload.name.as_deref().map(str::trim),
            payload.enabled,
            config.as_ref(),
        )
        .await?;
    info!("Integration {} updated by {}", id, claims.sub);
    Ok(Json(SuccessResponse::with_data("Integration updated", integration.view())))
}

pub async fn delete_integration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;

    let integration = state.integrations.delete(id).await?;
    info!("🗑️  Integration {} ({}) deleted by {}", id, integration.provider, claims.sub);
    Ok(Json(MessageResponse::new(format!(
        "Integration '{}' deleted",
        integration.name
    ))))
}

/// Probe the provider with the stored config and record the outcome
pub async fn test_integration(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<TestResult>>> {
    require_permission(&claims, INTEGRATIONS_MANAGE)?;

    let integration = state.integrations.find(id).await?;
    if !integration.enabled {
        return Err(AppError::BadRequest(format!(
            "Integration '{}' is disabled",
            integration.name
        )));
    }

    let probe = providers::probe_request(
        integration.provider,
        &integration.config,
        &state.settings.site.name,
    )?;
    let outcome = providers::execute_probe(&state.http, &probe).await;
    let result = TestResult {
        ok: outcome.ok,
        status: outcome.status,
        message: outcome.message,
        tested_at: chrono::Utc::now(),
    };
    state.integrations.record_test(id, &result).await?;

    if result.ok {
        info!("✅ Integration {} ({}) test passed", id, integration.provider);
    } else {
        warn!("Integration {} ({}) test failed: {}", id, integration.provider, result.message);
    }
    let message = if result.ok { "Connection test passed" } else { "Connection test failed" };
    Ok(Json(SuccessResponse::with_data(message, result)))
}
