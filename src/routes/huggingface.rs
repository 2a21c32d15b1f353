//! HuggingFace import route handler

use crate::auth::{require_permission, Claims};
use crate::content::registry::Access;
use crate::error::{conflict_error, ApiResult};
use crate::integrations::huggingface::{self, model_url};
use crate::integrations::Provider;
use crate::models::SuccessResponse;
use crate::routes::content::resolve;
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
pub struct ImportModelRequest {
    pub repo_id: String,
    #[serde(default)]
    pub publish: bool,
}

/// Import a model from the HuggingFace Hub into `ai-models`
pub async fn import_model(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportModelRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Value>>)> {
    let resource = resolve("ai-models")?;
    require_permission(&claims, &resource.permission(Access::Write))?;
    let repo_id = huggingface::validate_repo_id(&payload.repo_id)?;

    if state
        .content
        .exists_with(resource, "source_url", &model_url(&repo_id))
        .await?
    {
        return Err(conflict_error(format!("Model '{}' has already been imported", repo_id)));
    }

    let token = state
        .integrations
        .find_enabled_by_provider(Provider::Huggingface)
        .await?
        .and_then(|i| i.config.get("api_token").and_then(Value::as_str).map(str::to_string));
    debug!("Importing {} (authenticated: {})", repo_id, token.is_some());

    let info = huggingface::fetch_model_info(&state.http, &repo_id, token.as_deref()).await?;
    let body = huggingface::map_model(&info, payload.publish);
    let item = state.content.create(resource, &body).await?;

    info!("🤗 Imported {} from HuggingFace for {}", repo_id, claims.sub);
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Model '{}' imported", repo_id),
            item,
        )),
    ))
}
