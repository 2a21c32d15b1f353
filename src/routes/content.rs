//! Admin content route handlers
//!
//! One set of handlers serves every registry resource; the `{resource}`
//! path segment picks the descriptor.

use crate::auth::{require_permission, Claims};
use crate::content::registry::{self, Access, Resource};
use crate::content::BulkOutcome;
use crate::db::content::Scope;
use crate::error::{not_found_error, ApiResult, AppError};
use crate::models::content::{
    BulkRequest, DeletedSummary, ItemQuery, ListQuery, Page, ResourceStats, SlugCheckQuery,
    SlugCheckResponse,
};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;
use tracing::{debug, info};

/// Look up a resource by route name
pub(crate) fn resolve(name: &str) -> Result<&'static Resource, AppError> {
    registry::find(name).ok_or_else(|| not_found_error(format!("Unknown resource '{}'", name)))
}

/// Resolve the resource and check the caller's permission on it
fn authorize(claims: &Claims, name: &str, access: Access) -> Result<&'static Resource, AppError> {
    let resource = resolve(name)?;
    require_permission(claims, &resource.permission(access))?;
    Ok(resource)
}

pub async fn list_items(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(resource): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SuccessResponse<Page<Value>>>> {
    let resource = authorize(&claims, &resource, Access::Read)?;
    debug!("Listing {} for {}", resource.name, claims.sub);

    let page = state.content.list(resource, &query, Scope::Admin).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Retrieved {} of {} {}", page.items.len(), page.total, resource.name),
        page,
    )))
}

pub async fn create_item(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Value>>)> {
    let resource = authorize(&claims, &resource, Access::Write)?;
    debug!("Creating {} for {}", resource.name, claims.sub);

    let item = state.content.create(resource, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(format!("{} created", resource.label), item)),
    ))
}

pub async fn get_item(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((resource, id)): Path<(String, i32)>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let resource = authorize(&claims, &resource, Access::Read)?;

    let item = state
        .content
        .get(resource, id, query.include_children())
        .await?
        .ok_or_else(|| not_found_error(format!("{} {} not found", resource.label, id)))?;
    Ok(Json(SuccessResponse::with_data(format!("{} retrieved", resource.label), item)))
}

/// Handles both PUT and PATCH; only fields present in the body change
pub async fn update_item(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((resource, id)): Path<(String, i32)>,
    Json(body): Json<Value>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let resource = authorize(&claims, &resource, Access::Write)?;
    debug!("Updating {} {} for {}", resource.name, id, claims.sub);

    let item = state.content.update(resource, id, &body).await?;
    Ok(Json(SuccessResponse::with_data(format!("{} updated", resource.label), item)))
}

pub async fn delete_item(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((resource, id)): Path<(String, i32)>,
) -> ApiResult<Json<SuccessResponse<DeletedSummary>>> {
    let resource = authorize(&claims, &resource, Access::Write)?;

    let summary = state.content.delete(resource, id).await?;
    info!("🗑️  {} {} deleted by {}", resource.label, id, claims.sub);
    Ok(Json(SuccessResponse::with_data(
        format!("{} deleted", resource.label),
        summary,
    )))
}

pub async fn bulk_action(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(resource): Path<String>,
    Json(payload): Json<BulkRequest>,
) -> ApiResult<Json<SuccessResponse<BulkOutcome>>> {
    let resource = authorize(&claims, &resource, Access::Write)?;

    let outcome = state.content.bulk(resource, payload.action, &payload.ids).await?;
    let message = if outcome.partial {
        format!(
            "Bulk {} applied to {} of {} {}; {} not found",
            outcome.action.as_str(),
            outcome.affected.len(),
            outcome.requested,
            resource.name,
            outcome.missing.len()
        )
    } else {
        format!(
            "Bulk {} applied to {} {}",
            outcome.action.as_str(),
            outcome.affected.len(),
            resource.name
        )
    };
    Ok(Json(SuccessResponse::with_data(message, outcome)))
}

pub async fn slug_check(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(resource): Path<String>,
    Query(query): Query<SlugCheckQuery>,
) -> ApiResult<Json<SuccessResponse<SlugCheckResponse>>> {
    let resource = authorize(&claims, &resource, Access::Read)?;

    let result = state
        .content
        .slug_check(resource, &query.slug, query.exclude_id)
        .await?;
    let message = if result.available {
        "Slug is available"
    } else {
        "Slug is taken"
    };
    Ok(Json(SuccessResponse::with_data(message, result)))
}

/// Registry metadata the admin UI builds its forms from
pub async fn list_resources(
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<&'static Resource>>>> {
    let visible: Vec<&'static Resource> = registry::RESOURCES
        .iter()
        .filter(|r| claims.has_permission(&r.permission(Access::Read)))
        .collect();
    Ok(Json(SuccessResponse::with_data(
        format!("{} resources", visible.len()),
        visible,
    )))
}

pub async fn dashboard(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<ResourceStats>>>> {
    let readable: Vec<&'static str> = registry::top_level()
        .filter(|r| claims.has_permission(&r.permission(Access::Read)))
        .map(|r| r.name)
        .collect();
    if readable.is_empty() {
        return Err(AppError::Forbidden(
            "No content permissions for the dashboard".to_string(),
        ));
    }

    let stats = state
        .content
        .stats()
        .await?
        .into_iter()
        .filter(|s| readable.contains(&s.resource))
        .collect();
    Ok(Json(SuccessResponse::with_data("Dashboard statistics", stats)))
}
