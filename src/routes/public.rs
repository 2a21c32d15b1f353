//! Public read-only route handlers
//!
//! No authentication. Only public, publishable resources are served and
//! only rows with `published = true`.

use crate::content::registry::Resource;
use crate::db::content::Scope;
use crate::error::{not_found_error, ApiResult, AppError};
use crate::models::content::{CategoryCount, ListQuery, Page};
use crate::models::SuccessResponse;
use crate::pages::{self, PageDocument};
use crate::routes::content::resolve;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::debug;

/// Resolve a resource that is exposed on the public API
fn public_resource(name: &str) -> Result<&'static Resource, AppError> {
    match resolve(name)? {
        resource if resource.public && resource.publishable => Ok(resource),
        _ => Err(not_found_error(format!("Unknown resource '{}'", name))),
    }
}

/// Drop filters the public API does not offer
fn public_query(mut query: ListQuery) -> ListQuery {
    query.status = None;
    query.parent_id = None;
    query
}

async fn list_published(
    state: &SharedState,
    resource: &'static Resource,
    query: ListQuery,
) -> ApiResult<Json<SuccessResponse<Page<Value>>>> {
    let page = state
        .content
        .list(resource, &public_query(query), Scope::Public)
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Retrieved {} {}", page.items.len(), resource.name),
        page,
    )))
}

pub async fn list_content(
    State(state): State<SharedState>,
    Path(resource): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SuccessResponse<Page<Value>>>> {
    let resource = public_resource(&resource)?;
    list_published(&state, resource, query).await
}

pub async fn get_content(
    State(state): State<SharedState>,
    Path((resource, slug)): Path<(String, String)>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let resource = public_resource(&resource)?;
    debug!("Public read {}/{}", resource.name, slug);

    let item = state
        .content
        .get_published_by_slug(resource, &slug)
        .await?
        .ok_or_else(|| not_found_error(format!("{} '{}' not found", resource.label, slug)))?;
    Ok(Json(SuccessResponse::with_data(format!("{} retrieved", resource.label), item)))
}

/// Commands library, filterable by `category`, `platform` and `search`
pub async fn list_commands(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SuccessResponse<Page<Value>>>> {
    list_published(&state, public_resource("commands")?, query).await
}

pub async fn command_categories(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<CategoryCount>>>> {
    let categories = state.content.categories(public_resource("commands")?).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} categories", categories.len()),
        categories,
    )))
}

pub async fn list_stories(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<SuccessResponse<Page<Value>>>> {
    list_published(&state, public_resource("stories")?, query).await
}

pub async fn privacy_policy(State(state): State<SharedState>) -> Json<SuccessResponse<PageDocument>> {
    Json(SuccessResponse::with_data(
        "Privacy policy",
        pages::privacy_policy(&state.settings.site),
    ))
}
