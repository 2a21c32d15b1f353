//! Role and permission route handlers

use crate::auth::{
    normalize_permissions, permission_catalog, require_admin, require_permission, Claims,
    ROLES_MANAGE,
};
use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::role::{CreateRoleRequest, PermissionInfo, Role, UpdateRoleRequest};
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

/// Only admins may hand out `roles:manage`
fn check_grant(claims: &Claims, permissions: &[String]) -> ApiResult<()> {
    if permissions.iter().any(|p| p == ROLES_MANAGE) {
        require_admin(claims)?;
    }
    Ok(())
}

pub async fn list_roles(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<Role>>>> {
    require_permission(&claims, ROLES_MANAGE)?;

    let roles = state.roles.list().await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Retrieved {} roles", roles.len()),
        roles,
    )))
}

pub async fn get_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<Role>>> {
    require_permission(&claims, ROLES_MANAGE)?;

    let role = state
        .roles
        .find(id)
        .await?
        .ok_or_else(|| not_found_error(format!("Role {} not found", id)))?;
    Ok(Json(SuccessResponse::with_data("Role retrieved", role)))
}

pub async fn create_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Role>>)> {
    require_permission(&claims, ROLES_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let permissions = normalize_permissions(&payload.permissions).map_err(validation_error)?;
    check_grant(&claims, &permissions)?;

    let role = state
        .roles
        .create(&payload.name, payload.description.as_deref(), &permissions)
        .await?;
    state.refresh_grants().await?;
    info!("✅ Role '{}' created by {}", role.name, claims.sub);
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Role created", role)),
    ))
}

pub async fn update_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<SuccessResponse<Role>>> {
    require_permission(&claims, ROLES_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let permissions = payload
        .permissions
        .as_deref()
        .map(normalize_permissions)
        .transpose()
        .map_err(validation_error)?;
    if let Some(permissions) = &permissions {
        check_grant(&claims, permissions)?;
    }

    let role = state
        .roles
        .update(
            id,
            payload.name.as_deref(),
            payload.description.as_deref(),
            permissions.as_deref(),
        )
        .await?;
    state.refresh_grants().await?;
    info!("Role '{}' updated by {}", role.name, claims.sub);
    Ok(Json(SuccessResponse::with_data("Role updated", role)))
}

pub async fn delete_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<Role>>> {
    require_permission(&claims, ROLES_MANAGE)?;

    let role = state.roles.delete(id).await?;
    state.refresh_grants().await?;
    info!("🗑️  Role '{}' deleted by {}", role.name, claims.sub);
    Ok(Json(SuccessResponse::with_data("Role deleted", role)))
}

pub async fn list_permissions(
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<PermissionInfo>>>> {
    require_permission(&claims, ROLES_MANAGE)?;
    let catalog = permission_catalog();
    Ok(Json(SuccessResponse::with_data(
        format!("{} permissions", catalog.len()),
        catalog,
    )))
}
