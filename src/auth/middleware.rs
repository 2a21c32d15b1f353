//! Authentication middleware
//!
//! Extracts and validates bearer tokens before any admin handler runs.

use crate::auth::{decode_token, Claims};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::warn;

/// Verify the bearer token and store its claims in request extensions
pub async fn auth_middleware(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(Authorization(bearer)) = request.headers().typed_get::<Authorization<Bearer>>() else {
        warn!("Rejected {} {}: missing bearer token", request.method(), request.uri().path());
        return Err(AppError::Unauthorized(
            "Missing or malformed authorization header".to_string(),
        ));
    };

    let mut claims = decode_token(bearer.token(), &state.settings.auth.jwt_secret).map_err(|e| {
        warn!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
        e
    })?;

    state.grants.apply(&mut claims).await;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require the admin role
pub fn require_admin(claims: &Claims) -> Result<(), AppError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Requires admin role, you have {}",
            claims.role
        )))
    }
}

/// Require a specific permission (admins have all of them)
pub fn require_permission(claims: &Claims, permission: &str) -> Result<(), AppError> {
    if claims.has_permission(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Missing permission '{}'",
            permission
        )))
    }
}
