//! SMTP configuration route handlers

use crate::auth::{require_permission, Claims, SMTP_MANAGE};
use crate::error::{validation_error, ApiResult, AppError};
use crate::mail;
use crate::models::integration::TestResult;
use crate::models::smtp::{
    CreateSmtpConfigRequest, SendTestRequest, SmtpConfigView, UpdateSmtpConfigRequest,
};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

pub async fn list_configs(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<SmtpConfigView>>>> {
    require_permission(&claims, SMTP_MANAGE)?;

    let configs: Vec<SmtpConfigView> = state
        .smtp
        .list()
        .await?
        .into_iter()
        .map(SmtpConfigView::from)
        .collect();
    Ok(Json(SuccessResponse::with_data(
        format!("Retrieved {} SMTP configurations", configs.len()),
        configs,
    )))
}

pub async fn get_config(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<SmtpConfigView>>> {
    require_permission(&claims, SMTP_MANAGE)?;

    let config = state.smtp.find(id).await?;
    Ok(Json(SuccessResponse::with_data(
        "SMTP configuration retrieved",
        SmtpConfigView::from(config),
    )))
}

pub async fn create_config(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSmtpConfigRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<SmtpConfigView>>)> {
    require_permission(&claims, SMTP_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let config = state.smtp.create(&payload).await?;
    info!("✅ SMTP configuration {} ({}) created by {}", config.id, config.host, claims.sub);
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "SMTP configuration created",
            SmtpConfigView::from(config),
        )),
    ))
}

pub async fn update_config(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSmtpConfigRequest>,
) -> ApiResult<Json<SuccessResponse<SmtpConfigView>>> {
    require_permission(&claims, SMTP_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let config = state.smtp.update(id, &payload).await?;
    info!("SMTP configuration {} updated by {}", id, claims.sub);
    Ok(Json(SuccessResponse::with_data(
        "SMTP configuration updated",
        SmtpConfigView::from(config),
    )))
}

pub async fn delete_config(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<MessageResponse>> {
    require_permission(&claims, SMTP_MANAGE)?;

    let config = state.smtp.delete(id).await?;
    info!("🗑️  SMTP configuration {} deleted by {}", id, claims.sub);
    Ok(Json(MessageResponse::new(format!(
        "SMTP configuration '{}' deleted",
        config.name
    ))))
}

pub async fn set_default(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<SmtpConfigView>>> {
    require_permission(&claims, SMTP_MANAGE)?;

    let config = state.smtp.set_default(id).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("'{}' is now the default SMTP configuration", config.name),
        SmtpConfigView::from(config),
    )))
}

fn test_result(outcome: &Result<(), AppError>, success: &str) -> TestResult {
    let (ok, message) = match outcome {
        Ok(()) => (true, success.to_string()),
        Err(AppError::Upstream(msg) | AppError::Validation(msg)) => (false, msg.clone()),
        Err(e) => (false, e.to_string()),
    };
    TestResult {
        ok,
        status: None,
        message,
        tested_at: chrono::Utc::now(),
    }
}

/// Connect and authenticate against the server, recording the outcome
pub async fn test_config(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> ApiResult<Json<SuccessResponse<TestResult>>> {
    require_permission(&claims, SMTP_MANAGE)?;

    let config = state.smtp.find(id).await?;
    let outcome = mail::test_connection(&config, state.smtp_timeout()).await;
    let result = test_result(&outcome, "SMTP connection successful");
    state.smtp.record_test(id, &result).await?;

    let message = if result.ok { "Connection test passed" } else { "Connection test failed" };
    Ok(Json(SuccessResponse::with_data(message, result)))
}

pub async fn send_test(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<SendTestRequest>,
) -> ApiResult<Json<SuccessResponse<TestResult>>> {
    require_permission(&claims, SMTP_MANAGE)?;
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let config = state.smtp.find(id).await?;
    if !config.is_active {
        return Err(AppError::BadRequest(format!(
            "SMTP configuration '{}' is inactive",
            config.name
        )));
    }
    let message = mail::build_test_message(&config, &payload.to, &state.settings.site.name)?;
    let outcome = mail::send(&config, message, state.smtp_timeout()).await;
    let result = test_result(&outcome, &format!("Test email sent to {}", payload.to));
    state.smtp.record_test(id, &result).await?;

    let message = if result.ok { "Test email sent" } else { "Test email failed" };
    Ok(Json(SuccessResponse::with_data(message, result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_messages() {
        let ok = test_result(&Ok(()), "fine");
        assert!(ok.ok);
        assert_eq!(ok.message, "fine");

        let failed = test_result(&Err(AppError::Upstream("refused".into())), "fine");
        assert!(!failed.ok);
        assert_eq!(failed.message, "refused");
    }
}
