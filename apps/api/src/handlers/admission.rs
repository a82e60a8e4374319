use axum::Json;
use axum::extract::State;
use jitgate_application::PolicyVerdict;
use jitgate_core::AppError;
use tracing::{info, warn};

use crate::dto::{
    AdmissionObject, AdmissionRequest, AdmissionResponse, AdmissionReviewRequest,
    AdmissionReviewResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

#[cfg(test)]
mod tests;

const CODE_BAD_REQUEST: u16 = 400;
const CODE_FORBIDDEN: u16 = 403;
const CODE_INTERNAL: u16 = 500;

/// Validates access request objects on create and update.
pub async fn validate_request_handler(
    State(state): State<AppState>,
    Json(review): Json<AdmissionReviewRequest>,
) -> ApiResult<Json<AdmissionReviewResponse>> {
    let request = review.request.ok_or_else(|| {
        AppError::Validation("admission review is missing its request".to_owned())
    })?;

    let response = admit(&state, request).await;
    Ok(Json(AdmissionReviewResponse::new(review.api_version, response)))
}

async fn admit(state: &AppState, request: AdmissionRequest) -> AdmissionResponse {
    if request.is_delete() {
        return AdmissionResponse::allowed(request.uid);
    }

    let Some(object) = request.object else {
        return AdmissionResponse::denied(
            request.uid,
            CODE_BAD_REQUEST,
            "admission request carries no object",
        );
    };
    let object = match serde_json::from_value::<AdmissionObject>(object) {
        Ok(object) => object,
        Err(error) => {
            return AdmissionResponse::denied(
                request.uid,
                CODE_BAD_REQUEST,
                format!("failed to decode JitRequest: {error}"),
            );
        }
    };
    let name = object.metadata.name.or(request.name).unwrap_or_default();

    let config = match state.config_snapshots.current().await {
        Ok(config) => config,
        Err(error) => {
            warn!(request = %name, error = %error, "admission without configuration");
            return AdmissionResponse::denied(request.uid, CODE_INTERNAL, error.to_string());
        }
    };

    match state
        .policy_validator
        .validate_admission(&object.spec, &config, state.clock.now())
        .await
    {
        Ok(PolicyVerdict::Admitted) => {
            info!(
                request = %name,
                operation = %request.operation,
                config_version = config.version(),
                "admission allowed"
            );
            AdmissionResponse::allowed(request.uid)
        }
        Ok(PolicyVerdict::Denied(violation)) => {
            info!(
                request = %name,
                operation = %request.operation,
                field = %violation.field_path,
                "admission denied"
            );
            AdmissionResponse::denied(request.uid, CODE_FORBIDDEN, violation.to_string())
        }
        Err(error) => {
            warn!(request = %name, error = %error, "admission check failed");
            AdmissionResponse::denied(request.uid, CODE_INTERNAL, error.to_string())
        }
    }
}
