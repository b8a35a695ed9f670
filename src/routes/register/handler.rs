use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use serde_json::{Value, json};

use crate::{AppState, error::AppError, registration::PatientRegistration};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<PatientRegistration>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.registration.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "patient registered successfully" })),
    ))
}
