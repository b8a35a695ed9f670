use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;

use super::model::{LoginRequest, LoginResponse};
use crate::{
    AppState,
    error::AppError,
    middleware::{AuthenticatedSession, BearerToken},
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>, AppError> {
    let attempt = req.into_attempt()?;
    let issued = state.sessions.login(&attempt).await?;
    Ok(Json(LoginResponse {
        token: issued.token,
    }))
}

/// 令牌有效时返回空的 200
#[axum::debug_handler]
pub async fn verify_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, AppError> {
    state.sessions.verify(&token).await?;
    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthenticatedSession>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .logout(&session.principal, &session.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
