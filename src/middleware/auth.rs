use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{AppState, auth::Principal, error::AppError};

/// Token taken from the `Authorization` header. Both `Bearer <token>` and a
/// bare token value are accepted.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        if header.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = match header.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            Some(_) => return None,
            None => header,
        };
        if token.is_empty() {
            None
        } else {
            Some(BearerToken(token.to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match header.and_then(BearerToken::parse) {
            Some(token) => Ok(token),
            None => {
                tracing::debug!("request without a usable authorization header");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// The verified caller, available to handlers behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub principal: Principal,
    pub token: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let verified = state.sessions.verify(&token).await?;
    request.extensions_mut().insert(AuthenticatedSession {
        principal: verified.principal,
        token,
    });
    Ok(next.run(request).await)
}
