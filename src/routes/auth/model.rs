use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::LoginAttempt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_doctor: bool,
}

impl LoginRequest {
    pub fn into_attempt(self) -> Result<LoginAttempt, AppError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::BadRequest(
                "username and password are required".to_string(),
            ));
        }
        Ok(LoginAttempt {
            username: self.username,
            password: self.password,
            is_doctor: self.is_doctor,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}
