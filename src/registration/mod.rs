// 患者注册：哈希密码、写入患者服务、发送欢迎邮件

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::upstream::{
    CredentialOracle, DirectoryError, Email, IdentityDirectory, NewPatient, Notifier, OracleError,
};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid registration: {0}")]
    Invalid(&'static str),
    #[error("failed to hash password: {0}")]
    Hashing(#[from] OracleError),
    #[error("failed to create patient: {0}")]
    Directory(#[from] DirectoryError),
}

/// Registration payload as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRegistration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub username: String,
    /// Plaintext password; older clients submit it as `passwordHash`.
    #[serde(alias = "passwordHash")]
    pub password: String,
}

impl PatientRegistration {
    fn validate(&self) -> Result<(), RegistrationError> {
        if self.username.trim().is_empty() {
            return Err(RegistrationError::Invalid("username is required"));
        }
        if self.password.is_empty() {
            return Err(RegistrationError::Invalid("password is required"));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(RegistrationError::Invalid("email is invalid"));
        }
        Ok(())
    }
}

pub fn welcome_email(patient: &NewPatient) -> Email {
    Email {
        to: patient.email.clone(),
        subject: "Bienvenido a MediSync".to_string(),
        body: format!(
            "Hola {}, bienvenido a MediSync! Tu usuario es: {}",
            patient.first_name, patient.username
        ),
    }
}

pub struct RegistrationService {
    directory: Arc<dyn IdentityDirectory>,
    oracle: Arc<dyn CredentialOracle>,
    notifier: Arc<dyn Notifier>,
}

impl RegistrationService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        oracle: Arc<dyn CredentialOracle>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            directory,
            oracle,
            notifier,
        }
    }

    pub async fn register(
        &self,
        req: PatientRegistration,
    ) -> Result<NewPatient, RegistrationError> {
        req.validate()?;

        let password_hash = self.oracle.hash(&req.password).await?;
        let patient = NewPatient {
            first_name: req.first_name,
            last_name: req.last_name,
            birth_date: req.birth_date,
            gender: req.gender,
            address: req.address,
            phone: req.phone,
            email: req.email,
            username: req.username,
            password_hash,
        };

        self.directory.create_patient(&patient).await?;

        // 邮件发送失败不影响注册结果
        if patient.email.is_empty() {
            tracing::debug!(username = %patient.username, "no email address, skipping welcome email");
        } else if let Err(e) = self.notifier.send(&welcome_email(&patient)).await {
            tracing::warn!(username = %patient.username, error = %e, "failed to send welcome email");
        }

        tracing::info!(username = %patient.username, "patient registered");
        Ok(patient)
    }
}
