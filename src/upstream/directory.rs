use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::{EndpointError, join_segments, parse_base};
use crate::auth::Role;

const CREATE_PATIENT_ROUTE: &[&str] = &["create-patient", "patients"];

/// Path (below the role's service base) of the by-username lookup.
pub fn lookup_route(role: Role) -> &'static [&'static str] {
    match role {
        Role::Patient => &["read-patient", "patients", "username"],
        Role::Doctor => &["read-doctor", "doctors", "username"],
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found")]
    NotFound,
    #[error("directory unreachable: {0}")]
    Unavailable(String),
    #[error("unexpected directory response: {0}")]
    InvalidResponse(String),
    #[error("directory rejected the request with status {0}")]
    Rejected(u16),
}

/// Stored profile returned by a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityRecord {
    #[serde(deserialize_with = "numeric_id")]
    pub id: i64,
    pub username: String,
    #[serde(rename = "passwordHash")]
    pub password_hash: String,
}

// Directory services return ids either as JSON numbers or as numeric strings.
fn numeric_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(i64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid user id {:?}", s))),
    }
}

/// Patient profile forwarded to the patient service on registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub gender: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_username(
        &self,
        role: Role,
        username: &str,
    ) -> Result<IdentityRecord, DirectoryError>;

    async fn create_patient(&self, patient: &NewPatient) -> Result<(), DirectoryError>;
}

/// Talks to the patient and doctor services over HTTP.
pub struct HttpIdentityDirectory {
    client: Client,
    patients: Url,
    doctors: Url,
}

impl HttpIdentityDirectory {
    pub fn new(client: Client, patients: &str, doctors: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            client,
            patients: parse_base(patients)?,
            doctors: parse_base(doctors)?,
        })
    }

    fn base(&self, role: Role) -> &Url {
        match role {
            Role::Patient => &self.patients,
            Role::Doctor => &self.doctors,
        }
    }

    pub fn lookup_url(&self, role: Role, username: &str) -> Url {
        let mut segments = lookup_route(role).to_vec();
        segments.push(username);
        join_segments(self.base(role), &segments)
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn find_by_username(
        &self,
        role: Role,
        username: &str,
    ) -> Result<IdentityRecord, DirectoryError> {
        let url = self.lookup_url(role, username);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            tracing::debug!(
                status = %resp.status(),
                role = role.as_str(),
                "directory lookup miss"
            );
            return Err(DirectoryError::NotFound);
        }

        // 读取响应体时超时或断开，按目录服务不可用处理
        let body = resp
            .bytes()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        serde_json::from_slice::<IdentityRecord>(&body)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }

    async fn create_patient(&self, patient: &NewPatient) -> Result<(), DirectoryError> {
        let url = join_segments(&self.patients, CREATE_PATIENT_ROUTE);
        let resp = self
            .client
            .post(url)
            .json(patient)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DirectoryError::Rejected(resp.status().as_u16()));
        }
        Ok(())
    }
}
