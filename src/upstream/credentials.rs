use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use super::{EndpointError, join_segments, parse_base};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("credential service unreachable: {0}")]
    Unavailable(String),
    #[error("credential service answered with status {0}")]
    Status(u16),
    #[error("unexpected credential service response: {0}")]
    InvalidResponse(String),
    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// Hashes passwords and checks them against stored hashes.
#[async_trait]
pub trait CredentialOracle: Send + Sync {
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, OracleError>;

    async fn hash(&self, password: &str) -> Result<String, OracleError>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    password: &'a str,
    hash: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[derive(Serialize)]
struct HashRequest<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct HashResponse {
    hash: String,
}

/// Client of the password hashing service (`/verify`, `/hash`).
pub struct HttpCredentialOracle {
    client: Client,
    base: Url,
}

impl HttpCredentialOracle {
    pub fn new(client: Client, base: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            client,
            base: parse_base(base)?,
        })
    }
}

#[async_trait]
impl CredentialOracle for HttpCredentialOracle {
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, OracleError> {
        let resp = self
            .client
            .post(join_segments(&self.base, &["verify"]))
            .json(&VerifyRequest { password, hash })
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        // 密码服务在不匹配时返回 401
        match resp.status() {
            StatusCode::UNAUTHORIZED => Ok(false),
            s if s.is_success() => read_json::<VerifyResponse>(resp).await.map(|r| r.valid),
            s => Err(OracleError::Status(s.as_u16())),
        }
    }

    async fn hash(&self, password: &str) -> Result<String, OracleError> {
        let resp = self
            .client
            .post(join_segments(&self.base, &["hash"]))
            .json(&HashRequest { password })
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OracleError::Status(resp.status().as_u16()));
        }
        read_json::<HashResponse>(resp).await.map(|r| r.hash)
    }
}

// A body that cannot be read in time is an outage, not a bad answer.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, OracleError> {
    let body = resp
        .bytes()
        .await
        .map_err(|e| OracleError::Unavailable(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| OracleError::InvalidResponse(e.to_string()))
}

/// In-process bcrypt oracle, used when no hashing service is configured.
pub struct BcryptOracle {
    cost: u32,
}

impl BcryptOracle {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptOracle {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[async_trait]
impl CredentialOracle for BcryptOracle {
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, OracleError> {
        let (password, hash) = (password.to_owned(), hash.to_owned());
        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| OracleError::Hashing(e.to_string()))?;
        // 哈希格式错误等同于不匹配
        Ok(matched.unwrap_or(false))
    }

    async fn hash(&self, password: &str) -> Result<String, OracleError> {
        let (password, cost) = (password.to_owned(), self.cost);
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| OracleError::Hashing(e.to_string()))?
            .map_err(|e| OracleError::Hashing(e.to_string()))
    }
}
