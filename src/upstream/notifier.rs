use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;

use super::{EndpointError, parse_base};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail service unreachable: {0}")]
    Unavailable(String),
    #[error("mail service answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), NotifyError>;
}

/// Posts emails as JSON to the mail relay.
pub struct HttpNotifier {
    client: Client,
    url: Url,
}

impl HttpNotifier {
    pub fn new(client: Client, url: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            client,
            url: parse_base(url)?,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(email)
            .send()
            .await
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

/// Drops every email; used when no mail relay is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, email: &Email) -> Result<(), NotifyError> {
        tracing::debug!(to = %email.to, subject = %email.subject, "mail relay not configured, email dropped");
        Ok(())
    }
}
