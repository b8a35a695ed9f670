// 外部服务：用户目录、密码服务、邮件通知

pub mod credentials;
pub mod directory;
pub mod notifier;

use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

pub use credentials::{BcryptOracle, CredentialOracle, HttpCredentialOracle, OracleError};
pub use directory::{
    DirectoryError, HttpIdentityDirectory, IdentityDirectory, IdentityRecord, NewPatient,
};
pub use notifier::{DisabledNotifier, Email, HttpNotifier, Notifier, NotifyError};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid service url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Every outbound call made with this client gives up after `timeout`.
pub fn http_client(timeout: Duration) -> Result<Client, EndpointError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn parse_base(url: &str) -> Result<Url, EndpointError> {
    let parsed = Url::parse(url).map_err(|e| EndpointError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(EndpointError::InvalidUrl {
            url: url.to_string(),
            reason: "not a base url".into(),
        });
    }
    Ok(parsed)
}

/// Appends `segments` to `base`, percent-encoding each one.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
