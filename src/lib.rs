use std::sync::Arc;

use thiserror::Error;

use auth::{SystemClock, TokenCodec};
use cache::{MemorySessionCache, RedisSessionCache, SessionCache};
use config::Config;
use registration::RegistrationService;
use session::SessionManager;
use upstream::{
    BcryptOracle, CredentialOracle, DisabledNotifier, EndpointError, HttpCredentialOracle,
    HttpIdentityDirectory, HttpNotifier, Notifier,
};

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod registration;
pub mod routes;
pub mod session;
pub mod upstream;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("invalid redis url: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub registration: Arc<RegistrationService>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, registration: Arc<RegistrationService>) -> Self {
        Self {
            sessions,
            registration,
        }
    }

    /// Wires the production collaborators described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let client = upstream::http_client(config.upstream_timeout())?;

        let directory = Arc::new(HttpIdentityDirectory::new(
            client.clone(),
            &config.patient_service_url,
            &config.doctor_service_url,
        )?);

        let oracle: Arc<dyn CredentialOracle> = match &config.verify_service_url {
            Some(url) => Arc::new(HttpCredentialOracle::new(client.clone(), url)?),
            None => {
                tracing::warn!("VERIFY_SERVICE_URL not set, hashing passwords in-process");
                Arc::new(BcryptOracle::default())
            }
        };

        let cache: Arc<dyn SessionCache> = match &config.redis_url {
            Some(url) => Arc::new(RedisSessionCache::new(
                redis::Client::open(url.as_str())?,
                config.upstream_timeout(),
            )),
            None => {
                tracing::warn!("REDIS_URL not set, sessions are cached in-process only");
                Arc::new(MemorySessionCache::new())
            }
        };

        let notifier: Arc<dyn Notifier> = match &config.notifier_url {
            Some(url) => Arc::new(HttpNotifier::new(client, url)?),
            None => {
                tracing::info!("AWS_SES_URL not set, welcome emails are disabled");
                Arc::new(DisabledNotifier)
            }
        };

        let codec = TokenCodec::new(config.jwt_secret.as_bytes(), Arc::new(SystemClock));
        let sessions = SessionManager::new(
            directory.clone(),
            oracle.clone(),
            codec,
            cache,
            config.verify_mode,
        );
        let registration = RegistrationService::new(directory, oracle, notifier);

        Ok(Self::new(Arc::new(sessions), Arc::new(registration)))
    }
}
