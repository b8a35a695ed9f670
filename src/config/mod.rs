use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// How `/verify-token` decides that a token is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Signature and expiry only; the session cache is never consulted.
    #[default]
    Signature,
    /// Signature and expiry, then the cached token for the username must match.
    /// An unreachable cache still lets the token through.
    CacheChecked,
}

impl VerifyMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "signature" => Some(VerifyMode::Signature),
            "cache" => Some(VerifyMode::CacheChecked),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub patient_service_url: String,
    pub doctor_service_url: String,
    pub verify_service_url: Option<String>,
    pub redis_url: Option<String>,
    pub notifier_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub upstream_timeout_secs: u64,
    pub verify_mode: VerifyMode,
}

// The signing secret never ends up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("patient_service_url", &self.patient_service_url)
            .field("doctor_service_url", &self.doctor_service_url)
            .field("verify_service_url", &self.verify_service_url)
            .field("redis_url", &self.redis_url)
            .field("notifier_url", &self.notifier_url)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("verify_mode", &self.verify_mode)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let patient_service_url = var("PATIENT_SERVICE_URL")
            .or_else(|| var("USER_SERVICE_URL"))
            .ok_or(ConfigError::Missing("PATIENT_SERVICE_URL"))?;
        let doctor_service_url =
            var("DOCTOR_SERVICE_URL").ok_or(ConfigError::Missing("DOCTOR_SERVICE_URL"))?;

        let server_port = match var("PORT") {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: port,
            })?,
            None => 8080,
        };
        let upstream_timeout_secs = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(secs) => match secs.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "UPSTREAM_TIMEOUT_SECS",
                        value: secs,
                    });
                }
            },
            None => 5,
        };
        let verify_mode = match var("SESSION_VERIFY_MODE") {
            Some(mode) => VerifyMode::parse(&mode).ok_or(ConfigError::Invalid {
                var: "SESSION_VERIFY_MODE",
                value: mode,
            })?,
            None => VerifyMode::default(),
        };

        Ok(Config {
            jwt_secret,
            patient_service_url,
            doctor_service_url,
            verify_service_url: var("VERIFY_SERVICE_URL"),
            redis_url: var("REDIS_URL"),
            notifier_url: var("AWS_SES_URL"),
            server_host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            upstream_timeout_secs,
            verify_mode,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("JWT_SECRET", "s3cret"),
        ("PATIENT_SERVICE_URL", "http://patients"),
        ("DOCTOR_SERVICE_URL", "http://doctors"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_are_absent() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(config.verify_mode, VerifyMode::Signature);
        assert!(config.redis_url.is_none());
        assert!(config.verify_service_url.is_none());
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = Config::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let mut blank = BASE.to_vec();
        blank[0] = ("JWT_SECRET", "   ");
        let err = Config::from_lookup(lookup(&blank)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn user_service_url_is_accepted_for_patients() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("USER_SERVICE_URL", "http://users"),
            ("DOCTOR_SERVICE_URL", "http://doctors"),
        ]))
        .unwrap();
        assert_eq!(config.patient_service_url, "http://users");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SESSION_VERIFY_MODE", "sometimes"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { var: "SESSION_VERIFY_MODE", .. })
        ));

        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));

        let mut pairs = BASE.to_vec();
        pairs.push(("UPSTREAM_TIMEOUT_SECS", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn cache_mode_is_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SESSION_VERIFY_MODE", "Cache"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.verify_mode, VerifyMode::CacheChecked);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("s3cret"));
    }
}
