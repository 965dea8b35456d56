use crate::error::ConfigError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const ENDPOINT_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";
pub const KEY_VAR: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";
/// Set by Azure App Service; when present `.env` is not read and the server binds all interfaces.
pub const HOSTED_VAR: &str = "WEBSITE_HOSTNAME";

const DEFAULT_MODEL_ID: &str = "prebuilt-receipt";
const DEFAULT_API_VERSION: &str = "2024-11-30";
const DEFAULT_PORT: u16 = 5000;

/// Service configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub api_version: String,
    pub bind_address: SocketAddr,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_upload_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("bind_address", &self.bind_address)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn load_env() {
    if std::env::var_os(HOSTED_VAR).is_none() {
        let _ = dotenvy::dotenv();
    }
}

impl Config {
    /// Read the configuration from the process environment (and `.env` when running locally).
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let endpoint = required(ENDPOINT_VAR)?.trim().trim_end_matches('/').to_string();
        let api_key = required(KEY_VAR)?.trim().to_string();

        let hosted = var(HOSTED_VAR).is_some();
        let default_host = if hosted {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        let host = parse_or(&var, "HOST", default_host)?;
        let port = parse_or(&var, "PORT", DEFAULT_PORT)?;
        let upload_mb: usize = parse_or(&var, "MAX_UPLOAD_MB", 20)?;
        let max_upload_bytes = upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                name: "MAX_UPLOAD_MB",
                value: upload_mb.to_string(),
            })?;

        Ok(Config {
            endpoint,
            api_key,
            model_id: var("DOCUMENT_INTELLIGENCE_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            api_version: var("DOCUMENT_INTELLIGENCE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            bind_address: SocketAddr::new(host, port),
            request_timeout: Duration::from_secs(parse_or(&var, "REQUEST_TIMEOUT_SECS", 120)?),
            poll_interval: Duration::from_millis(parse_or(&var, "POLL_INTERVAL_MS", 2000)?),
            max_polls: parse_or(&var, "MAX_POLLS", 60)?,
            max_retries: parse_or(&var, "MAX_RETRIES", 3)?,
            retry_backoff: Duration::from_millis(parse_or(&var, "RETRY_BACKOFF_MS", 500)?),
            max_upload_bytes,
        })
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        (ENDPOINT_VAR, "https://example.cognitiveservices.azure.com/"),
        (KEY_VAR, "secret-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = config(&REQUIRED).unwrap();
        assert_eq!(config.endpoint, "https://example.cognitiveservices.azure.com");
        assert_eq!(config.api_key, "secret-key");
        assert_eq!(config.model_id, "prebuilt-receipt");
        assert_eq!(config.api_version, "2024-11-30");
        assert_eq!(config.bind_address, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_polls, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing(ENDPOINT_VAR));
        assert_eq!(
            config(&[REQUIRED[0]]).unwrap_err(),
            ConfigError::Missing(KEY_VAR)
        );
        assert_eq!(
            config(&[REQUIRED[0], (KEY_VAR, "  ")]).unwrap_err(),
            ConfigError::Missing(KEY_VAR)
        );
    }

    #[test]
    fn test_hosted_binds_all_interfaces() {
        let config = config(&[
            REQUIRED[0],
            REQUIRED[1],
            (HOSTED_VAR, "receipts.azurewebsites.net"),
            ("PORT", "8181"),
        ])
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:8181".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_invalid_number() {
        let err = config(&[REQUIRED[0], REQUIRED[1], ("MAX_POLLS", "lots")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "MAX_POLLS",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_upload_limit_overflow() {
        let err = config(&[
            REQUIRED[0],
            REQUIRED[1],
            ("MAX_UPLOAD_MB", "18446744073709551"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "MAX_UPLOAD_MB",
                value: "18446744073709551".to_string()
            }
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = config(&REQUIRED).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
