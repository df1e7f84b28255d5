use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::storage::StorageConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Identity provider settings. Tokens are verified by the gateway; the
/// service only reports what it was deployed against.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub todos_table: String,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub const DEFAULT_BIND_ADDR: &'static str = "127.0.0.1:3000";
    pub const DEFAULT_DATABASE_URL: &'static str = "sqlite://todos.db?mode=rwc";
    pub const DEFAULT_TODOS_TABLE: &'static str = "todos";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let bucket =
            var("ATTACHMENTS_S3_BUCKET").ok_or(ConfigError::Missing("ATTACHMENTS_S3_BUCKET"))?;
        let mut storage = StorageConfig::new(bucket);
        if let Some(endpoint) = var("S3_ENDPOINT") {
            storage.endpoint = endpoint;
        }
        if let Some(region) = var("AWS_REGION") {
            storage.region = region;
        }
        match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    key: "AWS_SECRET_ACCESS_KEY",
                    reason: "must be set together with AWS_ACCESS_KEY_ID".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    key: "AWS_ACCESS_KEY_ID",
                    reason: "must be set together with AWS_SECRET_ACCESS_KEY".to_string(),
                });
            }
            (key_id, secret) => {
                storage.access_key_id = key_id;
                storage.secret_access_key = secret;
            }
        }
        storage.public_base_url = var("ATTACHMENTS_PUBLIC_URL");
        if let Some(ttl) = var("SIGNED_URL_EXPIRATION") {
            storage.upload_ttl_secs = ttl.trim().parse::<u64>().map_err(|e| {
                ConfigError::Invalid {
                    key: "SIGNED_URL_EXPIRATION",
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| Self::DEFAULT_DATABASE_URL.to_string()),
            todos_table: var("TODOS_TABLE")
                .unwrap_or_else(|| Self::DEFAULT_TODOS_TABLE.to_string()),
            storage,
            auth: AuthConfig {
                issuer: var("AUTH_ISSUER"),
                audience: var("AUTH_AUDIENCE"),
            },
        })
    }
}
