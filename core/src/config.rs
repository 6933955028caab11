//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Variables already set in the environment win over the file.
//! `Config` is built once at startup and passed by reference.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;
use crate::executor::HttpSettings;

pub const OKTA_CLIENT_ID: &str = "OKTA_CLIENT_ID";
pub const OKTA_CLIENT_SECRET: &str = "OKTA_CLIENT_SECRET";
pub const OKTA_TOKEN_URI: &str = "OKTA_TOKEN_URI";
pub const OKTA_SCOPE: &str = "OKTA_SCOPE";
pub const NEO4J_URI: &str = "NEO4J_URI";
pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

pub const DEFAULT_DATABASE: &str = "neo4j";

/// Identity provider settings for the client-credentials grant.
#[derive(Clone)]
pub struct OktaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub scope: String,
}

impl fmt::Debug for OktaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OktaConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    /// `neo4j+s://`, `bolt://`, `https://` ... URI of the database server.
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub okta: OktaConfig,
    pub neo4j: Neo4jConfig,
    pub http: HttpSettings,
}

impl Config {
    /// Seed the environment from `env_file` (or `./.env` when `None`, if
    /// present) and read the configuration from it.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                path: path.display().to_string(),
                source,
            })?,
            None => match dotenvy::dotenv() {
                Ok(path) => debug!(path = %path.display(), "loaded env file"),
                Err(err) => debug!(error = %err, "no env file loaded"),
            },
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let okta = OktaConfig {
            client_id: required(OKTA_CLIENT_ID)?,
            client_secret: required(OKTA_CLIENT_SECRET)?,
            token_uri: required(OKTA_TOKEN_URI)?,
            scope: required(OKTA_SCOPE)?,
        };

        let neo4j = Neo4jConfig {
            uri: required(NEO4J_URI)?,
            database: lookup(NEO4J_DATABASE)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        };

        let http = match lookup(HTTP_TIMEOUT_SECS) {
            Some(raw) => HttpSettings::with_timeout(parse_timeout(&raw)?),
            None => HttpSettings::default(),
        };

        Ok(Self { okta, neo4j, http })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: HTTP_TIMEOUT_SECS,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("expected a whole number of seconds"))?;
    if secs == 0 {
        return Err(invalid("timeout must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
