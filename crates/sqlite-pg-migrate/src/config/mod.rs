//! Configuration loading and validation.
//!
//! Configuration comes from a YAML file ([`Config::load`]) or entirely from
//! the process environment ([`Config::from_env`]). Either way it is built once
//! at start-up and passed by reference to the orchestrator.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variables recognised by [`Config::from_env`] and
/// [`Config::apply_env_overrides`]. Each entry lists the preferred name first.
const ENV_SQLITE_PATH: &[&str] = &["SQLITE_PATH"];
const ENV_DB_NAME: &[&str] = &["DB_NAME", "dbname"];
const ENV_DB_USER: &[&str] = &["DB_USER", "user"];
const ENV_DB_PASSWORD: &[&str] = &["DB_PASSWORD", "password"];
const ENV_DB_HOST: &[&str] = &["DB_HOST"];
const ENV_DB_PORT: &[&str] = &["DB_PORT"];
const ENV_DB_SCHEMA: &[&str] = &["DB_SCHEMA"];
const ENV_BATCH_SIZE: &[&str] = &["BATCH_SIZE"];

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = first_of(&lookup, ENV_DB_NAME)
            .ok_or_else(|| MigrateError::Config("DB_NAME is not set".into()))?;
        let user = first_of(&lookup, ENV_DB_USER)
            .ok_or_else(|| MigrateError::Config("DB_USER is not set".into()))?;

        let mut config = Config {
            source: SourceConfig::default(),
            target: TargetConfig {
                host: default_host(),
                port: default_pg_port(),
                database,
                user,
                password: String::new(),
                schema: default_content_schema(),
                ssl_mode: "disable".to_string(),
                application_name: "sqlite-pg-migrate".to_string(),
            },
            migration: MigrationConfig::default(),
        };
        config.apply_overrides_from(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Override file settings with any environment variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(&|key: &str| std::env::var(key).ok())?;
        self.validate()
    }

    fn apply_overrides_from<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = first_of(lookup, ENV_SQLITE_PATH) {
            self.source.path = PathBuf::from(path);
        }
        if let Some(database) = first_of(lookup, ENV_DB_NAME) {
            self.target.database = database;
        }
        if let Some(user) = first_of(lookup, ENV_DB_USER) {
            self.target.user = user;
        }
        if let Some(password) = first_of(lookup, ENV_DB_PASSWORD) {
            self.target.password = password;
        }
        if let Some(host) = first_of(lookup, ENV_DB_HOST) {
            self.target.host = host;
        }
        if let Some(port) = first_of(lookup, ENV_DB_PORT) {
            self.target.port = port
                .parse()
                .map_err(|_| MigrateError::Config(format!("DB_PORT is not a port: '{}'", port)))?;
        }
        if let Some(schema) = first_of(lookup, ENV_DB_SCHEMA) {
            self.target.schema = schema;
        }
        if let Some(batch) = first_of(lookup, ENV_BATCH_SIZE) {
            self.migration.batch_size = batch.parse().map_err(|_| {
                MigrateError::Config(format!("BATCH_SIZE is not a number: '{}'", batch))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration, used as a run fingerprint.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl SourceConfig {
    /// Build a read-only sqlx connection URL.
    pub fn connection_string(&self) -> String {
        format!("sqlite://{}?mode=ro", self.path.display())
    }
}

fn first_of<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
}
