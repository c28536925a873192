//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (SQLite).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source database (SQLite) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_sqlite_path")]
    pub path: PathBuf,

    /// Maximum pooled SQLite connections (default: 1).
    #[serde(default = "default_one")]
    pub max_connections: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
            max_connections: default_one(),
        }
    }
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Target schema, also used as the session search path (default: "content").
    #[serde(default = "default_content_schema")]
    pub schema: String,

    /// SSL mode. Only "disable" is supported.
    #[serde(default = "default_disable")]
    pub ssl_mode: String,

    /// Application name reported to the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("application_name", &self.application_name)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Rows per INSERT statement (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Rows per shard read. `None` reads each shard in one query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_limit: Option<usize>,

    /// Tables migrated concurrently (default: 1, sequential).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Tables to migrate. Empty means every registered table.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Maximum PostgreSQL connections (default: 4).
    #[serde(default = "default_max_pg_connections")]
    pub max_pg_connections: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            read_limit: None,
            workers: default_workers(),
            tables: Vec::new(),
            max_pg_connections: default_max_pg_connections(),
        }
    }
}

// Default value functions for serde
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("db.sqlite")
}

fn default_one() -> u32 {
    1
}

pub(crate) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(crate) fn default_pg_port() -> u16 {
    5432
}

pub(crate) fn default_content_schema() -> String {
    "content".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_application_name() -> String {
    "sqlite-pg-migrate".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_workers() -> usize {
    1
}

fn default_max_pg_connections() -> usize {
    4
}
