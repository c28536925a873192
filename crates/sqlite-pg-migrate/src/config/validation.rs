//! Configuration validation.

use super::Config;
use crate::core::registry;
use crate::error::{MigrateError, Result};

/// PostgreSQL accepts at most this many bind parameters per statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.path is required".into()));
    }
    if config.source.max_connections == 0 {
        return Err(MigrateError::Config(
            "source.max_connections must be at least 1".into(),
        ));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if config.target.schema.is_empty() {
        return Err(MigrateError::Config("target.schema is required".into()));
    }
    if !config.target.ssl_mode.eq_ignore_ascii_case("disable") {
        return Err(MigrateError::Config(format!(
            "target.ssl_mode must be 'disable', got '{}'",
            config.target.ssl_mode
        )));
    }

    // Migration validation
    let migration = &config.migration;
    if migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    let widest = registry::max_arity();
    if migration
        .batch_size
        .checked_mul(widest)
        .map_or(true, |params| params > MAX_BIND_PARAMS)
    {
        return Err(MigrateError::Config(format!(
            "migration.batch_size {} exceeds the {} bind parameters allowed per statement \
             ({} columns per row)",
            migration.batch_size, MAX_BIND_PARAMS, widest
        )));
    }
    if let Some(0) = migration.read_limit {
        return Err(MigrateError::Config(
            "migration.read_limit must be at least 1".into(),
        ));
    }
    if migration.workers == 0 {
        return Err(MigrateError::Config(
            "migration.workers must be at least 1".into(),
        ));
    }
    if migration.max_pg_connections == 0 {
        return Err(MigrateError::Config(
            "migration.max_pg_connections must be at least 1".into(),
        ));
    }
    for table in &migration.tables {
        registry::spec_for(table)?;
    }

    Ok(())
}
