//! Source and target connections for one run.
//!
//! Both sides are held as trait objects so the orchestrator runs unchanged
//! against the SQLite/PostgreSQL drivers or in-memory implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::core::traits::{SourceReader, TargetWriter};
use crate::drivers::{PostgresWriter, SqliteReader};
use crate::error::Result;

/// Open source reader and target writer.
#[derive(Clone)]
pub struct Connections {
    pub source: Arc<dyn SourceReader>,
    pub target: Arc<dyn TargetWriter>,
}

impl Connections {
    /// Open both pools from configuration. The source is opened first and
    /// closed again if the target cannot be reached.
    pub async fn open(config: &Config) -> Result<Self> {
        let source = SqliteReader::new(&config.source, config.migration.workers).await?;
        let target =
            match PostgresWriter::new(&config.target, config.migration.max_pg_connections).await {
                Ok(target) => target,
                Err(e) => {
                    source.close().await;
                    return Err(e);
                }
            };
        Ok(Self::new(Arc::new(source), Arc::new(target)))
    }

    /// Wrap existing reader and writer.
    pub fn new(source: Arc<dyn SourceReader>, target: Arc<dyn TargetWriter>) -> Self {
        Self { source, target }
    }

    /// Test both connections.
    pub async fn health_check(&self) -> Result<()> {
        self.source.health_check().await?;
        info!("Source ({}) is healthy", self.source.db_type());
        self.target.health_check().await?;
        info!("Target ({}) is healthy", self.target.db_type());
        Ok(())
    }

    /// Close both pools.
    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}
