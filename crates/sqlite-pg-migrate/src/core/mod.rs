//! Core abstractions shared by the drivers and the orchestrator.
//!
//! - [`schema`]: field types, table specs and the shard partition
//! - [`registry`]: the statically declared migrated tables
//! - [`value`]: SQL values, validated records and batches
//! - [`traits`]: the source reader and target writer seams

pub mod registry;
pub mod schema;
pub mod traits;
pub mod value;

pub use registry::{all_tables, spec_for};
pub use schema::{Field, FieldType, ShardKey, TableSpec, SHARD_COUNT};
pub use traits::{Extracted, ShardQuery, SourceReader, TargetWriter};
pub use value::{Batch, Record, ShapeError, SqlValue};
