//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`sqlite`]: SQLite source reader (`SourceReader`)
//! - [`postgres`]: PostgreSQL target writer (`TargetWriter`)
//!
//! Each driver module pairs a dialect, which only builds SQL text and is unit
//! tested without a server, with the reader or writer that runs it.

pub mod postgres;
pub mod sqlite;

pub use postgres::{PostgresDialect, PostgresWriter};
pub use sqlite::{SqliteDialect, SqliteReader};
