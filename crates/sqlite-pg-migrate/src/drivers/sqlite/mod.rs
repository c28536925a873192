//! SQLite source driver.
//!
//! - [`SqliteDialect`]: count and shard-filtered SELECT statements
//! - [`SqliteReader`]: source reader over a read-only sqlx pool

mod dialect;
mod reader;

pub use dialect::SqliteDialect;
pub use reader::SqliteReader;
