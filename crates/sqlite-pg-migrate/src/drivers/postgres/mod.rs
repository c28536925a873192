//! PostgreSQL target driver.
//!
//! - [`PostgresDialect`]: INSERT and COUNT statements for the content schema
//! - [`PostgresWriter`]: target writer over a deadpool-postgres pool

mod dialect;
mod writer;

pub use dialect::PostgresDialect;
pub use writer::PostgresWriter;
