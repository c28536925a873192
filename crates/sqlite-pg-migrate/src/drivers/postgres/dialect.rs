//! PostgreSQL SQL dialect.
//!
//! Builds the idempotent multi-row INSERT used by the writer. Placeholders
//! carry an explicit cast to the field's PostgreSQL type so parameter types
//! never depend on server-side inference.

use crate::core::schema::TableSpec;

/// SQL builder for the PostgreSQL target.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    schema: String,
}

impl PostgresDialect {
    /// Create a dialect writing into `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Target schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Quote an identifier, doubling embedded double quotes.
    pub fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Schema-qualified, quoted table name.
    pub fn qualify_table(&self, table: &str) -> String {
        format!(
            "{}.{}",
            Self::quote_ident(&self.schema),
            Self::quote_ident(table)
        )
    }

    /// `SELECT COUNT(*)` over the target table.
    pub fn count_query(&self, spec: &TableSpec) -> String {
        format!("SELECT COUNT(*)::int8 FROM {}", self.qualify_table(spec.name))
    }

    /// Multi-row INSERT of `rows` records that skips conflicting rows.
    ///
    /// Parameters are numbered row-major: row `r`, field `f` binds
    /// `$(r * arity + f + 1)`.
    pub fn insert_statement(&self, spec: &TableSpec, rows: usize) -> String {
        let col_list = spec
            .fields
            .iter()
            .map(|f| Self::quote_ident(f.name))
            .collect::<Vec<_>>()
            .join(", ");

        let mut idx = 1;
        let placeholders = (0..rows)
            .map(|_| {
                let row = spec
                    .fields
                    .iter()
                    .map(|f| {
                        let p = format!("${}::{}", idx, f.field_type.pg_type());
                        idx += 1;
                        p
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", row)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let conflict_list = spec
            .conflict_key
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO NOTHING",
            self.qualify_table(spec.name),
            col_list,
            placeholders,
            conflict_list
        )
    }
}
