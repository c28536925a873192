//! SQLite SQL dialect.

use crate::core::schema::TableSpec;

/// SQL builder for the SQLite source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Quote an identifier with double quotes.
    pub fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// `SELECT COUNT(*)` over the whole table.
    pub fn count_query(spec: &TableSpec) -> String {
        format!("SELECT COUNT(*) FROM {}", Self::quote_ident(spec.name))
    }

    /// Shard-filtered, paged SELECT of the table's fields in declaration order.
    ///
    /// Binds `?1` shard character, `?2` limit (`-1` for none), `?3` offset.
    /// The shard test lowercases the final character so the 36 shards stay
    /// disjoint for mixed-case identifiers.
    pub fn shard_query(spec: &TableSpec) -> String {
        let columns = spec
            .fields
            .iter()
            .map(|f| Self::quote_ident(f.name))
            .collect::<Vec<_>>()
            .join(", ");
        let id = Self::quote_ident(spec.id_field);

        format!(
            "SELECT {} FROM {} WHERE lower(substr(CAST({} AS TEXT), -1)) = ?1 \
             ORDER BY {} LIMIT ?2 OFFSET ?3",
            columns,
            Self::quote_ident(spec.name),
            id,
            id
        )
    }

    /// Bind value for `LIMIT`: SQLite treats a negative limit as unbounded.
    pub fn limit_param(limit: Option<usize>) -> i64 {
        limit
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(-1)
    }
}
