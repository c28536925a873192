//! Table shape metadata and the shard partition.
//!
//! A [`TableSpec`] is the static declaration of one migrated table: its
//! ordered, typed fields and the column set that identifies duplicates in the
//! target. Field order is the exact column order used by both the SELECT on
//! the source and the INSERT on the target.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical type of a migrated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UUID identifier (stored as TEXT in SQLite, `uuid` in PostgreSQL).
    Uuid,
    /// Free text.
    Text,
    /// Double precision number.
    Float,
    /// Calendar date without time zone.
    Date,
}

impl FieldType {
    /// PostgreSQL type used to cast bind parameters of this field.
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldType::Uuid => "uuid",
            FieldType::Text => "text",
            FieldType::Float => "double precision",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Uuid => "uuid",
            FieldType::Text => "text",
            FieldType::Float => "float",
            FieldType::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single named, typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl Field {
    /// Declare a non-nullable field.
    pub const fn required(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: false,
        }
    }

    /// Declare a nullable field.
    pub const fn optional(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            nullable: true,
        }
    }
}

/// Static declaration of a migrated table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name, identical in source and target.
    pub name: &'static str,
    /// Ordered record shape.
    pub fields: &'static [Field],
    /// Field holding the row identifier; its last character selects the shard.
    pub id_field: &'static str,
    /// Columns of the target's unique constraint used by `ON CONFLICT`.
    pub conflict_key: &'static [&'static str],
}

impl TableSpec {
    /// Number of fields in a record.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Column names in record order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Position of a field in the record shape.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Position of the identifier field.
    pub fn id_position(&self) -> Option<usize> {
        self.position(self.id_field)
    }

    /// Check that the id field and every conflict-key column are declared
    /// fields and that the conflict key is non-empty.
    pub fn is_consistent(&self) -> bool {
        !self.fields.is_empty()
            && self.id_position().is_some()
            && !self.conflict_key.is_empty()
            && self
                .conflict_key
                .iter()
                .all(|column| self.position(column).is_some())
    }
}

/// One of the 36 partitions of a table, selected by the final character of
/// the row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardKey(char);

/// Shard alphabet in processing order.
const SHARD_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Number of shards per table.
pub const SHARD_COUNT: usize = 36;

impl ShardKey {
    /// Build a shard key from a character of the alphabet (case-insensitive).
    pub fn new(c: char) -> Option<Self> {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            Some(Self(c))
        } else {
            None
        }
    }

    /// All shard keys in the fixed processing order: `a..z`, then `0..9`.
    pub fn all() -> impl Iterator<Item = ShardKey> {
        SHARD_ALPHABET.chars().map(ShardKey)
    }

    /// Shard that owns an identifier, or `None` when its final character is
    /// outside the alphabet.
    pub fn of(id: &str) -> Option<Self> {
        id.chars().last().and_then(Self::new)
    }

    /// The shard character.
    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
