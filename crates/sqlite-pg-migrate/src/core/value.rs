//! SQL value types and typed records.
//!
//! Records are validated against their [`TableSpec`] on construction, so a
//! [`Record`] always matches its [`TableSpec`](crate::core::schema::TableSpec) in arity, field order and field types.

use std::fmt;

use chrono::NaiveDate;
use uuid::Uuid;

use super::schema::{Field, FieldType, TableSpec};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for correct parameter binding.
    Null(FieldType),

    /// Parsed UUID.
    Uuid(Uuid),

    /// Text. Also the source representation of UUID fields.
    Text(String),

    /// Double precision number.
    Float(f64),

    /// Calendar date.
    Date(NaiveDate),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Whether this value may be stored in a field of the given type.
    #[must_use]
    pub fn fits(&self, field_type: FieldType) -> bool {
        match (self, field_type) {
            (SqlValue::Null(t), _) => *t == field_type,
            (SqlValue::Uuid(_), FieldType::Uuid) => true,
            (SqlValue::Text(_), FieldType::Uuid | FieldType::Text) => true,
            (SqlValue::Float(_), FieldType::Float) => true,
            (SqlValue::Date(_), FieldType::Date) => true,
            _ => false,
        }
    }

    /// Textual form used for identifiers and shard selection.
    #[must_use]
    pub fn as_key_text(&self) -> Option<String> {
        match self {
            SqlValue::Uuid(u) => Some(u.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

/// Why a row could not be turned into a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// Row has a different number of columns than the table declares.
    Arity { expected: usize, actual: usize },
    /// NULL in a non-nullable field.
    UnexpectedNull { field: &'static str },
    /// Value of the wrong type for the field.
    WrongType {
        field: &'static str,
        expected: FieldType,
    },
    /// The storage value could not be decoded for the field.
    Undecodable { field: &'static str, message: String },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Arity { expected, actual } => {
                write!(f, "expected {} columns, got {}", expected, actual)
            }
            ShapeError::UnexpectedNull { field } => write!(f, "{} must not be NULL", field),
            ShapeError::WrongType { field, expected } => {
                write!(f, "{} must be of type {}", field, expected)
            }
            ShapeError::Undecodable { field, message } => {
                write!(f, "{} could not be decoded: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// An ordered tuple of values matching a [`TableSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<SqlValue>,
}

impl Record {
    /// Validate `values` against `spec`.
    pub fn new(spec: &TableSpec, values: Vec<SqlValue>) -> Result<Self, ShapeError> {
        if values.len() != spec.arity() {
            return Err(ShapeError::Arity {
                expected: spec.arity(),
                actual: values.len(),
            });
        }
        for (field, value) in spec.fields.iter().zip(&values) {
            check_field(field, value)?;
        }
        Ok(Self { values })
    }

    /// Values in spec order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Value at a position.
    pub fn get(&self, idx: usize) -> Option<&SqlValue> {
        self.values.get(idx)
    }

    /// Consume the record into its values.
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

fn check_field(field: &Field, value: &SqlValue) -> Result<(), ShapeError> {
    if value.is_null() {
        if !field.nullable {
            return Err(ShapeError::UnexpectedNull { field: field.name });
        }
        // A NULL's type hint must still match so the loader binds it correctly.
        if !value.fits(field.field_type) {
            return Err(ShapeError::WrongType {
                field: field.name,
                expected: field.field_type,
            });
        }
        return Ok(());
    }
    if value.fits(field.field_type) {
        Ok(())
    } else {
        Err(ShapeError::WrongType {
            field: field.name,
            expected: field.field_type,
        })
    }
}

/// A non-empty slice of records from one (table, shard) pair.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    records: &'a [Record],
}

impl<'a> Batch<'a> {
    /// Wrap a slice of records. Returns `None` for an empty slice.
    pub fn new(records: &'a [Record]) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    /// Split records into consecutive batches of at most `size` rows.
    pub fn split(records: &'a [Record], size: usize) -> impl Iterator<Item = Batch<'a>> {
        records
            .chunks(size.max(1))
            .map(|records| Batch { records })
    }

    /// Records in this batch.
    pub fn records(&self) -> &'a [Record] {
        self.records
    }

    /// Get the number of rows in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
