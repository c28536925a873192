//! Static registry of the migrated tables.
//!
//! Conflict keys are declared per table. Junction tables conflict on their
//! pair of foreign keys; entity tables conflict on their identifier.

use super::schema::{Field, FieldType, TableSpec};
use crate::error::{MigrateError, Result};

pub static GENRE: TableSpec = TableSpec {
    name: "genre",
    fields: &[
        Field::required("id", FieldType::Uuid),
        Field::required("name", FieldType::Text),
        Field::optional("description", FieldType::Text),
    ],
    id_field: "id",
    conflict_key: &["id"],
};

pub static FILM_WORK: TableSpec = TableSpec {
    name: "film_work",
    fields: &[
        Field::required("id", FieldType::Uuid),
        Field::required("title", FieldType::Text),
        Field::optional("description", FieldType::Text),
        Field::optional("creation_date", FieldType::Date),
        Field::required("type", FieldType::Text),
        Field::optional("rating", FieldType::Float),
    ],
    id_field: "id",
    conflict_key: &["id"],
};

pub static PERSON: TableSpec = TableSpec {
    name: "person",
    fields: &[
        Field::required("id", FieldType::Uuid),
        Field::required("full_name", FieldType::Text),
    ],
    id_field: "id",
    conflict_key: &["id"],
};

pub static GENRE_FILM_WORK: TableSpec = TableSpec {
    name: "genre_film_work",
    fields: &[
        Field::required("id", FieldType::Uuid),
        Field::required("film_work_id", FieldType::Uuid),
        Field::required("genre_id", FieldType::Uuid),
    ],
    id_field: "id",
    conflict_key: &["film_work_id", "genre_id"],
};

pub static PERSON_FILM_WORK: TableSpec = TableSpec {
    name: "person_film_work",
    fields: &[
        Field::required("id", FieldType::Uuid),
        Field::required("film_work_id", FieldType::Uuid),
        Field::required("person_id", FieldType::Uuid),
        Field::optional("role", FieldType::Text),
    ],
    id_field: "id",
    conflict_key: &["film_work_id", "person_id"],
};

/// Registered tables in migration order: entities before junctions.
static TABLES: [&TableSpec; 5] = [
    &GENRE,
    &FILM_WORK,
    &PERSON,
    &GENRE_FILM_WORK,
    &PERSON_FILM_WORK,
];

/// All registered tables in migration order.
pub fn all_tables() -> &'static [&'static TableSpec] {
    &TABLES
}

/// Look up a table by name.
pub fn spec_for(table_name: &str) -> Result<&'static TableSpec> {
    TABLES
        .iter()
        .copied()
        .find(|spec| spec.name == table_name)
        .ok_or_else(|| MigrateError::UnknownTable(table_name.to_string()))
}

/// Resolve a list of names, keeping registry order. An empty list selects
/// every table.
pub fn resolve(names: &[String]) -> Result<Vec<&'static TableSpec>> {
    if names.is_empty() {
        return Ok(TABLES.to_vec());
    }
    for name in names {
        spec_for(name)?;
    }
    Ok(TABLES
        .iter()
        .copied()
        .filter(|spec| names.iter().any(|n| n == spec.name))
        .collect())
}

/// Widest record shape in the registry.
pub fn max_arity() -> usize {
    TABLES.iter().map(|spec| spec.arity()).max().unwrap_or(0)
}
