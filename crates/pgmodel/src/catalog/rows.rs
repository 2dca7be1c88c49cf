//! Raw catalog rows.
//!
//! These carry catalog strings as-is; deciding what they mean is the type
//! decoder's and assembler's job.

use pgmodel_schema::ObjectName;
use tokio_postgres::Row;

/// The physical type of a column, field or statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRow {
    /// Physical (domain-resolved) type, e.g. `pg_catalog.int4` or `public._mood`
    pub name: ObjectName,
    /// Single-letter `typcategory`
    pub category: String,
    /// Element type, for array types
    pub element: Option<ElementRow>,
    /// Domain the value was declared with, if any
    pub domain: Option<ObjectName>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

/// Element type of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRow {
    pub name: ObjectName,
    pub category: String,
    pub domain: Option<ObjectName>,
}

/// A column of a table, view or composite type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    /// Owning table or composite type
    pub object: ObjectName,
    pub position: i32,
    pub name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub ty: TypeRow,
}

/// One column of a primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyRow {
    pub table: ObjectName,
    pub constraint: String,
    pub column: String,
    /// One-based position within the key
    pub ordinal: i32,
}

/// One column pair of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub table: ObjectName,
    pub constraint: String,
    pub target: ObjectName,
    pub column: String,
    pub target_column: String,
    /// One-based position within the key
    pub ordinal: i32,
}

/// A named UNIQUE or CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    pub table: ObjectName,
    pub name: String,
}

/// One label of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumRow {
    pub name: ObjectName,
    /// `None` for an enum declared without labels
    pub label: Option<String>,
}

// ============================================================================
// Row decoding
// ============================================================================

type RowResult<T> = Result<T, tokio_postgres::Error>;

fn object(row: &Row, database: &str, schema: &str, name: &str) -> RowResult<ObjectName> {
    Ok(ObjectName::new(
        database,
        row.try_get::<_, String>(schema)?,
        row.try_get::<_, String>(name)?,
    ))
}

fn optional_object(
    row: &Row,
    database: &str,
    schema: &str,
    name: &str,
) -> RowResult<Option<ObjectName>> {
    let schema: Option<String> = row.try_get(schema)?;
    let name: Option<String> = row.try_get(name)?;
    Ok(match (schema, name) {
        (Some(schema), Some(name)) => Some(ObjectName::new(database, schema, name)),
        _ => None,
    })
}

impl TypeRow {
    /// Read the type columns shared by every type-bearing query.
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        let element = match optional_object(row, database, "element_schema", "element_name")? {
            Some(name) => Some(ElementRow {
                name,
                category: row.try_get("element_category")?,
                domain: optional_object(
                    row,
                    database,
                    "element_domain_schema",
                    "element_domain_name",
                )?,
            }),
            None => None,
        };
        Ok(Self {
            name: object(row, database, "type_schema", "type_name")?,
            category: row.try_get("type_category")?,
            element,
            domain: optional_object(row, database, "domain_schema", "domain_name")?,
            numeric_precision: row.try_get("numeric_precision")?,
            numeric_scale: row.try_get("numeric_scale")?,
        })
    }
}

impl ColumnRow {
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        Ok(Self {
            object: object(row, database, "schema_name", "object_name")?,
            position: row.try_get("position")?,
            name: row.try_get("column_name")?,
            nullable: row.try_get("nullable")?,
            default: row.try_get("column_default")?,
            ty: TypeRow::from_row(row, database)?,
        })
    }
}

impl PrimaryKeyRow {
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        Ok(Self {
            table: object(row, database, "schema_name", "object_name")?,
            constraint: row.try_get("constraint_name")?,
            column: row.try_get("column_name")?,
            ordinal: row.try_get("ordinal")?,
        })
    }
}

impl ForeignKeyRow {
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        Ok(Self {
            table: object(row, database, "schema_name", "object_name")?,
            constraint: row.try_get("constraint_name")?,
            target: object(row, database, "target_schema", "target_name")?,
            column: row.try_get("column_name")?,
            target_column: row.try_get("target_column")?,
            ordinal: row.try_get("ordinal")?,
        })
    }
}

impl ConstraintRow {
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        Ok(Self {
            table: object(row, database, "schema_name", "object_name")?,
            name: row.try_get("constraint_name")?,
        })
    }
}

impl EnumRow {
    pub(crate) fn from_row(row: &Row, database: &str) -> RowResult<Self> {
        Ok(Self {
            name: object(row, database, "schema_name", "object_name")?,
            label: row.try_get("label")?,
        })
    }
}
