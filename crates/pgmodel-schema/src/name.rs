//! Qualified names for catalog objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A schema inside a specific database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaName {
    pub database: String,
    pub schema: String,
}

impl SchemaName {
    pub fn new(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
        }
    }

    /// Qualify a local name with this schema.
    pub fn object(&self, name: impl Into<String>) -> ObjectName {
        ObjectName {
            schema: self.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.schema)
    }
}

/// A named object (table, enum, composite type, domain) inside a schema.
///
/// Ordering is by database, then schema, then local name; model output is
/// sorted with it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    pub schema: SchemaName,
    pub name: String,
}

impl ObjectName {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        SchemaName::new(database, schema).object(name)
    }

    /// The schema identifier, without the database.
    pub fn schema_name(&self) -> &str {
        &self.schema.schema
    }

    /// `"schema"."name"`, ready to splice into SQL.
    pub fn to_sql(&self) -> String {
        pgmodel_sql::qualified_ident(&self.schema.schema, &self.name)
    }

    /// Reference to a column of this object.
    pub fn column(&self, column: impl Into<String>) -> ColumnRef {
        ColumnRef {
            table: self.clone(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A column of a specific table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: ObjectName,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}
