//! Tables, keys, enums and composite types.

use crate::{ColumnRef, ObjectName, Type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A table column or composite-type field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Ordinal position in the catalog. Only used to order columns; not
    /// part of the persisted form.
    #[serde(skip)]
    pub position: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
    pub nullable: bool,
    /// Default value expression (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

/// One column of a foreign key, paired with the column it references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    /// Referenced table
    pub target: ObjectName,
    /// Column pairs in constraint order; never empty
    pub columns: Vec<ColumnPair>,
}

/// Shape of a foreign key, as code generators see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyKind<'a> {
    /// Exactly one column pair
    Single(&'a ColumnPair),
    /// Two or more column pairs
    Multi(&'a [ColumnPair]),
}

impl ForeignKey {
    /// Classify this key as single- or multi-column.
    ///
    /// Keys are assembled from catalog rows and always carry at least one
    /// pair; an empty key is reported as `Multi(&[])`.
    pub fn kind(&self) -> ForeignKeyKind<'_> {
        match self.columns.as_slice() {
            [single] => ForeignKeyKind::Single(single),
            many => ForeignKeyKind::Multi(many),
        }
    }
}

/// A database table (or view, or temporary probe table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: ObjectName,
    /// Columns, in ordinal order
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Names of UNIQUE constraints
    #[serde(default)]
    pub unique_constraints: BTreeSet<String>,
    /// Names of CHECK constraints
    #[serde(default)]
    pub check_constraints: BTreeSet<String>,
}

impl Table {
    /// An empty table with the given name.
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_constraints: BTreeSet::new(),
            check_constraints: BTreeSet::new(),
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reference to a column of this table.
    pub fn column_ref(&self, name: &str) -> ColumnRef {
        self.name.column(name)
    }
}

/// An enum type with its labels in catalog sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enum {
    pub name: ObjectName,
    pub labels: Vec<String>,
}

/// A standalone composite type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeType {
    pub name: ObjectName,
    /// Fields, in attribute-number order
    pub fields: Vec<Column>,
}
