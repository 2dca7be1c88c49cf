//! Schema model types for pgmodel.
//!
//! This crate contains the language-neutral model that `pgmodel` resolves
//! from a live database and that code generators consume:
//!
//! - qualified names ([`SchemaName`], [`ObjectName`], [`ColumnRef`])
//! - the closed [`Type`] algebra over [`Primitive`] types
//! - [`Table`], [`Enum`], [`CompositeType`] and [`Statement`] entities
//! - the persisted [`SchemaModel`] document
//! - integer range literal decoding ([`range`])
//!
//! All entities are plain immutable values; nothing here talks to a database.

mod model;
mod name;
pub mod range;
mod statement;
mod table;
mod types;

pub use model::{ModelError, SchemaModel};
pub use name::{ColumnRef, ObjectName, SchemaName};
pub use range::{RangeBound, RangeError};
pub use statement::{Cardinality, Statement, VariableRef};
pub use table::{
    Column, ColumnPair, CompositeType, Enum, ForeignKey, ForeignKeyKind, PrimaryKey, Table,
};
pub use types::{Primitive, Type, ValueClass};
