//! Catalog access.
//!
//! [`Catalog`] is the read-only metadata source the assembler and type
//! closure work against; [`Prober`] creates and drops the session-local
//! objects used for statement introspection. [`PgCatalog`] implements both
//! over a live connection.

mod pg;
pub mod queries;
mod rows;

#[cfg(test)]
pub(crate) mod fixture;

pub use pg::PgCatalog;
pub use rows::{
    ColumnRow, ConstraintRow, ElementRow, EnumRow, ForeignKeyRow, PrimaryKeyRow, TypeRow,
};

use crate::{Result, SqlObjectFilter};

/// Read-only schema metadata, restricted by object filters.
///
/// Every method must return an empty result for an empty filter.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    /// Identifier of the database this catalog describes.
    fn database(&self) -> &str;

    /// Columns of tables, views and session temp tables.
    async fn columns(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>>;

    async fn primary_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<PrimaryKeyRow>>;

    async fn foreign_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<ForeignKeyRow>>;

    async fn unique_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>>;

    async fn check_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>>;

    /// Labels of the matched enum types, in catalog sort order.
    async fn enums(&self, filter: &SqlObjectFilter) -> Result<Vec<EnumRow>>;

    /// Fields of the matched standalone composite types.
    async fn composite_fields(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>>;
}

/// Session-local probe objects for statement introspection.
///
/// `probe` is a plain lowercase identifier that needs no quoting.
#[allow(async_fn_in_trait)]
pub trait Prober {
    /// `PREPARE probe AS sql`
    async fn prepare(&self, probe: &str, sql: &str) -> Result<()>;

    /// Parameter types Postgres inferred for a prepared statement, in
    /// parameter order.
    async fn parameter_types(&self, probe: &str) -> Result<Vec<TypeRow>>;

    /// `DEALLOCATE probe`
    async fn deallocate(&self, probe: &str) -> Result<()>;

    /// Create an empty temp table shaped like the result of `sql`.
    async fn create_temp_table(&self, probe: &str, sql: &str) -> Result<()>;

    async fn drop_temp_table(&self, probe: &str) -> Result<()>;
}
