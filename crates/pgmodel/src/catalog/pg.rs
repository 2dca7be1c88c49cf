use super::queries::{self, NamedConstraint};
use super::{
    Catalog, ColumnRow, ConstraintRow, EnumRow, ForeignKeyRow, PrimaryKeyRow, Prober, TypeRow,
};
use crate::filter::FilterTarget;
use crate::{Connection, ConnectionExt, Result, SqlObjectFilter};
use tokio_postgres::Row;

/// [`Catalog`] and [`Prober`] over a live connection.
pub struct PgCatalog<'a, C: Connection> {
    conn: &'a C,
    database: String,
}

impl<'a, C: Connection> PgCatalog<'a, C> {
    /// Wrap a connection, reading the identifier of the connected database.
    pub async fn new(conn: &'a C) -> Result<Self> {
        let rows = conn.traced().query(queries::CURRENT_DATABASE, &[]).await?;
        let database = match rows.first() {
            Some(row) => row.try_get("database_name")?,
            None => String::new(),
        };
        tracing::debug!("catalog for database {}", database);
        Ok(Self { conn, database })
    }

    /// Run a filtered catalog query; an empty filter issues no SQL.
    async fn filtered<T>(
        &self,
        filter: &SqlObjectFilter,
        target: FilterTarget<'_>,
        sql: impl FnOnce(&str) -> String,
        decode: impl Fn(&Row, &str) -> std::result::Result<T, tokio_postgres::Error>,
    ) -> Result<Vec<T>> {
        let Some(fragment) = filter.to_sql(target) else {
            return Ok(Vec::new());
        };
        let rows = self.conn.traced().query(&sql(&fragment), &[]).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(decode(row, &self.database)?);
        }
        Ok(out)
    }
}

impl<C: Connection> Catalog for PgCatalog<'_, C> {
    fn database(&self) -> &str {
        &self.database
    }

    async fn columns(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>> {
        self.filtered(
            filter,
            FilterTarget::RELATION,
            queries::columns,
            ColumnRow::from_row,
        )
        .await
    }

    async fn primary_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<PrimaryKeyRow>> {
        self.filtered(
            filter,
            FilterTarget::RELATION,
            queries::primary_keys,
            PrimaryKeyRow::from_row,
        )
        .await
    }

    async fn foreign_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<ForeignKeyRow>> {
        self.filtered(
            filter,
            FilterTarget::RELATION,
            queries::foreign_keys,
            ForeignKeyRow::from_row,
        )
        .await
    }

    async fn unique_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>> {
        self.filtered(
            filter,
            FilterTarget::RELATION,
            |f| queries::named_constraints(NamedConstraint::Unique, f),
            ConstraintRow::from_row,
        )
        .await
    }

    async fn check_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>> {
        self.filtered(
            filter,
            FilterTarget::RELATION,
            |f| queries::named_constraints(NamedConstraint::Check, f),
            ConstraintRow::from_row,
        )
        .await
    }

    async fn enums(&self, filter: &SqlObjectFilter) -> Result<Vec<EnumRow>> {
        self.filtered(filter, FilterTarget::TYPE, queries::enums, EnumRow::from_row)
            .await
    }

    async fn composite_fields(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>> {
        // a row type's pg_class entry carries the type's name
        self.filtered(
            filter,
            FilterTarget::RELATION,
            queries::composite_fields,
            ColumnRow::from_row,
        )
        .await
    }
}

impl<C: Connection> Prober for PgCatalog<'_, C> {
    async fn prepare(&self, probe: &str, sql: &str) -> Result<()> {
        let ddl = format!("PREPARE {} AS {}", probe, sql);
        self.conn.traced().batch_execute(&ddl).await?;
        Ok(())
    }

    async fn parameter_types(&self, probe: &str) -> Result<Vec<TypeRow>> {
        let sql = queries::prepared_parameter_types();
        let rows = self.conn.traced().query(&sql, &[&probe]).await?;
        let mut types = Vec::with_capacity(rows.len());
        for row in &rows {
            types.push(TypeRow::from_row(row, &self.database)?);
        }
        Ok(types)
    }

    async fn deallocate(&self, probe: &str) -> Result<()> {
        let ddl = format!("DEALLOCATE {}", probe);
        self.conn.traced().batch_execute(&ddl).await?;
        Ok(())
    }

    async fn create_temp_table(&self, probe: &str, sql: &str) -> Result<()> {
        // the body may end in a line comment
        let ddl = format!("CREATE TEMP TABLE {} AS {}\nWITH NO DATA", probe, sql);
        self.conn.traced().batch_execute(&ddl).await?;
        Ok(())
    }

    async fn drop_temp_table(&self, probe: &str) -> Result<()> {
        let ddl = format!("DROP TABLE IF EXISTS pg_temp.{}", probe);
        self.conn.traced().batch_execute(&ddl).await?;
        Ok(())
    }
}
