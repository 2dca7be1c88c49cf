//! In-memory catalog for tests.

use super::{
    Catalog, ColumnRow, ConstraintRow, ElementRow, EnumRow, ForeignKeyRow, PrimaryKeyRow, Prober,
    TypeRow,
};
use crate::{Error, Result, SqlObjectFilter};
use pgmodel_schema::ObjectName;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

const TEMP_SCHEMA: &str = "pg_temp_3";

pub(crate) fn primitive_row(database: &str, name: &str) -> TypeRow {
    TypeRow {
        name: ObjectName::new(database, "pg_catalog", name),
        category: "X".to_string(),
        element: None,
        domain: None,
        numeric_precision: None,
        numeric_scale: None,
    }
}

pub(crate) fn user_type_row(name: ObjectName, category: &str) -> TypeRow {
    TypeRow {
        name,
        category: category.to_string(),
        element: None,
        domain: None,
        numeric_precision: None,
        numeric_scale: None,
    }
}

pub(crate) fn array_row(element: TypeRow) -> TypeRow {
    let name = element
        .name
        .schema
        .object(format!("_{}", element.name.name));
    TypeRow {
        name,
        category: "A".to_string(),
        element: Some(ElementRow {
            name: element.name,
            category: element.category,
            domain: None,
        }),
        domain: None,
        numeric_precision: element.numeric_precision,
        numeric_scale: element.numeric_scale,
    }
}

fn matches(filter: &SqlObjectFilter, object: &ObjectName) -> bool {
    match filter {
        SqlObjectFilter::Schemas(schemas) => schemas.contains(object.schema_name()),
        SqlObjectFilter::Objects(objects) => objects
            .iter()
            .any(|o| o.schema_name() == object.schema_name() && o.name == object.name),
        SqlObjectFilter::TempTables(names) => {
            object.schema_name() == TEMP_SCHEMA && names.contains(&object.name)
        }
        SqlObjectFilter::Any(filters) => filters.iter().any(|f| matches(f, object)),
    }
}

fn select<T: Clone>(
    rows: &[T],
    filter: &SqlObjectFilter,
    object: impl Fn(&T) -> &ObjectName,
) -> Vec<T> {
    rows.iter()
        .filter(|r| matches(filter, object(r)))
        .cloned()
        .collect()
}

fn probe_error(message: &str) -> Error {
    Error::Io {
        path: "<fixture>".to_string(),
        source: std::io::Error::other(message.to_string()),
    }
}

/// A fixture database.
///
/// Catalog rows are plain vectors. Probing is scripted: `parameters` maps
/// prepared SQL to the parameter types Postgres would infer, `results` maps
/// sample SQL to the columns of the temp table it would create.
#[derive(Default)]
pub(crate) struct FixtureCatalog {
    pub database: String,
    pub columns: Vec<ColumnRow>,
    pub primary_keys: Vec<PrimaryKeyRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
    pub unique_constraints: Vec<ConstraintRow>,
    pub check_constraints: Vec<ConstraintRow>,
    pub enums: Vec<EnumRow>,
    pub composite_fields: Vec<ColumnRow>,

    pub parameters: HashMap<String, Vec<TypeRow>>,
    pub results: HashMap<String, Vec<(String, TypeRow, bool)>>,
    /// Probe DDL containing this text fails
    pub fail_on: Option<String>,

    /// Filters passed to `columns`, in call order
    pub column_queries: Mutex<Vec<SqlObjectFilter>>,
    /// Live prepared statements: probe name to SQL
    pub prepared: Mutex<BTreeMap<String, String>>,
    /// Live temp tables
    pub temp_tables: Mutex<Vec<ColumnRow>>,
    /// `DEALLOCATE probe` and `DROP probe`, in call order
    pub cleanups: Mutex<Vec<String>>,
}

impl FixtureCatalog {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self, schema: &str, name: &str) -> ObjectName {
        ObjectName::new(&self.database, schema, name)
    }

    pub fn primitive(&self, name: &str) -> TypeRow {
        primitive_row(&self.database, name)
    }

    /// Add a column typed `ty` to `schema.table`.
    pub fn column(&mut self, schema: &str, table: &str, column: &str, ty: TypeRow, nullable: bool) {
        let object = self.name(schema, table);
        let position = self.columns.iter().filter(|c| c.object == object).count() as i32 + 1;
        self.columns.push(ColumnRow {
            object,
            position,
            name: column.to_string(),
            nullable,
            default: None,
            ty,
        });
    }

    /// Add a table whose columns are all built-in types.
    pub fn table(&mut self, schema: &str, table: &str, columns: &[(&str, &str, bool)]) {
        for (column, type_name, nullable) in columns {
            let ty = self.primitive(type_name);
            self.column(schema, table, column, ty, *nullable);
        }
    }

    pub fn primary_key(&mut self, schema: &str, table: &str, constraint: &str, columns: &[&str]) {
        for (i, column) in columns.iter().enumerate() {
            self.primary_keys.push(PrimaryKeyRow {
                table: self.name(schema, table),
                constraint: constraint.to_string(),
                column: column.to_string(),
                ordinal: i as i32 + 1,
            });
        }
    }

    pub fn foreign_key(
        &mut self,
        schema: &str,
        table: &str,
        constraint: &str,
        target: &str,
        pairs: &[(&str, &str)],
    ) {
        for (i, (column, target_column)) in pairs.iter().enumerate() {
            self.foreign_keys.push(ForeignKeyRow {
                table: self.name(schema, table),
                constraint: constraint.to_string(),
                target: self.name(schema, target),
                column: column.to_string(),
                target_column: target_column.to_string(),
                ordinal: i as i32 + 1,
            });
        }
    }

    pub fn enum_type(&mut self, schema: &str, name: &str, labels: &[&str]) {
        if labels.is_empty() {
            self.enums.push(EnumRow {
                name: self.name(schema, name),
                label: None,
            });
        }
        for label in labels {
            self.enums.push(EnumRow {
                name: self.name(schema, name),
                label: Some(label.to_string()),
            });
        }
    }

    pub fn composite_field(&mut self, schema: &str, name: &str, field: &str, ty: TypeRow) {
        let object = self.name(schema, name);
        let position = self
            .composite_fields
            .iter()
            .filter(|c| c.object == object)
            .count() as i32
            + 1;
        self.composite_fields.push(ColumnRow {
            object,
            position,
            name: field.to_string(),
            nullable: true,
            default: None,
            ty,
        });
    }

    /// Number of `columns` calls so far.
    pub fn column_query_count(&self) -> usize {
        self.column_queries.lock().unwrap().len()
    }

    /// True once every probe object has been cleaned up.
    pub fn is_clean(&self) -> bool {
        self.prepared.lock().unwrap().is_empty() && self.temp_tables.lock().unwrap().is_empty()
    }

    /// Leading keyword of every cleanup call so far.
    pub fn cleanup_kinds(&self) -> Vec<String> {
        self.cleanups
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| c.split(' ').next())
            .map(str::to_string)
            .collect()
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match &self.fail_on {
            Some(marker) if sql.contains(marker.as_str()) => {
                Err(probe_error(&format!("syntax error at or near \"{}\"", marker)))
            }
            _ => Ok(()),
        }
    }
}

impl Catalog for FixtureCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn columns(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>> {
        self.column_queries.lock().unwrap().push(filter.clone());
        let mut rows = select(&self.columns, filter, |r| &r.object);
        let temp_tables = self.temp_tables.lock().unwrap();
        rows.extend(select(temp_tables.as_slice(), filter, |r| &r.object));
        Ok(rows)
    }

    async fn primary_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<PrimaryKeyRow>> {
        Ok(select(&self.primary_keys, filter, |r| &r.table))
    }

    async fn foreign_keys(&self, filter: &SqlObjectFilter) -> Result<Vec<ForeignKeyRow>> {
        Ok(select(&self.foreign_keys, filter, |r| &r.table))
    }

    async fn unique_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>> {
        Ok(select(&self.unique_constraints, filter, |r| &r.table))
    }

    async fn check_constraints(&self, filter: &SqlObjectFilter) -> Result<Vec<ConstraintRow>> {
        Ok(select(&self.check_constraints, filter, |r| &r.table))
    }

    async fn enums(&self, filter: &SqlObjectFilter) -> Result<Vec<EnumRow>> {
        Ok(select(&self.enums, filter, |r| &r.name))
    }

    async fn composite_fields(&self, filter: &SqlObjectFilter) -> Result<Vec<ColumnRow>> {
        // table columns double as the fields of the table's row type
        let mut rows = select(&self.composite_fields, filter, |r| &r.object);
        rows.extend(select(&self.columns, filter, |r| &r.object));
        Ok(rows)
    }
}

impl Prober for FixtureCatalog {
    async fn prepare(&self, probe: &str, sql: &str) -> Result<()> {
        self.check_failure(sql)?;
        let mut prepared = self.prepared.lock().unwrap();
        if prepared.contains_key(probe) {
            return Err(probe_error(&format!(
                "prepared statement \"{}\" already exists",
                probe
            )));
        }
        prepared.insert(probe.to_string(), sql.to_string());
        Ok(())
    }

    async fn parameter_types(&self, probe: &str) -> Result<Vec<TypeRow>> {
        let prepared = self.prepared.lock().unwrap();
        let sql = prepared
            .get(probe)
            .ok_or_else(|| probe_error("no such prepared statement"))?;
        Ok(self.parameters.get(sql).cloned().unwrap_or_default())
    }

    async fn deallocate(&self, probe: &str) -> Result<()> {
        self.cleanups
            .lock()
            .unwrap()
            .push(format!("DEALLOCATE {}", probe));
        match self.prepared.lock().unwrap().remove(probe) {
            Some(_) => Ok(()),
            None => Err(probe_error(&format!(
                "prepared statement \"{}\" does not exist",
                probe
            ))),
        }
    }

    async fn create_temp_table(&self, probe: &str, sql: &str) -> Result<()> {
        self.check_failure(sql)?;
        let object = ObjectName::new(&self.database, TEMP_SCHEMA, probe);
        let columns = self.results.get(sql).cloned().unwrap_or_default();
        let mut temp_tables = self.temp_tables.lock().unwrap();
        for (i, (name, ty, nullable)) in columns.into_iter().enumerate() {
            temp_tables.push(ColumnRow {
                object: object.clone(),
                position: i as i32 + 1,
                name,
                nullable,
                default: None,
                ty,
            });
        }
        Ok(())
    }

    async fn drop_temp_table(&self, probe: &str) -> Result<()> {
        self.cleanups.lock().unwrap().push(format!("DROP {}", probe));
        self.temp_tables
            .lock()
            .unwrap()
            .retain(|c| c.object.name != probe);
        Ok(())
    }
}
