//! Object filters and their rendering to SQL `WHERE` fragments.

use pgmodel_schema::ObjectName;
use pgmodel_sql::{Lit, literal_list};
use std::collections::BTreeSet;

/// A predicate over (schema, name) pairs of catalog objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlObjectFilter {
    /// Every object in any of these schemas
    Schemas(BTreeSet<String>),
    /// Exactly these objects (the database part of each name is ignored;
    /// a catalog only ever sees its own database)
    Objects(BTreeSet<ObjectName>),
    /// Temporary tables of the current session, by name
    TempTables(BTreeSet<String>),
    /// Objects matched by any of the sub-filters
    Any(Vec<SqlObjectFilter>),
}

/// Which columns of a catalog query the filter applies to.
#[derive(Debug, Clone, Copy)]
pub struct FilterTarget<'a> {
    /// Alias of the joined `pg_namespace`
    pub namespace: &'a str,
    /// Expression yielding the object's local name
    pub name: &'a str,
}

impl FilterTarget<'static> {
    /// Relations: `pg_namespace n` joined to `pg_class c`.
    pub const RELATION: FilterTarget<'static> = FilterTarget {
        namespace: "n",
        name: "c.relname",
    };

    /// Types: `pg_namespace n` joined to `pg_type t`.
    pub const TYPE: FilterTarget<'static> = FilterTarget {
        namespace: "n",
        name: "t.typname",
    };
}

impl SqlObjectFilter {
    /// Filter matching exactly the given objects.
    pub fn objects(names: impl IntoIterator<Item = ObjectName>) -> Self {
        SqlObjectFilter::Objects(names.into_iter().collect())
    }

    /// Filter matching the given temp tables.
    pub fn temp_tables(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        SqlObjectFilter::TempTables(names.into_iter().map(Into::into).collect())
    }

    /// True if this filter matches nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            SqlObjectFilter::Schemas(schemas) => schemas.is_empty(),
            SqlObjectFilter::Objects(objects) => objects.is_empty(),
            SqlObjectFilter::TempTables(names) => names.is_empty(),
            SqlObjectFilter::Any(filters) => filters.iter().all(|f| f.is_empty()),
        }
    }

    /// Render this filter as a boolean SQL expression over `target`.
    ///
    /// Returns `None` when the filter is empty; an empty filter must never
    /// reach the database, so callers short-circuit to an empty result.
    pub fn to_sql(&self, target: FilterTarget<'_>) -> Option<String> {
        match self {
            SqlObjectFilter::Schemas(schemas) => {
                let list = literal_list(schemas)?;
                Some(format!("{}.nspname IN {}", target.namespace, list))
            }
            SqlObjectFilter::Objects(objects) => {
                if objects.is_empty() {
                    return None;
                }
                let pairs: Vec<String> = objects
                    .iter()
                    .map(|o| format!("({}, {})", Lit(o.schema_name()), Lit(&o.name)))
                    .collect();
                Some(format!(
                    "({}.nspname, {}) IN ({})",
                    target.namespace,
                    target.name,
                    pairs.join(", ")
                ))
            }
            SqlObjectFilter::TempTables(names) => {
                let list = literal_list(names)?;
                Some(format!(
                    "({}.oid = pg_my_temp_schema() AND {} IN {})",
                    target.namespace, target.name, list
                ))
            }
            SqlObjectFilter::Any(filters) => {
                let parts: Vec<String> = filters.iter().filter_map(|f| f.to_sql(target)).collect();
                match parts.len() {
                    0 => None,
                    1 => parts.into_iter().next(),
                    _ => Some(format!("({})", parts.join(" OR "))),
                }
            }
        }
    }
}
