//! Table assembly, the foreign-key closure and the type closure.

use crate::catalog::{Catalog, ColumnRow, ConstraintRow, EnumRow, ForeignKeyRow, PrimaryKeyRow};
use crate::decode::decode_type;
use crate::{Error, Result, SqlObjectFilter};
use pgmodel_schema::{
    Column, ColumnPair, CompositeType, Enum, ForeignKey, ObjectName, PrimaryKey, Statement, Table,
    Type,
};
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on closure rounds. Every round fetches at least one object
/// not seen before, so only a misbehaving catalog can reach it.
pub const MAX_CLOSURE_ROUNDS: usize = 1024;

// ============================================================================
// Assembly
// ============================================================================

/// Decode catalog columns into [`Column`]s, in ordinal order per object.
pub(crate) fn assemble_columns(rows: Vec<ColumnRow>) -> Result<BTreeMap<ObjectName, Vec<Column>>> {
    let mut by_object: BTreeMap<ObjectName, Vec<Column>> = BTreeMap::new();
    for row in rows {
        let ty = decode_type(&row.ty)?;
        by_object.entry(row.object).or_default().push(Column {
            position: row.position,
            name: row.name,
            ty,
            nullable: row.nullable,
            default: row.default,
        });
    }
    for columns in by_object.values_mut() {
        columns.sort_by_key(|c| c.position);
    }
    Ok(by_object)
}

/// Combine one batch of catalog rows into tables, sorted by name.
pub fn assemble_tables(
    columns: Vec<ColumnRow>,
    primary_keys: Vec<PrimaryKeyRow>,
    foreign_keys: Vec<ForeignKeyRow>,
    unique_constraints: Vec<ConstraintRow>,
    check_constraints: Vec<ConstraintRow>,
) -> Result<Vec<Table>> {
    let mut tables: BTreeMap<ObjectName, Table> = BTreeMap::new();
    for (name, columns) in assemble_columns(columns)? {
        let mut table = Table::new(name.clone());
        table.columns = columns;
        tables.insert(name, table);
    }

    // table -> constraint -> (ordinal, column)
    let mut pks: BTreeMap<ObjectName, BTreeMap<String, Vec<(i32, String)>>> = BTreeMap::new();
    for row in primary_keys {
        pks.entry(row.table)
            .or_default()
            .entry(row.constraint)
            .or_default()
            .push((row.ordinal, row.column));
    }
    for (name, constraints) in pks {
        if constraints.len() > 1 {
            return Err(Error::MultiplePrimaryKeys {
                table: name,
                constraints: constraints.into_keys().collect(),
            });
        }
        let table = tables
            .entry(name.clone())
            .or_insert_with(|| Table::new(name));
        if let Some((constraint, mut columns)) = constraints.into_iter().next() {
            columns.sort();
            table.primary_key = Some(PrimaryKey {
                name: constraint,
                columns: columns.into_iter().map(|(_, c)| c).collect(),
            });
        }
    }

    // (table, constraint) -> (target, [(ordinal, pair)])
    let mut fks: BTreeMap<(ObjectName, String), (ObjectName, Vec<(i32, ColumnPair)>)> =
        BTreeMap::new();
    for row in foreign_keys {
        let pair = ColumnPair {
            source: row.column,
            target: row.target_column,
        };
        fks.entry((row.table, row.constraint))
            .or_insert_with(|| (row.target, Vec::new()))
            .1
            .push((row.ordinal, pair));
    }
    for ((name, constraint), (target, mut pairs)) in fks {
        pairs.sort();
        let table = tables
            .entry(name.clone())
            .or_insert_with(|| Table::new(name));
        table.foreign_keys.push(ForeignKey {
            name: constraint,
            target,
            columns: pairs.into_iter().map(|(_, p)| p).collect(),
        });
    }

    for row in unique_constraints {
        let table = tables
            .entry(row.table.clone())
            .or_insert_with(|| Table::new(row.table));
        table.unique_constraints.insert(row.name);
    }
    for row in check_constraints {
        let table = tables
            .entry(row.table.clone())
            .or_insert_with(|| Table::new(row.table));
        table.check_constraints.insert(row.name);
    }

    Ok(tables.into_values().collect())
}

/// Fetch and assemble every table matched by `filter`.
pub async fn fetch_tables<C: Catalog>(catalog: &C, filter: &SqlObjectFilter) -> Result<Vec<Table>> {
    if filter.is_empty() {
        return Ok(Vec::new());
    }
    assemble_tables(
        catalog.columns(filter).await?,
        catalog.primary_keys(filter).await?,
        catalog.foreign_keys(filter).await?,
        catalog.unique_constraints(filter).await?,
        catalog.check_constraints(filter).await?,
    )
}

// ============================================================================
// Foreign-key closure
// ============================================================================

/// Resolve every table matched by `filter`, plus every table reachable from
/// them through foreign keys.
///
/// Each round fetches exactly the referenced tables not fetched so far. A
/// requested table the catalog does not return fails the closure instead of
/// being requested again.
pub async fn resolve_tables<C: Catalog>(
    catalog: &C,
    filter: &SqlObjectFilter,
) -> Result<Vec<Table>> {
    let mut fetched: BTreeMap<ObjectName, Table> = BTreeMap::new();
    // target -> (referencing table, constraint) for the current round
    let mut requested: BTreeMap<ObjectName, (ObjectName, String)> = BTreeMap::new();
    let mut filter = filter.clone();

    for round in 1..=MAX_CLOSURE_ROUNDS {
        let batch = fetch_tables(catalog, &filter).await?;
        tracing::debug!(round, tables = batch.len(), "foreign key closure round");
        for table in batch {
            fetched.entry(table.name.clone()).or_insert(table);
        }

        if let Some((target, (table, constraint))) = requested
            .into_iter()
            .find(|(target, _)| !fetched.contains_key(target))
        {
            return Err(Error::DanglingForeignKey {
                table,
                constraint,
                target,
            });
        }

        requested = BTreeMap::new();
        for table in fetched.values() {
            for fk in &table.foreign_keys {
                if !fetched.contains_key(&fk.target) {
                    requested
                        .entry(fk.target.clone())
                        .or_insert_with(|| (table.name.clone(), fk.name.clone()));
                }
            }
        }
        if requested.is_empty() {
            return Ok(fetched.into_values().collect());
        }
        filter = SqlObjectFilter::objects(requested.keys().cloned());
    }

    Err(Error::ClosureLimit {
        what: "foreign key",
        rounds: MAX_CLOSURE_ROUNDS,
    })
}

// ============================================================================
// Type closure
// ============================================================================

/// Enums and composite types reachable from the resolved tables and
/// statements.
#[derive(Debug, Default)]
pub struct ResolvedTypes {
    pub enums: Vec<Enum>,
    pub composite_types: Vec<CompositeType>,
}

fn collect_references<'a>(types: impl IntoIterator<Item = &'a Type>) -> BTreeSet<ObjectName> {
    types
        .into_iter()
        .flat_map(|ty| ty.referenced_objects())
        .cloned()
        .collect()
}

/// Every type used by the tables' columns and the statements' parameters
/// and result columns.
fn initial_references(tables: &[Table], statements: &[Statement]) -> BTreeSet<ObjectName> {
    let columns = tables.iter().flat_map(|t| t.columns.iter().map(|c| &c.ty));
    let parameters = statements.iter().flat_map(|s| s.parameters.values());
    let results = statements
        .iter()
        .flat_map(|s| s.columns.iter().map(|c| &c.ty));
    collect_references(columns.chain(parameters).chain(results))
}

/// Fetch every enum and composite type referenced from `tables` and
/// `statements`, following composite fields until nothing is missing.
pub async fn resolve_types<C: Catalog>(
    catalog: &C,
    tables: &[Table],
    statements: &[Statement],
) -> Result<ResolvedTypes> {
    let mut enums: BTreeMap<ObjectName, Enum> = BTreeMap::new();
    let mut composites: BTreeMap<ObjectName, CompositeType> = BTreeMap::new();
    let mut pending = initial_references(tables, statements);

    for round in 1..=MAX_CLOSURE_ROUNDS {
        let missing: BTreeSet<ObjectName> = pending
            .into_iter()
            .filter(|n| !enums.contains_key(n) && !composites.contains_key(n))
            .collect();
        if missing.is_empty() {
            return Ok(ResolvedTypes {
                enums: enums.into_values().collect(),
                composite_types: composites.into_values().collect(),
            });
        }

        let filter = SqlObjectFilter::Objects(missing.clone());
        let new_enums = assemble_enums(catalog.enums(&filter).await?);
        let new_composites = assemble_columns(catalog.composite_fields(&filter).await?)?;
        tracing::debug!(
            round,
            enums = new_enums.len(),
            composites = new_composites.len(),
            "type closure round"
        );

        pending = BTreeSet::new();
        for (name, fields) in new_composites {
            pending.extend(collect_references(fields.iter().map(|f| &f.ty)));
            composites.insert(name.clone(), CompositeType { name, fields });
        }
        for e in new_enums {
            enums.insert(e.name.clone(), e);
        }

        if let Some(name) = missing
            .into_iter()
            .find(|n| !enums.contains_key(n) && !composites.contains_key(n))
        {
            return Err(Error::MissingType(name));
        }
    }

    Err(Error::ClosureLimit {
        what: "type",
        rounds: MAX_CLOSURE_ROUNDS,
    })
}

/// Group enum labels by type, keeping catalog order.
fn assemble_enums(rows: Vec<EnumRow>) -> Vec<Enum> {
    let mut by_name: BTreeMap<ObjectName, Vec<String>> = BTreeMap::new();
    for row in rows {
        let labels = by_name.entry(row.name).or_default();
        labels.extend(row.label);
    }
    by_name
        .into_iter()
        .map(|(name, labels)| Enum { name, labels })
        .collect()
}
