//! Statement introspection against a live session.
//!
//! Parameter types come from preparing the statement and reading what
//! Postgres inferred. Result columns come from materializing an empty temp
//! table shaped like the statement's result and reading it back through the
//! regular column query. Both probe objects are removed before returning,
//! whether or not probing succeeded.

use super::ParsedStatement;
use crate::catalog::{Catalog, Prober, TypeRow};
use crate::decode::decode_type;
use crate::resolve::assemble_columns;
use crate::{Error, Result, SqlObjectFilter};
use indexmap::IndexMap;
use pgmodel_schema::{Column, Statement};

/// Resolve parameter and result types for one parsed statement.
pub async fn introspect_statement<C: Catalog + Prober>(
    catalog: &C,
    parsed: &ParsedStatement,
) -> Result<Statement> {
    let probe = pgmodel_sql::probe_name(
        &format!("pgmodel_{}", parsed.name),
        &parsed.prepared_sql,
    );
    tracing::debug!(statement = %parsed.name, probe = %probe, "introspecting statement");

    probe_statement(catalog, &probe, parsed)
        .await
        .map_err(|source| match source {
            e @ Error::ParameterCountMismatch { .. } => e,
            source => Error::Probe {
                statement: parsed.name.clone(),
                source: Box::new(source),
            },
        })
}

/// Introspect statements one after another on the same session.
pub async fn introspect_statements<C: Catalog + Prober>(
    catalog: &C,
    parsed: &[ParsedStatement],
) -> Result<Vec<Statement>> {
    let mut statements = Vec::with_capacity(parsed.len());
    for statement in parsed {
        statements.push(introspect_statement(catalog, statement).await?);
    }
    Ok(statements)
}

async fn probe_statement<C: Catalog + Prober>(
    catalog: &C,
    probe: &str,
    parsed: &ParsedStatement,
) -> Result<Statement> {
    let rows = parameter_rows(catalog, probe, &parsed.prepared_sql).await?;
    if rows.len() != parsed.unique_variables.len() {
        return Err(Error::ParameterCountMismatch {
            statement: parsed.name.clone(),
            expected: parsed.unique_variables.len(),
            actual: rows.len(),
        });
    }

    let mut parameters = IndexMap::with_capacity(rows.len());
    for (name, row) in parsed.unique_variables.iter().zip(&rows) {
        parameters.insert(name.clone(), decode_type(row)?);
    }

    let columns = if parsed.returns_rows {
        result_columns(catalog, probe, parsed).await?
    } else {
        Vec::new()
    };

    Ok(Statement {
        name: parsed.name.clone(),
        cardinality: parsed.cardinality,
        variables: parsed.variables.clone(),
        parameters,
        columns,
        sql: parsed.prepared_sql.clone(),
    })
}

/// Keep the first failure; a cleanup failure after a successful probe still
/// fails the statement.
fn with_cleanup<T>(result: Result<T>, cleanup: Result<()>, probe: &str) -> Result<T> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup)) => {
            tracing::warn!("failed to clean up probe {}: {}", probe, cleanup);
            Err(e)
        }
    }
}

async fn parameter_rows<C: Prober>(catalog: &C, probe: &str, sql: &str) -> Result<Vec<TypeRow>> {
    // cleanup runs even when PREPARE itself failed
    let rows = match catalog.prepare(probe, sql).await {
        Ok(()) => catalog.parameter_types(probe).await,
        Err(e) => Err(e),
    };
    let cleanup = catalog.deallocate(probe).await;
    with_cleanup(rows, cleanup, probe)
}

async fn result_columns<C: Catalog + Prober>(
    catalog: &C,
    probe: &str,
    parsed: &ParsedStatement,
) -> Result<Vec<Column>> {
    let rows = match catalog.create_temp_table(probe, &parsed.sample_sql).await {
        Ok(()) => {
            catalog
                .columns(&SqlObjectFilter::temp_tables([probe]))
                .await
        }
        Err(e) => Err(e),
    };
    let cleanup = catalog.drop_temp_table(probe).await;
    let rows = with_cleanup(rows, cleanup, probe)?;

    let mut columns: Vec<Column> = assemble_columns(rows)?
        .into_values()
        .next()
        .unwrap_or_default();
    for column in &mut columns {
        if parsed.non_null.contains(&column.name) {
            column.nullable = false;
        }
    }
    for name in &parsed.non_null {
        if !columns.iter().any(|c| &c.name == name) {
            tracing::warn!(
                "statement {} marks {} as non-null, but it is not a result column",
                parsed.name,
                name
            );
        }
    }
    Ok(columns)
}
