use pgmodel_schema::{ColumnRef, ModelError, ObjectName, ValueClass};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("unknown column type category '{category}' for {schema}:{name}")]
    UnknownTypeCategory {
        schema: String,
        name: String,
        category: String,
    },

    #[error("unsupported type '{name}': not a known built-in type")]
    UnknownPrimitive { name: String },

    #[error(
        "inconsistent numeric facets for {type_name}: precision {precision:?}, scale {scale:?}"
    )]
    InconsistentNumeric {
        type_name: String,
        precision: Option<i32>,
        scale: Option<i32>,
    },

    #[error("table {table} has multiple primary keys: {}", .constraints.join(", "))]
    MultiplePrimaryKeys {
        table: ObjectName,
        constraints: Vec<String>,
    },

    #[error("foreign key {constraint} on {table} references {target}, which the catalog did not return")]
    DanglingForeignKey {
        table: ObjectName,
        constraint: String,
        target: ObjectName,
    },

    #[error("{what} closure did not converge after {rounds} rounds")]
    ClosureLimit { what: &'static str, rounds: usize },

    #[error("referenced type {0} was not returned by the catalog")]
    MissingType(ObjectName),

    #[error("multiple type overwrites for {}", format_conflicts(.0))]
    ConflictingOverwrites(Vec<OverwriteConflict>),

    #[error("type overwrite for {0}, which is not a column of any resolved table")]
    UnknownOverwriteColumn(ColumnRef),

    #[error("duplicate statement names: {}", .0.join(", "))]
    DuplicateStatementNames(Vec<String>),

    #[error("statement {statement} has {expected} unique variables but postgres inferred {actual} parameters")]
    ParameterCountMismatch {
        statement: String,
        expected: usize,
        actual: usize,
    },

    #[error("{path}:{line}: {message}")]
    Script {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to probe statement {statement}: {source}")]
    Probe {
        statement: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One FK-equivalence group that received more than one overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteConflict {
    /// Every column in the group
    pub columns: Vec<ColumnRef>,
    /// The distinct overwrites that landed in the group
    pub overwrites: Vec<ValueClass>,
}

impl fmt::Display for OverwriteConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        let overwrites: Vec<String> = self.overwrites.iter().map(|v| v.to_string()).collect();
        write!(
            f,
            "[{}] ({})",
            columns.join(", "),
            overwrites.join(" vs ")
        )
    }
}

fn format_conflicts(conflicts: &[OverwriteConflict]) -> String {
    let parts: Vec<String> = conflicts.iter().map(|c| c.to_string()).collect();
    parts.join("; ")
}
