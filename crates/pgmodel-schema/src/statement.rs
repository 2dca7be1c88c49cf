//! Hand-authored SQL statements with resolved types.

use crate::{Column, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many rows a statement produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cardinality {
    /// Exactly one row, or failure
    One,
    /// Zero or more rows, produced as a sequence
    #[default]
    Many,
}

impl Cardinality {
    /// Parse a header token such as `:one` or `:many` (without the colon).
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("one") {
            Some(Cardinality::One)
        } else if token.eq_ignore_ascii_case("many") {
            Some(Cardinality::Many)
        } else {
            None
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => write!(f, "ONE"),
            Cardinality::Many => write!(f, "MANY"),
        }
    }
}

/// One occurrence of a variable in the statement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    pub name: String,
    /// Zero-based position of the variable among the unique variables;
    /// `$index+1` in [`Statement::sql`].
    pub index: usize,
}

/// A fully typed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub name: String,
    pub cardinality: Cardinality,
    /// Every variable occurrence, repeats included, in text order
    pub variables: Vec<VariableRef>,
    /// Unique variables in first-seen order, with their resolved types
    pub parameters: IndexMap<String, Type>,
    /// Result columns, in select-list order
    pub columns: Vec<Column>,
    /// Statement text with variables replaced by `$n` markers
    pub sql: String,
}
