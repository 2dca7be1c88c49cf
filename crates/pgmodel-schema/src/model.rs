//! The complete resolved model and its persisted form.

use crate::{CompositeType, Enum, Statement, Table};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// Errors reading or writing the persisted model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema model document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything a code generator needs, for one or more databases.
///
/// Once [`normalized`](SchemaModel::normalize), all lists are sorted by name
/// and free of duplicates, so the persisted form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaModel {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    #[serde(default)]
    pub composite_types: Vec<CompositeType>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl SchemaModel {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten several models (one per database) into one normalized model.
    pub fn merge(models: impl IntoIterator<Item = SchemaModel>) -> Self {
        let mut merged = SchemaModel::new();
        for model in models {
            merged.tables.extend(model.tables);
            merged.enums.extend(model.enums);
            merged.composite_types.extend(model.composite_types);
            merged.statements.extend(model.statements);
        }
        merged.normalize();
        merged
    }

    /// Sort every list by name and drop later duplicate types and tables.
    ///
    /// Statements are only sorted; callers reject colliding names.
    pub fn normalize(&mut self) {
        self.tables.sort_by(|a, b| a.name.cmp(&b.name));
        self.tables.dedup_by(|a, b| a.name == b.name);

        self.enums.sort_by(|a, b| a.name.cmp(&b.name));
        self.enums.dedup_by(|a, b| a.name == b.name);

        self.composite_types.sort_by(|a, b| a.name.cmp(&b.name));
        self.composite_types.dedup_by(|a, b| a.name == b.name);

        self.statements.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Get a table by its local name (first match across schemas).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.name == name)
    }

    /// Get a statement by name.
    pub fn statement(&self, name: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.name == name)
    }

    /// Serialize to the persisted JSON document.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a model back from its persisted JSON document.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Stable content hash of the persisted form.
    ///
    /// Two models with the same fingerprint generate the same code.
    pub fn fingerprint(&self) -> Result<String, ModelError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Write the persisted form to `path`.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), ModelError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ModelError::Io {
            path: path.to_string(),
            source,
        })
    }

    /// Read a persisted model from `path`.
    pub fn read_from(path: &Utf8Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
