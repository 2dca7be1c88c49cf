//! Configuration file handling.
//!
//! Looks for `.config/pgmodel.toml` in the current directory or any parent
//! directory:
//!
//! ```toml
//! [[database]]
//! name = "main"
//! url = "postgres://${PGUSER}@localhost/app"
//! schemas = ["public"]
//! tables = ["audit.event"]
//! statements = ["queries/users.sql"]
//!
//! [database.overwrites.columns]
//! "public.user.id" = "app.UserId"
//!
//! [database.overwrites.domains]
//! "public.email" = "app.Email"
//! ```

use crate::{Error, ResolveRequest, Result, SqlObjectFilter, TypeOverwrites};
use camino::{Utf8Path, Utf8PathBuf};
use pgmodel_schema::{ObjectName, ValueClass};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

const CONFIG_FILE: &str = ".config/pgmodel.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no .config/pgmodel.toml found in {0} or any parent")]
    NotFound(Utf8PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration: one entry per database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "database", default)]
    pub databases: Vec<DatabaseConfig>,
}

/// One database to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Label used in logs
    pub name: String,
    /// Connection URL; `${VAR}` is replaced from the environment
    pub url: String,
    /// Schemas whose tables are all included
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Individual tables as `schema.table`
    #[serde(default)]
    pub tables: Vec<String>,
    /// Statement scripts, relative to the directory holding `.config/`
    #[serde(default)]
    pub statements: Vec<Utf8PathBuf>,
    #[serde(default)]
    pub overwrites: OverwritesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverwritesConfig {
    /// `schema.table.column` to value class
    #[serde(default)]
    pub columns: BTreeMap<String, ValueClass>,
    /// `schema.domain` to value class
    #[serde(default)]
    pub domains: BTreeMap<String, ValueClass>,
}

impl Config {
    pub fn from_toml(path: &Utf8Path, content: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

/// Load configuration from `.config/pgmodel.toml`, searching up the
/// directory tree from the current directory.
///
/// Returns the configuration and the directory containing `.config/`, which
/// statement paths are relative to.
pub fn load() -> std::result::Result<(Config, Utf8PathBuf), ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: Utf8PathBuf::from("."),
        source,
    })?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| {
        ConfigError::Invalid(format!(
            "current directory {} is not valid UTF-8",
            p.display()
        ))
    })?;
    load_from(&cwd)
}

/// Load configuration starting from a specific directory.
///
/// Variables from a `.env` file beside `.config/` are added to the
/// environment, without overriding ones already set.
pub fn load_from(start: &Utf8Path) -> std::result::Result<(Config, Utf8PathBuf), ConfigError> {
    let (config_path, base_dir) = find_config_file(start)?;
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;
    let config = Config::from_toml(&config_path, &content)?;
    // a `.env` next to `.config/` feeds `${VAR}` expansion in URLs
    if dotenvy::from_path(base_dir.join(".env")).is_ok() {
        tracing::debug!("loaded {}/.env", base_dir);
    }
    tracing::debug!(path = %config_path, databases = config.databases.len(), "loaded config");
    Ok((config, base_dir))
}

fn find_config_file(
    start: &Utf8Path,
) -> std::result::Result<(Utf8PathBuf, Utf8PathBuf), ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok((config_path, current));
        }
        if !current.pop() {
            return Err(ConfigError::NotFound(start.to_path_buf()));
        }
    }
}

/// Replace every `${VAR}` in `s` with the variable's value.
pub fn expand_env_vars(s: &str) -> std::result::Result<String, ConfigError> {
    expand_with(s, |name| std::env::var(name).ok())
}

fn expand_with(
    s: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> std::result::Result<String, ConfigError> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::Invalid(format!("unterminated ${{ in '{}'", s)))?;
        let name = &after[..end];
        let value = lookup(name).ok_or_else(|| {
            ConfigError::Invalid(format!("environment variable {} is not set", name))
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn split_name<'a>(what: &str, name: &'a str, parts: usize) -> Result<Vec<&'a str>> {
    let split: Vec<&str> = name.splitn(parts, '.').collect();
    if split.len() != parts || split.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "{} '{}' must have {} dot-separated parts",
            what, name, parts
        ))
        .into());
    }
    Ok(split)
}

impl DatabaseConfig {
    /// The connection URL with environment variables expanded.
    pub fn connection_url(&self) -> Result<String> {
        Ok(expand_env_vars(&self.url)?)
    }

    /// The object filter selecting the configured schemas and tables.
    pub fn filter(&self, database: &str) -> Result<SqlObjectFilter> {
        let schemas: BTreeSet<String> = self.schemas.iter().cloned().collect();
        let mut tables = BTreeSet::new();
        for table in &self.tables {
            let parts = split_name("table", table, 2)?;
            tables.insert(ObjectName::new(database, parts[0], parts[1]));
        }
        Ok(SqlObjectFilter::Any(vec![
            SqlObjectFilter::Schemas(schemas),
            SqlObjectFilter::Objects(tables),
        ]))
    }

    pub fn type_overwrites(&self, database: &str) -> Result<TypeOverwrites> {
        let mut overwrites = TypeOverwrites::default();
        for (column, value_class) in &self.overwrites.columns {
            let parts = split_name("column overwrite", column, 3)?;
            let table = ObjectName::new(database, parts[0], parts[1]);
            overwrites
                .columns
                .insert(table.column(parts[2]), value_class.clone());
        }
        for (domain, value_class) in &self.overwrites.domains {
            let parts = split_name("domain overwrite", domain, 2)?;
            overwrites.domains.insert(
                ObjectName::new(database, parts[0], parts[1]),
                value_class.clone(),
            );
        }
        Ok(overwrites)
    }

    /// Build the resolution request for this entry once the connection has
    /// reported its database identifier. Statement scripts are read from
    /// `base_dir`.
    pub fn to_request(&self, database: &str, base_dir: &Utf8Path) -> Result<ResolveRequest> {
        let mut scripts = Vec::with_capacity(self.statements.len());
        for path in &self.statements {
            let full = base_dir.join(path);
            let source = std::fs::read_to_string(&full).map_err(|source| Error::Io {
                path: full.to_string(),
                source,
            })?;
            scripts.push((path.to_string(), source));
        }
        Ok(ResolveRequest {
            filter: self.filter(database)?,
            scripts,
            overwrites: self.type_overwrites(database)?,
        })
    }
}
