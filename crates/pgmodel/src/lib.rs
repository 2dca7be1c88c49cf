//! Resolve a live Postgres schema into a typed, language-neutral model.
//!
//! Given an object filter, a set of annotated SQL scripts and type
//! overwrites, `pgmodel` produces a [`SchemaModel`]:
//!
//! - every selected table plus every table reachable through foreign keys
//! - every enum and composite type those tables and statements use
//! - every script statement with parameter and result column types, as
//!   inferred by Postgres itself
//! - caller-declared value classes propagated across foreign keys
//!
//! The reader talks to the catalog through the [`Catalog`] and [`Prober`]
//! traits; [`PgCatalog`] implements both over a live connection.
//!
//! ```ignore
//! let (config, base_dir) = pgmodel::config::load()?;
//! let model = pgmodel::resolve_all(&config, &base_dir).await?;
//! model.write_to(camino::Utf8Path::new("schema.json"))?;
//! ```
//!
//! # Statement scripts
//!
//! ```sql
//! -- name: postsByAuthor
//! SELECT id, title, count(*) OVER () AS total /*!*/
//! FROM post
//! WHERE author_id = /*:author*/ 1;
//! ```
//!
//! See [`statement::parse_script`] for the marker syntax.

pub mod catalog;
pub mod config;
mod decode;
mod error;
mod filter;
mod overwrite;
mod resolve;
mod session;
pub mod statement;
mod traced;

pub use catalog::{Catalog, PgCatalog, Prober};
pub use config::{Config, ConfigError, DatabaseConfig};
pub use decode::decode_type;
pub use error::{Error, OverwriteConflict};
pub use filter::SqlObjectFilter;
pub use overwrite::{TypeOverwrites, apply_overwrites, merge_column_overwrites};
pub use resolve::{
    MAX_CLOSURE_ROUNDS, ResolvedTypes, assemble_tables, fetch_tables, resolve_tables,
    resolve_types,
};
pub use session::Session;
pub use traced::{Connection, ConnectionExt, TracedConn};

pub use pgmodel_schema::SchemaModel;

use camino::Utf8Path;
use statement::{check_unique_names, introspect_statements, parse_script};
use tracing::Instrument;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything needed to resolve one database.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Tables to start the foreign-key closure from
    pub filter: SqlObjectFilter,
    /// Statement scripts as `(path, source)`; the path is only used in errors
    pub scripts: Vec<(String, String)>,
    pub overwrites: TypeOverwrites,
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve one database through `catalog`.
///
/// Runs the table closure, parses and probes every statement, fetches the
/// referenced user-defined types and applies the overwrites. Any failure
/// aborts the whole resolution.
pub async fn resolve<C: Catalog + Prober>(
    catalog: &C,
    request: &ResolveRequest,
) -> Result<SchemaModel> {
    let mut tables = resolve_tables(catalog, &request.filter).await?;
    tracing::debug!(tables = tables.len(), "resolved tables");

    let mut parsed = Vec::new();
    for (path, source) in &request.scripts {
        parsed.extend(parse_script(path, source)?);
    }
    check_unique_names(parsed.iter().map(|s| s.name.as_str()))?;
    let mut statements = introspect_statements(catalog, &parsed).await?;

    let ResolvedTypes {
        enums,
        mut composite_types,
    } = resolve_types(catalog, &tables, &statements).await?;

    apply_overwrites(
        &mut tables,
        &mut composite_types,
        &mut statements,
        &request.overwrites,
    )?;

    let mut model = SchemaModel {
        tables,
        enums,
        composite_types,
        statements,
    };
    model.normalize();
    Ok(model)
}

/// Connect to a configured database and resolve it.
///
/// The session is closed before returning, whether or not resolution
/// succeeded.
pub async fn resolve_database(config: &DatabaseConfig, base_dir: &Utf8Path) -> Result<SchemaModel> {
    let span = tracing::info_span!("resolve_database", name = %config.name);
    async {
        tracing::info!("resolving database {}", config.name);
        let session = Session::connect(&config.connection_url()?).await?;
        let catalog = PgCatalog::new(session.client()).await?;
        let request = config.to_request(catalog.database(), base_dir)?;
        let model = resolve(&catalog, &request).await?;
        tracing::info!(
            tables = model.tables.len(),
            enums = model.enums.len(),
            composite_types = model.composite_types.len(),
            statements = model.statements.len(),
            "resolved database {}",
            config.name
        );
        Ok::<_, Error>(model)
    }
    .instrument(span)
    .await
}

/// Resolve every configured database in turn and merge the results.
pub async fn resolve_all(config: &Config, base_dir: &Utf8Path) -> Result<SchemaModel> {
    if config.databases.is_empty() {
        tracing::warn!("no databases configured");
    }
    let mut models = Vec::with_capacity(config.databases.len());
    for database in &config.databases {
        models.push(resolve_database(database, base_dir).await?);
    }
    merge_models(models)
}

/// Merge per-database models into one.
///
/// Statement names must stay unique across every database, under the same
/// normalization used within a single database.
pub fn merge_models(models: Vec<SchemaModel>) -> Result<SchemaModel> {
    check_unique_names(
        models
            .iter()
            .flat_map(|m| m.statements.iter().map(|s| s.name.as_str())),
    )?;
    Ok(SchemaModel::merge(models))
}
