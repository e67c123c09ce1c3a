pub mod catalog;
pub mod connection;
pub mod database_catalog;
pub mod error;
pub mod memory_catalog;
pub mod models;
pub mod schema;
pub mod validation;

use std::sync::Arc;

use tracing::{info, trace_span, warn};

use crate::settings::CatalogConfig;

use self::{
    catalog::Catalog,
    connection::{establish_pooled_connection, run_migrations},
    database_catalog::DatabaseCatalog,
    error::CatalogError,
    memory_catalog::MemoryCatalog,
};

pub type SharedCatalog = Arc<dyn Catalog + Send + Sync>;

/// Postgres when a database url is configured, memory otherwise.
pub fn open_catalog(config: &CatalogConfig) -> Result<SharedCatalog, CatalogError> {
    let span = trace_span!("opening catalog");
    let _guard = span.enter();

    let Some(database_url) = &config.database_url else {
        warn!("no database url configured, records live in memory until exit");
        return Ok(Arc::new(MemoryCatalog::new()));
    };

    let pool = establish_pooled_connection(database_url, config.pool_max_size)?;
    if config.run_migrations {
        run_migrations(&pool)?;
    }

    info!(pool_max_size = config.pool_max_size, "connected to postgres");
    Ok(Arc::new(DatabaseCatalog::new(pool)))
}
