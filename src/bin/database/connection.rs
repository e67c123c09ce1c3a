use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{info, trace, trace_span};

use super::{database_catalog::PgPool, error::CatalogError};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn establish_pooled_connection(
    database_url: &str,
    max_size: u32,
) -> Result<PgPool, CatalogError> {
    let span = trace_span!("establishing pooled connection");
    let _guard = span.enter();

    trace!("Creating manager");
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    trace!("Creating pool");
    Ok(Pool::builder().max_size(max_size).build(manager)?)
}

pub fn run_migrations(pool: &PgPool) -> Result<(), CatalogError> {
    let span = trace_span!("running migrations");
    let _guard = span.enter();

    let mut pooled = pool.get()?;
    let connection: &mut PgConnection = &mut pooled;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| CatalogError::Migration(error.to_string()))?;

    for version in applied {
        info!(%version, "applied migration");
    }

    Ok(())
}
