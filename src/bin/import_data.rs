use std::{env, path::PathBuf, process::ExitCode};

use data_loader::fixture_loader::{load_fixture, read_fixture, FixtureError};
use database::open_catalog;
use settings::CatalogConfig;
use tracing::{error, info, trace_span};

mod data_loader;
mod database;
mod logging;
mod settings;

fn main() -> ExitCode {
    let config = match CatalogConfig::load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Can't load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.log_level);

    let Some(path) = env::args_os().nth(1).map(PathBuf::from) else {
        error!("usage: import-data <fixture.json>");
        return ExitCode::FAILURE;
    };

    match import(&config, path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "import failed, nothing was written");
            ExitCode::FAILURE
        }
    }
}

fn import(config: &CatalogConfig, path: PathBuf) -> Result<(), FixtureError> {
    let span = trace_span!("import", path = %path.display());
    let _guard = span.enter();

    if config.database_url.is_none() {
        info!("importing into an in-memory catalog, this only checks the fixture");
    }

    let catalog = open_catalog(config)?;
    let fixture = read_fixture(&path)?;
    let report = load_fixture(catalog.as_ref(), &fixture)?;

    info!(
        ingredients_created = report.ingredients_created,
        ingredients_reused = report.ingredients_reused,
        recipes_created = report.recipes_created,
        recipe_ingredients_created = report.recipe_ingredients_created,
        "import done"
    );

    Ok(())
}
