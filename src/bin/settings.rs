use std::env;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Runtime configuration shared by the binaries.
///
/// Sources, lowest priority first: `DATABASE_URL`, `recipe_catalog.toml`,
/// then `CATALOG_*` environment variables. A `.env` file is loaded first.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogConfig {
    /// Postgres URL. Without one the catalog lives in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_pool_max_size() -> u32 {
    4
}

fn default_run_migrations() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl CatalogConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_default("database_url", database_url)?;
        }

        Self::from_builder(
            builder
                .add_source(File::with_name("recipe_catalog").required(false))
                .add_source(Environment::with_prefix("CATALOG")),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use pretty_assertions::assert_eq;

    use super::*;

    fn from_toml(toml: &str) -> CatalogConfig {
        CatalogConfig::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap()
    }

    #[test]
    fn defaults_select_the_memory_catalog() {
        assert_eq!(
            from_toml(""),
            CatalogConfig {
                database_url: None,
                pool_max_size: 4,
                run_migrations: true,
                log_level: "info".into(),
            }
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let config = from_toml(
            r#"
            database_url = "postgres://catalog@localhost/recipes"
            pool_max_size = 1
            run_migrations = false
            log_level = "trace"
            "#,
        );

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://catalog@localhost/recipes")
        );
        assert_eq!(config.pool_max_size, 1);
        assert!(!config.run_migrations);
        assert_eq!(config.log_level, "trace");
    }
}
