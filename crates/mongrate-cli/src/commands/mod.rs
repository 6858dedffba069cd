//! CLI command implementations.

pub mod migrate;
pub mod plan;
pub mod preview;

use anyhow::{bail, Context, Result};
use mongrate_backend::{MySqlSource, SourceDatabase};
use mongrate_config::{ConfigLoader, MigrationConfig};
use mongrate_core::{synthesize, RankedSchema};

use crate::GlobalOptions;

/// Load the merged configuration for this invocation.
pub fn load_config(global: &GlobalOptions) -> Result<MigrationConfig> {
    let working_dir = std::env::current_dir().context("cannot resolve working directory")?;
    let overrides = global.to_config_overrides();
    ConfigLoader::new()
        .load(&working_dir, Some(&overrides))
        .context("failed to load configuration")
}

/// Connect to the source database.
pub fn connect_source(config: &MigrationConfig, database: &str) -> Result<MySqlSource> {
    MySqlSource::connect(&config.source.url(database), database)
        .with_context(|| format!("cannot connect to MySQL database '{database}'"))
}

/// Introspect the catalog and run schema synthesis.
pub async fn synthesize_schemas(source: &MySqlSource) -> Result<Vec<RankedSchema>> {
    let catalog = source
        .read_catalog()
        .await
        .context("catalog introspection failed")?;
    let ranked = synthesize(&catalog).context("schema synthesis failed")?;
    if ranked.is_empty() {
        bail!("no viable document schema found within the search budget");
    }
    Ok(ranked)
}

/// Pick a 1-based schema index out of the ranked list.
pub fn select_schema(ranked: &[RankedSchema], index: usize) -> Result<&RankedSchema> {
    if index == 0 || index > ranked.len() {
        bail!(
            "schema index {index} out of range; run `mongrate plan` to list the {} options",
            ranked.len()
        );
    }
    Ok(&ranked[index - 1])
}
