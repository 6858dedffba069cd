//! Migrate command - execute a chosen schema against live databases.

use anyhow::{Context, Result};
use clap::Args;
use mongrate_backend::{DataMapper, MongoTarget};

use super::{connect_source, load_config, select_schema, synthesize_schemas};
use crate::progress::step_spinner;
use crate::GlobalOptions;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Name of the MySQL database (the MongoDB database name will match)
    database: String,

    /// 1-based index into the ranked schema list (see `mongrate plan`)
    #[arg(long, short = 's', default_value = "1")]
    schema: usize,
}

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let source = connect_source(&config, &args.database)?;
    let ranked = synthesize_schemas(&source).await?;
    let chosen = select_schema(&ranked, args.schema)?;

    let target = MongoTarget::connect(&config.target.uri(), &args.database)
        .await
        .context("cannot connect to MongoDB")?;

    let spinner = step_spinner(format!(
        "migrating '{}' with schema #{}",
        args.database, args.schema
    ));
    let mapper = DataMapper::new(&source, &target);
    let report = mapper
        .migrate(&chosen.schema)
        .await
        .context("migration failed; partial target data is not rolled back")?;
    spinner.finish_and_clear();

    let total: u64 = report.inserted.values().sum();
    println!("Migration complete");
    for (collection, count) in &report.inserted {
        println!("  {collection}: {count} document(s)");
    }
    println!(
        "  {total} document(s) total, {} patched with references",
        report.patched
    );

    source.disconnect().await?;
    Ok(())
}
