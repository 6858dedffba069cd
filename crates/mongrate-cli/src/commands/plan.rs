//! Plan command - synthesize and rank document schemas.

use anyhow::Result;
use clap::{Args, ValueEnum};

use super::{connect_source, load_config, synthesize_schemas};
use crate::GlobalOptions;

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Name of the MySQL database (the MongoDB database name will match)
    database: String,

    /// Maximum number of schemas to show
    #[arg(long, short = 'n', default_value = "5")]
    limit: usize,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Execute the plan command
pub async fn execute(args: PlanArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let source = connect_source(&config, &args.database)?;
    let ranked = synthesize_schemas(&source).await?;

    match args.output {
        OutputFormat::Json => {
            let plans: Vec<_> = ranked
                .iter()
                .take(args.limit)
                .map(|entry| {
                    serde_json::json!({
                        "schema": &entry.schema,
                        "cost": entry.cost,
                        "steps": &entry.steps,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
        OutputFormat::Text => {
            println!(
                "{} candidate schema(s) for '{}', best first:\n",
                ranked.len(),
                args.database
            );
            for (position, entry) in ranked.iter().take(args.limit).enumerate() {
                println!("{})", position + 1);
                print!("{}", entry.schema);
                println!(
                    "   score {:.3} (storage {:.0} B, loss {:.0} B, refs {})\n",
                    entry.cost.score,
                    entry.cost.data_storage,
                    entry.cost.data_loss,
                    entry.cost.reference_count,
                );
            }
            if ranked.len() > args.limit {
                println!(
                    "... and {} more; raise --limit to see them",
                    ranked.len() - args.limit
                );
            }
        }
    }

    source.disconnect().await?;
    Ok(())
}
