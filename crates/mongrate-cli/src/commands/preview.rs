//! Preview command - materialize sample rows of one schema to a file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use mongrate_backend::{render_preview, DataMapper, TargetDatabase};

use super::{connect_source, load_config, select_schema, synthesize_schemas};
use crate::GlobalOptions;

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Name of the MySQL database
    database: String,

    /// 1-based index into the ranked schema list (see `mongrate plan`)
    #[arg(long, short = 's', default_value = "1")]
    schema: usize,

    /// Rows sampled per root collection (defaults to the configured value)
    #[arg(long, short = 'n')]
    rows: Option<u32>,

    /// Preview file to write
    #[arg(long, short = 'f', default_value = "preview.json")]
    out: PathBuf,
}

/// Execute the preview command
pub async fn execute(args: PreviewArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;
    let source = connect_source(&config, &args.database)?;
    let ranked = synthesize_schemas(&source).await?;
    let chosen = select_schema(&ranked, args.schema)?;

    // preview never touches the target; an unconnected handle satisfies the
    // mapper's interface
    let target = NullTarget;
    let mapper = DataMapper::new(&source, &target);
    let rows = args.rows.unwrap_or(config.preview.rows);
    let preview = mapper
        .preview(&chosen.schema, rows)
        .await
        .context("preview materialization failed")?;

    let text = render_preview(&preview)?;
    std::fs::write(&args.out, text)
        .with_context(|| format!("cannot write preview file '{}'", args.out.display()))?;
    println!("Preview generated at {}", args.out.display());

    source.disconnect().await?;
    Ok(())
}

/// Target stand-in for preview runs; the mapper never calls it.
struct NullTarget;

impl TargetDatabase for NullTarget {
    fn collection(&self, _name: &str) -> Box<dyn mongrate_backend::TargetCollection> {
        unreachable!("preview mode performs no target I/O")
    }
}
