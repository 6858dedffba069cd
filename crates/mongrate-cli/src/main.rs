//! Mongrate CLI - relational to document database migration
//!
//! Synthesizes document schemas for a MySQL database, previews them, and
//! runs the migration into MongoDB.
//!
//! # Usage
//!
//! ```bash
//! # Rank candidate document schemas
//! mongrate plan world --mysql-username dev
//!
//! # Write a preview of schema #1 to a file
//! mongrate preview world --schema 1 --out world-preview.json
//!
//! # Migrate using schema #1
//! mongrate migrate world --schema 1
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// Mongrate - document schema synthesis and migration
#[derive(Parser, Debug)]
#[command(name = "mongrate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// MySQL host
    #[arg(long, global = true, env = "MONGRATE_MYSQL_HOST")]
    mysql_host: Option<String>,

    /// MySQL port
    #[arg(long, global = true, env = "MONGRATE_MYSQL_PORT")]
    mysql_port: Option<u16>,

    /// MySQL username
    #[arg(long, short = 'u', global = true, env = "MONGRATE_MYSQL_USER")]
    mysql_username: Option<String>,

    /// MySQL password
    #[arg(long, global = true, env = "MONGRATE_MYSQL_PASSWORD")]
    mysql_password: Option<String>,

    /// MongoDB host
    #[arg(long, global = true, env = "MONGRATE_MONGODB_HOST")]
    mongodb_host: Option<String>,

    /// MongoDB port
    #[arg(long, global = true, env = "MONGRATE_MONGODB_PORT")]
    mongodb_port: Option<u16>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides.
    pub fn to_config_overrides(&self) -> mongrate_config::ConfigOverrides {
        mongrate_config::ConfigOverrides {
            source_host: self.mysql_host.clone(),
            source_port: self.mysql_port,
            source_username: self.mysql_username.clone(),
            source_password: self.mysql_password.clone(),
            target_host: self.mongodb_host.clone(),
            target_port: self.mongodb_port,
            preview_rows: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize and rank document schemas for a database
    Plan(commands::plan::PlanArgs),

    /// Materialize a few rows of a schema into a preview file
    Preview(commands::preview::PreviewArgs),

    /// Migrate the database using a chosen schema
    Migrate(commands::migrate::MigrateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, cli.global).await,
        Commands::Preview(args) => commands::preview::execute(args, cli.global).await,
        Commands::Migrate(args) => commands::migrate::execute(args, cli.global).await,
    }
}

fn init_tracing(global: &GlobalOptions) {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mongrate={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
