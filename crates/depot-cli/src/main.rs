//! Depot CLI - save and load back-office records from the terminal
//!
//! Writes go to the remote API when it is reachable and stay in the local
//! cache, marked pending, when it is not.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::collections::run_collections;
use crate::commands::common::{resolve_db_path, CliContext};
use crate::commands::delete::run_delete;
use crate::commands::get::run_get;
use crate::commands::health::run_health;
use crate::commands::load::run_load;
use crate::commands::pending::run_pending;
use crate::commands::run::run_foreground;
use crate::commands::save::run_save;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["depot=info", "depot_core=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = CliContext {
        db_path: resolve_db_path(cli.db_path),
        api_url: cli.api_url,
    };

    match cli.command {
        Commands::Save {
            collection,
            data,
            id,
            json,
        } => run_save(&collection, &data, id.as_deref(), json, &context).await?,
        Commands::Load { collection, json } => run_load(&collection, json, &context).await?,
        Commands::Get {
            collection,
            id,
            json,
        } => run_get(&collection, &id, json, &context).await?,
        Commands::Delete { collection, id } => run_delete(&collection, &id, &context).await?,
        Commands::Sync { json } => run_sync(json, &context).await?,
        Commands::Health => run_health(&context).await?,
        Commands::Pending { collection, json } => {
            run_pending(collection.as_deref(), json, &context)?;
        }
        Commands::Collections { json } => run_collections(json)?,
        Commands::Run => run_foreground(&context).await?,
    }

    Ok(())
}
