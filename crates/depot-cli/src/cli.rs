use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "Save and load back-office records, keeping working offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Remote API base URL (overrides DEPOT_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a record, or update one when --id is given
    Save {
        /// Collection name (e.g. clients, vehicles)
        collection: String,
        /// Record fields as a JSON object, or `-` to read stdin
        data: String,
        /// Update the record with this ID instead of creating one
        #[arg(long)]
        id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every record of a collection
    #[command(alias = "list")]
    Load {
        /// Collection name
        collection: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single record
    Get {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record
    Delete {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },
    /// Push pending local writes, then reload every collection
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether the remote API is reachable
    Health,
    /// List records whose last write has not reached the remote
    Pending {
        /// Only show this collection
        collection: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List known collection names and the remote resources behind them
    Collections {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the foreground until interrupted
    Run,
}
