//! Command-line front end for the contact directory.
//!
//! # Responsibility
//! - Expose contact, neighbor, recency and search operations as subcommands.
//! - Print every result as JSON on stdout; logs go to files only.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use deliverybook_core::config::{DB_FILE_NAME, DEFAULT_RECENT_LIMIT};
use deliverybook_core::{
    default_log_level, init_logging, ContactDraft, Directory, DirectoryConfig, MutationOutcome,
    SearchStatus,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deliverybook")]
#[command(about = "Contact directory with neighbors, recents and substring search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file
    #[arg(long, global = true, env = "DELIVERYBOOK_DB", default_value = DB_FILE_NAME)]
    db: PathBuf,

    /// Use a throwaway in-memory database instead of `--db`
    #[arg(long, global = true)]
    memory: bool,

    /// Absolute directory for rotating log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update a contact
    Add(AddArgs),
    /// Print one contact
    Show { id: String },
    /// Delete a contact
    Delete { id: String },
    /// Substring search over id, name and address (case-sensitive)
    Search {
        query: String,
        /// Maximum number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Most recently accessed contacts
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: u32,
    },
    /// Total number of contacts
    Count,
    /// Mark a contact as accessed
    Touch {
        id: String,
        /// Unix epoch milliseconds; defaults to now
        #[arg(long)]
        at: Option<i64>,
    },
    /// Remove a contact from the recents list
    Forget { id: String },
    /// Empty the recents list
    #[command(name = "clear-recents")]
    ClearRecents,
    /// Edit a contact's neighbor list
    #[command(subcommand)]
    Neighbor(NeighborCommand),
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    address: String,
    /// Repeat for several neighbors, in order
    #[arg(long = "neighbor")]
    neighbors: Vec<String>,
}

#[derive(Subcommand)]
enum NeighborCommand {
    Add {
        id: String,
        value: String,
    },
    Edit {
        id: String,
        index: usize,
        value: String,
    },
    Rm {
        id: String,
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(default_log_level(), log_dir).context("failed to start logging")?;
    }

    let config = DirectoryConfig::default();
    let directory = if cli.memory {
        Directory::open_in_memory(config)?
    } else {
        Directory::open(&cli.db, config)
            .with_context(|| format!("failed to open `{}`", cli.db.display()))?
    };

    let output = run(&directory, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(directory: &Directory, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Add(args) => {
            let draft = ContactDraft {
                id: args.id,
                name: args.name,
                address: args.address,
                neighbors: args.neighbors,
            };
            outcome(directory.contacts().save(draft).await?)
        }
        Commands::Show { id } => json!(directory.contacts().load(&id).await?),
        Commands::Delete { id } => outcome(directory.contacts().delete(&id).await?),
        Commands::Search { query, pages } => search(directory, query, pages).await?,
        Commands::Recent { limit } => json!(directory.store().recent(limit).await?),
        Commands::Count => json!({ "count": directory.store().count().await? }),
        Commands::Touch { id, at } => {
            let recency = directory.recency();
            let applied = match at {
                Some(at) => recency.mark_accessed_at(&id, at).await?,
                None => recency.mark_accessed(&id).await?,
            };
            outcome(applied)
        }
        Commands::Forget { id } => outcome(directory.recency().remove(&id).await?),
        Commands::ClearRecents => json!({ "cleared": directory.recency().clear_all().await? }),
        Commands::Neighbor(command) => {
            let neighbors = directory.neighbors();
            let applied = match command {
                NeighborCommand::Add { id, value } => neighbors.add_neighbor(&id, &value).await?,
                NeighborCommand::Edit { id, index, value } => {
                    neighbors.update_neighbor(&id, index, &value).await?
                }
                NeighborCommand::Rm { id, index } => neighbors.delete_neighbor(&id, index).await?,
            };
            outcome(applied)
        }
    };
    Ok(value)
}

async fn search(directory: &Directory, query: String, max_pages: u32) -> Result<serde_json::Value> {
    let pipeline = directory.search();
    let mut results = pipeline.subscribe();
    pipeline.set_query(query);

    let mut loaded = 1;
    let settled = loop {
        let current = results
            .wait_for(|results| !matches!(results.status, SearchStatus::Loading))
            .await?
            .clone();
        if let SearchStatus::Failed(err) = &current.status {
            return Err(anyhow!("search failed: {err}"));
        }
        let wants_more = matches!(current.status, SearchStatus::MoreAvailable) && loaded < max_pages;
        if wants_more && pipeline.load_more() {
            loaded += 1;
            continue;
        }
        break current;
    };

    Ok(json!({
        "query": settled.query,
        "active": !matches!(settled.status, SearchStatus::Idle),
        "more_available": matches!(settled.status, SearchStatus::MoreAvailable),
        "items": settled.items,
    }))
}

fn outcome(outcome: MutationOutcome) -> serde_json::Value {
    json!({ "outcome": outcome })
}
