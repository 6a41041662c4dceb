use std::path::PathBuf;
use std::sync::Arc;

use clamp_client::ClampClient;
use clamp_ledger::SqliteLedger;
use clamp_points::QdrantPointStore;
use clamp_types::ClampError;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "clamp", about = "Git-like version control for vector database collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Path to the control-plane database
    #[arg(long, default_value = "~/.clamp/db.sqlite")]
    db_path: String,

    /// Qdrant HTTP endpoint
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the control-plane database
    Init {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// List all versioned groups
    Groups {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show commit history for a group
    History {
        group: String,

        /// Maximum number of commits to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show deployment status and point counts for a group
    Status {
        group: String,

        /// Qdrant collection name
        #[arg(short, long)]
        collection: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Roll a group back to an earlier commit
    Rollback {
        group: String,

        /// Full or abbreviated commit hash
        commit: String,

        /// Qdrant collection name
        #[arg(short, long)]
        collection: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete a group's commits, deployment, and points
    DeleteGroup {
        group: String,

        /// Qdrant collection name
        #[arg(short, long)]
        collection: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn client_for(store: &StoreArgs) -> anyhow::Result<ClampClient> {
    let ledger = SqliteLedger::connect(expand_home(&store.db_path)).await?;
    let points = QdrantPointStore::new(store.url.clone());
    Ok(ClampClient::new(Arc::new(ledger), Arc::new(points)))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn confirm(prompt: String, force: bool) -> anyhow::Result<bool> {
    if force {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    if !confirmed {
        println!("Aborted");
    }
    Ok(confirmed)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Init { store } => {
            let path = expand_home(&store.db_path);
            SqliteLedger::connect(&path).await?;
            println!("Initialized control plane at {}", path.display());
        }

        Commands::Groups { store } => {
            let client = client_for(&store).await?;
            let groups = client.groups().await?;
            if groups.is_empty() {
                println!("No versioned groups found");
            }
            for group in groups {
                println!("{group}");
            }
        }

        Commands::History { group, limit, store } => {
            let client = client_for(&store).await?;
            let commits = client.history(&group, Some(limit)).await?;
            if commits.is_empty() {
                println!("No commits found for group '{group}'");
                return Ok(());
            }

            let active_hash = client
                .deployment(&group)
                .await?
                .map(|d| d.active_commit_hash);

            println!("\nCommit history for group '{group}':\n");
            for commit in commits {
                let is_active = active_hash.as_deref() == Some(commit.hash.as_str());
                let marker = if is_active { "* " } else { "  " };
                println!("{marker}{}", commit.short_hash().yellow().bold());
                println!("  Author:  {}", commit.author_or_unknown());
                println!("  Date:    {}", commit.timestamp.format("%Y-%m-%d %H:%M:%S"));
                println!("  Message: {}", commit.message);
                if is_active {
                    println!("  {}", "(ACTIVE)".green().bold());
                }
                println!();
            }
        }

        Commands::Status { group, collection, store } => {
            let client = client_for(&store).await?;
            let status = client.status(&collection, &group).await?;
            match status.active_commit_short() {
                None => println!("No deployment found for group '{group}'"),
                Some(short) => {
                    println!("Group:         {}", status.group);
                    println!("Active commit: {}", short.yellow().bold());
                    println!(
                        "Message:       {}",
                        status.message.as_deref().unwrap_or("(unknown)")
                    );
                    println!(
                        "Author:        {}",
                        status.author.as_deref().unwrap_or("Unknown")
                    );
                    if let Some(ts) = status.timestamp {
                        println!("Date:          {}", ts.format("%Y-%m-%d %H:%M:%S"));
                    }
                    println!("Active points: {}", status.active_count);
                    println!("Total points:  {}", status.total_count);
                }
            }
        }

        Commands::Rollback {
            group,
            commit,
            collection,
            force,
            store,
        } => {
            let client = client_for(&store).await?;
            let target = match client.resolve_commit(&group, &commit).await {
                Ok(target) => target,
                Err(err @ ClampError::CommitNotFound { .. }) => {
                    eprintln!("Hint: run `clamp history {group}` to list available commits");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };

            let prompt = format!(
                "Roll back group '{group}' to commit {}?",
                target.short_hash()
            );
            if !confirm(prompt, force)? {
                return Ok(());
            }

            client.rollback(&collection, &group, &target.hash).await?;
            println!(
                "Rolled back group '{group}' to commit {}",
                target.short_hash().yellow().bold()
            );
        }

        Commands::DeleteGroup {
            group,
            collection,
            force,
            store,
        } => {
            let client = client_for(&store).await?;
            let prompt =
                format!("Delete all commits, the deployment, and the points of group '{group}'?");
            if !confirm(prompt, force)? {
                return Ok(());
            }

            client.delete_group(&collection, &group).await?;
            println!("Deleted group '{group}'");
        }
    }
    Ok(())
}
