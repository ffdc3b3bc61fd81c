//! Notefs Server Binary
//!
//! `init` seeds a fresh store (empty root, default branch, first user);
//! `serve` runs the HTTP server over it.

use clap::{Parser, Subcommand};
use notefs::branch::BranchRegistry;
use notefs::config::Config;
use notefs::fs::Notefs;
use notefs::server::{self, AppState};
use notefs::users::{UserProfile, Users};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "notefsd", about = "Persistent copy-on-write file store server")]
struct Cli {
    /// Path to a configuration file (defaults to ./notefs.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the store with an empty root, a default branch and an
    /// initial user subscribed to it
    Init {
        #[arg(long, default_value = "main")]
        branch: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Run the HTTP server
    Serve {
        /// Listen address, overriding the configured one
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    notefs::logging::init(&config.logging)?;

    std::fs::create_dir_all(&config.storage.path)?;
    let db = sled::open(&config.storage.path)?;
    let fs = Notefs::open(&db)?;
    let branches = BranchRegistry::open(&db)?;
    let users = Users::open(&db)?;

    match cli.command {
        Command::Init {
            branch,
            user,
            password,
        } => {
            let now = chrono::Utc::now().timestamp_millis();
            let root = fs.create_root(now)?;
            branches.create(1, &branch, root)?;
            users.create(&UserProfile {
                id: 1,
                name: user.clone(),
                password,
            })?;
            users.subscribe(1, 1)?;
            println!(
                "initialized store at {} (branch {branch} -> root {root}, user {user})",
                config.storage.path.display()
            );
        }
        Command::Serve { listen } => {
            let listen = listen.unwrap_or(config.server.listen);
            let state = AppState {
                fs: Arc::new(fs),
                branches: Arc::new(branches),
                users: Arc::new(users),
            };
            server::serve(state, &listen).await?;
        }
    }
    Ok(())
}
