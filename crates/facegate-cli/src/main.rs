use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facegate", about = "Face template enrollment and matching")]
struct Cli {
    /// Template store path (overrides FACEGATE_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a captured sample is usable, without matching it
    Validate {
        /// JSON capture: a descriptor array or a landmark object
        #[arg(short, long)]
        sample: PathBuf,
    },
    /// Enroll (or re-enroll) a user's face template
    Enroll {
        #[arg(short, long)]
        user: String,
        /// One or more captures; descriptors accumulate, at most one landmark sample
        #[arg(short, long, required = true)]
        sample: Vec<PathBuf>,
    },
    /// Delete a user's template
    Remove {
        #[arg(short, long)]
        user: String,
    },
    /// List enrolled users
    List,
    /// Mark a user's account active
    Activate {
        #[arg(short, long)]
        user: String,
    },
    /// Mark a user's account inactive
    Deactivate {
        #[arg(short, long)]
        user: String,
    },
    /// Match a capture against enrolled templates
    Verify {
        #[arg(short, long)]
        sample: PathBuf,
        /// Compare against this user only instead of scanning every template
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    tracing::debug!(store = %config.store_path.display(), "configuration loaded");

    let output = match cli.command {
        Commands::Validate { sample } => commands::validate_sample(&sample).await?,
        Commands::Enroll { user, sample } => commands::enroll(&config, &user, &sample).await?,
        Commands::Remove { user } => commands::remove(&config, &user)?,
        Commands::List => commands::list(&config)?,
        Commands::Activate { user } => commands::set_active(&config, &user, true)?,
        Commands::Deactivate { user } => commands::set_active(&config, &user, false)?,
        Commands::Verify { sample, user } => commands::verify(&config, &sample, user).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
