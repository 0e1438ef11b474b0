//! kolscore CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kolscore", version, about = "Hierarchical KOL quality scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a batch of accounts and write a report
    Score {
        /// Path to a JSON file with an array of accounts
        #[arg(long)]
        accounts: PathBuf,

        /// Keep only the first N tweets per account for scoring
        #[arg(long, default_value = "10")]
        tweets_limit: usize,

        /// Output directory (overrides the configured one)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip writing raw scores to the cross-run history
        #[arg(long)]
        no_history: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Recompute normalization parameters from the accumulated history
    UpdateNormalization {
        /// Directory holding the normalization state
        #[arg(long, default_value = "./outputs")]
        output: PathBuf,
    },

    /// Write the scoring tree structure as JSON
    ExportTree {
        /// Destination file
        #[arg(long, default_value = "tree_structure.json")]
        output: PathBuf,
    },

    /// Create a starter config and sample accounts file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kolscore=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            accounts,
            tweets_limit,
            output,
            no_history,
            config,
        } => commands::score::execute(accounts, tweets_limit, output, no_history, config).await,
        Commands::UpdateNormalization { output } => {
            commands::update_normalization::execute(output)
        }
        Commands::ExportTree { output } => commands::export_tree::execute(output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
