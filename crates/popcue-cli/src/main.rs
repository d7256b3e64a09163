use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "popcue", version, about = "Popcue trigger engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines signal script on a virtual clock
    Simulate(commands::simulate::SimulateArgs),
    /// Print the stored session snapshot as JSON
    Status {
        /// Session database (defaults to ~/.config/popcue/session.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Remove every stored session key
    Clear {
        /// Session database (defaults to ~/.config/popcue/session.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("POPCUE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Status { db } => commands::session::status(db.as_deref()),
        Commands::Clear { db } => commands::session::clear(db.as_deref()),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
