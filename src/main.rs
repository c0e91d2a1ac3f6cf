// ABOUTME: Entry point for duologue — two AI agents in a scripted, turn-based conversation.
// ABOUTME: Parses CLI args, initializes logging, loads config, and launches the app.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use duologue::app::App;
use duologue::config::Config;

#[derive(Debug, Parser)]
#[command(name = "duologue", version, about = "Let two AI agents talk to each other")]
struct Cli {
    /// Config file (default: ~/.duologue/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of rounds (1-500), overrides the config file
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Directory for transcripts, overrides the config file
    #[arg(long)]
    transcript_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_overrides(cli.rounds, cli.transcript_dir);

    App::new(config).run().await
}
