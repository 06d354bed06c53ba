use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use w90tools_rust::config::Config;

/// Run the tasks of a w90tools config file and print their reports.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML config
    config: PathBuf,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading config `{}`", cli.config.display()))?;
    info!("{}", config.title());
    let reports = config
        .tasks()
        .execute_all()
        .context("running config tasks")?;
    for report in reports {
        println!("{report}");
    }
    Ok(())
}
