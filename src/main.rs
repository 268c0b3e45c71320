//! Tumor diagnosis ensemble - main entry point

use clap::Parser;
use ensemble_diagnosis::cli::{cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so reports on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ensemble_diagnosis=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().into_command() {
        Commands::Run(args) => cmd_run(&args)?,
        Commands::Info { data, target } => cmd_info(&data, &target)?,
    }

    Ok(())
}
