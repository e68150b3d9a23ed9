use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tincan::prelude::*;
use tracing::{error, info};

/// A small, pluggable IRC bot.
#[derive(Parser, Debug)]
#[command(name = "tincan")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file; searched for in the working and user config
    /// directories when omitted
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Configuration profile, loaded from `tincan.<NAME>.toml`; defaults to
    /// `TINCAN_PROFILE`
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder = Bot::builder().catalog(builtin_catalog());
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }

    // Logging is only up once the configuration has been read.
    let bot = match builder.build() {
        Ok(bot) => bot,
        Err(e) => {
            eprintln!("tincan: {e}");
            error!(error = %e, "Failed to start");
            return ExitCode::FAILURE;
        }
    };

    match bot.run_until_signal().await {
        Ok(()) => {
            info!("Bye");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Bot stopped with an error");
            ExitCode::FAILURE
        }
    }
}
