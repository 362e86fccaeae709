mod cli;
mod logging;
mod model;
mod orchestrator;
mod reveal;
mod terminal;
mod transport;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.json || args.text || cfg!(not(feature = "tui"));
    logging::init(args.log_file.as_deref(), is_headless)?;

    match cli::run(args).await {
        // Headless runs report the run outcome through the exit code.
        Ok(succeeded) => {
            if is_headless {
                std::process::exit(if succeeded { 0 } else { 1 });
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
