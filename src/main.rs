mod cli;
mod download;
mod error;
mod output;
mod reading;
mod report;
mod reshape;
mod sources;

use std::process::ExitCode;

use clap::Parser;
use cli::{
    command::{self, Settings},
    Cli, Commands,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings {
        data_dir: cli.data_dir,
        output_dir: cli.output_dir,
        format: cli.format,
    };

    let result = match &cli.command {
        Commands::FetchTides {} => command::fetch_tides(&settings).await,
        Commands::Tides {} => command::tides(&settings),
        Commands::Electricity {} => command::electricity(&settings),
        Commands::Tourism {} => command::tourism(&settings),
        Commands::Maritime {} => command::maritime(&settings),
        Commands::Climate {} => command::climate(&settings),
        Commands::Events { file } => command::events(&settings, file.as_deref()).await,
        Commands::Flood {} => command::flood(&settings),
        Commands::Disasters {} => command::disasters(&settings),
        Commands::Airfares {} => command::airfares(&settings),
        Commands::All {} => command::all(&settings),
    };

    match result {
        Ok(files) => {
            for file in files {
                println!("File saved to `{}`", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
