//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Reshapes New Zealand open data into flat tables
pub struct Cli {
    /// Directory holding the raw source files
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory the output tables are written to
    #[arg(long, global = true, default_value = "processed_data")]
    pub output_dir: PathBuf,

    /// Output file format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download LINZ tide prediction CSVs for the major ports
    FetchTides {},
    /// Reshape tide predictions
    Tides {},
    /// Reshape the MBIE electricity workbook and zone data
    Electricity {},
    /// Reshape Stats NZ tourism exports
    Tourism {},
    /// Reshape Maritime NZ incident reports
    Maritime {},
    /// Reshape NIWA climate station archives
    Climate {},
    /// Fetch and reshape the EventFinda RSS feed
    Events {
        /// Read the feed from a saved file instead of fetching it
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Reshape Waipa flood zones and boundaries
    Flood {},
    /// Reshape ICNZ natural disaster costs
    Disasters {},
    /// Reshape the Kaggle airfares archive
    Airfares {},
    /// Run every local reshape in turn
    All {},
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let bar = ProgressBar::new(size).with_message(message);
    match ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}") {
        Ok(style) => bar.with_style(style.progress_chars("##-")),
        Err(_) => bar,
    }
}
