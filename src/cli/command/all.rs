use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{error, info};

use super::{airfares, climate, disasters, electricity, flood, maritime, tides, tourism, Settings};

type Command = fn(&Settings) -> Result<Vec<PathBuf>>;

const LOCAL_COMMANDS: [(&str, Command); 8] = [
    ("tides", tides),
    ("electricity", electricity),
    ("tourism", tourism),
    ("maritime", maritime),
    ("climate", climate),
    ("flood", flood),
    ("disasters", disasters),
    ("airfares", airfares),
];

/// Runs every reshape that needs no network. A failing source does not stop
/// the others.
pub fn all(settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut failed = Vec::new();

    for (name, command) in LOCAL_COMMANDS {
        info!(source = name, "starting");
        match command(settings) {
            Ok(paths) => written.extend(paths),
            Err(e) => {
                error!(source = name, "{:#}", e);
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} sources failed: {}",
            failed.len(),
            LOCAL_COMMANDS.len(),
            failed.join(", ")
        );
    }

    Ok(written)
}
