use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use tracing::instrument;

use super::{Settings, Tables};
use crate::{
    cli::create_spinner,
    download::{fetch_text, http_client},
    output::Audit,
    report::Report,
    sources::events::{events_table, ACCEPT, DATA_SOURCE, FEED_URL},
};

/// Fetches the feed, or reads a saved copy from `file`.
#[instrument(skip_all)]
pub async fn events(settings: &Settings, file: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut report = Report::new(DATA_SOURCE);

    let xml = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let client = http_client()?;
            let bar = create_spinner("Fetching EventFinda feed...".to_string());
            let fetched = fetch_text(&client, FEED_URL, ACCEPT).await;
            bar.finish_and_clear();
            match fetched {
                Ok(xml) => {
                    report.fetch_ok();
                    xml
                }
                Err(e) => {
                    report.fetch_failed(FEED_URL, format!("{:#}", e));
                    report.summarise();
                    return Err(e);
                }
            }
        }
    };

    let audit = Audit::new(DATA_SOURCE, report.loaded_at).url(FEED_URL);
    let mut tables = Tables::default();
    tables.add("RSS feed", events_table(&xml, &audit, &mut report));

    tables.finish(settings, report)
}
