//! Per-command reporting context.
//!
//! A `Report` is created when a command starts and handed `&mut` to every stage
//! that can read, emit or drop data. It replaces module-level logger state: the
//! counts it accumulates are logged once when the command finishes.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Report {
    pub source: String,
    /// One load timestamp per command invocation, shared by every record and table.
    pub loaded_at: NaiveDateTime,
    pub rows_read: usize,
    pub records_emitted: usize,
    pub fetched: usize,
    pub fetch_failed: usize,
    pub files_written: Vec<String>,
    dropped: BTreeMap<&'static str, usize>,
}

impl Report {
    pub fn new(source: impl Into<String>) -> Self {
        Report {
            source: source.into(),
            loaded_at: Local::now().naive_local(),
            rows_read: 0,
            records_emitted: 0,
            fetched: 0,
            fetch_failed: 0,
            files_written: Vec::new(),
            dropped: BTreeMap::new(),
        }
    }

    /// Counts a dropped record without logging it.
    pub fn drop_silently(&mut self, reason: &'static str) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    /// Counts a dropped record and logs the offending value at warn level.
    pub fn drop_record(&mut self, reason: &'static str, detail: impl std::fmt::Display) {
        warn!(source = %self.source, reason, "{}", detail);
        self.drop_silently(reason);
    }

    pub fn dropped(&self, reason: &str) -> usize {
        self.dropped.get(reason).copied().unwrap_or(0)
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn fetch_ok(&mut self) {
        self.fetched += 1;
    }

    pub fn fetch_failed(&mut self, url: &str, error: impl std::fmt::Display) {
        warn!(source = %self.source, url, "fetch failed: {}", error);
        self.fetch_failed += 1;
    }

    pub fn wrote(&mut self, path: impl Into<String>) {
        self.files_written.push(path.into());
    }

    pub fn summarise(&self) {
        info!(
            source = %self.source,
            rows_read = self.rows_read,
            records = self.records_emitted,
            dropped = self.total_dropped(),
            files = self.files_written.len(),
            "finished"
        );
        for (reason, count) in &self.dropped {
            info!(source = %self.source, reason, count, "dropped records");
        }
        if self.fetched + self.fetch_failed > 0 {
            info!(
                source = %self.source,
                ok = self.fetched,
                failed = self.fetch_failed,
                "downloads"
            );
        }
    }
}

// -- Tests -------------------------------------------------------------------
