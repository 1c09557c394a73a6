//! History command implementation.

use super::open_registry;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// One line of history output.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    /// Nanosecond timestamp of the entry.
    pub timestamp: i64,
    /// Bytes inserted plus deleted.
    pub change_sum: u64,
    /// Whether the revision is a full snapshot (revision listings only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<bool>,
}

/// History of a page.
#[derive(Debug, Serialize)]
pub struct HistoryResult {
    /// Page name.
    pub page: String,
    /// Session gap in seconds, absent for revision listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Entries, newest first.
    pub entries: Vec<HistoryEntry>,
}

/// Runs the history command.
pub fn run(
    path: &Path,
    page: &str,
    interval: Option<u64>,
    revisions: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(path, false)?;
    let handle = registry.open_existing(page)?;
    let page_ref = handle.read();

    let result = if revisions {
        let mut entries: Vec<_> = page_ref
            .revisions()
            .map(|meta| HistoryEntry {
                timestamp: meta.timestamp.as_nanos(),
                change_sum: meta.change_sum,
                snapshot: Some(meta.is_snapshot),
            })
            .collect();
        entries.reverse();
        HistoryResult {
            page: page.to_string(),
            interval_secs: None,
            entries,
        }
    } else {
        let interval = interval
            .map(Duration::from_secs)
            .unwrap_or(registry.config().history_interval);
        let snaps = page_ref.history_with(interval);
        HistoryResult {
            page: page.to_string(),
            interval_secs: Some(interval.as_secs()),
            entries: snaps
                .iter()
                .map(|(timestamp, change_sum)| HistoryEntry {
                    timestamp: timestamp.as_nanos(),
                    change_sum,
                    snapshot: None,
                })
                .collect(),
        }
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &HistoryResult) {
    match result.interval_secs {
        Some(secs) => println!("History of '{}' ({}s sessions)", result.page, secs),
        None => println!("Revisions of '{}'", result.page),
    }
    println!();

    if result.entries.is_empty() {
        println!("  (no history)");
        return;
    }
    for entry in &result.entries {
        let kind = match entry.snapshot {
            Some(true) => " snapshot",
            Some(false) => " delta",
            None => "",
        };
        println!(
            "  {:>20}  {:>8} bytes changed{}",
            entry.timestamp, entry.change_sum, kind
        );
    }
}
