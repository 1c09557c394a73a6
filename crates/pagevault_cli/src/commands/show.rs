//! Show command implementation.

use super::{display_text, open_registry};
use pagevault_core::{ReadMode, Timestamp};
use serde::Serialize;
use std::path::Path;

/// Text of a page as printed by `show`.
#[derive(Debug, Serialize)]
pub struct ShowResult {
    /// Page name.
    pub page: String,
    /// Read mode used.
    pub mode: String,
    /// Requested point in time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
    /// Page text.
    pub text: String,
    /// Whether this read destroyed the page.
    pub self_destructed: bool,
}

/// Parses a read mode name.
pub fn parse_mode(mode: &str) -> Result<ReadMode, Box<dyn std::error::Error>> {
    match mode {
        "edit" => Ok(ReadMode::Edit),
        "view" => Ok(ReadMode::View),
        "raw" => Ok(ReadMode::Raw),
        "history" => Ok(ReadMode::History),
        other => Err(format!(
            "Unknown read mode '{other}' (expected edit, view, raw or history)"
        )
        .into()),
    }
}

/// Runs the show command.
pub fn run(
    path: &Path,
    page: &str,
    mode: &str,
    at: Option<i64>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let read_mode = parse_mode(mode)?;
    let registry = open_registry(path, false)?;
    let handle = registry.open_existing(page)?;

    let result = match at {
        Some(nanos) => {
            let page_ref = handle.read();
            if read_mode.is_gated() {
                page_ref.state().check_open(page)?;
            }
            let text = page_ref.previous_by_timestamp(Timestamp::from_nanos(nanos))?;
            ShowResult {
                page: page.to_string(),
                mode: mode.to_string(),
                at,
                text: display_text(&text),
                self_destructed: false,
            }
        }
        None => {
            let view = handle.write().read(read_mode)?;
            ShowResult {
                page: page.to_string(),
                mode: mode.to_string(),
                at: None,
                text: display_text(&view.text),
                self_destructed: view.self_destructed,
            }
        }
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print!("{}", result.text);
            if !result.text.ends_with('\n') {
                println!();
            }
            if result.self_destructed {
                eprintln!("Page '{page}' has self-destructed");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse() {
        assert_eq!(parse_mode("edit").unwrap(), ReadMode::Edit);
        assert_eq!(parse_mode("history").unwrap(), ReadMode::History);
        assert!(parse_mode("peek").is_err());
    }
}
