//! Output formatting for the CLI: human-readable by default, JSON behind
//! the global `--json` flag.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Print a command result to stdout in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    let rendered = if json_mode {
        serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
    } else {
        result.to_human()
    };
    println!("{rendered}");
}

/// Shorten a string to at most `max_len` characters, marking the cut.
/// Counts chars, not bytes, so multibyte names never split mid-character.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// A table with the CLI's standard preset applied.
pub fn base_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer string", 10), "a longe...");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
    }

    #[test]
    fn test_truncate_cuts_on_char_boundaries() {
        assert_eq!(truncate("café", 10), "café");

        let name = format!("{}étiquette", "a".repeat(28));
        let cut = truncate(&name, 32);
        assert_eq!(cut.chars().count(), 32);
        assert!(cut.ends_with("..."));
    }
}
