//! Parsing of bet creation text

use crate::error::{BetError, Result};
use std::collections::BTreeSet;

pub const BET_USAGE: &str =
    "-bet [Bet Title] | [Option] | [Option] ...\n\nexample: -bet Will we win tonight? | yes | no";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetDraft {
    pub title: String,
    /// Distinct, trimmed, non-empty labels
    pub options: BTreeSet<String>,
}

/// Parse `"<title> | <option> | <option> ..."`
pub fn parse_bet(text: &str) -> Result<BetDraft> {
    let mut parts = text.split('|');

    let title = parts.next().unwrap_or_default().trim().to_string();
    let options: BTreeSet<String> = parts
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect();

    if title.is_empty() || options.is_empty() {
        return Err(BetError::UsageError(BET_USAGE.to_string()));
    }

    Ok(BetDraft { title, options })
}
