use regex::RegexBuilder;
use serde::Serialize;

use crate::error::ExtractError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// 1-based.
    pub line_number: usize,
    pub line: String,
}

/// Case-insensitive literal search; every line containing `term` matches once.
pub fn search_text(text: &str, term: &str) -> Result<Vec<SearchMatch>, ExtractError> {
    if term.is_empty() {
        return Err(ExtractError::InvalidOption(
            "search term cannot be empty".to_string(),
        ));
    }

    let pattern = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .map_err(|error| ExtractError::InvalidOption(format!("invalid search term: {error}")))?;

    Ok(text
        .split('\n')
        .enumerate()
        .filter(|(_, line)| pattern.is_match(line))
        .map(|(index, line)| SearchMatch {
            line_number: index + 1,
            line: line.trim().to_string(),
        })
        .collect())
}
