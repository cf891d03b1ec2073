//! Keyword classification of a message's intent.

use crate::types::{MessageStatus, RichText};

/// Whole-run phrases that mean "nothing hostile here".
const CLEAR_PHRASES: &[&str] = &["BLUE", "BLUES ONLY", "ONLY BLUE", "STILL BLUE", "ALL BLUES"];

/// Classify one plain run.
///
/// Returns `None` when the run carries no recognizable modifier.
pub fn classify_run(run: &str) -> Option<MessageStatus> {
    let upper = run.trim().to_uppercase();
    if upper.contains('?') {
        return Some(MessageStatus::Request);
    }
    let words: Vec<&str> = upper.split_whitespace().collect();
    if words.iter().any(|w| *w == "CLEAR" || *w == "CLR") {
        Some(MessageStatus::Clear)
    } else if words.iter().any(|w| *w == "STAT" || *w == "STATUS") {
        Some(MessageStatus::Request)
    } else if CLEAR_PHRASES.contains(&upper.as_str()) {
        Some(MessageStatus::Clear)
    } else {
        None
    }
}

/// Classify an annotated body by its plain runs; the first run that matches wins.
///
/// Callers treat `None` as [`MessageStatus::Alarm`].
pub fn classify(text: &RichText) -> Option<MessageStatus> {
    text.plain_runs().find_map(classify_run)
}
