//! Location pass.
//!
//! Words are matched against the catalog either exactly or, for 2-4 character
//! words, as an abbreviation of the first catalog entry they prefix.

use crate::catalog::LocationCatalog;
use crate::types::{RichText, Segment};
use std::collections::BTreeSet;

/// Punctuation replaced by spaces before splitting a run into words.
///
/// `?` is kept: it turns a message into a request.
const IGNORED_CHARS: &[char] = &['*', ',', '!', '.', '(', ')'];

/// Common words that collide with system abbreviations.
///
/// Only skipped when typed in lower or mixed case; an all-caps `IN` is still a candidate.
const WORDS_TO_IGNORE: &[&str] = &[
    "IN", "IS", "AS", "OR", "NV", "TO", "ME", "HE", "SHE", "YOU", "ARE", "ON", "HAS", "OF", "IT",
    "GET", "IF", "THE", "HOT", "OH", "OK", "GJ", "AND", "MY", "SAY", "ANY", "NO", "FOR", "OUT",
    "WH", "MAN", "PART", "AT", "AN",
];

/// `words[idx]` names a gate ("X gate"), unless the phrase is "X gate to Y".
fn is_gate_name(words: &[&str], idx: usize) -> bool {
    match words.get(idx + 1) {
        Some(next) if next.eq_ignore_ascii_case("GATE") => !words
            .get(idx + 2)
            .is_some_and(|w| w.eq_ignore_ascii_case("TO")),
        _ => false,
    }
}

/// Canonical name `word` refers to, if any.
fn resolve(word: &str, catalog: &LocationCatalog) -> Option<String> {
    let upper = word.to_uppercase();
    if upper != word && WORDS_TO_IGNORE.contains(&upper.as_str()) {
        return None;
    }
    if let Some(entry) = catalog.get(&upper) {
        return Some(entry.name.clone());
    }
    if (2..=4).contains(&upper.chars().count()) {
        return catalog.first_with_prefix(&upper).map(str::to_string);
    }
    None
}

/// First occurrence of `word` in `run` that stands alone as a word.
fn find_word(run: &str, word: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(pos) = run[from..].find(word) {
        let start = from + pos;
        let end = start + word.len();
        let before_ok = run[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        let after_ok = run[end..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
        if before_ok && after_ok {
            return Some((start, end));
        }
        from = start + run[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Byte range and canonical name of the first location mentioned in `run`.
fn find_location(run: &str, catalog: &LocationCatalog) -> Option<(usize, usize, String)> {
    let cleaned: String = run
        .chars()
        .map(|c| if IGNORED_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();

    for (idx, word) in words.iter().enumerate() {
        if is_gate_name(&words, idx) {
            continue;
        }
        let Some(name) = resolve(word, catalog) else {
            continue;
        };
        match find_word(run, word) {
            Some((start, end)) => return Some((start, end, name)),
            None => {
                tracing::trace!(word = %word, "Location word not found at a word boundary");
            }
        }
    }
    None
}

/// Mark the first location found in a plain run and record its canonical name.
pub fn mark_location(
    text: &mut RichText,
    catalog: &LocationCatalog,
    systems: &mut BTreeSet<String>,
) -> bool {
    let hit = text
        .segments()
        .iter()
        .enumerate()
        .find_map(|(index, segment)| match segment {
            Segment::Plain { text: run } if !run.is_empty() => find_location(run, catalog)
                .map(|(start, end, name)| (index, start, end, name, run[start..end].to_string())),
            _ => None,
        });

    match hit {
        Some((index, start, end, name, label)) => {
            systems.insert(name.clone());
            text.split_plain(index, start, end, Segment::Location { name, label });
            true
        }
        None => false,
    }
}
