//! Hyperlink pass.

use crate::types::{RichText, Segment};

const URL_PREFIXES: &[&str] = &["http://", "https://"];

/// Earliest link in `run`, as a byte range ending at whitespace or end of run.
fn find_url(run: &str) -> Option<(usize, usize)> {
    let start = URL_PREFIXES.iter().filter_map(|p| run.find(p)).min()?;
    let end = run[start..]
        .find(char::is_whitespace)
        .map(|i| start + i)
        .unwrap_or(run.len());
    Some((start, end))
}

/// Mark the first link found in a plain run.
pub fn mark_url(text: &mut RichText) -> bool {
    let hit = text
        .segments()
        .iter()
        .enumerate()
        .find_map(|(index, segment)| match segment {
            Segment::Plain { text: run } => {
                find_url(run).map(|(start, end)| (index, start, end, run[start..end].to_string()))
            }
            _ => None,
        });

    match hit {
        Some((index, start, end, url)) => {
            text.split_plain(index, start, end, Segment::Url { url });
            true
        }
        None => false,
    }
}
