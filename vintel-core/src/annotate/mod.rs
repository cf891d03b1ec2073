//! Rich-text annotation of chat messages
//!
//! A message body is a [`RichText`]: an ordered list of segments, of which
//! only the plain runs are still open for scanning. Each pass looks for one
//! match in the plain runs, splits the run around it and reports whether it
//! changed anything. Splitting restructures the segment list, so callers
//! re-run a pass until it reports `false`.
//!
//! ## Passes
//!
//! | Pass | Module | Marks |
//! |------|--------|-------|
//! | Ships | [`ships`] | Known hull names, with an optional plural `s` |
//! | URLs | [`urls`] | `http://` and `https://` links |
//! | Locations | [`locations`] | Names and 2-4 character abbreviations from the catalog |

pub mod locations;
pub mod ships;
pub mod urls;

pub use locations::mark_location;
pub use ships::mark_ship;
pub use urls::mark_url;

use crate::catalog::LocationCatalog;
use crate::types::RichText;
use std::collections::BTreeSet;

/// Upper bound on the matches a single pass may apply to one message.
pub const MAX_PASS_ITERATIONS: usize = 100;

/// Run `pass` until it stops finding matches.
///
/// Returns `false` when the iteration cap was hit before the text settled.
pub fn run_to_fixed_point<F>(pass_name: &str, text: &mut RichText, mut pass: F) -> bool
where
    F: FnMut(&mut RichText) -> bool,
{
    for _ in 0..MAX_PASS_ITERATIONS {
        if !pass(text) {
            return true;
        }
    }
    tracing::error!(
        pass = pass_name,
        limit = MAX_PASS_ITERATIONS,
        "Took too long to annotate message"
    );
    false
}

/// Apply the ship, URL and location passes in that order.
///
/// Canonical names of every location marked are added to `systems`.
pub fn annotate(text: &mut RichText, catalog: &LocationCatalog, systems: &mut BTreeSet<String>) {
    run_to_fixed_point("ships", text, mark_ship);
    run_to_fixed_point("urls", text, mark_url);
    run_to_fixed_point("locations", text, |t| mark_location(t, catalog, systems));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    fn catalog() -> LocationCatalog {
        LocationCatalog::from_names(["Jita", "HED-GP", "1DQ1-A", "Amarr"])
    }

    #[test]
    fn test_annotate_all_kinds() {
        let mut text = RichText::new("2 rifters in HED-GP see https://zkillboard.com/kill/1/");
        let mut systems = BTreeSet::new();
        annotate(&mut text, &catalog(), &mut systems);

        assert!(systems.contains("HED-GP"));
        let kinds: Vec<_> = text
            .segments()
            .iter()
            .filter(|s| !matches!(s, Segment::Plain { .. }))
            .collect();
        assert_eq!(kinds.len(), 3);
        assert_eq!(
            text.display_text(),
            "2 rifters in HED-GP see https://zkillboard.com/kill/1/"
        );
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let mut text = RichText::new("Jita Amarr jita 1dq rifter");
        let mut systems = BTreeSet::new();
        let catalog = catalog();
        annotate(&mut text, &catalog, &mut systems);

        assert!(!mark_ship(&mut text));
        assert!(!mark_url(&mut text));
        assert!(!mark_location(&mut text, &catalog, &mut systems));
        assert_eq!(systems.len(), 3);
    }

    #[test]
    fn test_iteration_cap_terminates() {
        let mut text = RichText::new("x");
        let mut calls = 0;
        let settled = run_to_fixed_point("always", &mut text, |_| {
            calls += 1;
            true
        });
        assert!(!settled);
        assert_eq!(calls, MAX_PASS_ITERATIONS);
    }
}
