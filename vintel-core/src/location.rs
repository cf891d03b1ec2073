//! Per-character location tracking from local channel announcements.

use crate::extract::parse_line;
use crate::types::Message;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Posters whose local channel lines announce a system change.
pub const ANNOUNCERS: &[&str] = &["EVE System", "EVE-System"];

/// Placeholder system for a character whose location is not known yet.
pub const UNKNOWN_SYSTEM: &str = "unknown";

/// Where a character was last seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub system: String,
    pub last_update: DateTime<Utc>,
}

impl LocationRecord {
    fn unknown() -> Self {
        Self {
            system: UNKNOWN_SYSTEM.to_string(),
            last_update: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// Current system of every character seen in a local channel.
#[derive(Debug, Default)]
pub struct LocationTracker {
    records: HashMap<String, LocationRecord>,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `character` known with an unknown location, if it is not already.
    pub fn register(&mut self, character: &str) {
        self.records
            .entry(character.to_string())
            .or_insert_with(LocationRecord::unknown);
    }

    /// Feed one local channel line listened to by `character`.
    ///
    /// Returns a location message when the line moves the character. Lines
    /// that are not announcements, have no colon, or are not newer than the
    /// stored location yield `None`.
    pub fn apply(&mut self, character: &str, line: &str) -> Option<Message> {
        let parts = parse_line(line)?;
        if !ANNOUNCERS.contains(&parts.user) {
            return None;
        }
        let Some(system) = parts.text.split(':').nth(1) else {
            tracing::trace!(character, text = parts.text, "Announcement without a system");
            return None;
        };
        let system = system.trim().replace('*', "").to_uppercase();

        let record = self
            .records
            .entry(character.to_string())
            .or_insert_with(LocationRecord::unknown);
        if parts.timestamp <= record.last_update {
            tracing::debug!(
                character,
                system = %system,
                timestamp = %parts.timestamp,
                last_update = %record.last_update,
                "Dropping out-of-order location update"
            );
            return None;
        }

        record.system = system.clone();
        record.last_update = parts.timestamp;
        tracing::debug!(character, system = %system, "Character moved");
        Some(Message::location(character, &system, parts.timestamp))
    }

    pub fn location_of(&self, character: &str) -> Option<&LocationRecord> {
        self.records.get(character)
    }

    /// Known characters, sorted by name.
    pub fn known_characters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}
