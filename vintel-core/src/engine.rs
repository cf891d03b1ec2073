//! Chat engine: ties file tailing, extraction and location tracking together
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │  Chat logs   │ ──► │ FileTracker │ ──► │ MessageExtractor │ ──► History
//! │ (UTF-16LE)   │     │  (new lines)│     │ LocationTracker  │ ──► locations
//! └──────────────┘     └─────────────┘     └──────────────────┘
//! ```
//!
//! The engine is single-threaded: callers serialize [`ChatEngine::on_file_changed`]
//! calls across files. It never fails on a single bad file; the file is ignored
//! from then on and a [`FileWarning`] is returned once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut engine = ChatEngine::new(config.chat.clone(), catalog, clock);
//! engine.discover(&config.log_dir())?;
//! let startup = engine.replay();
//!
//! // later, whenever a log grows
//! let result = engine.on_file_changed(&path);
//! for message in &result.messages {
//!     println!("{}", message);
//! }
//! ```

use crate::catalog::LocationCatalog;
use crate::clock::Clock;
use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::extract::{History, MessageExtractor};
use crate::location::{LocationRecord, LocationTracker};
use crate::tracker::{derive_room_name, is_local_room, FileTracker};
use crate::types::Message;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Shortest line worth parsing, in characters.
const MIN_LINE_LEN: usize = 3;

/// A file that failed and is now ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWarning {
    pub path: PathBuf,
    pub message: String,
}

impl FileWarning {
    fn new(path: &Path, error: &Error) -> Self {
        Self {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for FileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Output of one poll.
#[derive(Debug, Default)]
pub struct PollResult {
    /// Messages produced, in line order
    pub messages: Vec<Message>,
    /// Files that failed during this poll
    pub warnings: Vec<FileWarning>,
}

impl PollResult {
    fn merge(&mut self, other: PollResult) {
        self.messages.extend(other.messages);
        self.warnings.extend(other.warnings);
    }
}

fn is_worth_parsing(line: &str) -> bool {
    line.chars().count() >= MIN_LINE_LEN
}

/// Chat log files (`*.txt`) directly inside `dir`, sorted by path.
pub fn list_chat_logs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::escape(&dir.to_string_lossy()) + "/*.txt";
    let entries = glob::glob(&pattern)
        .map_err(|e| Error::Config(format!("Invalid log directory pattern: {}", e)))?;
    let mut paths: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
    paths.sort();
    Ok(paths)
}

/// Owns all pipeline state for one set of chat logs.
pub struct ChatEngine {
    extractor: MessageExtractor,
    catalog: LocationCatalog,
    clock: Arc<dyn Clock>,
    files: FileTracker,
    history: History,
    locations: LocationTracker,
    startup_max_age: Duration,
}

impl ChatEngine {
    pub fn new(config: ChatConfig, catalog: LocationCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            extractor: MessageExtractor::new(config.normalized_rooms(), config.expiry_secs),
            catalog,
            clock,
            files: FileTracker::new(config.header_lines, config.replay_lines),
            history: History::new(),
            locations: LocationTracker::new(),
            startup_max_age: Duration::from_secs(config.startup_max_age_secs),
        }
    }

    /// Current game time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start tracking every recently modified chat log in `dir`.
    ///
    /// Files are picked up at their current end; call [`replay`](Self::replay)
    /// to process their tails. Returns the tracked paths.
    pub fn discover(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut tracked = Vec::new();
        for path in list_chat_logs(dir)? {
            let age = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map(|t| t.elapsed().unwrap_or(Duration::ZERO));
            match age {
                Ok(age) if age <= self.startup_max_age => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat chat log");
                    continue;
                }
            }

            match self.files.track_existing(&path) {
                Ok(()) => tracked.push(path),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring chat log");
                }
            }
        }
        tracing::info!(dir = %dir.display(), count = tracked.len(), "Discovered chat logs");
        Ok(tracked)
    }

    /// Process the lines appended to `path` since the last call.
    pub fn on_file_changed(&mut self, path: &Path) -> PollResult {
        let mut result = PollResult::default();
        if self.files.is_ignored(path) {
            return result;
        }

        let lines = match self.files.read_new_lines(path) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read chat log, ignoring it");
                result.warnings.push(FileWarning::new(path, &e));
                return result;
            }
        };

        let room = derive_room_name(path);
        let lines = lines.iter().filter(|line| is_worth_parsing(line));

        if is_local_room(&room) {
            let Some(owner) = self
                .files
                .record(path)
                .and_then(|r| r.owner_character.clone())
            else {
                return result;
            };
            self.locations.register(&owner);
            result
                .messages
                .extend(lines.filter_map(|line| self.locations.apply(&owner, line)));
        } else {
            let now = self.clock.now();
            for line in lines {
                if let Some(message) =
                    self.extractor
                        .extract(line, &room, now, &self.catalog, &mut self.history)
                {
                    result.messages.push(message);
                }
            }
        }

        tracing::trace!(
            path = %path.display(),
            messages = result.messages.len(),
            "Processed chat log"
        );
        result
    }

    /// Move every tracked file back by the replay window. Returns the new offsets.
    pub fn rewind(&mut self) -> BTreeMap<PathBuf, usize> {
        self.files.rewind()
    }

    /// Rewind, then process the replayed tail of every tracked file.
    ///
    /// Files are read one after another, so the replayed messages and the
    /// history are re-sorted by timestamp afterwards. Expiry relies on the
    /// history being in time order.
    pub fn replay(&mut self) -> PollResult {
        let mut result = PollResult::default();
        for path in self.rewind().into_keys() {
            result.merge(self.on_file_changed(&path));
        }
        result.messages.sort_by_key(|m| m.timestamp);

        let mut messages = self.replace_history(History::new()).into_messages();
        messages.sort_by_key(|m| m.timestamp);
        self.history = History::from_messages(messages);

        tracing::info!(messages = result.messages.len(), "Replayed chat logs");
        result
    }

    /// Drop history entries older than the expiry window at `now`.
    ///
    /// Returns the dropped messages, marked old.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<Message> {
        self.history.expire(now, self.extractor.expiry_secs())
    }

    pub fn expire_now(&mut self) -> Vec<Message> {
        let now = self.clock.now();
        self.expire(now)
    }

    pub fn set_rooms<I, S>(&mut self, rooms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extractor.set_rooms(rooms);
    }

    pub fn rooms(&self) -> &[String] {
        self.extractor.rooms()
    }

    pub fn set_catalog(&mut self, catalog: LocationCatalog) {
        tracing::info!(locations = catalog.len(), "Location catalog replaced");
        self.catalog = catalog;
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    /// Swap in a new history, returning the old one.
    pub fn replace_history(&mut self, history: History) -> History {
        std::mem::replace(&mut self.history, history)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn location_of(&self, character: &str) -> Option<&LocationRecord> {
        self.locations.location_of(character)
    }

    pub fn known_characters(&self) -> Vec<&str> {
        self.locations.known_characters()
    }

    pub fn reset_locations(&mut self) {
        self.locations.reset();
    }

    pub fn tracked_paths(&self) -> Vec<&Path> {
        self.files.records().map(|(path, _)| path).collect()
    }

    pub fn ignored_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.files.ignored_paths().collect();
        paths.sort();
        paths
    }
}
