//! Per-file tail tracking
//!
//! The game client writes one UTF-16LE log per channel session, named
//! `<room>_<YYYYMMDD>_<HHMMSS>[_<character id>].txt`. Files only ever grow,
//! so the tracker remembers how many lines of each file it has consumed and
//! hands out the rest on the next poll.
//!
//! # Line accounting
//!
//! The consumed count includes the header and the (possibly partial) last
//! line. Each poll re-reads that last line, so a line that was still being
//! written is seen again once complete; duplicate detection downstream makes
//! the re-read harmless.
//!
//! # Failures
//!
//! A file that cannot be read or decoded, and a local-channel file without its
//! listener header, is put on the ignored list and never polled again.

use crate::error::{Error, Result};
use crate::extract::parse_timestamp;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Characters the client appends to the room name in file names
/// (`_YYYYMMDD_HHMMSS_<10-digit id>.txt`).
pub const FILE_SUFFIX_LEN: usize = 31;

/// Local channel names across client languages, lower-case.
pub const LOCAL_ROOM_NAMES: &[&str] = &["local", "lokal", "локальный"];

const LISTENER_MARKER: &str = "Listener:";
const SESSION_MARKER: &str = "Session started:";

fn all_digits(s: &str, len: Option<usize>) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && len.map_or(true, |l| s.len() == l)
}

/// Room name encoded in a chat log file name, lower-case.
///
/// Strips the client's `_date_time[_id]` suffix and the extension. Names that
/// do not follow that pattern lose their last [`FILE_SUFFIX_LEN`] characters.
pub fn derive_room_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parts: Vec<&str> = stem.rsplitn(4, '_').collect();
    let room = match parts.as_slice() {
        [id, time, date, room] if all_digits(id, None) && all_digits(time, Some(6)) && all_digits(date, Some(8)) => {
            room.to_string()
        }
        [time, date, rest @ ..] if !rest.is_empty() && all_digits(time, Some(6)) && all_digits(date, Some(8)) => {
            // rsplitn(4) may have split the room name itself; glue it back
            rest.iter().rev().copied().collect::<Vec<_>>().join("_")
        }
        _ => {
            let chars: Vec<char> = file_name.chars().collect();
            let keep = chars.len().saturating_sub(FILE_SUFFIX_LEN);
            chars[..keep].iter().collect()
        }
    };
    room.to_lowercase()
}

/// Whether `room` is a local channel.
pub fn is_local_room(room: &str) -> bool {
    LOCAL_ROOM_NAMES.contains(&room)
}

/// Decode a UTF-16LE byte buffer.
///
/// A leading byte order mark is dropped, as is a trailing odd byte (the
/// client may be mid-write).
pub fn decode_utf16le(path: &Path, bytes: &[u8]) -> Result<String> {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let text: String = char::decode_utf16(units)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// Tracking state of one chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Lines consumed so far, header included
    pub offset_lines: usize,
    /// Character listening to a local channel
    pub owner_character: Option<String>,
    /// Start of a local channel session
    pub session_start: Option<DateTime<Utc>>,
}

impl FileRecord {
    fn new(offset_lines: usize) -> Self {
        Self {
            offset_lines,
            owner_character: None,
            session_start: None,
        }
    }
}

/// Owner and session start from a local channel header.
fn scan_local_header(lines: &[&str]) -> Option<(String, DateTime<Utc>)> {
    let mut owner = None;
    let mut session = None;
    for line in lines {
        if let Some(pos) = line.find(LISTENER_MARKER) {
            let rest = &line[pos..];
            if let Some(colon) = rest.find(':') {
                owner = Some(rest[colon + 1..].trim().to_string());
            }
        } else if let Some(pos) = line.find(SESSION_MARKER) {
            let rest = &line[pos..];
            if let Some(colon) = rest.find(':') {
                session = parse_timestamp(&rest[colon + 1..]);
            }
        }
        if let (Some(owner), Some(session)) = (&owner, session) {
            return Some((owner.clone(), session));
        }
    }
    None
}

/// Tracks consumed lines for every known chat log.
#[derive(Debug)]
pub struct FileTracker {
    records: BTreeMap<PathBuf, FileRecord>,
    ignored: HashSet<PathBuf>,
    header_lines: usize,
    replay_lines: usize,
}

impl FileTracker {
    pub fn new(header_lines: usize, replay_lines: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            ignored: HashSet::new(),
            header_lines,
            replay_lines,
        }
    }

    pub fn record(&self, path: &Path) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn records(&self) -> impl Iterator<Item = (&Path, &FileRecord)> {
        self.records.iter().map(|(p, r)| (p.as_path(), r))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.contains(path)
    }

    pub fn ignored_paths(&self) -> impl Iterator<Item = &Path> {
        self.ignored.iter().map(PathBuf::as_path)
    }

    /// Start tracking `path` from its current end, without returning any lines.
    ///
    /// Used when picking up existing files at startup; a later [`rewind`](Self::rewind)
    /// replays their tails.
    pub fn track_existing(&mut self, path: &Path) -> Result<()> {
        if self.is_ignored(path) {
            return Ok(());
        }
        self.read_new_lines(path).map(|_| ())
    }

    /// Lines appended to `path` since the previous call.
    ///
    /// The first call for an unknown file assumes only the header has been
    /// written. On error the file is ignored from then on.
    pub fn read_new_lines(&mut self, path: &Path) -> Result<Vec<String>> {
        if self.is_ignored(path) {
            return Ok(Vec::new());
        }
        match self.read_tail(path) {
            Ok(lines) => Ok(lines),
            Err(e) => {
                self.ignored.insert(path.to_path_buf());
                Err(e)
            }
        }
    }

    fn read_tail(&mut self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path)?;
        let content = decode_utf16le(path, &bytes)?;
        let lines: Vec<&str> = content.split('\n').collect();
        let room = derive_room_name(path);

        let header_lines = self.header_lines;
        let record = self
            .records
            .entry(path.to_path_buf())
            .or_insert_with(|| FileRecord::new(header_lines));

        if is_local_room(&room) && record.owner_character.is_none() {
            let (owner, session) =
                scan_local_header(&lines).ok_or_else(|| Error::LocalHeader(path.to_path_buf()))?;
            tracing::debug!(
                path = %path.display(),
                character = %owner,
                session_start = %session,
                "Local channel owner found"
            );
            record.owner_character = Some(owner);
            record.session_start = Some(session);
        }

        let start = record.offset_lines.saturating_sub(1);
        record.offset_lines = record.offset_lines.max(lines.len());

        Ok(lines
            .iter()
            .skip(start)
            .map(|line| line.trim().to_string())
            .collect())
    }

    /// Move every file back so its last `replay_lines` lines are read again.
    ///
    /// Never moves into the header. Returns the new offsets.
    pub fn rewind(&mut self) -> BTreeMap<PathBuf, usize> {
        let mut offsets = BTreeMap::new();
        for (path, record) in self.records.iter_mut() {
            let new_offset = record
                .offset_lines
                .saturating_sub(self.replay_lines)
                .max(self.header_lines);
            tracing::info!(
                path = %path.display(),
                lines = record.offset_lines.saturating_sub(new_offset),
                "Rewinding log file"
            );
            record.offset_lines = new_offset;
            offsets.insert(path.clone(), new_offset);
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    pub(crate) fn encode(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn header(lines: usize) -> String {
        (0..lines).map(|i| format!("header {}\n", i)).collect()
    }

    #[test]
    fn test_derive_room_name() {
        assert_eq!(
            derive_room_name(Path::new("North Provi Intel_20140913_200737.txt")),
            "north provi intel"
        );
        assert_eq!(
            derive_room_name(Path::new("/logs/Delve_Intel_20230101_120000_1234567890.txt")),
            "delve_intel"
        );
        assert_eq!(
            derive_room_name(Path::new("Local_20230101_120000_1234567890.txt")),
            "local"
        );
        assert_eq!(
            derive_room_name(Path::new("my_room_20230101_120000.txt")),
            "my_room"
        );
    }

    #[test]
    fn test_derive_room_name_fallback() {
        let name = format!("Corp{}", "x".repeat(FILE_SUFFIX_LEN));
        assert_eq!(derive_room_name(Path::new(&name)), "corp");
        assert_eq!(derive_room_name(Path::new("short.txt")), "");
    }

    #[test]
    fn test_is_local_room() {
        assert!(is_local_room("local"));
        assert!(is_local_room("lokal"));
        assert!(is_local_room("локальный"));
        assert!(!is_local_room("intel"));
    }

    #[test]
    fn test_decode_utf16le() {
        let path = Path::new("x.txt");
        assert_eq!(decode_utf16le(path, &encode("héllo")).unwrap(), "héllo");

        let mut odd = encode("ab");
        odd.push(0x41);
        assert_eq!(decode_utf16le(path, &odd).unwrap(), "ab");

        // unpaired surrogate
        let bad = [0x00, 0xD8, 0x41, 0x00];
        assert!(matches!(
            decode_utf16le(path, &bad),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_new_file_skips_header_and_tails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Intel_20150121_193000.txt");
        let mut content = header(12);
        content.push_str("line a\n");
        std::fs::write(&path, encode(&content)).unwrap();

        let mut tracker = FileTracker::new(13, 500);
        let lines = tracker.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["line a", ""]);
        assert_eq!(tracker.record(&path).unwrap().offset_lines, 14);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        let more: Vec<u8> = encode("line b\nline c\n").split_off(2);
        file.write_all(&more).unwrap();

        let lines = tracker.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["line b", "line c", ""]);
        assert!(tracker.read_new_lines(&path).unwrap() == vec![""]);
    }

    #[test]
    fn test_rewind_bounded_by_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Intel_20150121_193000.txt");
        let mut content = header(12);
        for i in 0..20 {
            content.push_str(&format!("line {}\n", i));
        }
        std::fs::write(&path, encode(&content)).unwrap();

        let mut tracker = FileTracker::new(13, 5);
        tracker.track_existing(&path).unwrap();
        assert_eq!(tracker.record(&path).unwrap().offset_lines, 33);

        let offsets = tracker.rewind();
        assert_eq!(offsets.get(&path), Some(&28));
        let lines = tracker.read_new_lines(&path).unwrap();
        assert_eq!(lines, vec!["line 15", "line 16", "line 17", "line 18", "line 19", ""]);

        let mut tracker = FileTracker::new(13, 500);
        tracker.track_existing(&path).unwrap();
        assert_eq!(tracker.rewind().get(&path), Some(&13));
    }

    #[test]
    fn test_unreadable_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Intel_20150121_193000.txt");
        std::fs::write(&path, [0x00, 0xD8, 0x41, 0x00]).unwrap();

        let mut tracker = FileTracker::new(13, 500);
        assert!(tracker.read_new_lines(&path).is_err());
        assert!(tracker.is_ignored(&path));
        assert!(tracker.read_new_lines(&path).unwrap().is_empty());

        let missing = dir.path().join("Gone_20150121_193000.txt");
        assert!(matches!(
            tracker.read_new_lines(&missing),
            Err(Error::Io(_))
        ));
        assert!(tracker.is_ignored(&missing));
    }

    #[test]
    fn test_local_header_scanned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Local_20150121_193000_1234567890.txt");
        let content = "\n\n  ---\n  Channel ID:      local\n  Channel Name:    Local\n  Listener:        Pilot One\n  Session started: 2015.01.21 19:30:00\n  ---\n";
        std::fs::write(&path, encode(content)).unwrap();

        let mut tracker = FileTracker::new(13, 500);
        tracker.read_new_lines(&path).unwrap();
        let record = tracker.record(&path).unwrap();
        assert_eq!(record.owner_character.as_deref(), Some("Pilot One"));
        assert_eq!(
            record.session_start,
            parse_timestamp("2015.01.21 19:30:00")
        );
    }

    #[test]
    fn test_local_without_header_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Local_20150121_193000_1234567890.txt");
        std::fs::write(&path, encode("[ 2015.01.21 19:32:30 ] EVE System > hi\n")).unwrap();

        let mut tracker = FileTracker::new(13, 500);
        assert!(matches!(
            tracker.read_new_lines(&path),
            Err(Error::LocalHeader(_))
        ));
        assert!(tracker.is_ignored(&path));
        assert!(tracker.record(&path).is_some());
    }
}
