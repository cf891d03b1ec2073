//! Line-to-message extraction
//!
//! A chat log line looks like
//!
//! ```text
//! [ 2015.01.21 19:32:30 ] Pilot1 > Jita clear?
//! ```
//!
//! [`parse_line`] splits it into timestamp, poster and text;
//! [`MessageExtractor`] turns it into a classified, annotated [`Message`] and
//! records it in the [`History`].
//!
//! # Dropped lines
//!
//! None of these are errors; the extractor just returns `None`:
//!
//! - Missing brackets or `>`, or an unparsable timestamp
//! - Lines older than the expiry window
//! - Lines from rooms that are not watched (unless they are KOS requests or sound tests)

use crate::annotate;
use crate::catalog::LocationCatalog;
use crate::status;
use crate::types::{Message, MessageKey, MessageStatus};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Timestamp format used by the game client.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Prefix that turns a line into a KOS lookup request.
pub const KOS_MARKER: &str = "XXX ";

/// Prefix of the sound test line.
pub const SOUND_TEST_MARKER: &str = "VINTELSOUND_TEST";

/// Same-room messages inspected when a bare "clear" looks for the request it answers.
pub const REQUEST_LOOKBACK: usize = 4;

/// Parse a game timestamp (`2015.01.21 19:32:30`).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// The fields of one chat log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineParts<'a> {
    pub timestamp: DateTime<Utc>,
    pub user: &'a str,
    pub text: &'a str,
}

/// Split `[ timestamp ] user > text`.
pub fn parse_line(line: &str) -> Option<LineParts<'_>> {
    let time_start = line.find('[')? + 1;
    let time_end = line.find(']')?;
    if time_end < time_start {
        return None;
    }
    let timestamp = parse_timestamp(&line[time_start..time_end])?;

    let user_end = time_end + line[time_end..].find('>')?;
    Some(LineParts {
        timestamp,
        user: line[time_end + 1..user_end].trim(),
        text: line[user_end + 1..].trim(),
    })
}

// ============================================
// History
// ============================================

/// Append-ordered log of the messages seen so far.
///
/// Keeps a count per identity so duplicate checks do not scan the log.
#[derive(Debug, Default)]
pub struct History {
    messages: VecDeque<Message>,
    keys: HashMap<MessageKey, usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from messages in append order.
    pub fn from_messages<I: IntoIterator<Item = Message>>(messages: I) -> Self {
        let mut history = Self::new();
        for message in messages {
            history.push(message);
        }
        history
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.iter()
    }

    /// The messages in append order.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into()
    }

    pub fn contains(&self, key: &MessageKey) -> bool {
        self.keys.contains_key(key)
    }

    pub fn push(&mut self, message: Message) {
        *self.keys.entry(message.key()).or_insert(0) += 1;
        self.messages.push_back(message);
    }

    fn pop_front(&mut self) -> Option<Message> {
        let message = self.messages.pop_front()?;
        let key = message.key();
        if let Some(count) = self.keys.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                self.keys.remove(&key);
            }
        }
        Some(message)
    }

    /// Systems of the latest open request in `room`, looking back at most
    /// [`REQUEST_LOOKBACK`] messages of that room. Duplicates do not count.
    pub fn open_request_systems(&self, room: &str) -> Option<&BTreeSet<String>> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.room == room && m.status != MessageStatus::Ignore)
            .take(REQUEST_LOOKBACK)
            .find(|m| m.status == MessageStatus::Request && !m.systems.is_empty())
            .map(|m| &m.systems)
    }

    /// Drop messages older than `expiry_secs`, oldest first.
    ///
    /// Stops at the first message still inside the window. Returns the
    /// expired messages, flagged as old.
    pub fn expire(&mut self, now: DateTime<Utc>, expiry_secs: i64) -> Vec<Message> {
        let mut expired = Vec::new();
        while let Some(front) = self.messages.front() {
            if (now - front.timestamp).num_seconds() <= expiry_secs {
                break;
            }
            if let Some(mut message) = self.pop_front() {
                message.is_old = true;
                expired.push(message);
            }
        }
        expired
    }
}

// ============================================
// MessageExtractor
// ============================================

/// Turns intel-channel lines into messages.
#[derive(Debug, Clone)]
pub struct MessageExtractor {
    rooms: Vec<String>,
    expiry_secs: i64,
}

impl MessageExtractor {
    /// `rooms` are matched case-insensitively.
    pub fn new<I, S>(rooms: I, expiry_secs: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rooms: rooms
                .into_iter()
                .map(|r| r.as_ref().trim().to_lowercase())
                .collect(),
            expiry_secs,
        }
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    pub fn set_rooms<I, S>(&mut self, rooms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rooms = rooms
            .into_iter()
            .map(|r| r.as_ref().trim().to_lowercase())
            .collect();
    }

    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }

    pub fn is_watched(&self, room: &str) -> bool {
        self.rooms.iter().any(|r| r == room)
    }

    /// Extract at most one message from `line`, posted in `room`.
    ///
    /// Annotated messages are appended to `history`; KOS requests and sound
    /// tests are routed straight back without touching it.
    pub fn extract(
        &self,
        line: &str,
        room: &str,
        now: DateTime<Utc>,
        catalog: &LocationCatalog,
        history: &mut History,
    ) -> Option<Message> {
        let parts = parse_line(line)?;
        if (now - parts.timestamp).num_seconds() > self.expiry_secs {
            tracing::trace!(room, timestamp = %parts.timestamp, "Ignoring stale line");
            return None;
        }

        let upper_text = parts.text.to_uppercase();
        if upper_text.starts_with(KOS_MARKER) {
            return Some(Message::new(
                room,
                parts.text,
                parts.timestamp,
                parts.user,
                MessageStatus::KosStatusRequest,
            ));
        }
        if room.starts_with('=') {
            let text = format!("xxx {}", parts.text);
            return Some(Message::new(
                room,
                &text,
                parts.timestamp,
                parts.user,
                MessageStatus::KosStatusRequest,
            ));
        }
        if upper_text.starts_with(SOUND_TEST_MARKER) {
            return Some(Message::new(
                room,
                parts.text,
                parts.timestamp,
                parts.user,
                MessageStatus::SoundTest,
            ));
        }
        if !self.is_watched(room) {
            return None;
        }

        let mut message = Message::new(
            room,
            parts.text,
            parts.timestamp,
            parts.user,
            MessageStatus::Alarm,
        );

        // Happens when someone runs more than one client in the same channel
        if history.contains(&message.key()) {
            message.status = MessageStatus::Ignore;
            tracing::debug!(duplicate = %message, "Ignoring duplicate message");
            history.push(message.clone());
            return Some(message);
        }

        annotate::annotate(&mut message.text, catalog, &mut message.systems);
        message.status = status::classify(&message.text).unwrap_or(MessageStatus::Alarm);

        // A bare "clear" probably answers the last open request in this room
        if message.status == MessageStatus::Clear && message.systems.is_empty() {
            if let Some(systems) = history.open_request_systems(room) {
                message.systems = systems.clone();
            }
        }

        history.push(message.clone());
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 1, 21, 19, 35, 0).unwrap()
    }

    fn catalog() -> LocationCatalog {
        LocationCatalog::from_names(["Jita", "Amarr", "HED-GP"])
    }

    fn extractor() -> MessageExtractor {
        MessageExtractor::new(["Intel"], 1200)
    }

    fn extract(line: &str, room: &str, history: &mut History) -> Option<Message> {
        extractor().extract(line, room, now(), &catalog(), history)
    }

    #[test]
    fn test_parse_line() {
        let parts = parse_line("[ 2015.01.21 19:32:30 ] Pilot1 > Jita clear?").unwrap();
        assert_eq!(parts.user, "Pilot1");
        assert_eq!(parts.text, "Jita clear?");
        assert_eq!(
            parts.timestamp,
            Utc.with_ymd_and_hms(2015, 1, 21, 19, 32, 30).unwrap()
        );
    }

    #[test]
    fn test_parse_line_rejects_malformed() {
        assert!(parse_line("no brackets here").is_none());
        assert!(parse_line("[ yesterday ] Pilot1 > hi").is_none());
        assert!(parse_line("[ 2015.01.21 19:32:30 ] Pilot1 without text").is_none());
        assert!(parse_line("] [ 2015.01.21 19:32:30 > x").is_none());
    }

    #[test]
    fn test_request_with_system() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:30 ] Pilot1 > Jita clear?",
            "intel",
            &mut history,
        )
        .unwrap();
        assert_eq!(message.status, MessageStatus::Request);
        assert_eq!(message.systems.iter().collect::<Vec<_>>(), vec!["JITA"]);
        assert_eq!(message.plain_text, "Jita clear?");
        assert_eq!(message.upper_text, "JITA CLEAR?");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_bare_mention_is_alarm() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:30 ] Pilot1 > HED-GP 2 reds",
            "intel",
            &mut history,
        )
        .unwrap();
        assert_eq!(message.status, MessageStatus::Alarm);
    }

    #[test]
    fn test_stale_line_dropped() {
        let mut history = History::new();
        let old = now() - Duration::seconds(1201);
        let line = format!("[ {} ] Pilot1 > Jita", old.format(TIMESTAMP_FORMAT));
        assert!(extract(&line, "intel", &mut history).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_unwatched_room_dropped() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:30 ] Pilot1 > Jita",
            "trade",
            &mut history,
        );
        assert!(message.is_none());
    }

    #[test]
    fn test_kos_request_any_room() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:31 ] Pilot1 > XXX Pilot2, Pilot3",
            "corp",
            &mut history,
        )
        .unwrap();
        assert_eq!(message.status, MessageStatus::KosStatusRequest);
        assert_eq!(message.kos_pilots(), vec!["Pilot2", "Pilot3"]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_request_room_prefix() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:31 ] Pilot1 > Pilot2",
            "=kos",
            &mut history,
        )
        .unwrap();
        assert_eq!(message.status, MessageStatus::KosStatusRequest);
        assert_eq!(message.plain_text, "xxx Pilot2");
        assert_eq!(message.upper_text, "XXX PILOT2");
    }

    #[test]
    fn test_sound_test() {
        let mut history = History::new();
        let message = extract(
            "[ 2015.01.21 19:32:31 ] Pilot1 > vintelsound_test",
            "anything",
            &mut history,
        )
        .unwrap();
        assert_eq!(message.status, MessageStatus::SoundTest);
    }

    #[test]
    fn test_duplicate_is_ignored() {
        let mut history = History::new();
        let line = "[ 2015.01.21 19:32:30 ] Pilot1 > Jita 5 reds";
        let first = extract(line, "intel", &mut history).unwrap();
        let second = extract(line, "intel", &mut history).unwrap();

        assert_eq!(first.status, MessageStatus::Alarm);
        assert_eq!(second.status, MessageStatus::Ignore);
        assert!(second.systems.is_empty());
        assert_eq!(
            history
                .iter()
                .filter(|m| m.status != MessageStatus::Ignore)
                .count(),
            1
        );
    }

    #[test]
    fn test_clear_backfills_from_open_request() {
        let mut history = History::new();
        extract(
            "[ 2015.01.21 19:32:00 ] Pilot1 > Amarr status",
            "intel",
            &mut history,
        );
        let answer = extract(
            "[ 2015.01.21 19:32:30 ] Pilot2 > clr",
            "intel",
            &mut history,
        )
        .unwrap();
        assert_eq!(answer.status, MessageStatus::Clear);
        assert!(answer.systems.contains("AMARR"));
    }

    #[test]
    fn test_clear_backfill_is_bounded() {
        let mut history = History::new();
        extract(
            "[ 2015.01.21 19:30:00 ] Pilot1 > Amarr status",
            "intel",
            &mut history,
        );
        for i in 0..REQUEST_LOOKBACK {
            let line = format!("[ 2015.01.21 19:31:0{} ] Pilot3 > chatter {}", i, i);
            extract(&line, "intel", &mut history);
        }
        let answer = extract(
            "[ 2015.01.21 19:32:30 ] Pilot2 > clear",
            "intel",
            &mut history,
        )
        .unwrap();
        assert_eq!(answer.status, MessageStatus::Clear);
        assert!(answer.systems.is_empty());
    }

    #[test]
    fn test_clear_backfill_skips_duplicates() {
        let mut history = History::new();
        let lines = [
            "[ 2015.01.21 19:30:00 ] Pilot1 > Amarr status",
            "[ 2015.01.21 19:31:00 ] Pilot3 > chatter a",
            "[ 2015.01.21 19:31:10 ] Pilot3 > chatter b",
        ];
        // two clients in the same channel log every line twice
        for line in lines {
            extract(line, "intel", &mut history);
            extract(line, "intel", &mut history);
        }
        assert_eq!(history.len(), 6);

        let answer = extract(
            "[ 2015.01.21 19:32:30 ] Pilot2 > clr",
            "intel",
            &mut history,
        )
        .unwrap();
        assert_eq!(answer.status, MessageStatus::Clear);
        assert!(answer.systems.contains("AMARR"));
    }

    #[test]
    fn test_history_expire_stops_at_first_fresh() {
        let mut history = History::new();
        for minutes in [30, 25, 5, 1] {
            let ts = now() - Duration::minutes(minutes);
            history.push(Message::new("intel", "x", ts, "p", MessageStatus::Alarm));
        }
        let expired = history.expire(now(), 1200);
        assert_eq!(expired.len(), 2);
        assert!(expired.iter().all(|m| m.is_old));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_key_counts_follow_expiry() {
        let mut history = History::new();
        let ts = now() - Duration::minutes(30);
        let message = Message::new("intel", "x", ts, "p", MessageStatus::Alarm);
        history.push(message.clone());
        history.push(message.clone());
        history.expire(now(), 1200);
        assert!(!history.contains(&message.key()));
    }
}
