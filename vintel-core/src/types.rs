//! Core domain types for vintel
//!
//! These types describe what the pipeline produces from a chat log line.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Room** | A chat channel; its name is derived from the log file name |
//! | **Local** | The per-character channel in which the server announces system changes |
//! | **System** | A location known to the [`LocationCatalog`](crate::LocationCatalog), by canonical upper-case name |
//! | **Segment** | One run of a message body: plain text, or a span already recognized as a ship, link or system |
//! | **KOS** | "Kill on sight" roster lookups requested with the `xxx` prefix |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================
// Status
// ============================================

/// Intent of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Hostiles reported in the mentioned systems (the default reading)
    Alarm,
    /// Mentioned systems reported clear
    Clear,
    /// Someone asks for the status of the mentioned systems
    Request,
    /// Duplicate or otherwise irrelevant; carries no side effects
    Ignore,
    /// `xxx` roster lookup request
    KosStatusRequest,
    /// Sound test marker typed by the user
    SoundTest,
    /// A character changed systems
    Location,
    /// Synthetic message that should not change any system state
    NoChange,
}

impl MessageStatus {
    /// Returns the identifier used in logs and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Alarm => "alarm",
            MessageStatus::Clear => "clear",
            MessageStatus::Request => "request",
            MessageStatus::Ignore => "ignore",
            MessageStatus::KosStatusRequest => "kos_status_request",
            MessageStatus::SoundTest => "sound_test",
            MessageStatus::Location => "location",
            MessageStatus::NoChange => "no_change",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alarm" => Ok(MessageStatus::Alarm),
            "clear" => Ok(MessageStatus::Clear),
            "request" => Ok(MessageStatus::Request),
            "ignore" => Ok(MessageStatus::Ignore),
            "kos_status_request" => Ok(MessageStatus::KosStatusRequest),
            "sound_test" => Ok(MessageStatus::SoundTest),
            "location" => Ok(MessageStatus::Location),
            "no_change" => Ok(MessageStatus::NoChange),
            _ => Err(format!("unknown message status: {}", s)),
        }
    }
}

// ============================================
// Rich text
// ============================================

/// One run of an annotated message body.
///
/// Only [`Segment::Plain`] runs are ever scanned by the annotation passes;
/// the other variants are finished spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Plain { text: String },
    Ship { text: String },
    Url { url: String },
    /// `name` is the canonical catalog name, `label` the token as typed
    Location { name: String, label: String },
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Segment::Plain { text: text.into() }
    }

    /// Text a reader sees for this run.
    pub fn label(&self) -> &str {
        match self {
            Segment::Plain { text } | Segment::Ship { text } => text,
            Segment::Url { url } => url,
            Segment::Location { label, .. } => label,
        }
    }
}

/// A message body as an ordered list of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    segments: Vec<Segment>,
}

impl RichText {
    /// Start from a single plain run (empty input gives no segments).
    pub fn new(text: &str) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::plain(text)]
        };
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over the texts of the plain runs, in order.
    pub fn plain_runs(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Plain { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Concatenation of all plain runs.
    pub fn plain_text(&self) -> String {
        self.plain_runs().collect()
    }

    /// The body as typed: every segment's visible label, in order.
    pub fn display_text(&self) -> String {
        self.segments.iter().map(Segment::label).collect()
    }

    /// Replace the byte range `start..end` of the plain run at `index` with `mark`.
    ///
    /// The surrounding text stays as plain runs; empty runs are dropped.
    pub(crate) fn split_plain(&mut self, index: usize, start: usize, end: usize, mark: Segment) {
        let text = match &self.segments[index] {
            Segment::Plain { text } => text.clone(),
            _ => return,
        };
        let mut replacement = Vec::with_capacity(3);
        if start > 0 {
            replacement.push(Segment::plain(&text[..start]));
        }
        replacement.push(mark);
        if end < text.len() {
            replacement.push(Segment::plain(&text[end..]));
        }
        self.segments.splice(index..=index, replacement);
    }

    /// Render as the HTML-like markup a chat view would display.
    ///
    /// Systems link to `mark_system/<NAME>`, URLs to `link/<url>`.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Plain { text } => out.push_str(&escape_html(text)),
                Segment::Ship { text } => {
                    out.push_str(r#"<span style="color:#d95911;font-weight:bold">"#);
                    out.push_str(&escape_html(text));
                    out.push_str("</span>");
                }
                Segment::Url { url } => {
                    let url = escape_html(url);
                    out.push_str(&format!(
                        r#"<a style="color:#28a5ed;font-weight:bold" href="link/{0}">{0}</a>"#,
                        url
                    ));
                }
                Segment::Location { name, label } => {
                    out.push_str(&format!(
                        r#"<a style="color:#CC8800;font-weight:bold" href="mark_system/{}">{}</a>"#,
                        escape_html(name),
                        escape_html(label)
                    ));
                }
            }
        }
        out
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================
// Message
// ============================================

/// Identity of a message for duplicate detection.
///
/// The same line posted by two game clients of one player produces equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub room: String,
    pub plain_text: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

/// A message extracted from a chat log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Room the message was posted in (lower-case, empty for location updates)
    pub room: String,
    /// Annotated body
    pub text: RichText,
    /// Body as typed, before annotation
    pub plain_text: String,
    /// Upper-case body, used for routing decisions
    pub upper_text: String,
    /// Game time the line was written
    pub timestamp: DateTime<Utc>,
    /// Poster (or, for location updates, the moving character)
    pub user: String,
    /// Canonical names of the systems mentioned
    pub systems: BTreeSet<String>,
    pub status: MessageStatus,
    /// Set when the history expires this message
    pub is_old: bool,
}

impl Message {
    /// Build a message whose body has not been annotated.
    pub fn new(
        room: impl Into<String>,
        text: &str,
        timestamp: DateTime<Utc>,
        user: impl Into<String>,
        status: MessageStatus,
    ) -> Self {
        Self {
            room: room.into(),
            text: RichText::new(text),
            plain_text: text.to_string(),
            upper_text: text.to_uppercase(),
            timestamp,
            user: user.into(),
            systems: BTreeSet::new(),
            status,
            is_old: false,
        }
    }

    /// A message injected by an outer layer (e.g. a roster lookup result).
    ///
    /// It never changes system state.
    pub fn synthetic(
        room: impl Into<String>,
        text: &str,
        timestamp: DateTime<Utc>,
        user: impl Into<String>,
    ) -> Self {
        Self::new(room, text, timestamp, user, MessageStatus::NoChange)
    }

    /// Location update for `character`, who moved to `system`.
    pub fn location(character: &str, system: &str, timestamp: DateTime<Utc>) -> Self {
        let mut message = Self::new("", "", timestamp, character, MessageStatus::Location);
        message.systems.insert(system.to_string());
        message
    }

    /// Identity tuple used for duplicate detection.
    pub fn key(&self) -> MessageKey {
        MessageKey {
            room: self.room.clone(),
            plain_text: self.plain_text.clone(),
            timestamp: self.timestamp,
            user: self.user.clone(),
        }
    }

    /// Pilot names of a KOS request, in the order they were typed.
    ///
    /// Returns an empty list for any other status.
    pub fn kos_pilots(&self) -> Vec<String> {
        if self.status != MessageStatus::KosStatusRequest {
            return Vec::new();
        }
        let names = self.plain_text.get(4..).unwrap_or("").replace("  ", ",");
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Rendered body (see [`RichText::to_html`]).
    pub fn html(&self) -> String {
        self.text.to_html()
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.room == other.room
            && self.plain_text == other.plain_text
            && self.timestamp == other.timestamp
            && self.user == other.user
    }
}

impl Eq for Message {}

impl std::hash::Hash for Message {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.room.hash(state);
        self.plain_text.hash(state);
        self.timestamp.hash(state);
        self.user.hash(state);
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Message(room:{} user:{} timestamp:{} status:{} plain_text:[{}])",
            self.room,
            self.user,
            self.timestamp.format("%Y.%m.%d %H:%M:%S"),
            self.status,
            self.plain_text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 1, 21, 19, 32, 30).unwrap()
    }

    #[test]
    fn test_status_roundtrip_names() {
        for status in [
            MessageStatus::Alarm,
            MessageStatus::Clear,
            MessageStatus::Request,
            MessageStatus::Ignore,
            MessageStatus::KosStatusRequest,
            MessageStatus::SoundTest,
            MessageStatus::Location,
            MessageStatus::NoChange,
        ] {
            assert_eq!(status.as_str().parse::<MessageStatus>(), Ok(status));
        }
        assert!("bogus".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_split_plain_keeps_surrounding_text() {
        let mut text = RichText::new("red rifter here");
        text.split_plain(
            0,
            4,
            10,
            Segment::Ship {
                text: "rifter".to_string(),
            },
        );
        assert_eq!(text.segments().len(), 3);
        assert_eq!(text.plain_text(), "red  here");
        assert_eq!(text.display_text(), "red rifter here");
    }

    #[test]
    fn test_split_plain_drops_empty_runs() {
        let mut text = RichText::new("Jita");
        text.split_plain(
            0,
            0,
            4,
            Segment::Location {
                name: "JITA".to_string(),
                label: "Jita".to_string(),
            },
        );
        assert_eq!(text.segments().len(), 1);
        assert_eq!(text.plain_text(), "");
    }

    #[test]
    fn test_to_html_escapes_and_links() {
        let mut text = RichText::new("a<b Jita");
        text.split_plain(
            0,
            4,
            8,
            Segment::Location {
                name: "JITA".to_string(),
                label: "Jita".to_string(),
            },
        );
        let html = text.to_html();
        assert!(html.starts_with("a&lt;b "));
        assert!(html.contains(r#"href="mark_system/JITA">Jita</a>"#));
    }

    #[test]
    fn test_message_identity_ignores_status() {
        let a = Message::new("intel", "Jita", ts(), "Pilot1", MessageStatus::Alarm);
        let mut b = a.clone();
        b.status = MessageStatus::Ignore;
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let c = Message::new("intel", "Jita", ts(), "Pilot2", MessageStatus::Alarm);
        assert_ne!(a, c);
    }

    #[test]
    fn test_kos_pilots() {
        let message = Message::new(
            "intel",
            "XXX Pilot2, Pilot3  Pilot4,",
            ts(),
            "Pilot1",
            MessageStatus::KosStatusRequest,
        );
        assert_eq!(message.kos_pilots(), vec!["Pilot2", "Pilot3", "Pilot4"]);

        let alarm = Message::new("intel", "XXX Pilot2", ts(), "Pilot1", MessageStatus::Alarm);
        assert!(alarm.kos_pilots().is_empty());
    }

    #[test]
    fn test_location_message() {
        let message = Message::location("Pilot1", "JITA", ts());
        assert_eq!(message.room, "");
        assert_eq!(message.status, MessageStatus::Location);
        assert!(message.systems.contains("JITA"));
    }
}
