//! # vintel-core
//!
//! Core library for vintel - a visual intel chat analyzer for EVE Online.
//!
//! This library provides:
//! - Incremental tailing of the game client's UTF-16 chat logs
//! - Message extraction, deduplication and intent classification
//! - Rich-text annotation of ships, links and known locations
//! - Per-character location tracking from local-channel announcements
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through the pipeline in one direction:
//! - **Files:** [`FileTracker`] diffs each chat log against the lines already consumed
//! - **Lines:** [`MessageExtractor`] turns a line into at most one [`Message`],
//!   running the [`annotate`] passes and the [`status`] classifier
//! - **State:** [`ChatEngine`] keeps the message history and feeds local-channel
//!   lines to the [`LocationTracker`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vintel_core::{ChatEngine, Config, LocationCatalog, SystemClock};
//!
//! let config = Config::load().expect("failed to load config");
//! let catalog = LocationCatalog::load(&config.catalog_path()).expect("failed to load catalog");
//! let clock = Arc::new(SystemClock::with_offset_secs(config.chat.time_offset_secs));
//!
//! let mut engine = ChatEngine::new(config.chat.clone(), catalog, clock);
//! engine.discover(&config.log_dir()).expect("failed to scan log directory");
//! for message in engine.replay().messages {
//!     println!("{}", message);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use catalog::{LocationCatalog, LocationEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ChatConfig, Config};
pub use engine::{list_chat_logs, ChatEngine, FileWarning, PollResult};
pub use error::{Error, Result};
pub use extract::{History, MessageExtractor};
pub use location::{LocationRecord, LocationTracker};
pub use tracker::{derive_room_name, is_local_room, FileRecord, FileTracker};
pub use types::*;

// Public modules
pub mod annotate;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod location;
pub mod logging;
pub mod status;
pub mod tracker;
pub mod types;
