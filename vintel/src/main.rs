//! vintel-watch - tail EVE chat logs and print intel as it arrives
//!
//! Discovers the game client's chat logs, replays their recent tails, then
//! polls for appended lines and prints every extracted message.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Catalog: $XDG_DATA_HOME/vintel/systems.json (~/.local/share/vintel/systems.json)
//! - Logs: $XDG_STATE_HOME/vintel/vintel.<date>.log (~/.local/state/vintel/)
//! - Config: $XDG_CONFIG_HOME/vintel/config.toml (~/.config/vintel/config.toml)

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vintel_core::{
    list_chat_logs, ChatEngine, Config, LocationCatalog, Message, MessageStatus, PollResult,
    SystemClock,
};

#[derive(Parser)]
#[command(name = "vintel-watch")]
#[command(about = "Tail EVE chat logs and print intel messages")]
#[command(version)]
struct Args {
    /// Chat log directory (overrides config)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Location catalog JSON file (overrides config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Intel room to watch; repeat for several (overrides config)
    #[arg(short, long = "room")]
    rooms: Vec<String>,

    /// Replay recent history and exit instead of watching
    #[arg(long)]
    once: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    poll: u64,

    /// Print messages as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose output (-v duplicates, expiry and debug logs; -vv discovered files and trace logs)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// One printed message in `--json` mode.
#[derive(Serialize)]
struct MessageLine<'a> {
    timestamp: String,
    room: &'a str,
    user: &'a str,
    status: MessageStatus,
    text: &'a str,
    systems: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    kos_pilots: Vec<String>,
}

impl<'a> From<&'a Message> for MessageLine<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            timestamp: message
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            room: &message.room,
            user: &message.user,
            status: message.status,
            text: &message.plain_text,
            systems: &message.systems,
            kos_pilots: message.kos_pilots(),
        }
    }
}

fn main() -> Result<()> {
    let mut args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(dir) = args.log_dir.take() {
        config.chat.log_dir = Some(dir);
    }
    if let Some(path) = args.catalog.take() {
        config.catalog.path = Some(path);
    }
    if !args.rooms.is_empty() {
        config.chat.rooms = std::mem::take(&mut args.rooms);
    }

    let log_guard = vintel_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;
    tracing::info!("vintel-watch starting");

    let catalog = load_catalog(&config.catalog_path())?;
    let clock = Arc::new(SystemClock::with_offset_secs(config.chat.time_offset_secs));
    let mut engine = ChatEngine::new(config.chat.clone(), catalog, clock);

    let log_dir = config.log_dir();
    let tracked = engine
        .discover(&log_dir)
        .with_context(|| format!("failed to scan {}", log_dir.display()))?;

    if !args.json {
        println!("Chat logs: {}", log_dir.display());
        println!("Logs: {}", log_guard.log_dir().display());
        println!(
            "Watching {} room(s), {} recent file(s)",
            engine.rooms().len(),
            tracked.len()
        );
    }
    if args.verbose > 1 {
        for path in &tracked {
            eprintln!("  - {}", path.display());
        }
    }

    let replayed = engine.replay();
    print_result(&replayed, &args)?;

    if args.once {
        tracing::info!(messages = replayed.messages.len(), "Replay complete");
        return Ok(());
    }

    run_watch_mode(&mut engine, &log_dir, &args)
}

/// Load the location catalog, or fall back to an empty one if the file is missing.
fn load_catalog(path: &Path) -> Result<LocationCatalog> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "No location catalog, locations will not be recognized");
        eprintln!("warning: no location catalog at {}", path.display());
        return Ok(LocationCatalog::default());
    }
    LocationCatalog::load(path)
        .with_context(|| format!("failed to load location catalog {}", path.display()))
}

/// Poll the log directory until Ctrl+C.
fn run_watch_mode(engine: &mut ChatEngine, log_dir: &Path, args: &Args) -> Result<()> {
    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let poll_duration = Duration::from_millis(args.poll);
    if !args.json {
        println!(
            "Watch mode active (poll every {}ms). Press Ctrl+C to stop.",
            args.poll
        );
    }

    // Sizes seen so far; only files that change afterwards are polled
    let mut sizes: HashMap<PathBuf, u64> = HashMap::new();
    for path in list_chat_logs(log_dir)? {
        if let Ok(metadata) = std::fs::metadata(&path) {
            sizes.insert(path, metadata.len());
        }
    }

    while running.load(Ordering::SeqCst) {
        let paths = match list_chat_logs(log_dir) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list chat logs");
                Vec::new()
            }
        };

        for path in paths {
            let Ok(size) = std::fs::metadata(&path).map(|m| m.len()) else {
                continue;
            };
            if sizes.get(&path) == Some(&size) {
                continue;
            }
            sizes.insert(path.clone(), size);

            let result = engine.on_file_changed(&path);
            print_result(&result, args)?;
        }

        let expired = engine.expire_now();
        if args.verbose > 0 && !expired.is_empty() {
            eprintln!("Expired {} message(s)", expired.len());
        }

        thread::sleep(poll_duration);
    }

    tracing::info!("vintel-watch stopped");
    Ok(())
}

fn print_result(result: &PollResult, args: &Args) -> Result<()> {
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for message in &result.messages {
        if message.status == MessageStatus::Ignore && args.verbose == 0 {
            continue;
        }
        if args.json {
            let line = serde_json::to_string(&MessageLine::from(message))
                .context("failed to serialize message")?;
            println!("{}", line);
        } else {
            println!("{}", format_message(message));
        }
    }
    Ok(())
}

fn format_message(message: &Message) -> String {
    let time = message.timestamp.format("%H:%M:%S");
    let systems = if message.systems.is_empty() {
        String::new()
    } else {
        format!(
            " [{}]",
            message.systems.iter().cloned().collect::<Vec<_>>().join(", ")
        )
    };

    match message.status {
        MessageStatus::Location => format!(
            "{} {:<8} {} is now in{}",
            time, message.status, message.user, systems
        ),
        _ => format!(
            "{} {:<8} {} {}: {}{}",
            time, message.status, message.room, message.user, message.plain_text, systems
        ),
    }
}
