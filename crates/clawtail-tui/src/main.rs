//! clawtail — entry point.
//!
//! Spawns the watch command, then runs the cooperative frame loop:
//! drain queued lines, classify and store them, redraw, poll one key,
//! repeat at ~12 Hz until quit or interrupt.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use clawtail_tui::app::{App, AppConfig, DisplayConfig};
use clawtail_tui::classify::ClassifierConfig;
use clawtail_tui::ui;
use clawtail_tui::watch::{self, SourceMessage, WatchConfig};

/// Maximum lines drained from the queue in one frame. The sole
/// throttle on processing rate — sustained bursts make the display lag
/// behind real time instead of starving the render loop.
const DRAIN_BATCH: usize = 200;

/// Key-poll timeout, doubling as the frame-rate cap (~12 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// Structured TUI for OpenClaw logs produced by the watch script.
#[derive(Parser)]
#[command(name = "clawtail", version, about)]
struct Cli {
    /// Command to run for log streaming.
    #[arg(long, default_value = "./watch-openclaw-log-tailspin.sh")]
    watch_cmd: String,

    /// Maximum retained events per group and warning/raw buffers.
    #[arg(long, default_value_t = 400)]
    max_events: usize,

    /// Write structured debug logs to a file.
    #[arg(long)]
    debug: bool,

    /// Arguments passed to the watch command after `--`.
    #[arg(last = true)]
    watch_args: Vec<String>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.debug {
        init_debug_logging()?;
    }

    let watch_config = WatchConfig {
        command: cli.watch_cmd,
        args: cli.watch_args,
    };

    // Spawn before touching the terminal: a launch failure must report
    // to stderr and exit 1 with no UI shown.
    let mut handle = watch::spawn_watch(&watch_config)?;

    let mut app = App::new(AppConfig {
        max_events: cli.max_events,
        source_desc: watch_config.describe(),
        classifier: ClassifierConfig::default(),
        display: DisplayConfig::default(),
    });

    let terminal = ratatui::init();
    let result = run(terminal, &mut app, &mut handle.rx);
    ratatui::restore();

    // Same shutdown path for quit, interrupt, and stream closure:
    // cancel ingestion, SIGTERM the child, escalate after the grace
    // period, close handles.
    handle.shutdown().await;

    info!("clawtail exited");
    result
}

/// The cooperative frame loop. Owns all domain state mutation.
fn run(
    mut terminal: DefaultTerminal,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<SourceMessage>,
) -> color_eyre::Result<()> {
    loop {
        let mut drained = 0;
        while drained < DRAIN_BATCH {
            match rx.try_recv() {
                Ok(SourceMessage::Line(line)) => {
                    app.ingest_line(&line);
                    drained += 1;
                }
                Ok(SourceMessage::Closed) => {
                    debug!("source closed");
                    app.source_closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        terminal.draw(|frame| ui::draw(frame, app))?;

        // One key per frame; the timeout is the frame-rate cap. In raw
        // mode Ctrl-C arrives here as a key event and quits like `q`.
        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Initialize file-based debug logging.
///
/// The terminal belongs to the dashboard, so `--debug` writes
/// structured logs to `~/.local/share/clawtail/tui-debug.log` instead.
/// Monitor with `tail -f`.
fn init_debug_logging() -> color_eyre::Result<()> {
    use tracing_subscriber::EnvFilter;

    let data_dir = log_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("tui-debug.log");

    // Truncate at startup so each session starts clean.
    let file = std::fs::File::create(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();

    info!(path = %log_path.display(), "debug logging enabled");
    Ok(())
}

/// Log directory: `~/.local/share/clawtail/`.
fn log_dir() -> PathBuf {
    std::env::var("HOME").map_or_else(
        |_| PathBuf::from("/tmp/clawtail"),
        |home| PathBuf::from(home).join(".local/share/clawtail"),
    )
}
