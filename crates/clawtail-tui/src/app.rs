//! Application state for the clawtail TUI.
//!
//! Owns the event store and the pause/quit flags, feeds cleaned lines
//! through the classifier, and maps keypresses to operator commands.
//! All mutation happens on the main loop; the renderer only borrows.

use std::time::Instant;

use crate::classify::{Classifier, ClassifierConfig};
use crate::store::EventStore;

/// Display tuning for the renderer. Immutable after startup.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// How many recent entries each panel shows.
    pub recent_per_panel: usize,
    /// Title of the primary-group panel.
    pub primary_label: String,
    /// Title of the secondary-group panel.
    pub secondary_label: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            recent_per_panel: 12,
            primary_label: "LM Studio".to_owned(),
            secondary_label: "OpenClaw".to_owned(),
        }
    }
}

/// Everything the app needs at construction time.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Per-buffer capacity (floor of [`EventStore::MIN_CAPACITY`]).
    pub max_events: usize,
    /// Human-readable watch command line for the status bar.
    pub source_desc: String,
    pub classifier: ClassifierConfig,
    pub display: DisplayConfig,
}

/// What a keypress asks the app to do. Returned so the main loop can
/// react to `Quit` (shut down ingestion); `Clear` and `TogglePause`
/// are already applied when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    Clear,
    TogglePause,
}

/// Top-level application state.
#[derive(Debug)]
pub struct App {
    pub store: EventStore,
    pub display: DisplayConfig,
    /// While set, drained lines are discarded (not buffered).
    pub paused: bool,
    pub should_quit: bool,
    /// Set once when the closing sentinel is observed.
    pub source_closed: bool,
    pub source_desc: String,
    pub started_at: Instant,
    classifier: Classifier,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            store: EventStore::new(config.max_events),
            display: config.display,
            paused: false,
            should_quit: false,
            source_closed: false,
            source_desc: config.source_desc,
            started_at: Instant::now(),
            classifier: Classifier::new(config.classifier),
        }
    }

    /// Process one raw line from the queue.
    ///
    /// While paused the line is dropped entirely — no counters, no
    /// buffers. Lines that clean down to nothing are likewise dropped
    /// before any state changes.
    pub fn ingest_line(&mut self, raw: &str) {
        if self.paused {
            return;
        }
        let clean = self.classifier.clean(raw);
        if clean.is_empty() {
            return;
        }
        self.store.record_line(&clean);
        let classified = self.classifier.classify(&clean);
        self.store.record_event(&classified);
    }

    /// Map a keypress to an operator command and apply it.
    ///
    /// `q`/`Q`/Ctrl-C quit, `r`/`R` clear the buffers, `p`/`P` toggle
    /// pause. Every other key is a no-op.
    pub fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> Option<InputAction> {
        use crossterm::event::{KeyCode, KeyModifiers};

        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                InputAction::Quit
            }
            KeyCode::Char('q' | 'Q') => InputAction::Quit,
            KeyCode::Char('r' | 'R') => InputAction::Clear,
            KeyCode::Char('p' | 'P') => InputAction::TogglePause,
            _ => return None,
        };

        match action {
            InputAction::Quit => self.should_quit = true,
            InputAction::Clear => self.store.clear(),
            InputAction::TogglePause => self.paused = !self.paused,
        }
        Some(action)
    }

    /// Stream state shown in the status bar.
    pub const fn status_label(&self) -> &'static str {
        if self.source_closed { "closed" } else { "streaming" }
    }

    /// Seconds since startup.
    pub fn runtime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
