//! Watch-command subprocess driver.
//!
//! Spawns the log-tailing watch command and forwards its combined
//! stdout/stderr output, one raw line at a time, over an unbounded
//! channel to the main loop.
//!
//! # Architecture
//!
//! ```text
//! TUI main loop
//!     ↓ spawn_watch()
//! tokio::spawn → watch subprocess
//!     ↓ stdout + stderr (text lines)
//!     ↓ mpsc (unbounded — the producer never blocks)
//! TUI drains lines per frame → classify → store → re-render
//! ```
//!
//! The driver performs no parsing and holds no domain state. On end of
//! output or a stop request it terminates the subprocess (SIGTERM,
//! bounded grace period, then SIGKILL) and sends exactly one
//! [`SourceMessage::Closed`] sentinel so the consumer can detect
//! closure deterministically.

use std::process::Stdio;
use std::time::Duration;

use color_eyre::eyre::WrapErr;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long the subprocess gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// What to run and what to pass through to it.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// The watch command (script or binary) producing the line stream.
    pub command: String,
    /// Arguments forwarded verbatim (everything after `--` on our CLI).
    pub args: Vec<String>,
}

impl WatchConfig {
    /// One-line description for the status bar.
    pub fn describe(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Messages sent from the driver task to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMessage {
    /// One raw line of subprocess output, not yet cleaned or classified.
    Line(String),
    /// The stream is done — sent exactly once, last.
    Closed,
}

/// Handle to a running watch driver.
pub struct WatchHandle {
    /// Stream of raw lines followed by one `Closed`.
    pub rx: mpsc::UnboundedReceiver<SourceMessage>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Stop ingestion and wait for the subprocess to be torn down.
    ///
    /// Safe to call on every exit path; the driver terminates the
    /// child and closes its handles exactly once either way.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Spawn the watch command and start the driver task.
///
/// Spawn failure is the only hard error in this module — it means the
/// operator gets a message on stderr and the process exits before any
/// UI is drawn.
pub fn spawn_watch(config: &WatchConfig) -> color_eyre::Result<WatchHandle> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .wrap_err_with(|| format!("failed to start watch command `{}`", config.describe()))?;

    info!(command = %config.describe(), pid = ?child.id(), "spawned watch process");

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_watch(child, tx, cancel.clone()));

    Ok(WatchHandle { rx, cancel, task })
}

/// Drive the subprocess: forward lines until EOF or cancellation, then
/// tear the child down and emit the closing sentinel.
async fn run_watch(
    mut child: Child,
    tx: mpsc::UnboundedSender<SourceMessage>,
    cancel: CancellationToken,
) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let streams = async {
        tokio::join!(
            forward_lines(stdout, tx.clone()),
            forward_lines(stderr, tx.clone()),
        );
    };

    tokio::select! {
        () = cancel.cancelled() => {
            debug!("stop requested, tearing down watch process");
        }
        () = streams => {
            debug!("watch stream reached end of output");
        }
    }

    terminate(&mut child).await;

    // Exactly one sentinel, after the last forwarded line. Send failure
    // just means the consumer already went away.
    let _ = tx.send(SourceMessage::Closed);
}

/// Forward lines from one pipe into the channel, preserving order.
async fn forward_lines<R>(reader: Option<R>, tx: mpsc::UnboundedSender<SourceMessage>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else { return };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(SourceMessage::Line(line)).is_err() {
                    // Receiver dropped — the TUI is shutting down.
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                // A broken pipe is a normal terminal state for the
                // stream, not a viewer failure.
                warn!(error = %e, "read error on watch stream");
                break;
            }
        }
    }
}

/// Ask the subprocess to exit, escalating to SIGKILL after the grace
/// period. No-op when it has already exited.
async fn terminate(child: &mut Child) {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(?status, "watch process already exited");
        return;
    }

    if let Some(pid) = child.id() {
        // SAFETY: plain syscall on a pid we own via the child handle.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }

    match tokio::time::timeout(TERM_GRACE, child.wait()).await {
        Ok(status) => {
            debug!(?status, "watch process exited after SIGTERM");
        }
        Err(_) => {
            warn!("watch process ignored SIGTERM, killing");
            let _ = child.kill().await;
        }
    }
}
