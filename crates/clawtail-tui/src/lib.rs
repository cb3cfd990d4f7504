//! clawtail — a structured terminal dashboard for OpenClaw log streams.
//!
//! This crate tails the output of an external watch command, classifies
//! each line into typed events, keeps bounded rolling history with
//! running counters, and renders a live dashboard.
//!
//! # Architecture
//!
//! ```text
//! watch command ──→ watch driver (tokio task)
//!                        │ raw lines + one Closed sentinel
//!                        ↓ mpsc (unbounded)
//!                   main loop (frame-bounded drain)
//!                        ├── classify: line → LogEvent + Group
//!                        ├── store:    bounded buffers + counters
//!                        └── ui:       pure draw of the snapshot
//! ```
//!
//! The main loop exclusively owns the store, so domain state needs no
//! locking; the channel is the only structure crossing contexts.

pub mod app;
pub mod classify;
pub mod store;
pub mod ui;
pub mod watch;
