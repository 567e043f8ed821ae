//! Issue triage dashboard back-end.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs  (TriageServer, ShutdownHandle)       │
//! │ (static) │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         │ ActionExecutor::apply()                │
//!                       │         v                                        │
//!                       │  executor.rs  (label → comment → close)          │
//!                       │         │                                        │
//!                       │         │ ActionRunner::run()                    │
//!                       │         v                                        │
//!                       │  runner.rs    (GhCli subprocess, timeout)        │
//!                       │         │                                        │
//!                       │         │ TriageStore::record()                  │
//!                       │         v                                        │
//!                       │  state.rs / store.rs  (locked atomic JSON)       │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                            |
//! |-----------|-----------------------------------------------------------|
//! | `models`  | Document types: `Issue`, `Finding`, `TriageEntry`, ...    |
//! | `query`   | Filter/sort primitives and the dashboard view             |
//! | `export`  | Markdown report rendering                                 |
//! | `assets`  | Bundled dashboard page (`rust-embed`) or a static dir     |
//!
//! Documents are re-read on every request; there is no in-process cache.
//! `issues.json` and `findings.json` are produced by an upstream analysis
//! step and never written here.

pub mod api;
pub mod assets;
pub mod executor;
pub mod export;
pub mod models;
pub mod query;
pub mod runner;
pub mod server;
pub mod state;
pub mod store;
