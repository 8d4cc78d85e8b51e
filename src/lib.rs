//! threadvault - persistence, search and incremental update for
//! conversation threads.
//!
//! Threads are saved through a [`storage::ThreadStore`] (a local directory
//! with a JSON index, or a remote HTTP endpoint), encoded by a
//! [`format::Formatter`] (JSON or Markdown with front matter), and exposed to
//! agents as tools over a JSON-RPC stdio server.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod server;
pub mod storage;
pub mod summarize;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
