//! CLI command implementations.

pub mod delete;
pub mod list;
pub mod search;
pub mod serve;
pub mod show;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::storage::{LocalStore, RemoteStore, ThreadStore};
use chrono::{DateTime, Local, Utc};

/// Open the configured default store.
///
/// # Errors
///
/// Returns an error if the remote backend is selected but cannot be built.
pub fn open_store(config: &Config) -> Result<Box<dyn ThreadStore>> {
    Ok(match config.storage.backend {
        Backend::Local => Box::new(LocalStore::new(config.storage.path.clone())),
        Backend::Remote => Box::new(RemoteStore::new(&config.remote)?),
    })
}

/// Format UTC time as local time for display.
fn format_local_time(utc: DateTime<Utc>) -> String {
    let local: DateTime<Local> = utc.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Cut a string to `max` characters, marking the cut with "...".
fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.chars().count() > max {
        let cut: String = first_line.chars().take(max).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}
