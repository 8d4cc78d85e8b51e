//! `threadvault list` command implementation.

use crate::cli::{format_local_time, open_store, truncate};
use crate::config::Config;
use crate::core::ThreadDescriptor;
use crate::error::Result;

const TITLE_WIDTH: usize = 40;

/// Run the list command.
///
/// Shows saved threads, newest first.
///
/// # Errors
///
/// Returns an error if the storage backend fails.
pub fn run(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = open_store(config)?;
    let limit = limit.unwrap_or(config.defaults.list_limit);
    let descriptors = store.list()?;

    if descriptors.is_empty() {
        println!("No conversations found.");
        println!("\nConversations are stored in: {}", config.storage.path.display());
        return Ok(());
    }

    print!("{}", render(&descriptors, limit));
    Ok(())
}

fn render(descriptors: &[ThreadDescriptor], limit: usize) -> String {
    let mut out = format!(
        "{:<38} {:<17} {:<9} Title\n{}\n",
        "ID",
        "Saved",
        "Format",
        "─".repeat(100)
    );
    for descriptor in descriptors.iter().take(limit) {
        out.push_str(&format!(
            "{:<38} {:<17} {:<9} {}\n",
            descriptor.id,
            format_local_time(descriptor.saved_at),
            descriptor.format,
            truncate(&descriptor.title, TITLE_WIDTH)
        ));
    }
    out.push_str(&"─".repeat(100));
    out.push_str(&format!(
        "\nShowing {} of {} conversation(s)\n",
        descriptors.len().min(limit),
        descriptors.len()
    ));
    out
}
