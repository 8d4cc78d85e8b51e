//! `threadvault delete` command implementation.

use crate::cli::open_store;
use crate::config::Config;
use crate::error::{Error, Result};

/// Run the delete command.
///
/// # Errors
///
/// Returns an error if no thread has this id or storage fails.
pub fn run(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config)?;
    if !store.delete(id)? {
        return Err(Error::Validation(format!("Conversation not found: {id}")));
    }
    println!("Deleted conversation {id}.");
    Ok(())
}
