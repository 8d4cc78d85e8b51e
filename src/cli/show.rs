//! `threadvault show` command implementation.

use crate::cli::open_store;
use crate::config::Config;
use crate::core::{Format, SaveOptions, ThreadTarget, locate};
use crate::error::{Error, Result};
use crate::format::formatter_for;

/// Run the show command.
///
/// Prints a thread, looked up by id then by exact title, in the requested
/// format (markdown by default).
///
/// # Errors
///
/// Returns an error if the thread does not exist or storage fails.
pub fn run(config: &Config, id_or_title: &str, format: Option<&str>) -> Result<()> {
    let format = match format {
        Some(f) => f.parse()?,
        None => Format::Markdown,
    };
    let store = open_store(config)?;

    let located = match locate(store.as_ref(), &ThreadTarget::by_id(id_or_title))? {
        Some(located) => Some(located),
        None => locate(store.as_ref(), &ThreadTarget::by_title(id_or_title))?,
    };
    let Some(located) = located else {
        return Err(Error::Validation(format!(
            "Conversation not found: {id_or_title}"
        )));
    };

    let text = formatter_for(format).serialize(&located.thread, &SaveOptions::with_format(format))?;
    println!("{}", text.trim_end());
    Ok(())
}
