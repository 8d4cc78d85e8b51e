//! Text encodings for threads.
//!
//! Both formatters obey the same round-trip law: with metadata and
//! timestamps included, `deserialize(serialize(t))` reproduces `t` exactly.
//! With either option off, the omitted parts come back absent and the
//! metadata is rebuilt from whatever the document still carries.

pub mod json;
pub mod markdown;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;

use crate::core::{Format, Message, SaveOptions, Thread, ThreadMetadata};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Title used when a document carries no title at all.
pub const UNTITLED: &str = "Untitled conversation";

/// Bidirectional serializer between a thread and a text encoding.
pub trait Formatter: Send + Sync {
    /// Encode a thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be encoded.
    fn serialize(&self, thread: &Thread, options: &SaveOptions) -> Result<String>;

    /// Decode a thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid document for this format.
    fn deserialize(&self, text: &str) -> Result<Thread>;

    /// Canonical file extension, including the dot.
    fn file_extension(&self) -> &'static str;
}

/// Formatter for a format.
#[must_use]
pub fn formatter_for(format: Format) -> &'static dyn Formatter {
    match format {
        Format::Json => &JsonFormatter,
        Format::Markdown => &MarkdownFormatter,
    }
}

/// Messages as they should be written, with timestamps dropped if requested.
fn presented_messages(messages: &[Message], include_timestamps: bool) -> Vec<Message> {
    messages
        .iter()
        .map(|m| Message {
            timestamp: if include_timestamps { m.timestamp } else { None },
            ..m.clone()
        })
        .collect()
}

/// Metadata for a document that was written without its metadata block.
///
/// `created_at` falls back to the first message timestamp, then the epoch.
fn fallback_metadata(title: Option<String>, messages: &[Message]) -> ThreadMetadata {
    let created_at = messages
        .iter()
        .find_map(|m| m.timestamp)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    ThreadMetadata {
        title: title.unwrap_or_else(|| UNTITLED.to_string()),
        source_app: None,
        created_at,
        updated_at: None,
        tags: None,
        summary: None,
    }
}
