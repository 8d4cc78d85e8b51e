//! Structured JSON encoding.

use super::{Formatter, fallback_metadata, presented_messages};
use crate::core::{Message, SaveOptions, Thread, ThreadMetadata};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Writes threads as pretty-printed JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct DocumentOut<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a ThreadMetadata>,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct DocumentIn {
    id: String,
    #[serde(default)]
    metadata: Option<ThreadMetadata>,
    #[serde(default)]
    messages: Vec<Message>,
}

impl Formatter for JsonFormatter {
    fn serialize(&self, thread: &Thread, options: &SaveOptions) -> Result<String> {
        let doc = DocumentOut {
            id: &thread.id,
            metadata: options.include_metadata.then_some(&thread.metadata),
            messages: presented_messages(&thread.messages, options.include_timestamps),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    fn deserialize(&self, text: &str) -> Result<Thread> {
        let doc: DocumentIn = serde_json::from_str(text)?;
        let metadata = doc
            .metadata
            .unwrap_or_else(|| fallback_metadata(None, &doc.messages));
        Ok(Thread {
            id: doc.id,
            metadata,
            messages: doc.messages,
        })
    }

    fn file_extension(&self) -> &'static str {
        ".json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Format, Role};
    use crate::format::UNTITLED;
    use chrono::Utc;

    fn sample() -> Thread {
        let mut thread = Thread::new(
            "Rust lifetimes",
            vec![
                Message::new(Role::User, "why does this not compile?").at(Utc::now()),
                Message::new(Role::Assistant, "the borrow outlives the owner").at(Utc::now()),
            ],
        );
        thread.metadata.tags = Some(vec!["rust".to_string()]);
        thread.metadata.source_app = Some("editor".to_string());
        thread
    }

    #[test]
    fn round_trip_with_everything() {
        let thread = sample();
        let text = JsonFormatter
            .serialize(&thread, &SaveOptions::default())
            .unwrap();
        assert_eq!(JsonFormatter.deserialize(&text).unwrap(), thread);
    }

    #[test]
    fn omitting_metadata_drops_block() {
        let thread = sample();
        let options = SaveOptions {
            format: Format::Json,
            include_metadata: false,
            include_timestamps: true,
        };
        let text = JsonFormatter.serialize(&thread, &options).unwrap();
        assert!(!text.contains("\"metadata\""));

        let parsed = JsonFormatter.deserialize(&text).unwrap();
        assert_eq!(parsed.id, thread.id);
        assert_eq!(parsed.metadata.title, UNTITLED);
        assert_eq!(parsed.messages, thread.messages);
    }

    #[test]
    fn omitting_timestamps_keeps_content() {
        let thread = sample();
        let options = SaveOptions {
            format: Format::Json,
            include_metadata: true,
            include_timestamps: false,
        };
        let text = JsonFormatter.serialize(&thread, &options).unwrap();
        let parsed = JsonFormatter.deserialize(&text).unwrap();
        assert!(parsed.messages.iter().all(|m| m.timestamp.is_none()));
        assert_eq!(parsed.messages[1].content, "the borrow outlives the owner");
        assert_eq!(parsed.metadata, thread.metadata);
    }

    #[test]
    fn rejects_garbage() {
        assert!(JsonFormatter.deserialize("{ not json").is_err());
        assert!(JsonFormatter.deserialize(r#"{"messages": []}"#).is_err());
    }
}
