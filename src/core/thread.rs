//! Conversation thread types.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human side of the conversation.
    User,
    /// Model side of the conversation.
    Assistant,
    /// System prompt or instructions.
    System,
}

impl Role {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Capitalized name used in human-readable output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }

    /// Parse a capitalized label back into a role.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "User" => Some(Self::User),
            "Assistant" => Some(Self::Assistant),
            "System" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,

    /// Message text.
    pub content: String,

    /// When the message was sent, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message without a timestamp.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// Attach a timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Dedup identity: same role and same content. Timestamps are ignored.
    #[must_use]
    pub fn same_turn(&self, other: &Self) -> bool {
        self.role == other.role && self.content == other.content
    }
}

/// Descriptive metadata for a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMetadata {
    /// Human-readable title.
    pub title: String,

    /// Application the conversation came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,

    /// Logical creation time of the conversation.
    pub created_at: DateTime<Utc>,

    /// Last time the thread was rewritten by an update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Free-form tags, kept in the order given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Short summary of the conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ThreadMetadata {
    /// Metadata with only a title, created now.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_app: None,
            created_at: Utc::now(),
            updated_at: None,
            tags: None,
            summary: None,
        }
    }

    /// Tags as a slice, empty when none are set.
    #[must_use]
    pub fn tag_list(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// A saved conversation: metadata plus ordered messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Store-unique identifier.
    pub id: String,

    /// Descriptive metadata.
    pub metadata: ThreadMetadata,

    /// Messages in conversation order.
    pub messages: Vec<Message>,
}

impl Thread {
    /// Create a thread with a freshly generated id.
    #[must_use]
    pub fn new(title: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: generate_id(),
            metadata: ThreadMetadata::new(title),
            messages,
        }
    }

    /// Thread title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}

/// Generate a new thread id.
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// On-disk/wire encoding of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Structured JSON document.
    #[default]
    Json,
    /// Markdown with a YAML front matter block.
    Markdown,
}

impl Format {
    /// Canonical file extension, including the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => ".json",
            Self::Markdown => ".md",
        }
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(Error::Validation(format!(
                "Unsupported format '{other}' (expected json or markdown)"
            ))),
        }
    }
}

/// Options controlling how a thread is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    /// Encoding to write.
    pub format: Format,

    /// Write the metadata block.
    pub include_metadata: bool,

    /// Write per-message timestamps.
    pub include_timestamps: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: Format::Json,
            include_metadata: true,
            include_timestamps: true,
        }
    }
}

impl SaveOptions {
    /// Default options with a specific format.
    #[must_use]
    pub fn with_format(format: Format) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Lightweight index entry for a saved thread.
///
/// Exactly one of `file_path` and `remote_url` is set, depending on the
/// backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDescriptor {
    /// Thread id.
    pub id: String,

    /// Thread title at save time.
    pub title: String,

    /// Backing file (local store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Backing resource (remote store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Encoding of the stored document.
    pub format: Format,

    /// When the thread was persisted.
    pub saved_at: DateTime<Utc>,

    /// Application the conversation came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<String>,
}

impl ThreadDescriptor {
    /// Descriptor for a thread written to a local file.
    #[must_use]
    pub fn local(thread: &Thread, file_path: PathBuf, format: Format, saved_at: DateTime<Utc>) -> Self {
        Self {
            id: thread.id.clone(),
            title: thread.metadata.title.clone(),
            file_path: Some(file_path),
            remote_url: None,
            format,
            saved_at,
            source_app: thread.metadata.source_app.clone(),
        }
    }

    /// Descriptor for a thread stored on a remote endpoint.
    #[must_use]
    pub fn remote(thread: &Thread, remote_url: String, format: Format, saved_at: DateTime<Utc>) -> Self {
        Self {
            id: thread.id.clone(),
            title: thread.metadata.title.clone(),
            file_path: None,
            remote_url: Some(remote_url),
            format,
            saved_at,
            source_app: thread.metadata.source_app.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_turn_ignores_timestamp() {
        let a = Message::new(Role::User, "hi");
        let b = Message::new(Role::User, "hi").at(Utc::now());
        assert!(a.same_turn(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn same_turn_requires_matching_role() {
        let a = Message::new(Role::User, "hi");
        let b = Message::new(Role::Assistant, "hi");
        assert!(!a.same_turn(&b));
    }

    #[test]
    fn new_thread_gets_uuid() {
        let thread = Thread::new("Demo", vec![]);
        assert!(Uuid::parse_str(&thread.id).is_ok());
        assert_eq!(thread.title(), "Demo");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("Markdown".parse::<Format>().unwrap(), Format::Markdown);
        assert_eq!("md".parse::<Format>().unwrap(), Format::Markdown);
        assert!("yaml".parse::<Format>().unwrap_err().is_validation());
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let mut metadata = ThreadMetadata::new("T");
        metadata.source_app = Some("cli".to_string());
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"sourceApp\":\"cli\""));
        assert!(json.contains("\"createdAt\""));
        assert!(!json.contains("updatedAt"));
    }

    #[test]
    fn local_descriptor_has_only_file_path() {
        let thread = Thread::new("T", vec![]);
        let descriptor =
            ThreadDescriptor::local(&thread, PathBuf::from("/tmp/t.json"), Format::Json, Utc::now());
        assert!(descriptor.file_path.is_some());
        assert!(descriptor.remote_url.is_none());

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("filePath"));
        assert!(!json.contains("remoteUrl"));
    }

    #[test]
    fn role_labels_round_trip() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(Role::from_label(role.label()), Some(role));
        }
        assert_eq!(Role::from_label("Tool"), None);
    }
}
