//! Tool-call arguments.
//!
//! Fields that name a format, storage backend or date arrive as strings and
//! are parsed here so a bad value becomes a validation failure the caller can
//! read, not a protocol error.

use crate::config::Backend;
use crate::core::search::{DateBound, SearchCriteria, parse_date_bound};
use crate::core::update::{MetadataOverrides, UpdateMode, UpdateRequest};
use crate::core::{Format, Message, ThreadTarget};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode tool arguments, reporting shape errors as validation failures.
pub(crate) fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| Error::Validation(format!("Invalid arguments for {tool}: {e}")))
}

fn parse_storage(value: Option<&str>) -> Result<Option<Backend>> {
    value.map(str::parse).transpose()
}

fn parse_format(value: Option<&str>) -> Result<Option<Format>> {
    value.map(str::parse).transpose()
}

/// `save_conversation`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArgs {
    /// Conversation title.
    pub title: String,
    /// Messages in conversation order.
    pub messages: Vec<Message>,
    /// Explicit id; one is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Application the conversation came from.
    #[serde(default)]
    pub source_app: Option<String>,
    /// Tags to attach.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Explicit summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// `json` or `markdown`.
    #[serde(default)]
    pub format: Option<String>,
    /// Overrides the configured default.
    #[serde(default)]
    pub include_metadata: Option<bool>,
    /// Overrides the configured default.
    #[serde(default)]
    pub include_timestamps: Option<bool>,
    /// Ask the summarizer for a summary.
    #[serde(default)]
    pub generate_summary: bool,
    /// Ask the summarizer for tags.
    #[serde(default)]
    pub generate_tags: bool,
    /// `local` or `remote`.
    #[serde(default)]
    pub storage: Option<String>,
}

impl SaveArgs {
    pub fn format(&self) -> Result<Option<Format>> {
        parse_format(self.format.as_deref())
    }

    pub fn storage(&self) -> Result<Option<Backend>> {
        parse_storage(self.storage.as_deref())
    }
}

/// `list_conversations`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListArgs {
    /// Maximum entries returned.
    pub limit: Option<usize>,
    /// `local` or `remote`.
    pub storage: Option<String>,
}

impl ListArgs {
    pub fn storage(&self) -> Result<Option<Backend>> {
        parse_storage(self.storage.as_deref())
    }
}

/// `get_conversation` and `delete_conversation`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetArgs {
    /// Exact id.
    pub id: Option<String>,
    /// Exact title, used when id is absent.
    pub title: Option<String>,
    /// `local` or `remote`.
    pub storage: Option<String>,
}

impl TargetArgs {
    pub fn target(&self) -> ThreadTarget {
        ThreadTarget {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }

    pub fn storage(&self) -> Result<Option<Backend>> {
        parse_storage(self.storage.as_deref())
    }
}

/// `search_conversations`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchArgs {
    /// Free text over title, summary and message content.
    pub query: Option<String>,
    /// Exact title.
    pub title: Option<String>,
    /// Case-insensitive title substring.
    pub title_contains: Option<String>,
    /// Inclusive lower bound on creation time.
    pub date_from: Option<String>,
    /// Inclusive upper bound on creation time.
    pub date_to: Option<String>,
    /// Exact source application.
    pub source_app: Option<String>,
    /// Tags that must all be present.
    pub tags: Option<Vec<String>>,
    /// Maximum hits.
    pub limit: Option<usize>,
    /// Score and explain each hit.
    pub include_relevance: bool,
    /// `local` or `remote`.
    pub storage: Option<String>,
}

impl SearchArgs {
    /// Build criteria; `default_limit` applies when no limit was given.
    pub fn criteria(&self, default_limit: usize) -> Result<SearchCriteria> {
        let date_from = self
            .date_from
            .as_deref()
            .map(|v| parse_date_bound(v, DateBound::Start))
            .transpose()?;
        let date_to = self
            .date_to
            .as_deref()
            .map(|v| parse_date_bound(v, DateBound::End))
            .transpose()?;

        Ok(SearchCriteria {
            query: self.query.clone(),
            title: self.title.clone(),
            title_contains: self.title_contains.clone(),
            date_from,
            date_to,
            source_app: self.source_app.clone(),
            tags: self.tags.clone(),
            limit: Some(self.limit.unwrap_or(default_limit)),
        })
    }

    pub fn storage(&self) -> Result<Option<Backend>> {
        parse_storage(self.storage.as_deref())
    }
}

/// `update_conversation`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArgs {
    /// Exact id.
    #[serde(default)]
    pub id: Option<String>,
    /// Exact title, used when id is absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Messages to append or replace with.
    pub messages: Vec<Message>,
    /// `append` (default) or `replace`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Skip appended messages already present; defaults to true.
    #[serde(default)]
    pub deduplicate: Option<bool>,
    /// Replacement title.
    #[serde(default)]
    pub new_title: Option<String>,
    /// Replacement tag list.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Replacement summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Regenerate the summary unless one was given.
    #[serde(default)]
    pub generate_summary: bool,
    /// `local` or `remote`.
    #[serde(default)]
    pub storage: Option<String>,
}

impl UpdateArgs {
    pub fn target(&self) -> ThreadTarget {
        ThreadTarget {
            id: self.id.clone(),
            title: self.title.clone(),
        }
    }

    pub fn request(&self) -> Result<UpdateRequest> {
        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("append") => UpdateMode::Append,
            Some("replace") => UpdateMode::Replace,
            Some(other) => {
                return Err(Error::Validation(format!(
                    "Unknown mode '{other}' (expected append or replace)"
                )));
            }
        };

        Ok(UpdateRequest {
            messages: self.messages.clone(),
            mode,
            deduplicate: self.deduplicate.unwrap_or(true),
            overrides: MetadataOverrides {
                title: self.new_title.clone(),
                tags: self.tags.clone(),
                summary: self.summary.clone(),
            },
        })
    }

    pub fn storage(&self) -> Result<Option<Backend>> {
        parse_storage(self.storage.as_deref())
    }
}
