//! Summary and tag generation through an OpenAI-compatible chat endpoint.
//!
//! Generation is best effort. [`enrich`] swallows collaborator failures and
//! logs them so the save or update that asked for them still goes through.

use crate::config::SummarizerConfig;
use crate::core::{Message, Thread};
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest transcript sent to the model, in characters.
const TRANSCRIPT_LIMIT: usize = 12_000;
const ERROR_BODY_LIMIT: usize = 240;
const MAX_TAGS: usize = 5;

const SUMMARY_PROMPT: &str = "Summarize the following conversation in two or three sentences. \
Reply with the summary only.";
const TAGS_PROMPT: &str = "Suggest up to five short topic tags for the following conversation. \
Reply with the tags only, separated by commas.";

/// Produces summaries and tags from a message list.
pub trait Summarizer: Send + Sync {
    /// A short prose summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn summarize(&self, messages: &[Message]) -> Result<String>;

    /// Lowercase topic tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    fn suggest_tags(&self, messages: &[Message]) -> Result<Vec<String>>;
}

/// [`Summarizer`] backed by `POST {api_base}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl ChatSummarizer {
    /// Build a summarizer if the configuration enables one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API base is empty or the HTTP client cannot be
    /// built.
    pub fn from_config(config: &SummarizerConfig) -> Result<Option<Self>> {
        if !config.is_usable() {
            return Ok(None);
        }
        let api_base = config.api_base.trim().trim_end_matches('/');
        if api_base.is_empty() {
            return Err(Error::Config(
                "summarizer api_base must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Some(Self {
            endpoint: format!("{api_base}/chat/completions"),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            client,
        }))
    }

    fn complete(&self, instruction: &str, messages: &[Message]) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "temperature": 0.2,
                "messages": [
                    {"role": "system", "content": instruction},
                    {"role": "user", "content": transcript(messages)},
                ],
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let payload: Value = response.json()?;
        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Format("completion response missing message content".to_string()))
    }
}

impl Summarizer for ChatSummarizer {
    fn summarize(&self, messages: &[Message]) -> Result<String> {
        self.complete(SUMMARY_PROMPT, messages)
    }

    fn suggest_tags(&self, messages: &[Message]) -> Result<Vec<String>> {
        self.complete(TAGS_PROMPT, messages).map(|reply| parse_tags(&reply))
    }
}

/// Render messages as `Label: content` lines, cut to the transcript limit.
fn transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str(message.role.label());
        out.push_str(": ");
        out.push_str(&message.content);
        out.push('\n');
    }
    if out.chars().count() > TRANSCRIPT_LIMIT {
        out = out.chars().take(TRANSCRIPT_LIMIT).collect();
    }
    out
}

/// Split a model reply into distinct lowercase tags.
fn parse_tags(reply: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for raw in reply.split([',', '\n']) {
        let tag = raw
            .trim()
            .trim_start_matches(['-', '*', '#'])
            .trim()
            .to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Which generated fields a caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Fill `metadata.summary`.
    pub summary: bool,

    /// Fill `metadata.tags`.
    pub tags: bool,
}

impl Enrichment {
    /// Whether anything was asked for.
    #[must_use]
    pub fn any(self) -> bool {
        self.summary || self.tags
    }
}

/// Fill summary and tags on a thread from the summarizer.
///
/// Does nothing when no summarizer is configured. Failures are logged and
/// leave the field unchanged. Generated tags are merged after existing ones.
pub fn enrich(summarizer: Option<&dyn Summarizer>, thread: &mut Thread, wanted: Enrichment) {
    if !wanted.any() {
        return;
    }
    let Some(summarizer) = summarizer else {
        debug!(id = %thread.id, "summarizer not configured; skipping enrichment");
        return;
    };

    if wanted.summary {
        match summarizer.summarize(&thread.messages) {
            Ok(summary) => thread.metadata.summary = Some(summary),
            Err(e) => warn!(id = %thread.id, error = %e, "summary generation failed"),
        }
    }

    if wanted.tags {
        match summarizer.suggest_tags(&thread.messages) {
            Ok(generated) => {
                let tags = thread.metadata.tags.get_or_insert_with(Vec::new);
                for tag in generated {
                    if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                        tags.push(tag);
                    }
                }
            }
            Err(e) => warn!(id = %thread.id, error = %e, "tag generation failed"),
        }
    }
}
