//! Human-readable markdown encoding with YAML front matter.
//!
//! Layout:
//!
//! ```text
//! ---
//! id: 3f2a...
//! title: Rust lifetimes
//! createdAt: 2026-01-31T10:00:00Z
//! ---
//!
//! # Rust lifetimes
//!
//! ## User
//! _2026-01-31T10:00:00Z_
//!
//! why does this not compile?
//!
//! ## Assistant
//!
//! the borrow outlives the owner
//! ```
//!
//! Body lines starting with `#`, `_` or `\` are written with a leading `\` so
//! they are never read back as a heading or a timestamp line.

use super::{Formatter, fallback_metadata, presented_messages};
use crate::core::{Message, Role, SaveOptions, Thread, ThreadMetadata};
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const DELIMITER: &str = "---\n";
const CLOSING_DELIMITER: &str = "\n---\n";

/// Writes threads as markdown documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFormatter;

#[derive(Serialize)]
struct FrontMatterOut<'a> {
    id: &'a str,
    #[serde(flatten)]
    metadata: Option<&'a ThreadMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontMatterIn {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source_app: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    summary: Option<String>,
}

impl Formatter for MarkdownFormatter {
    fn serialize(&self, thread: &Thread, options: &SaveOptions) -> Result<String> {
        let front = FrontMatterOut {
            id: &thread.id,
            metadata: options.include_metadata.then_some(&thread.metadata),
        };

        let mut out = String::new();
        out.push_str(DELIMITER);
        out.push_str(&serde_yaml::to_string(&front)?);
        out.push_str(DELIMITER);
        out.push('\n');

        let title = thread.title().lines().next().unwrap_or_default();
        out.push_str(&format!("# {title}\n\n"));

        for message in presented_messages(&thread.messages, options.include_timestamps) {
            out.push_str(&format!("## {}\n", message.role.label()));
            if let Some(ts) = message.timestamp {
                out.push_str(&format!(
                    "_{}_\n",
                    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
                ));
            }
            out.push('\n');
            out.push_str(&escape_body(&message.content));
            out.push_str("\n\n");
        }

        Ok(out)
    }

    fn deserialize(&self, text: &str) -> Result<Thread> {
        let (yaml, body) = split_front_matter(text)?;
        let front: FrontMatterIn = serde_yaml::from_str(yaml)?;
        let (heading, messages) = parse_body(body);

        let metadata = match (front.title, front.created_at) {
            (Some(title), Some(created_at)) => ThreadMetadata {
                title,
                source_app: front.source_app,
                created_at,
                updated_at: front.updated_at,
                tags: front.tags,
                summary: front.summary,
            },
            (title, _) => fallback_metadata(title.or(heading), &messages),
        };

        Ok(Thread {
            id: front.id,
            metadata,
            messages,
        })
    }

    fn file_extension(&self) -> &'static str {
        ".md"
    }
}

/// Split a document into its YAML block and markdown body.
fn split_front_matter(text: &str) -> Result<(&str, &str)> {
    let rest = text
        .strip_prefix(DELIMITER)
        .ok_or_else(|| Error::Format("missing opening front matter delimiter".to_string()))?;
    let end = rest
        .find(CLOSING_DELIMITER)
        .ok_or_else(|| Error::Format("missing closing front matter delimiter".to_string()))?;

    Ok((&rest[..=end], &rest[end + CLOSING_DELIMITER.len()..]))
}

/// Parse the title heading and messages out of the body.
fn parse_body(body: &str) -> (Option<String>, Vec<Message>) {
    // (role, start of heading line, start of section after the heading line)
    let mut sections: Vec<(Role, usize, usize)> = Vec::new();
    let mut heading = None;
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        let bare = line.strip_suffix('\n').unwrap_or(line);
        if let Some(role) = bare.strip_prefix("## ").and_then(Role::from_label) {
            sections.push((role, offset, offset + line.len()));
        } else if sections.is_empty() && heading.is_none() {
            if let Some(title) = bare.strip_prefix("# ") {
                heading = Some(title.to_string());
            }
        }
        offset += line.len();
    }

    let messages = sections
        .iter()
        .enumerate()
        .map(|(i, &(role, _, start))| {
            let end = sections.get(i + 1).map_or(body.len(), |next| next.1);
            parse_section(role, &body[start..end])
        })
        .collect();

    (heading, messages)
}

/// Parse one message section: optional `_timestamp_` line, blank line, body.
fn parse_section(role: Role, raw: &str) -> Message {
    let mut rest = raw;
    let mut timestamp = None;

    if rest.starts_with('_') {
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_end];
        let parsed = line
            .strip_prefix('_')
            .and_then(|l| l.strip_suffix('_'))
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok());
        if let Some(ts) = parsed {
            timestamp = Some(ts.with_timezone(&Utc));
            rest = rest.get(line_end + 1..).unwrap_or_default();
        }
    }

    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let content = rest
        .strip_suffix("\n\n")
        .or_else(|| rest.strip_suffix('\n'))
        .unwrap_or(rest);

    Message {
        role,
        content: unescape_body(content),
        timestamp,
    }
}

const ESCAPE: char = '\\';

fn escape_body(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            if line.starts_with(['#', '_', ESCAPE]) {
                format!("{ESCAPE}{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_body(content: &str) -> String {
    content
        .split('\n')
        .map(|line| line.strip_prefix(ESCAPE).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}
