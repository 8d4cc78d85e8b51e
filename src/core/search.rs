//! Filtering and relevance ranking over stored threads.
//!
//! The engine walks `list()` in saved-at order, fetches each body, and keeps
//! the ones that pass every active criterion. Once `limit` matches are in
//! hand it stops fetching. Ranking happens afterwards, over that prefix only.

use crate::core::thread::{Thread, ThreadDescriptor};
use crate::error::{Error, Result};
use crate::storage::ThreadStore;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Score every result starts from.
pub const BASE_SCORE: u32 = 50;
const TITLE_BONUS: u32 = 30;
const SUMMARY_BONUS: u32 = 20;
const CONTENT_BONUS: u32 = 10;
const TAG_BONUS: u32 = 15;
const WEEK_BONUS: u32 = 10;
const MONTH_BONUS: u32 = 5;

const MAX_TOPICS: usize = 10;
const MAX_TITLE_TOPICS: usize = 5;

/// Filter and query criteria. Every field is optional; present ones are
/// AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Free text matched against title, summary and message content.
    pub query: Option<String>,

    /// Exact title.
    pub title: Option<String>,

    /// Case-insensitive title substring.
    pub title_contains: Option<String>,

    /// Earliest `createdAt`, inclusive.
    pub date_from: Option<DateTime<Utc>>,

    /// Latest `createdAt`, inclusive.
    pub date_to: Option<DateTime<Utc>>,

    /// Exact source application.
    pub source_app: Option<String>,

    /// Tags that must all be present (case-insensitive).
    pub tags: Option<Vec<String>>,

    /// Stop after this many matches.
    pub limit: Option<usize>,
}

impl SearchCriteria {
    /// Criteria with only a free-text query.
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// The term used for scoring: the query, else the title substring.
    #[must_use]
    pub fn term(&self) -> Option<&str> {
        non_empty(self.query.as_deref()).or_else(|| non_empty(self.title_contains.as_deref()))
    }

    /// Whether a thread passes every active criterion.
    #[must_use]
    pub fn matches(&self, thread: &Thread) -> bool {
        let metadata = &thread.metadata;

        if let Some(title) = &self.title {
            if metadata.title != *title {
                return false;
            }
        }

        if let Some(needle) = non_empty(self.title_contains.as_deref()) {
            if !contains_ignore_case(&metadata.title, needle) {
                return false;
            }
        }

        if self.date_from.is_some_and(|from| metadata.created_at < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| metadata.created_at > to) {
            return false;
        }

        if let Some(source_app) = &self.source_app {
            if metadata.source_app.as_ref() != Some(source_app) {
                return false;
            }
        }

        if let Some(wanted) = self.tags.as_deref().filter(|t| !t.is_empty()) {
            let have = metadata.tag_list();
            let all_present = wanted
                .iter()
                .all(|w| have.iter().any(|h| h.to_lowercase() == w.to_lowercase()));
            if !all_present {
                return false;
            }
        }

        if let Some(query) = non_empty(self.query.as_deref()) {
            let hit = contains_ignore_case(&metadata.title, query)
                || metadata
                    .summary
                    .as_deref()
                    .is_some_and(|s| contains_ignore_case(s, query))
                || thread
                    .messages
                    .iter()
                    .any(|m| contains_ignore_case(&m.content, query));
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Heuristic match quality for one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relevance {
    /// Total score.
    pub score: u32,

    /// Fields the term was found in, in the order they were checked.
    pub matched_fields: Vec<&'static str>,
}

/// Descriptive numbers reported alongside each result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDetails {
    /// Number of messages.
    pub message_count: usize,

    /// Whitespace-delimited tokens across all messages.
    pub word_count: usize,

    /// Up to ten topic hints.
    pub topics: Vec<String>,

    /// Whole days since the thread was saved.
    pub age_days: i64,
}

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Index entry.
    pub descriptor: ThreadDescriptor,

    /// Full thread body.
    pub thread: Thread,

    /// Score, when relevance was requested and a term was given.
    pub relevance: Option<Relevance>,

    /// Details, when relevance was requested.
    pub details: Option<ResultDetails>,
}

/// Run a search against a store.
///
/// # Errors
///
/// Returns an error if listing or fetching from the store fails.
pub fn search(
    store: &dyn ThreadStore,
    criteria: &SearchCriteria,
    include_relevance: bool,
) -> Result<Vec<SearchHit>> {
    search_at(store, criteria, include_relevance, Utc::now())
}

/// [`search`] with an explicit clock.
///
/// # Errors
///
/// Returns an error if listing or fetching from the store fails.
pub fn search_at(
    store: &dyn ThreadStore,
    criteria: &SearchCriteria,
    include_relevance: bool,
    now: DateTime<Utc>,
) -> Result<Vec<SearchHit>> {
    let limit = criteria.limit.unwrap_or(usize::MAX);
    let mut hits = Vec::new();
    let mut scanned = 0usize;

    for descriptor in store.list()? {
        if hits.len() >= limit {
            break;
        }
        scanned += 1;

        let Some(thread) = store.get(&descriptor.id)? else {
            continue;
        };
        if criteria.matches(&thread) {
            hits.push(SearchHit {
                descriptor,
                thread,
                relevance: None,
                details: None,
            });
        }
    }
    debug!(scanned, matched = hits.len(), "search scan finished");

    if include_relevance {
        let term = criteria.term();
        let content_eligible = non_empty(criteria.query.as_deref()).is_some();
        for hit in &mut hits {
            hit.details = Some(details(&hit.thread, &hit.descriptor, now));
            hit.relevance =
                term.map(|t| score(&hit.thread, &hit.descriptor, t, content_eligible, now));
        }
        if term.is_some() {
            hits.sort_by(|a, b| relevance_score(b).cmp(&relevance_score(a)));
        }
    }

    Ok(hits)
}

fn relevance_score(hit: &SearchHit) -> u32 {
    hit.relevance.as_ref().map_or(0, |r| r.score)
}

/// Score a thread against a term.
///
/// Message content only counts when the term came from a free-text query
/// (`content_eligible`), not from a title substring filter.
#[must_use]
pub fn score(
    thread: &Thread,
    descriptor: &ThreadDescriptor,
    term: &str,
    content_eligible: bool,
    now: DateTime<Utc>,
) -> Relevance {
    let metadata = &thread.metadata;
    let mut score = BASE_SCORE;
    let mut matched_fields = Vec::new();

    if contains_ignore_case(&metadata.title, term) {
        score += TITLE_BONUS;
        matched_fields.push("title");
    }

    if metadata
        .summary
        .as_deref()
        .is_some_and(|s| contains_ignore_case(s, term))
    {
        score += SUMMARY_BONUS;
        matched_fields.push("summary");
    }

    if content_eligible
        && thread
            .messages
            .iter()
            .any(|m| contains_ignore_case(&m.content, term))
    {
        score += CONTENT_BONUS;
        matched_fields.push("content");
    }

    if metadata
        .tag_list()
        .iter()
        .any(|tag| contains_ignore_case(tag, term))
    {
        score += TAG_BONUS;
        matched_fields.push("tags");
    }

    let age = now - descriptor.saved_at;
    if age < Duration::days(7) {
        score += WEEK_BONUS;
    } else if age < Duration::days(30) {
        score += MONTH_BONUS;
    }

    Relevance {
        score,
        matched_fields,
    }
}

/// Counts and topic hints for a result.
#[must_use]
pub fn details(thread: &Thread, descriptor: &ThreadDescriptor, now: DateTime<Utc>) -> ResultDetails {
    ResultDetails {
        message_count: thread.messages.len(),
        word_count: thread
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum(),
        topics: topics(thread),
        age_days: (now - descriptor.saved_at).num_days(),
    }
}

/// Topic hints: tags, long title words, and coarse content markers.
#[must_use]
pub fn topics(thread: &Thread) -> Vec<String> {
    let mut candidates: Vec<String> = thread.metadata.tag_list().to_vec();

    candidates.extend(
        thread
            .metadata
            .title
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.chars().count() > 3)
            .take(MAX_TITLE_TOPICS),
    );

    let looks_like_code = thread.messages.iter().any(|m| {
        m.content.contains("```") || m.content.contains("function ") || m.content.contains("class ")
    });
    if looks_like_code {
        candidates.push("code".to_string());
    }

    let looks_like_debugging = thread.messages.iter().any(|m| {
        let lowered = m.content.to_lowercase();
        ["error", "bug", "fix"].iter().any(|k| lowered.contains(k))
    });
    if looks_like_debugging {
        candidates.push("debugging".to_string());
    }

    let mut topics: Vec<String> = Vec::new();
    for candidate in candidates {
        if !topics.contains(&candidate) {
            topics.push(candidate);
        }
    }
    topics.truncate(MAX_TOPICS);
    topics
}

/// Which end of a day a date-only bound should snap to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// Midnight at the start of the day.
    Start,
    /// Last instant of the day.
    End,
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns a validation error if the value is neither.
pub fn parse_date_bound(value: &str, bound: DateBound) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{value}' (expected YYYY-MM-DD or RFC 3339)")))?;
    let time = match bound {
        DateBound::Start => NaiveTime::default(),
        DateBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
    };
    Ok(date.and_time(time).and_utc())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
