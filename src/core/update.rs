//! Appending to and replacing saved threads.
//!
//! An update never edits a stored thread in place. It computes a new thread
//! value, deletes the old one by id and saves the new one under the same id.
//! Those are two separate store calls; if the save fails after the delete
//! succeeded, the thread is gone.

use crate::core::lookup::{ThreadTarget, locate};
use crate::core::thread::{Message, SaveOptions, Thread, ThreadDescriptor};
use crate::error::Result;
use crate::storage::ThreadStore;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

/// How incoming messages combine with the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Add after the existing messages.
    #[default]
    Append,

    /// Discard the existing messages.
    Replace,
}

/// Metadata fields an update may override. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    /// New title.
    pub title: Option<String>,

    /// New tag list.
    pub tags: Option<Vec<String>>,

    /// New summary.
    pub summary: Option<String>,
}

/// An update to apply to a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Incoming messages, in order.
    pub messages: Vec<Message>,

    /// Append or replace.
    pub mode: UpdateMode,

    /// In append mode, skip incoming messages whose role and content
    /// already appear in the thread.
    pub deduplicate: bool,

    /// Metadata overrides.
    pub overrides: MetadataOverrides,
}

impl UpdateRequest {
    /// Append with deduplication.
    #[must_use]
    pub fn append(messages: Vec<Message>) -> Self {
        Self {
            messages,
            mode: UpdateMode::Append,
            deduplicate: true,
            overrides: MetadataOverrides::default(),
        }
    }

    /// Replace all messages.
    #[must_use]
    pub fn replace(messages: Vec<Message>) -> Self {
        Self {
            mode: UpdateMode::Replace,
            ..Self::append(messages)
        }
    }
}

/// Result of applying an update to a thread value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The new thread.
    pub thread: Thread,

    /// Appended count in append mode; full message count in replace mode.
    pub messages_added: usize,
}

/// Result of updating a stored thread.
#[derive(Debug, Clone)]
pub enum UpdateResult {
    /// No thread matched the target.
    NotFound,

    /// The thread was rewritten.
    Updated {
        /// Descriptor of the newly saved thread.
        descriptor: ThreadDescriptor,

        /// The new thread.
        thread: Thread,

        /// See [`UpdateOutcome::messages_added`].
        messages_added: usize,
    },
}

/// Compute the thread an update produces.
#[must_use]
pub fn apply_update(existing: &Thread, request: &UpdateRequest, now: DateTime<Utc>) -> UpdateOutcome {
    let messages = match request.mode {
        UpdateMode::Replace => request.messages.clone(),
        UpdateMode::Append => {
            let mut messages = existing.messages.clone();
            for incoming in &request.messages {
                let seen = request.deduplicate
                    && existing.messages.iter().any(|m| m.same_turn(incoming));
                if !seen {
                    messages.push(incoming.clone());
                }
            }
            messages
        }
    };

    let messages_added = match request.mode {
        UpdateMode::Replace => messages.len(),
        UpdateMode::Append => messages.len() - existing.messages.len(),
    };

    let mut metadata = existing.metadata.clone();
    let overrides = &request.overrides;
    if let Some(title) = &overrides.title {
        metadata.title.clone_from(title);
    }
    if let Some(tags) = &overrides.tags {
        metadata.tags = Some(tags.clone());
    }
    if let Some(summary) = &overrides.summary {
        metadata.summary = Some(summary.clone());
    }
    metadata.updated_at = Some(now);

    UpdateOutcome {
        thread: Thread {
            id: existing.id.clone(),
            metadata,
            messages,
        },
        messages_added,
    }
}

/// Locate a thread, apply an update and persist the result.
///
/// The new thread keeps the format it was stored in; `defaults` supplies the
/// format when the store no longer lists the thread, and the
/// metadata/timestamp options always.
///
/// # Errors
///
/// Returns a validation error if the target names neither id nor title, or
/// any store error.
pub fn update_thread(
    store: &dyn ThreadStore,
    target: &ThreadTarget,
    request: &UpdateRequest,
    defaults: &SaveOptions,
) -> Result<UpdateResult> {
    update_thread_with(store, target, request, defaults, |_| {})
}

/// [`update_thread`] with a hook that may adjust the new thread before it is
/// saved.
///
/// # Errors
///
/// Same as [`update_thread`].
pub fn update_thread_with(
    store: &dyn ThreadStore,
    target: &ThreadTarget,
    request: &UpdateRequest,
    defaults: &SaveOptions,
    prepare: impl FnOnce(&mut Thread),
) -> Result<UpdateResult> {
    let Some(located) = locate(store, target)? else {
        debug!(target = %target.describe(), "update target not found");
        return Ok(UpdateResult::NotFound);
    };

    let UpdateOutcome {
        mut thread,
        messages_added,
    } = apply_update(&located.thread, request, Utc::now());
    prepare(&mut thread);

    let options = SaveOptions {
        format: located.descriptor.as_ref().map_or(defaults.format, |d| d.format),
        ..*defaults
    };

    store.delete(&thread.id)?;
    let descriptor = store.save(&thread, &options)?;
    debug!(id = %thread.id, messages_added, mode = ?request.mode, "updated thread");

    Ok(UpdateResult::Updated {
        descriptor,
        thread,
        messages_added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::thread::{Format, Role};
    use crate::storage::{LocalStore, MemoryStore};
    use tempfile::TempDir;

    fn user(content: &str) -> Message {
        Message::new(Role::User, content)
    }

    fn assistant(content: &str) -> Message {
        Message::new(Role::Assistant, content)
    }

    #[test]
    fn append_skips_duplicates() {
        let existing = Thread::new("Demo", vec![user("hi")]);
        let request = UpdateRequest::append(vec![user("hi"), assistant("hello")]);

        let outcome = apply_update(&existing, &request, Utc::now());

        assert_eq!(outcome.thread.messages, vec![user("hi"), assistant("hello")]);
        assert_eq!(outcome.messages_added, 1);
    }

    #[test]
    fn dedup_ignores_timestamps() {
        let existing = Thread::new("Demo", vec![user("hi")]);
        let request = UpdateRequest::append(vec![user("hi").at(Utc::now())]);

        let outcome = apply_update(&existing, &request, Utc::now());
        assert_eq!(outcome.thread.messages.len(), 1);
        assert_eq!(outcome.messages_added, 0);
    }

    #[test]
    fn dedup_only_compares_against_existing() {
        // Two identical incoming messages are both new relative to the thread.
        let existing = Thread::new("Demo", vec![]);
        let request = UpdateRequest::append(vec![user("again"), user("again")]);

        let outcome = apply_update(&existing, &request, Utc::now());
        assert_eq!(outcome.messages_added, 2);
    }

    #[test]
    fn append_without_dedup_keeps_everything() {
        let existing = Thread::new("Demo", vec![user("hi")]);
        let mut request = UpdateRequest::append(vec![user("hi"), assistant("hello")]);
        request.deduplicate = false;

        let outcome = apply_update(&existing, &request, Utc::now());
        assert_eq!(
            outcome.thread.messages,
            vec![user("hi"), user("hi"), assistant("hello")]
        );
        assert_eq!(outcome.messages_added, 2);
    }

    #[test]
    fn replace_discards_existing() {
        let existing = Thread::new("Demo", vec![user("a"), assistant("b"), user("c")]);
        let request = UpdateRequest::replace(vec![user("only")]);

        let outcome = apply_update(&existing, &request, Utc::now());
        assert_eq!(outcome.thread.messages, vec![user("only")]);
        assert_eq!(outcome.messages_added, 1);
    }

    #[test]
    fn metadata_overrides_and_retention() {
        let mut existing = Thread::new("Old", vec![]);
        existing.metadata.summary = Some("keep me".to_string());
        existing.metadata.tags = Some(vec!["old".to_string()]);
        let now = Utc::now();

        let mut request = UpdateRequest::append(vec![]);
        request.overrides.title = Some("New".to_string());
        request.overrides.tags = Some(vec!["new".to_string()]);

        let outcome = apply_update(&existing, &request, now);
        let metadata = &outcome.thread.metadata;
        assert_eq!(outcome.thread.id, existing.id);
        assert_eq!(metadata.title, "New");
        assert_eq!(metadata.tags, Some(vec!["new".to_string()]));
        assert_eq!(metadata.summary.as_deref(), Some("keep me"));
        assert_eq!(metadata.created_at, existing.metadata.created_at);
        assert_eq!(metadata.updated_at, Some(now));
    }

    #[test]
    fn update_unknown_target_is_not_found() {
        let store = MemoryStore::new();
        let result = update_thread(
            &store,
            &ThreadTarget::by_id("missing"),
            &UpdateRequest::append(vec![user("hi")]),
            &SaveOptions::default(),
        )
        .unwrap();
        assert!(matches!(result, UpdateResult::NotFound));
    }

    #[test]
    fn update_without_target_is_validation_error() {
        let store = MemoryStore::new();
        let err = update_thread(
            &store,
            &ThreadTarget::default(),
            &UpdateRequest::append(vec![]),
            &SaveOptions::default(),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn repeated_appends_stay_deduplicated() {
        let store = MemoryStore::new();
        let thread = Thread::new("Demo", vec![user("hi")]);
        store.save(&thread, &SaveOptions::default()).unwrap();
        let target = ThreadTarget::by_id(&thread.id);
        let request = UpdateRequest::append(vec![assistant("hello")]);

        update_thread(&store, &target, &request, &SaveOptions::default()).unwrap();
        update_thread(&store, &target, &request, &SaveOptions::default()).unwrap();

        let stored = store.get(&thread.id).unwrap().unwrap();
        assert_eq!(stored.messages, vec![user("hi"), assistant("hello")]);
    }

    #[test]
    fn update_keeps_stored_format_and_replaces_file() {
        let temp = TempDir::new().unwrap();
        let store = LocalStore::new(temp.path().to_path_buf());
        let thread = Thread::new("Notes", vec![user("hi")]);
        let original = store
            .save(&thread, &SaveOptions::with_format(Format::Markdown))
            .unwrap();

        let mut request = UpdateRequest::append(vec![assistant("hello")]);
        request.overrides.title = Some("Renamed notes".to_string());
        let result = update_thread(
            &store,
            &ThreadTarget::by_title("Notes"),
            &request,
            &SaveOptions::default(),
        )
        .unwrap();

        let UpdateResult::Updated {
            descriptor,
            messages_added,
            ..
        } = result
        else {
            panic!("expected update");
        };
        assert_eq!(messages_added, 1);
        assert_eq!(descriptor.id, thread.id);
        assert_eq!(descriptor.format, Format::Markdown);
        assert!(!original.file_path.unwrap().exists());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Renamed notes");
        assert_eq!(store.get(&thread.id).unwrap().unwrap().messages.len(), 2);
    }

    #[test]
    fn prepare_hook_runs_before_save() {
        let store = MemoryStore::new();
        let thread = Thread::new("Demo", vec![user("hi")]);
        store.save(&thread, &SaveOptions::default()).unwrap();

        update_thread_with(
            &store,
            &ThreadTarget::by_id(&thread.id),
            &UpdateRequest::append(vec![]),
            &SaveOptions::default(),
            |t| t.metadata.summary = Some("generated".to_string()),
        )
        .unwrap();

        let stored = store.get(&thread.id).unwrap().unwrap();
        assert_eq!(stored.metadata.summary.as_deref(), Some("generated"));
    }
}
