//! Locating a thread by id or title.

use crate::core::thread::{Thread, ThreadDescriptor};
use crate::error::{Error, Result};
use crate::storage::ThreadStore;

/// How a caller identifies the thread to act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadTarget {
    /// Thread id. Takes precedence over `title`.
    pub id: Option<String>,

    /// Exact title.
    pub title: Option<String>,
}

impl ThreadTarget {
    /// Target a thread by id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: None,
        }
    }

    /// Target a thread by exact title.
    #[must_use]
    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: Some(title.into()),
        }
    }

    /// Human-readable description for messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.id, &self.title) {
            (Some(id), _) => format!("id '{id}'"),
            (None, Some(title)) => format!("title '{title}'"),
            (None, None) => "nothing".to_string(),
        }
    }
}

/// A thread together with its index entry.
#[derive(Debug, Clone)]
pub struct Located {
    /// Index entry, if the store still lists the thread.
    pub descriptor: Option<ThreadDescriptor>,

    /// Full thread body.
    pub thread: Thread,
}

/// Find a thread by id, or by exact title scanning `list()` newest first.
///
/// Title lookup fetches every candidate body in turn and takes the first
/// whose title matches.
///
/// # Errors
///
/// Returns a validation error if neither id nor title is given, or any
/// store error.
pub fn locate(store: &dyn ThreadStore, target: &ThreadTarget) -> Result<Option<Located>> {
    let id = target.id.as_deref().filter(|s| !s.is_empty());
    let title = target.title.as_deref().filter(|s| !s.is_empty());

    if let Some(id) = id {
        let Some(thread) = store.get(id)? else {
            return Ok(None);
        };
        let descriptor = store.list()?.into_iter().find(|d| d.id == id);
        return Ok(Some(Located { descriptor, thread }));
    }

    let Some(title) = title else {
        return Err(Error::Validation(
            "Either id or title must be provided".to_string(),
        ));
    };

    for descriptor in store.list()? {
        if let Some(thread) = store.get(&descriptor.id)? {
            if thread.title() == title {
                return Ok(Some(Located {
                    descriptor: Some(descriptor),
                    thread,
                }));
            }
        }
    }

    Ok(None)
}
