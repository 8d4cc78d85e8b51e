//! Storage trait definitions.

use crate::core::{SaveOptions, Thread, ThreadDescriptor};
use crate::error::Result;

/// Storage backend for conversation threads.
///
/// Implementations differ only in where bytes live; search and update work
/// against this trait and never see the backend.
pub trait ThreadStore: Send + Sync {
    /// Persist a thread and return its descriptor.
    ///
    /// Saving an id that already exists overwrites its index entry. Any
    /// previously written document is left in place; replace-by-id is
    /// delete followed by save.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, thread: &Thread, options: &SaveOptions) -> Result<ThreadDescriptor>;

    /// All saved threads, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn list(&self) -> Result<Vec<ThreadDescriptor>>;

    /// Load a thread by id. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get(&self, id: &str) -> Result<Option<Thread>>;

    /// Remove a thread. Returns `false` if the id was unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn delete(&self, id: &str) -> Result<bool>;
}

/// Sort descriptors most recently saved first. Stable for equal timestamps.
pub fn sort_newest_first(descriptors: &mut [ThreadDescriptor]) {
    descriptors.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
}
