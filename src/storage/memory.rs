//! In-memory storage backend for testing.

use crate::core::{SaveOptions, Thread, ThreadDescriptor};
use crate::error::{Error, Result};
use crate::format::formatter_for;
use crate::storage::traits::{ThreadStore, sort_newest_first};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage backend.
///
/// Documents go through the same formatters as the other backends, so
/// `include_metadata`/`include_timestamps` behave identically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    threads: RwLock<HashMap<String, (ThreadDescriptor, String)>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Save with an explicit `saved_at`, for tests that depend on recency.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be serialized.
    pub fn save_at(
        &self,
        thread: &Thread,
        options: &SaveOptions,
        saved_at: DateTime<Utc>,
    ) -> Result<ThreadDescriptor> {
        let text = formatter_for(options.format).serialize(thread, options)?;
        let descriptor = ThreadDescriptor::remote(
            thread,
            format!("memory://{}", thread.id),
            options.format,
            saved_at,
        );
        self.threads
            .write()
            .map_err(|_| Error::InvalidState("memory store lock poisoned".to_string()))?
            .insert(thread.id.clone(), (descriptor.clone(), text));
        Ok(descriptor)
    }
}

impl ThreadStore for MemoryStore {
    fn save(&self, thread: &Thread, options: &SaveOptions) -> Result<ThreadDescriptor> {
        self.save_at(thread, options, Utc::now())
    }

    fn list(&self) -> Result<Vec<ThreadDescriptor>> {
        let threads = self
            .threads
            .read()
            .map_err(|_| Error::InvalidState("memory store lock poisoned".to_string()))?;
        let mut descriptors: Vec<ThreadDescriptor> =
            threads.values().map(|(d, _)| d.clone()).collect();
        sort_newest_first(&mut descriptors);
        Ok(descriptors)
    }

    fn get(&self, id: &str) -> Result<Option<Thread>> {
        let threads = self
            .threads
            .read()
            .map_err(|_| Error::InvalidState("memory store lock poisoned".to_string()))?;
        threads
            .get(id)
            .map(|(descriptor, text)| formatter_for(descriptor.format).deserialize(text))
            .transpose()
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut threads = self
            .threads
            .write()
            .map_err(|_| Error::InvalidState("memory store lock poisoned".to_string()))?;
        Ok(threads.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Format, Message, Role};
    use chrono::Duration;

    fn demo_thread(title: &str) -> Thread {
        Thread::new(title, vec![Message::new(Role::User, "hi")])
    }

    #[test]
    fn get_missing_thread() {
        let store = MemoryStore::new();
        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn save_and_get_thread() {
        let store = MemoryStore::new();
        let thread = demo_thread("Demo");
        store.save(&thread, &SaveOptions::default()).unwrap();
        assert_eq!(store.get(&thread.id).unwrap().unwrap(), thread);
    }

    #[test]
    fn options_are_honored() {
        let store = MemoryStore::new();
        let thread = Thread::new("T", vec![Message::new(Role::User, "hi").at(Utc::now())]);
        let options = SaveOptions {
            format: Format::Markdown,
            include_metadata: true,
            include_timestamps: false,
        };
        store.save(&thread, &options).unwrap();
        let loaded = store.get(&thread.id).unwrap().unwrap();
        assert!(loaded.messages[0].timestamp.is_none());
    }

    #[test]
    fn list_orders_by_saved_at() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = demo_thread("old");
        let new = demo_thread("new");
        store
            .save_at(&old, &SaveOptions::default(), now - Duration::days(3))
            .unwrap();
        store.save_at(&new, &SaveOptions::default(), now).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed[0].id, new.id);
        assert_eq!(listed[1].id, old.id);
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryStore::new();
        let thread = demo_thread("Demo");
        store.save(&thread, &SaveOptions::default()).unwrap();

        assert!(store.delete(&thread.id).unwrap());
        assert!(!store.delete(&thread.id).unwrap());
        assert!(store.get(&thread.id).unwrap().is_none());
    }

    #[test]
    fn concurrent_writes() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..10 {
                    store
                        .save(&demo_thread(&format!("t-{i}-{j}")), &SaveOptions::default())
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.list().unwrap().len(), 80);
    }
}
