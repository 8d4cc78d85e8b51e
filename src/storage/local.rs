//! Filesystem storage backend with a JSON index.
//!
//! Layout of the base directory:
//!
//! ```text
//! index.json                      JSON array of ThreadDescriptor
//! rust-lifetimes-3f2a9c1e.json    one file per thread
//! standup-notes-77b0e4d2.md
//! ```
//!
//! The index is read on the first operation and kept in memory for the
//! lifetime of the store. Every change to it is flushed before the operation
//! returns. Nothing coordinates two stores pointed at the same directory:
//! the last index flush wins, so use one writer at a time.

use crate::core::{Format, SaveOptions, Thread, ThreadDescriptor};
use crate::error::{Error, Result};
use crate::format::formatter_for;
use crate::storage::traits::{ThreadStore, sort_newest_first};
use chrono::Utc;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Name of the index file inside the base directory.
pub const INDEX_FILE: &str = "index.json";

/// Maximum length of the title part of a filename.
const MAX_SLUG_LEN: usize = 100;

/// Number of id characters appended to the filename.
const ID_PREFIX_LEN: usize = 8;

type Index = BTreeMap<String, ThreadDescriptor>;

/// Index-backed storage in a local directory.
#[derive(Debug)]
pub struct LocalStore {
    base_dir: PathBuf,
    index: Mutex<Option<Index>>,
}

impl LocalStore {
    /// Create a store rooted at `base_dir`.
    ///
    /// Nothing is touched on disk until the first operation.
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            index: Mutex::new(None),
        }
    }

    /// Directory holding the index and thread files.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the index file.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE)
    }

    /// Lock the index, loading it from disk on first use.
    fn index(&self) -> Result<MutexGuard<'_, Option<Index>>> {
        let mut guard = self
            .index
            .lock()
            .map_err(|_| Error::InvalidState("index lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(self.load_index()?);
        }
        Ok(guard)
    }

    /// Run `f` against the loaded index.
    fn with_index<T>(&self, f: impl FnOnce(&mut Index) -> Result<T>) -> Result<T> {
        let mut guard = self.index()?;
        match guard.as_mut() {
            Some(index) => f(index),
            None => Err(Error::InvalidState("index not loaded".to_string())),
        }
    }

    fn load_index(&self) -> Result<Index> {
        let path = self.index_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Index::new()),
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<ThreadDescriptor> = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), entries = entries.len(), "loaded index");
        Ok(entries.into_iter().map(|d| (d.id.clone(), d)).collect())
    }

    fn flush(&self, index: &Index) -> Result<()> {
        let entries: Vec<&ThreadDescriptor> = index.values().collect();
        let contents = serde_json::to_string_pretty(&entries)?;
        fs::create_dir_all(&self.base_dir)?;
        write_atomic(&self.index_path(), &contents)
    }
}

impl ThreadStore for LocalStore {
    fn save(&self, thread: &Thread, options: &SaveOptions) -> Result<ThreadDescriptor> {
        let text = formatter_for(options.format).serialize(thread, options)?;
        let path = self
            .base_dir
            .join(thread_filename(thread.title(), &thread.id, options.format)?);

        fs::create_dir_all(&self.base_dir)?;
        write_atomic(&path, &text)?;

        let descriptor = ThreadDescriptor::local(thread, path, options.format, Utc::now());
        self.with_index(|index| {
            index.insert(thread.id.clone(), descriptor.clone());
            self.flush(index)
        })?;

        debug!(id = %thread.id, path = ?descriptor.file_path, "saved thread");
        Ok(descriptor)
    }

    fn list(&self) -> Result<Vec<ThreadDescriptor>> {
        let mut descriptors = self.with_index(|index| Ok(index.values().cloned().collect::<Vec<_>>()))?;
        sort_newest_first(&mut descriptors);
        Ok(descriptors)
    }

    fn get(&self, id: &str) -> Result<Option<Thread>> {
        let Some(descriptor) = self.with_index(|index| Ok(index.get(id).cloned()))? else {
            return Ok(None);
        };
        let path = descriptor
            .file_path
            .ok_or_else(|| Error::InvalidState(format!("index entry {id} has no file path")))?;

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(formatter_for(descriptor.format).deserialize(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(%id, path = %path.display(), "thread file missing, dropping index entry");
                self.with_index(|index| {
                    index.remove(id);
                    self.flush(index)
                })?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.with_index(|index| {
            let Some(descriptor) = index.get(id) else {
                return Ok(false);
            };

            if let Some(path) = &descriptor.file_path {
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(%id, "thread file already gone");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            index.remove(id);
            self.flush(index)?;
            debug!(%id, "deleted thread");
            Ok(true)
        })
    }
}

/// Write via a temp file and rename so readers never see a partial file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    fs::rename(&temp, path)?;
    Ok(())
}

/// Filesystem-safe filename for a thread.
///
/// The title is lowercased, every run of characters outside `[a-z0-9]`
/// becomes a single `-`, edge hyphens are stripped and the result is capped
/// at 100 characters. Then comes `-`, the first 8 characters of the id
/// (path separators and dots replaced by `_`) and the format extension.
///
/// # Errors
///
/// Returns an error if the separator pattern fails to compile.
pub fn thread_filename(title: &str, id: &str, format: Format) -> Result<String> {
    let separators =
        Regex::new(r"[^a-z0-9]+").map_err(|e| Error::InvalidState(e.to_string()))?;

    let lowered = title.to_lowercase();
    let collapsed = separators.replace_all(&lowered, "-");
    let slug: String = collapsed.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();

    let id_prefix: String = id
        .chars()
        .take(ID_PREFIX_LEN)
        .map(|c| if matches!(c, '/' | '\\' | '.') { '_' } else { c })
        .collect();

    Ok(format!("{slug}-{id_prefix}{}", format.extension()))
}
