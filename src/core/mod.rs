//! Core types: threads, search and updates.

pub mod lookup;
pub mod search;
pub mod thread;
pub mod update;

pub use lookup::{Located, ThreadTarget, locate};
pub use search::{SearchCriteria, SearchHit, search};
pub use thread::{
    Format, Message, Role, SaveOptions, Thread, ThreadDescriptor, ThreadMetadata, generate_id,
};
pub use update::{UpdateMode, UpdateRequest, UpdateResult, apply_update, update_thread};
