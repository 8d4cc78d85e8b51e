//! Storage backends for conversation threads.

pub mod local;
pub mod memory;
pub mod remote;
pub mod traits;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use traits::ThreadStore;
