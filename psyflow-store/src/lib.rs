//! Persistence adapters for session data.
//!
//! Every backend implements [`PersistenceAdapter`]: one call per record while
//! the session runs, one bulk call at the end. Calls are independent and may
//! overlap.

pub mod adapter;
pub mod file;
pub mod http;
pub mod memory;

pub use adapter::PersistenceAdapter;
pub use file::FileStore;
pub use http::{HttpStore, RetryPolicy};
pub use memory::MemoryStore;
