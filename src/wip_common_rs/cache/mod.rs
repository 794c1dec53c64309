//! Two-level response cache (§4.I/§4.J): an in-memory, policy-evicted
//! cache for hot lookups and a file-backed persistent cache for data that
//! should survive process restarts.

pub mod memory;
pub mod persistent;

pub use memory::{EvictionPolicy, MemoryCache};
pub use persistent::PersistentCache;
