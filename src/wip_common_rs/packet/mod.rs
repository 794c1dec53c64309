//! Packet codec: bit-level primitives, the fixed header, extended (TLV)
//! fields and the per-role packet types built on top of them.

pub mod core;
pub mod types;
