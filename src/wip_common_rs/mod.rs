//! WIP client core, reorganized around the hard-core components of the
//! protocol: packet codec, authentication, transport, connection pool,
//! caches and the orchestrating client.

pub mod auth;
pub mod cache;
pub mod client;
pub mod clients;
pub mod packet;
