//! Client-side support: packet-ID generation, connection pooling, and the
//! UDP transport built on top of a pooled socket.

pub mod connection_pool;
pub mod packet_id_generator;
pub mod retry;
pub mod transport;

pub use connection_pool::{ConnectionState, PoolConfig, PooledConnection, UdpConnectionPool};
pub use packet_id_generator::PacketIdGenerator;
pub use retry::RetryPolicy;
pub use transport::Transport;
