/*!
# WIP Rust Implementation

A Weather Information Protocol (WIP) client library: a bit-packed UDP
request/response protocol for lightweight weather data transfer, built
around four server roles (weather, location, query, report) sharing one
packet codec.

## Architecture

- **Packet layer** (`wip_common_rs::packet`): bit-level primitives, the
  16-byte fixed header, optional fixed response bodies, extended (TLV)
  fields, and the per-role packet types built on top of them.
- **Client layer** (`wip_common_rs::clients`): one synchronous client per
  server role, sharing a connection pool and packet-ID generator.
- **Cache layer** (`wip_common_rs::cache`): an in-memory, policy-evicted
  cache and a file-backed persistent cache.
- **Auth** (`wip_common_rs::auth`): HMAC-SHA256 packet signatures, the
  request/response auth hash, and bearer-style API tokens.
- **Orchestrator** (`wip_common_rs::client::WipClient`): composes the four
  role clients behind one handle.

## Quick start

```no_run
use wip_protocol::prelude::*;

let client = WipClient::new("127.0.0.1");
client.set_area_code(460_010);
let weather = client.get_weather(true, true, true, false, false, 0, true)?;
# Ok::<(), wip_protocol::wip_common_rs::packet::core::WipError>(())
```

## Packet format

- **Header**: 16 bytes, version(4) packet_id(12) type(3) flags(8) day(3)
  reserved(2) timestamp(64) area_code(20) checksum(12).
- **Fixed body** (weather/report responses only): weather_code(16)
  temperature(8, +100 bias) precipitation_prob(8).
- **Extended fields**: TLV, up to 16 per packet, 1500-byte packet cap.
*/

pub mod wip_common_rs;

/// Common imports for WIP Rust users.
pub mod prelude {
    // Client APIs
    pub use crate::wip_common_rs::client::{WipClient, WipClientConfig};
    pub use crate::wip_common_rs::clients::{LocationClient, QueryClient, ReportClient, WeatherClient};

    // Packet types
    pub use crate::wip_common_rs::packet::types::{
        ErrorResponse, LocationRequest, LocationResponse, QueryRequest, QueryResponse, ReportRequest,
        ReportResponse, WeatherRequest, WeatherResponse,
    };

    // Core primitives
    pub use crate::wip_common_rs::packet::core::{
        Codec, Flags, Header, PacketType, WeatherBody, WipError, WipResult,
    };

    // Caches
    pub use crate::wip_common_rs::cache::{EvictionPolicy, MemoryCache, PersistentCache};

    // Auth
    pub use crate::wip_common_rs::auth::ApiToken;
}
