//! Query role UDP client (§4.K), default port 4111 (§6).
//!
//! Grounded on the teacher's `query_client.rs` retry/backoff and response
//! cache config, converted from tokio `Semaphore`/async retry loops to a
//! plain synchronous retry loop over the shared transport/pool layers.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::wip_common_rs::clients::utils::{
    transport::DEFAULT_TIMEOUT, PacketIdGenerator, RetryPolicy, Transport, UdpConnectionPool,
};
use crate::wip_common_rs::packet::core::{Flags, WipError, WipResult};
use crate::wip_common_rs::packet::types::{QueryRequest, QueryResponse};

pub const DEFAULT_PORT: u16 = 4111;

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug, Clone)]
pub struct QueryClientConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

struct CacheEntry {
    response: QueryResponse,
    cached_at: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryStats {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retries: u64,
}

#[derive(Debug)]
pub struct QueryClient {
    host: String,
    port: u16,
    pool: Arc<UdpConnectionPool>,
    packet_ids: PacketIdGenerator,
    config: QueryClientConfig,
    cache: Mutex<HashMap<u32, CacheEntry>>,
    stats: Mutex<QueryStats>,
}

impl QueryClient {
    pub fn new(host: impl Into<String>, port: u16, pool: Arc<UdpConnectionPool>) -> Self {
        Self::with_config(host, port, pool, QueryClientConfig::default())
    }

    pub fn with_config(
        host: impl Into<String>,
        port: u16,
        pool: Arc<UdpConnectionPool>,
        config: QueryClientConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            pool,
            packet_ids: PacketIdGenerator::new(),
            config,
            cache: Mutex::new(HashMap::new()),
            stats: Mutex::new(QueryStats::default()),
        }
    }

    /// Runs a type-6 query for `area_code`, retrying on timeout/retryable
    /// io_error per `config.retry`'s exponential backoff schedule (§4.K, §4.G).
    pub fn query(&self, area_code: u32, flags: Flags, day: u8) -> WipResult<QueryResponse> {
        self.stats.lock().unwrap().total_queries += 1;

        if self.config.cache_enabled {
            let cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get(&area_code) {
                if entry.cached_at.elapsed() <= self.config.cache_ttl {
                    self.stats.lock().unwrap().cache_hits += 1;
                    return Ok(entry.response.clone());
                }
            }
        }
        self.stats.lock().unwrap().cache_misses += 1;

        let result = self.config.retry.run(|attempt| {
            if attempt > 1 {
                self.stats.lock().unwrap().retries += 1;
                warn!("query attempt {attempt} timed out, retrying");
            }
            self.send_query(area_code, flags, day)
        });

        match &result {
            Ok(response) => {
                self.stats.lock().unwrap().successful_queries += 1;
                if self.config.cache_enabled {
                    let mut cache = self.cache.lock().unwrap();
                    cache.insert(
                        area_code,
                        CacheEntry {
                            response: response.clone(),
                            cached_at: Instant::now(),
                        },
                    );
                    cache.retain(|_, v| v.cached_at.elapsed() <= self.config.cache_ttl);
                }
            }
            Err(_) => {
                self.stats.lock().unwrap().failed_queries += 1;
            }
        }
        result
    }

    fn send_query(&self, area_code: u32, flags: Flags, day: u8) -> WipResult<QueryResponse> {
        let packet_id = self.packet_ids.next_id();
        let request = QueryRequest::new(area_code, packet_id, now_unix_secs(), flags, day);

        let conn = self.pool.acquire(&self.host, self.port)?;
        let bytes = request.encode()?;
        let transport = Transport::new(&conn.socket, self.config.timeout);
        let result = transport
            .send(&bytes, packet_id)
            .and_then(|data| QueryResponse::decode(&data));

        match &result {
            Ok(_) => self.pool.release(conn),
            Err(WipError::InvalidPacket(_)) | Err(WipError::AuthFailed(_)) => {
                debug!("invalidating connection after fatal error");
                self.pool.invalidate(conn);
            }
            Err(_) => self.pool.release(conn),
        }
        result
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn stats(&self) -> QueryStats {
        *self.stats.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wip_common_rs::clients::utils::PoolConfig;
    use crate::wip_common_rs::packet::core::WeatherBody;
    use crate::wip_common_rs::packet::types::weather::WeatherResponse;
    use std::net::UdpSocket;

    #[test]
    fn query_round_trips_through_loopback_server() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = QueryRequest::decode(&buf[..len]).unwrap();
            let body = WeatherBody {
                weather_code: 300,
                temperature: 10,
                precipitation_prob: 0,
            };
            let resp = WeatherResponse::new(
                req.header.packet_id,
                req.header.area_code,
                req.header.timestamp,
                body,
                req.header.flags,
            );
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = QueryClient::new("127.0.0.1", port, pool);
        let flags = Flags {
            weather: true,
            ..Default::default()
        };
        let resp = client.query(460_010, flags, 0).unwrap();
        assert_eq!(resp.body.weather_code, 300);
        handle.join().unwrap();
    }

    #[test]
    fn repeated_queries_hit_the_cache() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = QueryRequest::decode(&buf[..len]).unwrap();
            let body = WeatherBody {
                weather_code: 1,
                temperature: 0,
                precipitation_prob: 0,
            };
            let resp = WeatherResponse::new(
                req.header.packet_id,
                req.header.area_code,
                req.header.timestamp,
                body,
                req.header.flags,
            );
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = QueryClient::new("127.0.0.1", port, pool);
        let flags = Flags::default();
        client.query(1, flags, 0).unwrap();
        client.query(1, flags, 0).unwrap();
        assert_eq!(client.stats().cache_hits, 1);
        handle.join().unwrap();
    }
}
