//! Location role UDP client (§4.K), default port 4109 (§6).
//!
//! Grounded on the teacher's `location_client.rs` coordinate-bounds
//! validation and cache-key normalization, stripped of its tokio
//! async/`Arc<RwLock<_>>` scaffolding in favor of the shared synchronous
//! pool/transport layers and a plain `Mutex`-guarded in-process cache.

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::wip_common_rs::clients::utils::{
    transport::DEFAULT_TIMEOUT, PacketIdGenerator, RetryPolicy, Transport, UdpConnectionPool,
};
use crate::wip_common_rs::packet::core::{WipError, WipResult};
use crate::wip_common_rs::packet::types::{LocationRequest, LocationResponse};

pub const DEFAULT_PORT: u16 = 4109;

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug, Clone)]
pub struct CoordinateBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl CoordinateBounds {
    pub fn world() -> Self {
        Self {
            min_latitude: -90.0,
            max_latitude: 90.0,
            min_longitude: -180.0,
            max_longitude: 180.0,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

impl Default for CoordinateBounds {
    fn default() -> Self {
        Self::world()
    }
}

#[derive(Debug, Clone)]
pub struct LocationClientConfig {
    pub timeout: Duration,
    pub precision_digits: u8,
    pub bounds: CoordinateBounds,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for LocationClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            precision_digits: 6,
            bounds: CoordinateBounds::world(),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(3600),
            retry: RetryPolicy::default(),
        }
    }
}

struct CachedArea {
    area_code: u32,
    cached_at: Instant,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocationStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Debug)]
pub struct LocationClient {
    host: String,
    port: u16,
    pool: Arc<UdpConnectionPool>,
    packet_ids: PacketIdGenerator,
    config: LocationClientConfig,
    cache: Mutex<HashMap<String, CachedArea>>,
    stats: Mutex<LocationStats>,
}

impl LocationClient {
    pub fn new(host: impl Into<String>, port: u16, pool: Arc<UdpConnectionPool>) -> Self {
        Self::with_config(host, port, pool, LocationClientConfig::default())
    }

    pub fn with_config(
        host: impl Into<String>,
        port: u16,
        pool: Arc<UdpConnectionPool>,
        config: LocationClientConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            pool,
            packet_ids: PacketIdGenerator::new(),
            config,
            cache: Mutex::new(HashMap::new()),
            stats: Mutex::new(LocationStats::default()),
        }
    }

    fn cache_key(&self, latitude: f64, longitude: f64) -> String {
        let precision = 10_f64.powi(self.config.precision_digits as i32);
        let lat = (latitude * precision).round() / precision;
        let lon = (longitude * precision).round() / precision;
        format!("{lat}:{lon}")
    }

    /// Resolves `(latitude, longitude)` to an area code (§8 scenario 2),
    /// validating against `config.bounds` and consulting the in-process
    /// cache first.
    pub fn resolve_coordinates(&self, latitude: f64, longitude: f64) -> WipResult<u32> {
        self.stats.lock().unwrap().total_requests += 1;

        if !self.config.bounds.contains(latitude, longitude) {
            return Err(WipError::InvalidField(format!(
                "coordinates ({latitude}, {longitude}) outside allowed bounds"
            )));
        }

        let key = self.cache_key(latitude, longitude);
        if self.config.cache_enabled {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.get(&key) {
                if cached.cached_at.elapsed() <= self.config.cache_ttl {
                    self.stats.lock().unwrap().cache_hits += 1;
                    debug!("location cache hit for ({latitude}, {longitude})");
                    return Ok(cached.area_code);
                }
            }
        }
        self.stats.lock().unwrap().cache_misses += 1;

        let area_code = self.config.retry.run(|attempt| {
            if attempt > 1 {
                warn!("location request attempt {attempt} timed out, retrying");
            }
            self.send_location_request(latitude, longitude)
        })?;

        if self.config.cache_enabled {
            let mut cache = self.cache.lock().unwrap();
            cache.insert(
                key,
                CachedArea {
                    area_code,
                    cached_at: Instant::now(),
                },
            );
            cache.retain(|_, v| v.cached_at.elapsed() <= self.config.cache_ttl);
        }

        Ok(area_code)
    }

    fn send_location_request(&self, latitude: f64, longitude: f64) -> WipResult<u32> {
        let packet_id = self.packet_ids.next_id();
        let request = LocationRequest::new(packet_id, now_unix_secs(), latitude, longitude)?;

        let conn = self.pool.acquire(&self.host, self.port)?;
        let bytes = request.encode()?;
        let transport = Transport::new(&conn.socket, self.config.timeout);
        let result = transport
            .send(&bytes, packet_id)
            .and_then(|data| LocationResponse::decode(&data))
            .map(|resp| resp.area_code());

        match &result {
            Ok(_) => self.pool.release(conn),
            Err(WipError::InvalidPacket(_)) | Err(WipError::AuthFailed(_)) => {
                warn!("invalidating connection after fatal error");
                self.pool.invalidate(conn);
            }
            Err(_) => self.pool.release(conn),
        }
        result
    }

    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn stats(&self) -> LocationStats {
        *self.stats.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wip_common_rs::clients::utils::PoolConfig;
    use std::net::UdpSocket;

    #[test]
    fn scenario_2_resolve_coordinates_round_trips_through_loopback_server() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = LocationRequest::decode(&buf[..len]).unwrap();
            let resp = LocationResponse::new(req.header.packet_id, req.header.timestamp, 460_010);
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = LocationClient::new("127.0.0.1", port, pool);
        let area_code = client.resolve_coordinates(35.6895, 139.6917).unwrap();
        assert_eq!(area_code, 460_010);
        handle.join().unwrap();
    }

    #[test]
    fn out_of_bounds_coordinates_are_rejected_before_sending() {
        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = LocationClient::with_config(
            "127.0.0.1",
            1,
            pool,
            LocationClientConfig {
                bounds: CoordinateBounds {
                    min_latitude: 24.0,
                    max_latitude: 46.0,
                    min_longitude: 123.0,
                    max_longitude: 146.0,
                },
                ..Default::default()
            },
        );
        let err = client.resolve_coordinates(0.0, 0.0).unwrap_err();
        assert!(matches!(err, WipError::InvalidField(_)));
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = LocationRequest::decode(&buf[..len]).unwrap();
            let resp = LocationResponse::new(req.header.packet_id, req.header.timestamp, 13_101);
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = LocationClient::new("127.0.0.1", port, pool);
        assert_eq!(client.resolve_coordinates(35.0, 139.0).unwrap(), 13_101);
        assert_eq!(client.resolve_coordinates(35.0, 139.0).unwrap(), 13_101);
        assert_eq!(client.stats().cache_hits, 1);
        handle.join().unwrap();
    }
}
