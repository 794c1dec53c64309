//! The unified client (§4.K): composes the four role clients behind one
//! handle, sharing a single connection pool and consulting the in-memory
//! cache before resolving coordinates or issuing a weather query.
//!
//! Grounded in the teacher's `client.rs` struct shape and method names
//! (`set_area_code`, `set_coordinates`, `get_weather`, `send_report`),
//! converted from `async fn` to blocking `fn` per §5.

use std::sync::Arc;
use std::time::Duration;

use crate::wip_common_rs::cache::{EvictionPolicy, MemoryCache};
use crate::wip_common_rs::clients::utils::{PoolConfig, UdpConnectionPool};
use crate::wip_common_rs::clients::{LocationClient, QueryClient, ReportClient, WeatherClient};
use crate::wip_common_rs::packet::core::{Flags, WeatherBody, WipError, WipResult};
use crate::wip_common_rs::packet::types::{QueryResponse, ReportResponse};

#[derive(Debug, Clone)]
pub struct WipClientConfig {
    pub weather_port: u16,
    pub location_port: u16,
    pub query_port: u16,
    pub report_port: u16,
    pub pool: PoolConfig,
}

impl Default for WipClientConfig {
    fn default() -> Self {
        Self {
            weather_port: crate::wip_common_rs::clients::weather_client::DEFAULT_PORT,
            location_port: crate::wip_common_rs::clients::location_client::DEFAULT_PORT,
            query_port: crate::wip_common_rs::clients::query_client::DEFAULT_PORT,
            report_port: crate::wip_common_rs::clients::report_client::DEFAULT_PORT,
            pool: PoolConfig::default(),
        }
    }
}

/// Normalises a raw area code to the canonical six-digit form (§4.K step 1:
/// "normalise inputs"): formatted as a decimal string, truncated to the
/// first six characters if longer, left-zero-padded to six digits if
/// shorter, then reparsed. Mirrors the teacher's
/// `query_packet.rs::create_query_request` normalisation.
fn normalize_area_code(area_code: u32) -> u32 {
    let raw = area_code.to_string();
    let normalized = if raw.len() >= 6 { raw[..6].to_string() } else { format!("{raw:0>6}") };
    normalized.parse::<u32>().unwrap_or(0)
}

/// One handle composing the weather/location/query/report clients against
/// a single host, sharing one connection pool across all four roles.
#[derive(Debug)]
pub struct WipClient {
    pub weather: WeatherClient,
    pub location: LocationClient,
    pub query: QueryClient,
    pub report: ReportClient,
    area_code: std::sync::Mutex<Option<u32>>,
    coordinates: std::sync::Mutex<Option<(f64, f64)>>,
    area_cache: MemoryCache<u32>,
}

impl WipClient {
    pub fn new(host: &str) -> Self {
        Self::with_config(host, WipClientConfig::default())
    }

    pub fn with_config(host: &str, config: WipClientConfig) -> Self {
        let pool = UdpConnectionPool::new(config.pool);
        Self {
            weather: WeatherClient::new(host, config.weather_port, Arc::clone(&pool)),
            location: LocationClient::new(host, config.location_port, Arc::clone(&pool)),
            query: QueryClient::new(host, config.query_port, Arc::clone(&pool)),
            report: ReportClient::new(host, config.report_port, pool),
            area_code: std::sync::Mutex::new(None),
            coordinates: std::sync::Mutex::new(None),
            area_cache: MemoryCache::with_options(
                Duration::from_secs(3600),
                256,
                EvictionPolicy::Lru,
                Duration::from_secs(60),
            ),
        }
    }

    pub fn set_area_code(&self, area_code: u32) {
        *self.area_code.lock().unwrap() = Some(normalize_area_code(area_code));
    }

    /// Resolves `(latitude, longitude)` to an area code, consulting the
    /// in-memory cache before issuing a location request (§4.K).
    pub fn set_coordinates(&self, latitude: f64, longitude: f64) -> WipResult<u32> {
        let cache_key = format!("{latitude:.6}:{longitude:.6}");
        let area_code = if let Some(cached) = self.area_cache.get(&cache_key) {
            cached
        } else {
            let resolved = normalize_area_code(self.location.resolve_coordinates(latitude, longitude)?);
            self.area_cache.set(&cache_key, resolved);
            resolved
        };
        *self.coordinates.lock().unwrap() = Some((latitude, longitude));
        *self.area_code.lock().unwrap() = Some(area_code);
        Ok(area_code)
    }

    fn resolved_area_code(&self) -> WipResult<u32> {
        if let Some(code) = *self.area_code.lock().unwrap() {
            return Ok(code);
        }
        let coordinates = *self.coordinates.lock().unwrap();
        match coordinates {
            Some((lat, lon)) => self.set_coordinates(lat, lon),
            None => Err(WipError::InvalidField(
                "neither area_code nor coordinates have been set".into(),
            )),
        }
    }

    /// Fetches weather for the currently-resolved area code: via the
    /// weather role directly (`direct = true`) or via the query role
    /// (`direct = false`), mirroring the teacher's `proxy` toggle (§4.K).
    #[allow(clippy::too_many_arguments)]
    pub fn get_weather(
        &self,
        weather: bool,
        temperature: bool,
        precipitation: bool,
        alert: bool,
        disaster: bool,
        day: u8,
        direct: bool,
    ) -> WipResult<QueryResponse> {
        let area_code = self.resolved_area_code()?;
        if direct {
            self.weather
                .get_weather(area_code, weather, temperature, precipitation, alert, disaster, day)
        } else {
            let flags = Flags {
                weather,
                temperature,
                precipitation,
                alert,
                disaster,
                ..Default::default()
            };
            self.query.query(area_code, flags, day)
        }
    }

    pub fn send_report(&self, body: WeatherBody, flags: Flags, day: u8) -> WipResult<ReportResponse> {
        let area_code = self.resolved_area_code()?;
        self.report.send_report(area_code, body, flags, day)
    }
}
