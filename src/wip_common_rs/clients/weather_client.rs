//! Weather role UDP client (§4.K), default port 4110 (§6).
//!
//! Grounded on the teacher's `weather_client.rs`, already synchronous —
//! the closest match in the teacher's own code to the mandated concurrency
//! model (§5) — converted to share the pool/transport layers instead of
//! owning a private `UdpSocket`.

use log::warn;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::wip_common_rs::clients::utils::{
    transport::DEFAULT_TIMEOUT, PacketIdGenerator, RetryPolicy, Transport, UdpConnectionPool,
};
use crate::wip_common_rs::packet::core::{Flags, WipError, WipResult};
use crate::wip_common_rs::packet::types::{WeatherRequest, WeatherResponse};

pub const DEFAULT_PORT: u16 = 4110;

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug)]
pub struct WeatherClient {
    host: String,
    port: u16,
    pool: Arc<UdpConnectionPool>,
    packet_ids: PacketIdGenerator,
    timeout: Duration,
    retry: RetryPolicy,
}

impl WeatherClient {
    pub fn new(host: impl Into<String>, port: u16, pool: Arc<UdpConnectionPool>) -> Self {
        Self {
            host: host.into(),
            port,
            pool,
            packet_ids: PacketIdGenerator::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Requests weather data for `area_code`, returning the decoded fixed
    /// body (§8 scenario 1).
    #[allow(clippy::too_many_arguments)]
    pub fn get_weather(
        &self,
        area_code: u32,
        weather: bool,
        temperature: bool,
        precipitation: bool,
        alert: bool,
        disaster: bool,
        day: u8,
    ) -> WipResult<WeatherResponse> {
        let packet_id = self.packet_ids.next_id();
        let flags = Flags {
            weather,
            temperature,
            precipitation,
            alert,
            disaster,
            ..Default::default()
        };
        let request = WeatherRequest::new(area_code, packet_id, now_unix_secs(), flags, day);
        self.retry.run(|attempt| {
            if attempt > 1 {
                warn!("weather request attempt {attempt} timed out, retrying");
            }
            self.exchange(&request, packet_id)
        })
    }

    fn exchange(&self, request: &WeatherRequest, packet_id: u16) -> WipResult<WeatherResponse> {
        let conn = self.pool.acquire(&self.host, self.port)?;
        let bytes = request.encode()?;
        let transport = Transport::new(&conn.socket, self.timeout);
        let result = transport
            .send(&bytes, packet_id)
            .and_then(|data| WeatherResponse::decode(&data));

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
}
