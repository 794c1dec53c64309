//! Report role UDP client (§4.K), default port 4112 (§6).
//!
//! Grounded on the teacher's `report_client.rs` retry loop and report
//! queue/batch-flush shape; the teacher's compression/encryption config
//! was a no-op placeholder wired to no real crate, so it is dropped here
//! rather than carried forward as dead weight (see DESIGN.md). Auth is the
//! one config knob from the teacher that does something real, grounded on
//! [[auth]].

use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::wip_common_rs::auth;
use crate::wip_common_rs::clients::utils::{
    transport::DEFAULT_TIMEOUT, PacketIdGenerator, RetryPolicy, Transport, UdpConnectionPool,
};
use crate::wip_common_rs::packet::core::{ExtendedValue, Flags, WeatherBody, WipError, WipResult};
use crate::wip_common_rs::packet::types::{ReportRequest, ReportResponse};

pub const DEFAULT_PORT: u16 = 4112;

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[derive(Debug, Clone)]
pub struct ReportClientConfig {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub auth_passphrase: Option<String>,
}

impl Default for ReportClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            auth_passphrase: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportStats {
    pub total_reports: u64,
    pub successful_reports: u64,
    pub failed_reports: u64,
    pub retries: u64,
}

#[derive(Debug)]
pub struct ReportClient {
    host: String,
    port: u16,
    pool: Arc<UdpConnectionPool>,
    packet_ids: PacketIdGenerator,
    config: ReportClientConfig,
    queue: Mutex<VecDeque<ReportRequest>>,
    stats: Mutex<ReportStats>,
}

impl ReportClient {
    pub fn new(host: impl Into<String>, port: u16, pool: Arc<UdpConnectionPool>) -> Self {
        Self::with_config(host, port, pool, ReportClientConfig::default())
    }

    pub fn with_config(
        host: impl Into<String>,
        port: u16,
        pool: Arc<UdpConnectionPool>,
        config: ReportClientConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            pool,
            packet_ids: PacketIdGenerator::new(),
            config,
            queue: Mutex::new(VecDeque::new()),
            stats: Mutex::new(ReportStats::default()),
        }
    }

    /// Submits a sensor/disaster report, optionally keyed with the auth
    /// hash extended field when `config.auth_passphrase` is set (§4.E,
    /// §8 scenario 6).
    pub fn send_report(
        &self,
        area_code: u32,
        body: WeatherBody,
        mut flags: Flags,
        day: u8,
    ) -> WipResult<ReportResponse> {
        self.stats.lock().unwrap().total_reports += 1;

        let packet_id = self.packet_ids.next_id();
        let timestamp = now_unix_secs();

        let mut request = ReportRequest::new(area_code, packet_id, timestamp, body, flags, day);
        if let Some(passphrase) = &self.config.auth_passphrase {
            flags.request_auth = true;
            flags.extended = true;
            let hash = auth::calculate_auth_hash(packet_id, timestamp, passphrase);
            request = ReportRequest::new(area_code, packet_id, timestamp, body, flags, day)
                .with_extended(vec![ExtendedValue::Binary(hash)]);
        }

        let result = self.config.retry.run(|attempt| {
            if attempt > 1 {
                self.stats.lock().unwrap().retries += 1;
                warn!("report attempt {attempt} timed out, retrying");
            }
            self.exchange(&request, packet_id)
        });

        match &result {
            Ok(_) => self.stats.lock().unwrap().successful_reports += 1,
            Err(_) => self.stats.lock().unwrap().failed_reports += 1,
        }
        result
    }

    fn exchange(&self, request: &ReportRequest, packet_id: u16) -> WipResult<ReportResponse> {
        let conn = self.pool.acquire(&self.host, self.port)?;
        let bytes = request.encode()?;
        let transport = Transport::new(&conn.socket, self.config.timeout);
        let result = transport
            .send(&bytes, packet_id)
            .and_then(|data| ReportResponse::decode(&data));

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

    /// Queues a pre-built report for a later `flush_queued_reports` call.
    pub fn queue_report(&self, request: ReportRequest) {
        self.queue.lock().unwrap().push_back(request);
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Sends every queued report concurrently (one thread per report,
    /// joined before returning) and drains the queue regardless of outcome.
    pub fn flush_queued_reports(self: &Arc<Self>) -> Vec<WipResult<ReportResponse>> {
        let pending: Vec<ReportRequest> = self.queue.lock().unwrap().drain(..).collect();
        let handles: Vec<_> = pending
            .into_iter()
            .map(|request| {
                let client = Arc::clone(self);
                thread::spawn(move || {
                    let packet_id = request.header.packet_id;
                    client.exchange(&request, packet_id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    pub fn stats(&self) -> ReportStats {
        *self.stats.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wip_common_rs::clients::utils::PoolConfig;
    use std::net::UdpSocket;

    #[test]
    fn send_report_round_trips_through_loopback_server() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = ReportRequest::decode(&buf[..len]).unwrap();
            let ack_body = WeatherBody {
                weather_code: 1,
                temperature: 0,
                precipitation_prob: 0,
            };
            let resp = ReportResponse::new(req.header.packet_id, req.header.timestamp, req.header.area_code, ack_body);
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = ReportClient::new("127.0.0.1", port, pool);
        let body = WeatherBody {
            weather_code: 200,
            temperature: 18,
            precipitation_prob: 40,
        };
        let flags = Flags {
            weather: true,
            ..Default::default()
        };
        let resp = client.send_report(460_010, body, flags, 0).unwrap();
        assert_eq!(resp.header.area_code, 460_010);
        handle.join().unwrap();
    }

    #[test]
    fn scenario_6_auth_enabled_report_carries_matching_auth_hash() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 1500];
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = ReportRequest::decode(&buf[..len]).unwrap();
            let hash = match &req.extended[0] {
                ExtendedValue::Binary(bytes) => bytes.clone(),
                other => panic!("expected Binary auth hash, got {other:?}"),
            };
            assert!(auth::verify_auth_hash(
                req.header.packet_id,
                req.header.timestamp,
                "shared-secret",
                &hash
            ));
            let ack_body = WeatherBody {
                weather_code: 1,
                temperature: 0,
                precipitation_prob: 0,
            };
            let resp = ReportResponse::new(req.header.packet_id, req.header.timestamp, req.header.area_code, ack_body);
            server.send_to(&resp.encode().unwrap(), src).unwrap();
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = ReportClient::with_config(
            "127.0.0.1",
            port,
            pool,
            ReportClientConfig {
                auth_passphrase: Some("shared-secret".into()),
                ..Default::default()
            },
        );
        let body = WeatherBody {
            weather_code: 200,
            temperature: 18,
            precipitation_prob: 40,
        };
        let flags = Flags {
            weather: true,
            ..Default::default()
        };
        client.send_report(460_010, body, flags, 0).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn flush_queued_reports_sends_everything_and_drains_the_queue() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = server.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            for _ in 0..3 {
                let mut buf = [0u8; 1500];
                let (len, src) = server.recv_from(&mut buf).unwrap();
                let req = ReportRequest::decode(&buf[..len]).unwrap();
                let ack_body = WeatherBody {
                    weather_code: 1,
                    temperature: 0,
                    precipitation_prob: 0,
                };
                let resp =
                    ReportResponse::new(req.header.packet_id, req.header.timestamp, req.header.area_code, ack_body);
                server.send_to(&resp.encode().unwrap(), src).unwrap();
            }
        });

        let pool = UdpConnectionPool::new(PoolConfig::default());
        let client = Arc::new(ReportClient::new("127.0.0.1", port, pool));
        let body = WeatherBody {
            weather_code: 1,
            temperature: 0,
            precipitation_prob: 0,
        };
        let flags = Flags::default();
        for i in 0..3u16 {
            let req = ReportRequest::new(460_010, i, now_unix_secs(), body, flags, 0);
            client.queue_report(req);
        }
        assert_eq!(client.queue_len(), 3);
        let results = client.flush_queued_reports();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(client.queue_len(), 0);
        handle.join().unwrap();
    }
}
