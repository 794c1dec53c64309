//! UDP "connection" pool keyed by `(host, port)` (§4.H).
//!
//! UDP has no true connections; the pool amortises socket creation and the
//! `connect(2)`-on-UDP remote-address bind. Grounded on the teacher's
//! `PoolConfig`/`ConnectionStats`/`PooledConnection` struct shapes,
//! rewritten from tokio `RwLock`/async health checks to
//! `std::sync::{Mutex, Condvar}` per §5's concurrency redesign.

use log::{debug, warn};
use std::collections::HashMap;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::wip_common_rs::packet::core::error::{WipError, WipResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Timeout,
    Closed,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    pub max_idle_time: Duration,
    pub max_error_count: u32,
    pub quality_threshold: f64,
    pub acquire_deadline: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_idle_time: Duration::from_secs(300),
            max_error_count: 5,
            quality_threshold: 0.3,
            acquire_deadline: Duration::from_secs(10),
        }
    }
}

/// One pooled socket and its bookkeeping (§4.H).
pub struct ConnectionRecord {
    pub id: u64,
    pub socket: Arc<UdpSocket>,
    pub state: ConnectionState,
    pub created: Instant,
    pub last_used: Instant,
    pub last_activity: Instant,
    pub use_count: u64,
    pub error_count: u32,
    pub is_in_use: bool,
    pub quality: f64,
}

impl ConnectionRecord {
    fn new(id: u64, socket: UdpSocket) -> Self {
        let now = Instant::now();
        Self {
            id,
            socket: Arc::new(socket),
            state: ConnectionState::Connected,
            created: now,
            last_used: now,
            last_activity: now,
            use_count: 0,
            error_count: 0,
            is_in_use: false,
            quality: 1.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectionStats {
    pub created: u64,
    pub destroyed: u64,
    pub acquired: u64,
    pub released: u64,
    pub invalidated: u64,
}

type PoolKey = (String, u16);

struct PoolState {
    records: HashMap<PoolKey, Vec<ConnectionRecord>>,
    stats: ConnectionStats,
    next_id: u64,
}

/// A handle to a pooled connection. Returning it to the pool (via
/// `UdpConnectionPool::release`) is the caller's responsibility; only one
/// in-flight operation may hold a given connection at a time (§4.H).
///
/// Identifies its record by a stable `id` rather than a `Vec` position:
/// `invalidate` removes records out of order, which would otherwise shift
/// the indices of every record after the removed one and make an
/// outstanding handle address the wrong record.
pub struct PooledConnection {
    pub key: PoolKey,
    pub id: u64,
    pub socket: Arc<UdpSocket>,
}

pub struct UdpConnectionPool {
    config: PoolConfig,
    state: Mutex<PoolState>,
    available: Condvar,
    running: Arc<AtomicBool>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl UdpConnectionPool {
    pub fn new(config: PoolConfig) -> Arc<Self> {
        let pool = Arc::new(Self {
            config,
            state: Mutex::new(PoolState {
                records: HashMap::new(),
                stats: ConnectionStats::default(),
                next_id: 0,
            }),
            available: Condvar::new(),
            running: Arc::new(AtomicBool::new(true)),
            maintenance: Mutex::new(None),
        });
        pool.spawn_maintenance();
        pool
    }

    fn spawn_maintenance(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let running = Arc::clone(&self.running);
        let handle = thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_secs(30));
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                pool.prune_stale();
            }
        });
        *self.maintenance.lock().unwrap() = Some(handle);
    }

    /// Scans for idle connections past `max_idle_time` or records with too
    /// many errors and prunes them (§4.H maintenance loop).
    fn prune_stale(&self) {
        let mut state = self.state.lock().unwrap();
        let max_idle = self.config.max_idle_time;
        let max_errors = self.config.max_error_count;
        for records in state.records.values_mut() {
            let before = records.len();
            records.retain(|r| {
                let stale = !r.is_in_use
                    && (r.last_used.elapsed() > max_idle || r.error_count > max_errors);
                !stale
            });
            let removed = before - records.len();
            if removed > 0 {
                debug!("pruned {removed} stale connection(s) from pool");
            }
        }
    }

    /// Acquires an idle connected record for `(host, port)`, creating a new
    /// socket if capacity permits, or waiting on the condvar until one is
    /// released or the acquisition deadline passes.
    pub fn acquire(&self, host: &str, port: u16) -> WipResult<PooledConnection> {
        let key = (host.to_string(), port);
        let mut state = self.state.lock().unwrap();
        let deadline = Instant::now() + self.config.acquire_deadline;

        loop {
            let records = state.records.entry(key.clone()).or_default();

            if let Some(record) = records
                .iter_mut()
                .find(|r| !r.is_in_use && r.state == ConnectionState::Connected)
            {
                record.is_in_use = true;
                record.last_used = Instant::now();
                record.use_count += 1;
                let socket = Arc::clone(&record.socket);
                let id = record.id;
                state.stats.acquired += 1;
                return Ok(PooledConnection { key, id, socket });
            }

            if records.len() < self.config.max_size {
                let socket = UdpSocket::bind("0.0.0.0:0")?;
                socket.connect((host, port))?;
                let id = state.next_id;
                state.next_id += 1;
                let mut record = ConnectionRecord::new(id, socket);
                record.is_in_use = true;
                record.use_count = 1;
                let socket = Arc::clone(&record.socket);
                records.push(record);
                state.stats.created += 1;
                state.stats.acquired += 1;
                return Ok(PooledConnection { key, id, socket });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WipError::Timeout);
            }
            let (guard, timeout_result) =
                self.available.wait_timeout(state, remaining).unwrap();
            state = guard;
            if timeout_result.timed_out() {
                return Err(WipError::Timeout);
            }
        }
    }

    /// Releases `conn` back to the pool: clears `is_in_use`, refreshes
    /// `last_used`, and signals any waiters.
    pub fn release(&self, conn: PooledConnection) {
        let mut state = self.state.lock().unwrap();
        if let Some(records) = state.records.get_mut(&conn.key) {
            if let Some(record) = records.iter_mut().find(|r| r.id == conn.id) {
                record.is_in_use = false;
                record.last_used = Instant::now();
                record.last_activity = Instant::now();
            }
        }
        state.stats.released += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Marks the connection's record `Error` and removes it from the pool.
    pub fn invalidate(&self, conn: PooledConnection) {
        let mut state = self.state.lock().unwrap();
        if let Some(records) = state.records.get_mut(&conn.key) {
            if let Some(pos) = records.iter().position(|r| r.id == conn.id) {
                records.remove(pos);
            }
        }
        state.stats.invalidated += 1;
        state.stats.destroyed += 1;
        drop(state);
        self.available.notify_one();
    }

    /// Adjusts the quality score for every record in `(host, port)`,
    /// clamped to `[0, 1]`; records below `quality_threshold` become
    /// eligible for eviction on the next maintenance pass.
    pub fn update_connection_quality(&self, host: &str, port: u16, delta: f64) {
        let mut state = self.state.lock().unwrap();
        if let Some(records) = state.records.get_mut(&(host.to_string(), port)) {
            for record in records.iter_mut() {
                record.quality = (record.quality + delta).clamp(0.0, 1.0);
                if record.quality < self.config.quality_threshold {
                    record.error_count += 1;
                }
            }
        }
    }

    pub fn stats(&self) -> ConnectionStats {
        self.state.lock().unwrap().stats
    }

    /// Stops the maintenance thread. In-flight acquire/release calls are
    /// unaffected; no new maintenance passes run after this returns.
    pub fn close(&self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.maintenance.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for UdpConnectionPool {
    fn drop(&mut self) {
        self.close();
    }
}
