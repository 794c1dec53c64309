//! Monotonic 12-bit packet-ID counter (§4.F).
//!
//! Grounded on the teacher's `PacketIDGenerator12Bit` (a plain, non-atomic
//! `u16` field that skips id 0), generalized to an `AtomicU16` seeded from
//! `rand` at construction and covering the full `[0, 4096)` range — 0 is a
//! valid id per this spec (§9 Open Question resolution).

use rand::Rng;
use std::sync::atomic::{AtomicU16, Ordering};

const PACKET_ID_MASK: u16 = 0x0FFF;

#[derive(Debug)]
pub struct PacketIdGenerator {
    current: AtomicU16,
}

impl PacketIdGenerator {
    /// Seeds the counter with a random starting value to reduce collisions
    /// across process restarts (§4.F).
    pub fn new() -> Self {
        let seed: u16 = rand::thread_rng().gen_range(0..=PACKET_ID_MASK);
        Self {
            current: AtomicU16::new(seed),
        }
    }

    fn seeded(start: u16) -> Self {
        Self {
            current: AtomicU16::new(start),
        }
    }

    /// Atomically fetches and increments the counter modulo 4096.
    pub fn next_id(&self) -> u16 {
        self.current.fetch_add(1, Ordering::Relaxed) & PACKET_ID_MASK
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
