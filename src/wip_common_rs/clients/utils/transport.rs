//! UDP transport: send + ID-filtered receive with timeout (§4.G).
//!
//! Grounded on the teacher's `weather_client.rs` receive loop (elapsed-time
//! recompute of remaining timeout) and `receive_with_id.rs`'s
//! `extract_packet_id` bit rule, merged into one synchronous type. The
//! transport does not itself retry — retry policy belongs to the
//! orchestrator (§4.K), per §4.G.

use log::{debug, warn};
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use crate::wip_common_rs::packet::core::error::{is_timeout_like, WipError, WipResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Extracts the 12-bit packet_id from the first two header bytes, per §3's
/// bit layout: 4-bit version then 12-bit packet_id, little-endian.
pub fn extract_packet_id(data: &[u8]) -> WipResult<u16> {
    if data.len() < 2 {
        return Err(WipError::InvalidPacket("packet too short to contain an id".into()));
    }
    let value = u16::from_le_bytes([data[0], data[1]]);
    Ok((value >> 4) & 0x0FFF)
}

/// A single outstanding send/receive exchange over a connected UDP socket.
pub struct Transport<'a> {
    socket: &'a UdpSocket,
    timeout: Duration,
}

impl<'a> Transport<'a> {
    pub fn new(socket: &'a UdpSocket, timeout: Duration) -> Self {
        Self { socket, timeout }
    }

    /// Sends `request` and waits up to `self.timeout` for a response whose
    /// packet_id matches `expected_id`. Non-matching packets are dropped
    /// silently and the loop continues (§4.G).
    pub fn send(&self, request: &[u8], expected_id: u16) -> WipResult<Vec<u8>> {
        self.socket.send(request)?;
        self.recv_matching(expected_id)
    }

    fn recv_matching(&self, expected_id: u16) -> WipResult<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WipError::Timeout);
            }
            // A short poll interval keeps the deadline accurate without
            // one read_timeout covering the whole wait.
            let poll = remaining.min(Duration::from_millis(200));
            self.socket.set_read_timeout(Some(poll))?;

            match self.socket.recv(&mut buf) {
                Ok(len) => {
                    let data = &buf[..len];
                    match extract_packet_id(data) {
                        Ok(id) if id == expected_id => return Ok(data.to_vec()),
                        Ok(id) => {
                            debug!("dropping packet with id {id}, expected {expected_id}");
                            continue;
                        }
                        Err(e) => {
                            warn!("dropping unparsable packet: {e}");
                            continue;
                        }
                    }
                }
                Err(e) if is_timeout_like(&e) => continue,
                Err(e) => return Err(WipError::Io(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket as StdUdpSocket;

    fn connected_pair() -> (StdUdpSocket, StdUdpSocket) {
        let a = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        let b = StdUdpSocket::bind("127.0.0.1:0").unwrap();
        a.connect(b.local_addr().unwrap()).unwrap();
        b.connect(a.local_addr().unwrap()).unwrap();
        (a, b)
    }

    fn packet_with_id(id: u16) -> Vec<u8> {
        let header = (1u16) | (id << 4); // version=1 in low nibble, id in next 12 bits
        let mut buf = vec![0u8; 16];
        buf[0..2].copy_from_slice(&header.to_le_bytes());
        buf
    }

    #[test]
    fn extract_packet_id_matches_bit_layout() {
        let data = packet_with_id(42);
        assert_eq!(extract_packet_id(&data).unwrap(), 42);
    }

    #[test]
    fn transport_id_filtering_ignores_non_matching_packets_regardless_of_arrival_order() {
        let (client, server) = connected_pair();
        let handle = std::thread::spawn(move || {
            server.send(&packet_with_id(99)).unwrap();
            server.send(&packet_with_id(7)).unwrap();
            server.send(&packet_with_id(100)).unwrap();
        });
        let transport = Transport::new(&client, Duration::from_secs(2));
        let response = transport.send(&packet_with_id(0), 7).unwrap();
        assert_eq!(extract_packet_id(&response).unwrap(), 7);
        handle.join().unwrap();
    }

    #[test]
    fn transport_times_out_when_nothing_matches() {
        let (client, _server) = connected_pair();
        let transport = Transport::new(&client, Duration::from_millis(300));
        let err = transport.send(&packet_with_id(0), 1).unwrap_err();
        assert!(matches!(err, WipError::Timeout));
    }
}
