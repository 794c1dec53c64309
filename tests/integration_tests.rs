//! Cross-module integration tests: the loopback-server unit tests in each
//! `clients/*_client.rs` exercise one role client in isolation; these cover
//! orchestration across the crate's public surface — the pool, the
//! checksum-driven connection-invalidation path, retry recovery, and the
//! `WipClient` facade tying the four roles together.

use std::net::UdpSocket;
use std::time::Duration;

use wip_protocol::prelude::*;
use wip_protocol::wip_common_rs::clients::utils::{PoolConfig, RetryPolicy, UdpConnectionPool};
use wip_protocol::wip_common_rs::clients::WeatherClient;

fn weather_ack(req_packet_id: u16, req_timestamp: u64, req_area_code: u32, req_flags: Flags) -> Vec<u8> {
    let body = WeatherBody {
        weather_code: 100,
        temperature: 22,
        precipitation_prob: 5,
    };
    WeatherResponse::new(req_packet_id, req_area_code, req_timestamp, body, req_flags)
        .encode()
        .unwrap()
}

/// §8 scenario 1, exercised through the full `WipClient` facade rather than
/// `WeatherClient` directly: area code set explicitly, weather routed
/// through the query role.
#[test]
fn wip_client_routes_weather_through_the_query_role() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1500];
        let (len, src) = server.recv_from(&mut buf).unwrap();
        let req = QueryRequest::decode(&buf[..len]).unwrap();
        let body = WeatherBody {
            weather_code: 200,
            temperature: 18,
            precipitation_prob: 40,
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

    let client = WipClient::with_config(
        "127.0.0.1",
        WipClientConfig {
            query_port: port,
            ..WipClientConfig::default()
        },
    );
    client.set_area_code(460_010);
    let resp = client
        .get_weather(true, true, true, false, false, 0, false)
        .unwrap();
    assert_eq!(resp.body.weather_code, 200);
    assert_eq!(client.query.stats().successful_queries, 1);
    handle.join().unwrap();
}

/// §8 scenario 3: a response whose checksum was tampered with after the
/// header left the wire is rejected, and the connection that produced it is
/// evicted from the pool rather than returned for reuse.
#[test]
fn checksum_corruption_is_rejected_and_the_connection_is_invalidated() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1500];
        let (len, src) = server.recv_from(&mut buf).unwrap();
        let req = WeatherRequest::decode(&buf[..len]).unwrap();
        let mut bytes = weather_ack(
            req.header.packet_id,
            req.header.timestamp,
            req.header.area_code,
            req.header.flags,
        );
        // Flip a checksum-covered bit outside the 12-bit checksum field
        // itself, so decode fails the checksum check rather than just
        // landing on a different (still internally-consistent) value.
        bytes[10] ^= 0x01;
        server.send_to(&bytes, src).unwrap();
    });

    let pool = UdpConnectionPool::new(PoolConfig::default());
    let client = WeatherClient::new("127.0.0.1", port, pool.clone()).with_timeout(Duration::from_secs(2));
    let err = client
        .get_weather(460_010, true, true, false, false, false, 0)
        .unwrap_err();
    assert!(matches!(err, WipError::InvalidPacket(_)));
    assert_eq!(pool.stats().invalidated, 1);
    handle.join().unwrap();
}

/// §8 scenario 4: the first request is silently dropped by the server, the
/// client's retry policy resends, and the second attempt succeeds.
#[test]
fn retry_then_success_recovers_after_one_dropped_request() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1500];
        // First datagram: drop it on the floor.
        let (_len, _src) = server.recv_from(&mut buf).unwrap();
        let (len, src) = server.recv_from(&mut buf).unwrap();
        let req = WeatherRequest::decode(&buf[..len]).unwrap();
        let bytes = weather_ack(
            req.header.packet_id,
            req.header.timestamp,
            req.header.area_code,
            req.header.flags,
        );
        server.send_to(&bytes, src).unwrap();
    });

    let pool = UdpConnectionPool::new(PoolConfig::default());
    let client = WeatherClient::new("127.0.0.1", port, pool)
        .with_timeout(Duration::from_millis(300))
        .with_retry(RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
        });
    let resp = client
        .get_weather(460_010, true, true, true, false, false, 0)
        .unwrap();
    assert_eq!(resp.body.weather_code, 100);
    handle.join().unwrap();
}

/// A sensor report carrying a non-auth extended field (a `string_list` of
/// alert descriptions) round-trips end to end over a real loopback socket,
/// independent of the `ReportClient`'s own auth-only extended-field wiring.
#[test]
fn report_with_string_list_extended_field_round_trips_over_the_wire() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let client_socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    client_socket.connect(("127.0.0.1", port)).unwrap();

    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1500];
        let (len, src) = server.recv_from(&mut buf).unwrap();
        let req = ReportRequest::decode(&buf[..len]).unwrap();
        assert_eq!(
            req.extended,
            vec![wip_protocol::wip_common_rs::packet::core::ExtendedValue::StringList(vec![
                "Heavy Rain".to_string(),
                "Flood Warning".to_string(),
            ])]
        );
        let ack_body = WeatherBody {
            weather_code: 1,
            temperature: 0,
            precipitation_prob: 0,
        };
        let resp = ReportResponse::new(req.header.packet_id, req.header.timestamp, req.header.area_code, ack_body);
        server.send_to(&resp.encode().unwrap(), src).unwrap();
    });

    let mut flags = Flags::default();
    flags.weather = true;
    flags.extended = true;
    let body = WeatherBody {
        weather_code: 300,
        temperature: 12,
        precipitation_prob: 80,
    };
    let req = ReportRequest::new(460_010, 7, 1_700_000_000, body, flags, 0).with_extended(vec![
        wip_protocol::wip_common_rs::packet::core::ExtendedValue::StringList(vec![
            "Heavy Rain".to_string(),
            "Flood Warning".to_string(),
        ]),
    ]);
    client_socket.send(&req.encode().unwrap()).unwrap();

    let mut buf = [0u8; 1500];
    client_socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let len = client_socket.recv(&mut buf).unwrap();
    let resp = ReportResponse::decode(&buf[..len]).unwrap();
    assert_eq!(resp.header.area_code, 460_010);
    handle.join().unwrap();
}

/// Two clients sharing one pool each get their own connection record for
/// the same `(host, port)` pair and can exchange concurrently without
/// interfering with each other's in-flight exchange.
#[test]
fn two_clients_sharing_one_pool_do_not_cross_talk() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1500];
        for _ in 0..2 {
            let (len, src) = server.recv_from(&mut buf).unwrap();
            let req = WeatherRequest::decode(&buf[..len]).unwrap();
            let bytes = weather_ack(
                req.header.packet_id,
                req.header.timestamp,
                req.header.area_code,
                req.header.flags,
            );
            server.send_to(&bytes, src).unwrap();
        }
    });

    let pool = UdpConnectionPool::new(PoolConfig::default());
    let a = WeatherClient::new("127.0.0.1", port, pool.clone()).with_timeout(Duration::from_secs(2));
    let b = WeatherClient::new("127.0.0.1", port, pool.clone()).with_timeout(Duration::from_secs(2));

    let t1 = std::thread::spawn(move || a.get_weather(460_010, true, false, false, false, false, 0));
    let t2 = std::thread::spawn(move || b.get_weather(130_010, true, false, false, false, false, 0));
    assert!(t1.join().unwrap().is_ok());
    assert!(t2.join().unwrap().is_ok());
    assert_eq!(pool.stats().created, 2);
    handle.join().unwrap();
}

/// The two-level cache pattern the orchestrator doesn't wire up itself: an
/// application checks the fast in-memory cache first, falling back to the
/// slower file-backed cache on a miss, and repopulating the memory cache
/// from what it finds there.
#[test]
fn memory_cache_falls_back_to_persistent_cache_on_miss() {
    let dir = tempfile::tempdir().unwrap();
    let mut persistent = PersistentCache::new(dir.path()).unwrap();
    persistent.set("460010", "sunny,22").unwrap();

    let memory: MemoryCache<String> =
        MemoryCache::with_options(Duration::from_secs(60), 32, EvictionPolicy::Lru, Duration::from_secs(30));

    assert!(memory.get("460010").is_none());
    let from_disk = persistent.get("460010").unwrap().expect("seeded above");
    memory.set("460010", from_disk.clone());

    assert_eq!(memory.get("460010"), Some(from_disk));
    assert_eq!(persistent.integrity_check(), Vec::<String>::new());
}
