//! HMAC-SHA256 based authentication (§4.E): packet signatures, the
//! request/response auth hash, and bearer-style API tokens.
//!
//! Grounded on the teacher's `utils/auth.rs` `WIPAuth`/`AuthToken` shape;
//! extended with the packet-signature mode and the spec's exact token
//! wire format.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::wip_common_rs::packet::core::error::{WipError, WipResult};

type HmacSha256 = Hmac<Sha256>;

/// Default API token lifetime (§4.E: "Tokens expire after one hour by default").
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Computes the HMAC-SHA256 signature of `packet_bytes` (with the
/// signature field, if any, already zeroed by the caller) using `key`.
pub fn sign_packet(key: &[u8], packet_bytes: &[u8]) -> String {
    hex::encode(hmac_sha256(key, packet_bytes))
}

/// Verifies a hex-encoded packet signature in constant time.
pub fn verify_packet_signature(key: &[u8], packet_bytes: &[u8], signature_hex: &str) -> WipResult<()> {
    let expected = hmac_sha256(key, packet_bytes);
    let received = hex::decode(signature_hex)
        .map_err(|e| WipError::AuthFailed(format!("malformed signature hex: {e}")))?;
    if constant_time_eq(&expected, &received) {
        Ok(())
    } else {
        Err(WipError::AuthFailed("packet signature mismatch".into()))
    }
}

/// Computes the auth hash over `packet_id:timestamp:passphrase`, keyed by
/// the passphrase itself (§4.E, §8 scenario 6).
pub fn calculate_auth_hash(packet_id: u16, timestamp: u64, passphrase: &str) -> Vec<u8> {
    let message = format!("{packet_id}:{timestamp}:{passphrase}");
    hmac_sha256(passphrase.as_bytes(), message.as_bytes())
}

/// Verifies an auth hash in constant time.
pub fn verify_auth_hash(packet_id: u16, timestamp: u64, passphrase: &str, received: &[u8]) -> bool {
    let expected = calculate_auth_hash(packet_id, timestamp, passphrase);
    constant_time_eq(&expected, received)
}

/// A bearer-style API token: `HMAC(key, client_id:expiry) || ":" || expiry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiToken {
    pub client_id: String,
    pub expiry_unix_secs: u64,
}

impl ApiToken {
    /// Issues a token for `client_id` expiring `ttl_secs` from now
    /// (default one hour, §4.E).
    pub fn issue(key: &[u8], client_id: &str, now_unix_secs: u64, ttl_secs: u64) -> (Self, String) {
        let expiry = now_unix_secs + ttl_secs;
        let token = Self {
            client_id: client_id.to_string(),
            expiry_unix_secs: expiry,
        };
        let encoded = token.encode(key);
        (token, encoded)
    }

    fn message(&self) -> String {
        format!("{}:{}", self.client_id, self.expiry_unix_secs)
    }

    fn encode(&self, key: &[u8]) -> String {
        let mac = hex::encode(hmac_sha256(key, self.message().as_bytes()));
        format!("{mac}:{}", self.expiry_unix_secs)
    }

    /// Parses and verifies a token string, checking the HMAC and that
    /// `expiry_unix_secs` has not passed `now_unix_secs`.
    pub fn verify(key: &[u8], client_id: &str, token: &str, now_unix_secs: u64) -> WipResult<Self> {
        let (mac_hex, expiry_str) = token
            .split_once(':')
            .ok_or_else(|| WipError::AuthFailed("malformed token".into()))?;
        let expiry: u64 = expiry_str
            .parse()
            .map_err(|_| WipError::AuthFailed("malformed token expiry".into()))?;
        let candidate = ApiToken {
            client_id: client_id.to_string(),
            expiry_unix_secs: expiry,
        };
        let expected_mac = hmac_sha256(key, candidate.message().as_bytes());
        let received_mac = hex::decode(mac_hex)
            .map_err(|e| WipError::AuthFailed(format!("malformed token hex: {e}")))?;
        if !constant_time_eq(&expected_mac, &received_mac) {
            return Err(WipError::AuthFailed("token signature mismatch".into()));
        }
        if expiry <= now_unix_secs {
            return Err(WipError::AuthFailed("token expired".into()));
        }
        Ok(candidate)
    }
}

/// Current Unix time in seconds, used as the default "now" for token issuance.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
