//! Unified error taxonomy for the WIP client core (§7).
//!
//! Every fallible operation in this crate returns `WipResult<T>`. There is
//! deliberately one flat enum rather than a nested hierarchy: the seven
//! variants below are exhaustive for the protocol's error surface.

use std::fmt;

#[derive(Debug)]
pub enum WipError {
    /// Length < 16, checksum mismatch, version mismatch, unknown type, or a
    /// truncated extended field.
    InvalidPacket(String),
    /// Encode attempted with a value outside a field's bit width, an
    /// unknown field name, or a validation failure (e.g. precip_prob > 100).
    InvalidField(String),
    /// Socket creation/send/recv failure not classified as a timeout.
    Io(std::io::Error),
    /// Receive deadline exceeded without a matching-id packet.
    Timeout,
    /// Signature or HMAC comparison failed, or a token expired.
    AuthFailed(String),
    /// A cache lookup that demanded a cached-only result came up empty.
    NotFound,
    /// A field spec could not be parsed or validated.
    ConfigError(String),
}

pub type WipResult<T> = Result<T, WipError>;

impl fmt::Display for WipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipError::InvalidPacket(msg) => write!(f, "invalid_packet: {msg}"),
            WipError::InvalidField(msg) => write!(f, "invalid_field: {msg}"),
            WipError::Io(e) => write!(f, "io_error: {e}"),
            WipError::Timeout => write!(f, "timeout"),
            WipError::AuthFailed(msg) => write!(f, "auth_failed: {msg}"),
            WipError::NotFound => write!(f, "not_found"),
            WipError::ConfigError(msg) => write!(f, "config_error: {msg}"),
        }
    }
}

impl std::error::Error for WipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WipError {
    fn from(e: std::io::Error) -> Self {
        if is_timeout_like(&e) {
            WipError::Timeout
        } else {
            WipError::Io(e)
        }
    }
}

/// Whether an I/O error should be treated as a timeout for retry purposes
/// rather than a generic `io_error`.
pub fn is_timeout_like(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// Whether `io_error` should be retried by the transport (§7: "only
/// `timeout` and classified-temporary `io_error`").
pub fn is_retryable_io(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionReset
    )
}
