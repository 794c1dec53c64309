//! Extended (TLV) field codec (§3, §4.D).
//!
//! Wire format per field: a 2-byte little-endian header (low 10 bits =
//! value length in bytes, high 6 bits = key 0-63) followed by the typed
//! value. At most 16 extended fields per packet; total wire size must stay
//! within the 1500-byte UDP MTU.

use super::error::{WipError, WipResult};
use serde_json::Value;

pub const MAX_EXTENDED_FIELDS: usize = 16;
pub const MAX_PACKET_SIZE: usize = 1500;

/// The typed extended-field payloads §3 enumerates.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendedValue {
    StringList(Vec<String>),
    Coordinate { latitude: f32, longitude: f32 },
    SourceInfo { source_id: u8, timestamp: u32, quality: u8 },
    Binary(Vec<u8>),
    Float32(f32),
    Int64(i64),
    Bool(bool),
    Json(Value),
}

impl ExtendedValue {
    fn serialize(&self) -> Vec<u8> {
        match self {
            ExtendedValue::StringList(items) => {
                let mut out = Vec::new();
                out.extend_from_slice(&(items.len() as u16).to_le_bytes());
                for item in items {
                    let bytes = item.as_bytes();
                    out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                    out.extend_from_slice(bytes);
                }
                out
            }
            ExtendedValue::Coordinate { latitude, longitude } => {
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&latitude.to_le_bytes());
                out.extend_from_slice(&longitude.to_le_bytes());
                out
            }
            ExtendedValue::SourceInfo { source_id, timestamp, quality } => {
                let mut out = Vec::with_capacity(6);
                out.push(*source_id);
                out.extend_from_slice(&timestamp.to_le_bytes());
                out.push(*quality);
                out
            }
            ExtendedValue::Binary(bytes) => bytes.clone(),
            ExtendedValue::Float32(v) => v.to_le_bytes().to_vec(),
            ExtendedValue::Int64(v) => v.to_le_bytes().to_vec(),
            ExtendedValue::Bool(v) => vec![*v as u8],
            ExtendedValue::Json(v) => serde_json::to_vec(v).unwrap_or_default(),
        }
    }

    fn deserialize(key: ExtendedKey, bytes: &[u8]) -> WipResult<Self> {
        Ok(match key {
            ExtendedKey::StringList => {
                if bytes.len() < 2 {
                    return Err(WipError::InvalidPacket("truncated string_list".into()));
                }
                let count = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
                let mut items = Vec::with_capacity(count);
                let mut pos = 2usize;
                for _ in 0..count {
                    if pos + 2 > bytes.len() {
                        return Err(WipError::InvalidPacket("truncated string_list entry".into()));
                    }
                    let len = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
                    pos += 2;
                    if pos + len > bytes.len() {
                        return Err(WipError::InvalidPacket("truncated string_list value".into()));
                    }
                    let s = String::from_utf8(bytes[pos..pos + len].to_vec())
                        .map_err(|_| WipError::InvalidPacket("invalid utf-8 in string_list".into()))?;
                    items.push(s);
                    pos += len;
                }
                ExtendedValue::StringList(items)
            }
            ExtendedKey::Coordinate => {
                if bytes.len() < 8 {
                    return Err(WipError::InvalidPacket("truncated coordinate".into()));
                }
                let latitude = f32::from_le_bytes(bytes[0..4].try_into().unwrap());
                let longitude = f32::from_le_bytes(bytes[4..8].try_into().unwrap());
                ExtendedValue::Coordinate { latitude, longitude }
            }
            ExtendedKey::SourceInfo => {
                if bytes.len() < 6 {
                    return Err(WipError::InvalidPacket("truncated source_info".into()));
                }
                ExtendedValue::SourceInfo {
                    source_id: bytes[0],
                    timestamp: u32::from_le_bytes(bytes[1..5].try_into().unwrap()),
                    quality: bytes[5],
                }
            }
            ExtendedKey::Binary => ExtendedValue::Binary(bytes.to_vec()),
            ExtendedKey::Float32 => {
                if bytes.len() < 4 {
                    return Err(WipError::InvalidPacket("truncated float32".into()));
                }
                ExtendedValue::Float32(f32::from_le_bytes(bytes[0..4].try_into().unwrap()))
            }
            ExtendedKey::Int64 => {
                if bytes.len() < 8 {
                    return Err(WipError::InvalidPacket("truncated int64".into()));
                }
                ExtendedValue::Int64(i64::from_le_bytes(bytes[0..8].try_into().unwrap()))
            }
            ExtendedKey::Bool => {
                if bytes.is_empty() {
                    return Err(WipError::InvalidPacket("truncated bool".into()));
                }
                ExtendedValue::Bool(bytes[0] != 0)
            }
            ExtendedKey::Json => {
                let v: Value = serde_json::from_slice(bytes)
                    .map_err(|e| WipError::InvalidPacket(format!("invalid json: {e}")))?;
                ExtendedValue::Json(v)
            }
        })
    }

    fn key(&self) -> ExtendedKey {
        match self {
            ExtendedValue::StringList(_) => ExtendedKey::StringList,
            ExtendedValue::Coordinate { .. } => ExtendedKey::Coordinate,
            ExtendedValue::SourceInfo { .. } => ExtendedKey::SourceInfo,
            ExtendedValue::Binary(_) => ExtendedKey::Binary,
            ExtendedValue::Float32(_) => ExtendedKey::Float32,
            ExtendedValue::Int64(_) => ExtendedKey::Int64,
            ExtendedValue::Bool(_) => ExtendedKey::Bool,
            ExtendedValue::Json(_) => ExtendedKey::Json,
        }
    }
}

/// The type-indexed keys, §4.C: "Keys 0-63 are type-indexed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKey {
    StringList = 0,
    Coordinate = 1,
    SourceInfo = 2,
    Binary = 3,
    Float32 = 4,
    Int64 = 5,
    Bool = 6,
    Json = 7,
}

impl ExtendedKey {
    fn from_u8(v: u8) -> WipResult<Self> {
        Ok(match v {
            0 => ExtendedKey::StringList,
            1 => ExtendedKey::Coordinate,
            2 => ExtendedKey::SourceInfo,
            3 => ExtendedKey::Binary,
            4 => ExtendedKey::Float32,
            5 => ExtendedKey::Int64,
            6 => ExtendedKey::Bool,
            7 => ExtendedKey::Json,
            other => return Err(WipError::InvalidPacket(format!("unknown extended-field key {other}"))),
        })
    }
}

/// Appends `fields` to `buf` as a sequence of TLV entries. Returns
/// `invalid_field` if more than `MAX_EXTENDED_FIELDS` are supplied or a
/// single value exceeds the 10-bit length budget.
pub fn encode_extended_fields(buf: &mut Vec<u8>, fields: &[ExtendedValue]) -> WipResult<()> {
    if fields.len() > MAX_EXTENDED_FIELDS {
        return Err(WipError::InvalidField(format!(
            "too many extended fields: {}",
            fields.len()
        )));
    }
    for field in fields {
        let payload = field.serialize();
        if payload.len() > 0x3FF {
            return Err(WipError::InvalidField(format!(
                "extended field value too long: {} bytes",
                payload.len()
            )));
        }
        let key = field.key() as u16;
        let tlv_header: u16 = (payload.len() as u16 & 0x3FF) | (key << 10);
        buf.extend_from_slice(&tlv_header.to_le_bytes());
        buf.extend_from_slice(&payload);
    }
    if buf.len() > MAX_PACKET_SIZE {
        return Err(WipError::InvalidField(format!(
            "packet exceeds maximum wire size: {} bytes",
            buf.len()
        )));
    }
    Ok(())
}

/// Decodes every TLV entry in `data` starting at `start`, stopping at the
/// end of the buffer or once `MAX_EXTENDED_FIELDS` have been read.
pub fn decode_extended_fields(data: &[u8], start: usize) -> WipResult<Vec<ExtendedValue>> {
    let mut fields = Vec::new();
    let mut pos = start;
    while pos < data.len() {
        if fields.len() >= MAX_EXTENDED_FIELDS {
            break;
        }
        if pos + 2 > data.len() {
            return Err(WipError::InvalidPacket("truncated extended-field header".into()));
        }
        let tlv_header = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let length = (tlv_header & 0x3FF) as usize;
        let key = ExtendedKey::from_u8((tlv_header >> 10) as u8)?;
        pos += 2;
        if pos + length > data.len() {
            return Err(WipError::InvalidPacket("extended field runs past buffer".into()));
        }
        let value = ExtendedValue::deserialize(key, &data[pos..pos + length])?;
        fields.push(value);
        pos += length;
    }
    Ok(fields)
}
