//! Location role packets (§3, §6): `CoordReq`/`CoordResp`, type codes 0/1.
//!
//! Grounded on the teacher's `location_packet.rs` struct shape, converted
//! from the async client-bound layout to a plain header + extended-field
//! `coordinate` value per §8 scenario 2.

use crate::wip_common_rs::packet::core::{
    decode_extended_fields, encode_extended_fields, extended_field::ExtendedKey, Flags, Header,
    PacketType, WipError, WipResult, ExtendedValue, HEADER_SIZE,
};

/// A coordinate-resolution request: header plus a `coordinate` extended
/// field carrying latitude/longitude as IEEE-754 float32 (§3).
#[derive(Debug, Clone)]
pub struct LocationRequest {
    pub header: Header,
    pub latitude: f32,
    pub longitude: f32,
}

impl LocationRequest {
    pub fn new(packet_id: u16, timestamp: u64, latitude: f64, longitude: f64) -> WipResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(WipError::InvalidField(format!(
                "latitude {latitude} out of range -90..=90"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(WipError::InvalidField(format!(
                "longitude {longitude} out of range -180..=180"
            )));
        }
        let mut flags = Flags::default();
        flags.extended = true;
        Ok(Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::CoordReq,
                flags,
                day: 0,
                timestamp,
                area_code: 0,
            },
            latitude: latitude as f32,
            longitude: longitude as f32,
        })
    }

    pub fn encode(&self) -> WipResult<Vec<u8>> {
        let mut buf = self.header.encode()?.to_vec();
        encode_extended_fields(
            &mut buf,
            &[ExtendedValue::Coordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            }],
        )?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::CoordReq {
            return Err(WipError::InvalidPacket(format!(
                "expected CoordReq, got {:?}",
                header.packet_type
            )));
        }
        let extended = decode_extended_fields(data, HEADER_SIZE)?;
        let (latitude, longitude) = extended
            .iter()
            .find_map(|v| match v {
                ExtendedValue::Coordinate { latitude, longitude } => Some((*latitude, *longitude)),
                _ => None,
            })
            .ok_or_else(|| {
                WipError::InvalidPacket(format!(
                    "missing coordinate extended field (key {})",
                    ExtendedKey::Coordinate as u8
                ))
            })?;
        Ok(Self {
            header,
            latitude,
            longitude,
        })
    }
}

/// The resolved area code for a coordinate request (§8 scenario 2).
#[derive(Debug, Clone)]
pub struct LocationResponse {
    pub header: Header,
}

impl LocationResponse {
    pub fn new(packet_id: u16, timestamp: u64, area_code: u32) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::CoordResp,
                flags: Flags::default(),
                day: 0,
                timestamp,
                area_code,
            },
        }
    }

    pub fn area_code(&self) -> u32 {
        self.header.area_code
    }

    pub fn encode(&self) -> WipResult<Vec<u8>> {
        Ok(self.header.encode()?.to_vec())
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::CoordResp {
            return Err(WipError::InvalidPacket(format!(
                "expected CoordResp, got {:?}",
                header.packet_type
            )));
        }
        Ok(Self { header })
    }
}

impl crate::wip_common_rs::packet::core::Codec for LocationRequest {
    fn encode(&self) -> WipResult<Vec<u8>> {
        LocationRequest::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        LocationRequest::decode(data)
    }
}

impl crate::wip_common_rs::packet::core::Codec for LocationResponse {
    fn encode(&self) -> WipResult<Vec<u8>> {
        LocationResponse::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        LocationResponse::decode(data)
    }
}
