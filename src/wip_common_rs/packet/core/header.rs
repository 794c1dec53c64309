//! The 16-byte fixed WIP header (§3), shared by every packet role.
//!
//! Bit layout (LSB-first within the 128-bit little-endian word):
//! version(4) packet_id(12) type(3) flags(8) day(3) reserved(2) timestamp(64)
//! area_code(20) checksum(12).

use super::checksum::{embed_checksum12, verify_checksum12};
use super::error::{WipError, WipResult};
use bitvec::prelude::*;

pub const HEADER_SIZE: usize = 16;

/// Packet type enum, §3's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    CoordReq = 0,
    CoordResp = 1,
    WeatherReq = 2,
    WeatherResp = 3,
    ReportReq = 4,
    ReportResp = 5,
    QueryReq = 6,
    ErrorResp = 7,
}

impl PacketType {
    pub fn from_u8(v: u8) -> WipResult<Self> {
        Ok(match v {
            0 => PacketType::CoordReq,
            1 => PacketType::CoordResp,
            2 => PacketType::WeatherReq,
            3 => PacketType::WeatherResp,
            4 => PacketType::ReportReq,
            5 => PacketType::ReportResp,
            6 => PacketType::QueryReq,
            7 => PacketType::ErrorResp,
            other => return Err(WipError::InvalidPacket(format!("unknown packet type {other}"))),
        })
    }
}

/// §3's flags bitmap, bit order as declared in the header table's `flags`
/// field (LSB of the 8-bit flags byte is `weather`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub weather: bool,
    pub temperature: bool,
    pub precipitation: bool,
    pub alert: bool,
    pub disaster: bool,
    pub extended: bool,
    pub request_auth: bool,
    pub response_auth: bool,
}

impl Flags {
    fn to_u8(self) -> u8 {
        (self.weather as u8)
            | (self.temperature as u8) << 1
            | (self.precipitation as u8) << 2
            | (self.alert as u8) << 3
            | (self.disaster as u8) << 4
            | (self.extended as u8) << 5
            | (self.request_auth as u8) << 6
            | (self.response_auth as u8) << 7
    }

    fn from_u8(v: u8) -> Self {
        Self {
            weather: v & 0x01 != 0,
            temperature: v & 0x02 != 0,
            precipitation: v & 0x04 != 0,
            alert: v & 0x08 != 0,
            disaster: v & 0x10 != 0,
            extended: v & 0x20 != 0,
            request_auth: v & 0x40 != 0,
            response_auth: v & 0x80 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub packet_id: u16,
    pub packet_type: PacketType,
    pub flags: Flags,
    pub day: u8,
    pub timestamp: u64,
    pub area_code: u32,
}

impl Header {
    pub fn encode(&self) -> WipResult<[u8; HEADER_SIZE]> {
        if self.version > 0x0F {
            return Err(WipError::InvalidField("version exceeds 4 bits".into()));
        }
        if self.packet_id > 0x0FFF {
            return Err(WipError::InvalidField("packet_id exceeds 12 bits".into()));
        }
        if self.day > 7 {
            return Err(WipError::InvalidField("day exceeds 3 bits".into()));
        }
        if self.area_code > 0x0F_FFFF {
            return Err(WipError::InvalidField("area_code exceeds 20 bits".into()));
        }

        let mut buf = [0u8; HEADER_SIZE];
        let bits = buf.view_bits_mut::<Lsb0>();
        bits[0..4].store_le(self.version);
        bits[4..16].store_le(self.packet_id);
        bits[16..19].store_le(self.packet_type as u8);
        bits[19..27].store_le(self.flags.to_u8());
        bits[27..30].store_le(self.day);
        bits[30..32].store_le(0u8); // reserved, must be zero on send
        bits[32..96].store_le(self.timestamp);
        bits[96..116].store_le(self.area_code);
        bits[116..128].store_le(0u16); // checksum placeholder

        embed_checksum12(&mut buf);
        Ok(buf)
    }

    /// Decodes and verifies a 16-byte header. Returns the header plus
    /// `true` if the reserved bits were non-zero (a decoding warning, not
    /// an error, per §4.D step 5).
    pub fn decode(data: &[u8]) -> WipResult<(Self, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(WipError::InvalidPacket(format!(
                "header too short: {} bytes",
                data.len()
            )));
        }
        let mut header_bytes = [0u8; HEADER_SIZE];
        header_bytes.copy_from_slice(&data[..HEADER_SIZE]);

        if !verify_checksum12(&header_bytes) {
            return Err(WipError::InvalidPacket("checksum mismatch".into()));
        }

        let bits = header_bytes.view_bits::<Lsb0>();
        let version: u8 = bits[0..4].load_le();
        if version != 1 {
            return Err(WipError::InvalidPacket(format!("unsupported version {version}")));
        }
        let packet_id: u16 = bits[4..16].load_le();
        let packet_type = PacketType::from_u8(bits[16..19].load_le())?;
        let flags = Flags::from_u8(bits[19..27].load_le());
        let day: u8 = bits[27..30].load_le();
        let reserved: u8 = bits[30..32].load_le();
        let timestamp: u64 = bits[32..96].load_le();
        let area_code: u32 = bits[96..116].load_le();

        Ok((
            Header {
                version,
                packet_id,
                packet_type,
                flags,
                day,
                timestamp,
                area_code,
            },
            reserved != 0,
        ))
    }
}
