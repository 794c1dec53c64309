//! Report role packets (§3, §6): `ReportReq`/`ReportResp`, type codes 4/5.
//!
//! Grounded on the teacher's `report_packet.rs` struct shape: a sensor/
//! disaster report carries the same fixed weather body as a weather
//! response plus `source_info`/`binary` extended fields for the reporting
//! sensor's metadata and raw payload.

use crate::wip_common_rs::packet::core::{
    decode_extended_fields, encode_extended_fields, Flags, Header, PacketType, WeatherBody,
    WipError, WipResult, ExtendedValue, HEADER_SIZE,
};

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub header: Header,
    pub body: WeatherBody,
    pub extended: Vec<ExtendedValue>,
}

impl ReportRequest {
    pub fn new(
        area_code: u32,
        packet_id: u16,
        timestamp: u64,
        body: WeatherBody,
        flags: Flags,
        day: u8,
    ) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::ReportReq,
                flags,
                day,
                timestamp,
                area_code,
            },
            body,
            extended: Vec::new(),
        }
    }

    pub fn with_extended(mut self, extended: Vec<ExtendedValue>) -> Self {
        self.extended = extended;
        self
    }

    pub fn encode(&self) -> WipResult<Vec<u8>> {
        let mut buf = self.header.encode()?.to_vec();
        buf.extend_from_slice(&self.body.encode()?);
        if self.header.flags.extended {
            encode_extended_fields(&mut buf, &self.extended)?;
        } else if !self.extended.is_empty() {
            return Err(WipError::InvalidField(
                "extended fields present but flags.extended is not set".into(),
            ));
        }
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::ReportReq {
            return Err(WipError::InvalidPacket(format!(
                "expected ReportReq, got {:?}",
                header.packet_type
            )));
        }
        let body_end = HEADER_SIZE + crate::wip_common_rs::packet::core::BODY_SIZE;
        if data.len() < body_end {
            return Err(WipError::InvalidPacket("truncated report body".into()));
        }
        let body = WeatherBody::decode(&data[HEADER_SIZE..body_end])?;
        let extended = if header.flags.extended {
            decode_extended_fields(data, body_end)?
        } else {
            Vec::new()
        };
        Ok(Self { header, body, extended })
    }
}

/// Acknowledgement of a report: header plus the fixed weather body (§3:
/// present on `WeatherResp` and `ReportResp` alike), so a report ack can
/// echo back the server's own reading for the reported area alongside its
/// resolved `area_code`.
#[derive(Debug, Clone)]
pub struct ReportResponse {
    pub header: Header,
    pub body: WeatherBody,
}

impl ReportResponse {
    pub fn new(packet_id: u16, timestamp: u64, area_code: u32, body: WeatherBody) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::ReportResp,
                flags: Flags::default(),
                day: 0,
                timestamp,
                area_code,
            },
            body,
        }
    }

    pub fn encode(&self) -> WipResult<Vec<u8>> {
        let mut buf = self.header.encode()?.to_vec();
        buf.extend_from_slice(&self.body.encode()?);
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::ReportResp {
            return Err(WipError::InvalidPacket(format!(
                "expected ReportResp, got {:?}",
                header.packet_type
            )));
        }
        let body_end = HEADER_SIZE + crate::wip_common_rs::packet::core::BODY_SIZE;
        if data.len() < body_end {
            return Err(WipError::InvalidPacket("truncated report response body".into()));
        }
        let body = WeatherBody::decode(&data[HEADER_SIZE..body_end])?;
        Ok(Self { header, body })
    }
}

impl crate::wip_common_rs::packet::core::Codec for ReportRequest {
    fn encode(&self) -> WipResult<Vec<u8>> {
        ReportRequest::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        ReportRequest::decode(data)
    }
}

impl crate::wip_common_rs::packet::core::Codec for ReportResponse {
    fn encode(&self) -> WipResult<Vec<u8>> {
        ReportResponse::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        ReportResponse::decode(data)
    }
}
