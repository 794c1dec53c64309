//! Query role packet (§3, §6): `QueryReq`, type code 6.
//!
//! §6's endpoint table lists only a request type for the query role; a
//! query resolves to the same `WeatherResp` (type 3) fixed-body response
//! the weather role returns, reusing `WeatherResponse` rather than
//! duplicating its wire format under a new name.

use crate::wip_common_rs::packet::core::{
    decode_extended_fields, encode_extended_fields, Flags, Header, PacketType, WipError,
    WipResult, ExtendedValue, HEADER_SIZE,
};
pub use crate::wip_common_rs::packet::types::weather::WeatherResponse as QueryResponse;

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub header: Header,
    pub extended: Vec<ExtendedValue>,
}

impl QueryRequest {
    pub fn new(area_code: u32, packet_id: u16, timestamp: u64, flags: Flags, day: u8) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::QueryReq,
                flags,
                day,
                timestamp,
                area_code,
            },
            extended: Vec::new(),
        }
    }

    pub fn with_extended(mut self, extended: Vec<ExtendedValue>) -> Self {
        self.extended = extended;
        self
    }

    pub fn encode(&self) -> WipResult<Vec<u8>> {
        if !self.extended.is_empty() && !self.header.flags.extended {
            return Err(WipError::InvalidField(
                "extended fields present but flags.extended is not set".into(),
            ));
        }
        let mut buf = self.header.encode()?.to_vec();
        if self.header.flags.extended {
            encode_extended_fields(&mut buf, &self.extended)?;
        }
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::QueryReq {
            return Err(WipError::InvalidPacket(format!(
                "expected QueryReq, got {:?}",
                header.packet_type
            )));
        }
        let extended = if header.flags.extended {
            decode_extended_fields(data, HEADER_SIZE)?
        } else {
            Vec::new()
        };
        Ok(Self { header, extended })
    }
}

impl crate::wip_common_rs::packet::core::Codec for QueryRequest {
    fn encode(&self) -> WipResult<Vec<u8>> {
        QueryRequest::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        QueryRequest::decode(data)
    }
}
