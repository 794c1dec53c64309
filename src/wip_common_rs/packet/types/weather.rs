//! Weather role packets (§3, §6): `WeatherReq`/`WeatherResp`, type codes 2/3.
//!
//! Grounded on the teacher's `query_packet.rs` (its "Query" struct at type
//! 2/3 is this spec's Weather role — the teacher's `QueryRequest`/
//! `QueryResponse` naming predates the role split this spec uses).

use crate::wip_common_rs::packet::core::{
    decode_extended_fields, encode_extended_fields, Flags, Header, PacketType, WeatherBody,
    WipError, WipResult, ExtendedValue, HEADER_SIZE,
};

/// A weather query, built by name per §4.D step 2 ("`type`, `version` and
/// `timestamp` must be explicit").
#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub header: Header,
    pub extended: Vec<ExtendedValue>,
}

impl WeatherRequest {
    pub fn new(area_code: u32, packet_id: u16, timestamp: u64, flags: Flags, day: u8) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::WeatherReq,
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

    /// Finalises the packet: appends extended fields (only valid when
    /// `flags.extended` is set) and embeds the checksum (§4.D step 5).
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
        if header.packet_type != PacketType::WeatherReq {
            return Err(WipError::InvalidPacket(format!(
                "expected WeatherReq, got {:?}",
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

/// A weather response: header + fixed body + optional extended fields
/// (alerts/disasters as `string_list`, auth hash, etc).
#[derive(Debug, Clone)]
pub struct WeatherResponse {
    pub header: Header,
    pub body: WeatherBody,
    pub extended: Vec<ExtendedValue>,
}

impl WeatherResponse {
    pub fn new(packet_id: u16, area_code: u32, timestamp: u64, body: WeatherBody, flags: Flags) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::WeatherResp,
                flags,
                day: 0,
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
        if header.packet_type != PacketType::WeatherResp {
            return Err(WipError::InvalidPacket(format!(
                "expected WeatherResp, got {:?}",
                header.packet_type
            )));
        }
        let body_end = HEADER_SIZE + crate::wip_common_rs::packet::core::BODY_SIZE;
        if data.len() < body_end {
            return Err(WipError::InvalidPacket("truncated weather response body".into()));
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

impl crate::wip_common_rs::packet::core::Codec for WeatherRequest {
    fn encode(&self) -> WipResult<Vec<u8>> {
        WeatherRequest::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        WeatherRequest::decode(data)
    }
}

impl crate::wip_common_rs::packet::core::Codec for WeatherResponse {
    fn encode(&self) -> WipResult<Vec<u8>> {
        WeatherResponse::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        WeatherResponse::decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(weather: bool, temperature: bool, precipitation: bool) -> Flags {
        Flags {
            weather,
            temperature,
            precipitation,
            ..Default::default()
        }
    }

    #[test]
    fn scenario_1_area_code_weather_request_response_round_trip() {
        let req = WeatherRequest::new(460_010, 42, 1_700_000_000, flags(true, true, true), 0);
        let req_bytes = req.encode().unwrap();
        let decoded_req = WeatherRequest::decode(&req_bytes).unwrap();
        assert_eq!(decoded_req.header.area_code, 460_010);
        assert_eq!(decoded_req.header.packet_id, 42);

        let body = WeatherBody {
            weather_code: 100,
            temperature: 25,
            precipitation_prob: 10,
        };
        let resp = WeatherResponse::new(42, 460_010, 1_700_000_000, body, flags(true, true, true));
        let resp_bytes = resp.encode().unwrap();
        let decoded_resp = WeatherResponse::decode(&resp_bytes).unwrap();
        assert_eq!(decoded_resp.header.packet_id, 42);
        assert_eq!(decoded_resp.body.weather_code, 100);
        assert_eq!(decoded_resp.body.temperature, 25);
        assert_eq!(decoded_resp.body.precipitation_prob, 10);
    }

    #[test]
    fn scenario_5_alerts_and_disasters_round_trip_via_extended_fields() {
        let mut flags = flags(true, true, true);
        flags.alert = true;
        flags.disaster = true;
        flags.extended = true;
        let body = WeatherBody {
            weather_code: 100,
            temperature: 25,
            precipitation_prob: 10,
        };
        let resp = WeatherResponse::new(1, 460_010, 1_700_000_000, body, flags).with_extended(vec![
            ExtendedValue::StringList(vec!["Heavy Rain".into(), "Flood".into()]),
            ExtendedValue::StringList(vec!["Landslide".into()]),
        ]);
        let bytes = resp.encode().unwrap();
        let decoded = WeatherResponse::decode(&bytes).unwrap();
        assert_eq!(
            decoded.extended,
            vec![
                ExtendedValue::StringList(vec!["Heavy Rain".into(), "Flood".into()]),
                ExtendedValue::StringList(vec!["Landslide".into()]),
            ]
        );
    }

    #[test]
    fn extended_fields_without_flag_are_rejected_on_encode() {
        let body = WeatherBody {
            weather_code: 1,
            temperature: 0,
            precipitation_prob: 0,
        };
        let resp = WeatherResponse::new(1, 1, 1, body, flags(false, false, false))
            .with_extended(vec![ExtendedValue::Bool(true)]);
        assert!(matches!(resp.encode(), Err(WipError::InvalidField(_))));
    }

    #[test]
    fn wrong_packet_type_is_rejected() {
        let req = WeatherRequest::new(1, 1, 1, flags(false, false, false), 0);
        let bytes = req.encode().unwrap();
        assert!(matches!(WeatherResponse::decode(&bytes), Err(WipError::InvalidPacket(_))));
    }
}
