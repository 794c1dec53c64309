//! Error response packet (§3, §4.D, §9): type code 7.
//!
//! Two incompatible encodings exist in the teacher's history (§9's open
//! question): a variable-length message and a fixed 16-bit code reusing
//! the weather_code bit-slot. This crate treats the variable-length form
//! as primary and the fixed-slot form as a legacy decode-only fallback,
//! per the spec's resolution.

use crate::wip_common_rs::packet::core::{
    bit_utils::{extract_bits, read_le16, write_le16},
    decode_extended_fields, Flags, Header, PacketType, WipError, WipResult, ExtendedValue,
    HEADER_SIZE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub header: Header,
    pub error_code: u16,
    pub message: Option<String>,
    pub severity: Option<u8>,
    pub sub_code: Option<u16>,
}

impl ErrorResponse {
    pub fn new(packet_id: u16, timestamp: u64, error_code: u16, message: impl Into<String>) -> Self {
        Self {
            header: Header {
                version: 1,
                packet_id,
                packet_type: PacketType::ErrorResp,
                flags: Flags::default(),
                day: 0,
                timestamp,
                area_code: 0,
            },
            error_code,
            message: Some(message.into()),
            severity: None,
            sub_code: None,
        }
    }

    pub fn with_severity(mut self, severity: u8, sub_code: u16) -> Self {
        self.severity = Some(severity);
        self.sub_code = Some(sub_code);
        self.header.flags.extended = true;
        self
    }

    /// Encodes the variable-length primary form: header + `u16 message_len`
    /// (LE) + UTF-8 message bytes, followed by a severity/sub-code extended
    /// field when set.
    pub fn encode(&self) -> WipResult<Vec<u8>> {
        let message = self.message.as_deref().unwrap_or("");
        let message_bytes = message.as_bytes();
        if message_bytes.len() > u16::MAX as usize {
            return Err(WipError::InvalidField("error message too long".into()));
        }

        let mut buf = self.header.encode()?.to_vec();
        let mut len_buf = [0u8; 2];
        write_le16(&mut len_buf, 0, message_bytes.len() as u16);
        buf.extend_from_slice(&len_buf);
        buf.extend_from_slice(message_bytes);

        if let (Some(severity), Some(sub_code)) = (self.severity, self.sub_code) {
            if !self.header.flags.extended {
                return Err(WipError::InvalidField(
                    "severity/sub_code present but flags.extended is not set".into(),
                ));
            }
            let mut payload = vec![severity];
            payload.extend_from_slice(&sub_code.to_le_bytes());
            crate::wip_common_rs::packet::core::encode_extended_fields(
                &mut buf,
                &[ExtendedValue::Binary(payload)],
            )?;
        }
        Ok(buf)
    }

    /// Tries the variable-length primary form first; falls back to the
    /// fixed-slot legacy encoding if the primary form doesn't parse (§9).
    pub fn decode(data: &[u8]) -> WipResult<Self> {
        let (header, _reserved_warning) = Header::decode(data)?;
        if header.packet_type != PacketType::ErrorResp {
            return Err(WipError::InvalidPacket(format!(
                "expected ErrorResp, got {:?}",
                header.packet_type
            )));
        }
        match Self::decode_variable_length(&header, data) {
            Ok(resp) => Ok(resp),
            Err(_) => Self::decode_fixed_slot(&header, data),
        }
    }

    fn decode_variable_length(header: &Header, data: &[u8]) -> WipResult<Self> {
        if data.len() < HEADER_SIZE + 2 {
            return Err(WipError::InvalidPacket("too short for variable-length error".into()));
        }
        let message_len = read_le16(data, HEADER_SIZE) as usize;
        let message_start = HEADER_SIZE + 2;
        let message_end = message_start + message_len;
        if message_end > data.len() {
            return Err(WipError::InvalidPacket("error message runs past buffer".into()));
        }
        let message = String::from_utf8(data[message_start..message_end].to_vec())
            .map_err(|_| WipError::InvalidPacket("invalid utf-8 in error message".into()))?;

        let (mut severity, mut sub_code) = (None, None);
        if header.flags.extended && message_end < data.len() {
            let extended = decode_extended_fields(data, message_end)?;
            if let Some(ExtendedValue::Binary(payload)) = extended.first() {
                if payload.len() >= 3 {
                    severity = Some(payload[0]);
                    sub_code = Some(u16::from_le_bytes([payload[1], payload[2]]));
                }
            }
        }

        Ok(Self {
            header: *header,
            error_code: 0,
            message: Some(message),
            severity,
            sub_code,
        })
    }

    fn decode_fixed_slot(header: &Header, data: &[u8]) -> WipResult<Self> {
        if data.len() < HEADER_SIZE + 2 {
            return Err(WipError::InvalidPacket("too short for fixed-slot error".into()));
        }
        let error_code = extract_bits(data, 8 * HEADER_SIZE, 16) as u16;
        Ok(Self {
            header: *header,
            error_code,
            message: None,
            severity: None,
            sub_code: None,
        })
    }
}

impl crate::wip_common_rs::packet::core::Codec for ErrorResponse {
    fn encode(&self) -> WipResult<Vec<u8>> {
        ErrorResponse::encode(self)
    }
    fn decode(data: &[u8]) -> WipResult<Self> {
        ErrorResponse::decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_length_form_round_trips() {
        let resp = ErrorResponse::new(1, 1_700_000_000, 0, "area code not found")
            .with_severity(2, 7);
        let bytes = resp.encode().unwrap();
        let decoded = ErrorResponse::decode(&bytes).unwrap();
        assert_eq!(decoded.message.as_deref(), Some("area code not found"));
        assert_eq!(decoded.severity, Some(2));
        assert_eq!(decoded.sub_code, Some(7));
    }

    #[test]
    fn fixed_slot_fallback_decodes_legacy_packets() {
        let header = Header {
            version: 1,
            packet_id: 3,
            packet_type: PacketType::ErrorResp,
            flags: Flags::default(),
            day: 0,
            timestamp: 1_700_000_000,
            area_code: 0,
        };
        let mut buf = header.encode().unwrap().to_vec();
        let mut code_buf = [0u8; 2];
        write_le16(&mut code_buf, 0, 42);
        buf.extend_from_slice(&code_buf);
        // This buffer is exactly 18 bytes: the variable-length decoder would
        // read message_len=42 and find it runs past the buffer, so it falls
        // back to the fixed-slot decode.
        let decoded = ErrorResponse::decode(&buf).unwrap();
        assert_eq!(decoded.error_code, 42);
        assert_eq!(decoded.message, None);
    }

    #[test]
    fn empty_message_round_trips() {
        let resp = ErrorResponse::new(1, 1, 0, "");
        let bytes = resp.encode().unwrap();
        let decoded = ErrorResponse::decode(&bytes).unwrap();
        assert_eq!(decoded.message.as_deref(), Some(""));
    }
}
