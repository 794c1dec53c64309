//! The fixed weather-response body (§3), present immediately after the
//! 16-byte header on `WeatherResp` and `ReportResp` packets.

use super::bit_utils::{extract_bits, insert_bits};
use super::error::{WipError, WipResult};

pub const BODY_SIZE: usize = 4;

/// `weather_code(16) temperature(8, +100 bias) precipitation_prob(8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherBody {
    pub weather_code: u16,
    /// Degrees Celsius, already de-biased. `None` round-trips through a raw
    /// byte of 0, which per §3 means -100C — callers that never set a
    /// temperature should treat that sentinel as "absent".
    pub temperature: i16,
    pub precipitation_prob: u8,
}

impl WeatherBody {
    pub fn encode(&self) -> WipResult<[u8; BODY_SIZE]> {
        if !(-100..=155).contains(&self.temperature) {
            return Err(WipError::InvalidField(format!(
                "temperature {} out of range -100..=155",
                self.temperature
            )));
        }
        if self.precipitation_prob > 100 {
            return Err(WipError::InvalidField(format!(
                "precipitation_prob {} exceeds 100",
                self.precipitation_prob
            )));
        }
        let mut buf = [0u8; BODY_SIZE];
        insert_bits(&mut buf, 0, 16, self.weather_code as u64);
        insert_bits(&mut buf, 16, 8, (self.temperature + 100) as u64);
        insert_bits(&mut buf, 24, 8, self.precipitation_prob as u64);
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> WipResult<Self> {
        if data.len() < BODY_SIZE {
            return Err(WipError::InvalidPacket(format!(
                "weather body too short: {} bytes",
                data.len()
            )));
        }
        let weather_code = extract_bits(data, 0, 16) as u16;
        let temp_raw = extract_bits(data, 16, 8) as i16;
        let precipitation_prob = extract_bits(data, 24, 8) as u8;
        if precipitation_prob > 100 {
            return Err(WipError::InvalidPacket(format!(
                "precipitation_prob {precipitation_prob} exceeds 100"
            )));
        }
        Ok(Self {
            weather_code,
            temperature: temp_raw - 100,
            precipitation_prob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_area_code_weather_response_body() {
        let body = WeatherBody {
            weather_code: 100,
            temperature: 25,
            precipitation_prob: 10,
        };
        let bytes = body.encode().unwrap();
        assert_eq!(extract_bits(&bytes, 16, 8), 125);
        let decoded = WeatherBody::decode(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn raw_zero_decodes_to_minus_100() {
        let bytes = [0u8; BODY_SIZE];
        let decoded = WeatherBody::decode(&bytes).unwrap();
        assert_eq!(decoded.temperature, -100);
    }

    #[test]
    fn precipitation_above_100_is_rejected_on_build() {
        let body = WeatherBody {
            weather_code: 1,
            temperature: 0,
            precipitation_prob: 101,
        };
        assert!(matches!(body.encode(), Err(WipError::InvalidField(_))));
    }

    #[test]
    fn precipitation_above_100_is_rejected_on_parse() {
        let mut bytes = [0u8; BODY_SIZE];
        insert_bits(&mut bytes, 24, 8, 150);
        assert!(matches!(WeatherBody::decode(&bytes), Err(WipError::InvalidPacket(_))));
    }
}
