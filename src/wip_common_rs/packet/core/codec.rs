//! The `encode`/`decode` contract shared by every packet role (§4.D).
//!
//! Grounded on the teacher's `PacketFormat` trait (`to_bytes`/`from_bytes`)
//! in `packet/core/format_base.rs`, narrowed to the two operations this
//! spec actually needs and returning `WipResult<T>` in place of the
//! teacher's silently-lossy `Option`. Each packet type already carries its
//! own inherent `encode`/`decode` pair (so role-specific callers don't need
//! the trait in scope); this lets generic code over `P: Codec` reach the
//! same methods when the packet role is a type parameter.

use super::error::WipResult;

pub trait Codec: Sized {
    fn encode(&self) -> WipResult<Vec<u8>>;
    fn decode(data: &[u8]) -> WipResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wip_common_rs::packet::core::Flags;
    use crate::wip_common_rs::packet::types::WeatherRequest;

    fn round_trip_via_trait<P: Codec>(packet: P) -> P {
        let bytes = packet.encode().unwrap();
        P::decode(&bytes).unwrap()
    }

    #[test]
    fn generic_caller_can_round_trip_any_packet_role_through_the_trait() {
        let req = WeatherRequest::new(460_010, 42, 1_700_000_000, Flags::default(), 0);
        let decoded = round_trip_via_trait(req);
        assert_eq!(decoded.header.area_code, 460_010);
    }
}
