//! Packet core: bit I/O, checksum, error taxonomy, field-spec loading, the
//! fixed header, and extended (TLV) fields.

pub mod bit_utils;
pub mod body;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod extended_field;
pub mod field_spec;
pub mod header;

pub use bit_utils::{extract_bits, insert_bits, read_le16, read_le32, read_le64};
pub use body::{WeatherBody, BODY_SIZE};
pub use checksum::{calc_checksum12, embed_checksum12, verify_checksum12};
pub use codec::Codec;
pub use error::{WipError, WipResult};
pub use extended_field::{decode_extended_fields, encode_extended_fields, ExtendedValue};
pub use field_spec::{ExtendedFieldSpec, ExtendedFieldTable, FieldKind, FieldSpec, FieldTable};
pub use header::{Flags, Header, PacketType, HEADER_SIZE};
