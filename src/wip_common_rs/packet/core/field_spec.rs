//! Field-spec loader (§4.C): JSON-driven description of field name, bit
//! offset, bit length and type, assembled once into an indexed `FieldTable`
//! rather than reflected over per packet.

use super::error::{WipError, WipResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A single field's type, used only for validation at load time — the
/// codec itself addresses fields purely by offset/length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uint,
    Int,
    Reserved,
}

impl FieldKind {
    fn from_str(s: &str) -> WipResult<Self> {
        match s {
            "uint" => Ok(FieldKind::Uint),
            "int" => Ok(FieldKind::Int),
            "reserved" => Ok(FieldKind::Reserved),
            other => Err(WipError::ConfigError(format!("unknown field type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub offset: usize,
    pub length: u8,
    pub kind: FieldKind,
}

/// An immutable, name-indexed table of field positions for one packet role.
/// Built once at construction (or on an explicit reload) and shared
/// read-only thereafter, per §9's "no runtime reflection" redesign note.
#[derive(Debug, Clone)]
pub struct FieldTable {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldEntry {
    Length(u32),
    Full { length: u32, #[serde(rename = "type")] kind: Option<String> },
}

impl FieldTable {
    /// Builds a table from an ordered list of `(name, length, kind)`
    /// entries, assigning bit offsets left-to-right starting at bit 0 — the
    /// same packing rule the JSON loader below uses.
    pub fn from_entries(entries: &[(&str, u8, FieldKind)]) -> WipResult<Self> {
        let mut fields = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut offset = 0usize;
        for &(name, length, kind) in entries {
            if !(1..=64).contains(&length) {
                return Err(WipError::ConfigError(format!(
                    "field '{name}' has out-of-range length {length}"
                )));
            }
            index.insert(name.to_string(), fields.len());
            fields.push(FieldSpec {
                name: name.to_string(),
                offset,
                length,
                kind,
            });
            offset += length as usize;
        }
        Ok(Self { fields, index })
    }

    /// Parses a field-spec JSON object: keys are field names in bit-layout
    /// order, values are either a bare integer length or `{length, type}`.
    /// Overlap is structurally impossible since offsets are assigned by
    /// declaration order, but out-of-range lengths are rejected before the
    /// table is returned, so a reload either succeeds atomically or changes
    /// nothing (the caller swaps the old `Arc<FieldTable>` only once this
    /// returns `Ok`).
    pub fn from_json(json: &str) -> WipResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| WipError::ConfigError(format!("invalid field-spec JSON: {e}")))?;
        let object = value
            .as_object()
            .ok_or_else(|| WipError::ConfigError("field spec must be a JSON object".into()))?;

        let mut fields = Vec::with_capacity(object.len());
        let mut index = HashMap::with_capacity(object.len());
        let mut offset = 0usize;
        for (name, raw) in object {
            let entry: RawFieldEntry = serde_json::from_value(raw.clone())
                .map_err(|e| WipError::ConfigError(format!("field '{name}': {e}")))?;
            let (length, kind) = match entry {
                RawFieldEntry::Length(len) => (len, FieldKind::Uint),
                RawFieldEntry::Full { length, kind } => (
                    length,
                    match kind {
                        Some(k) => FieldKind::from_str(&k)?,
                        None => FieldKind::Uint,
                    },
                ),
            };
            if length == 0 || length > 64 {
                return Err(WipError::ConfigError(format!(
                    "field '{name}' has out-of-range length {length}"
                )));
            }
            index.insert(name.clone(), fields.len());
            fields.push(FieldSpec {
                name: name.clone(),
                offset,
                length: length as u8,
                kind,
            });
            offset += length as usize;
        }
        Ok(Self { fields, index })
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn total_bits(&self) -> usize {
        self.fields.iter().map(|f| f.offset + f.length as usize).max().unwrap_or(0)
    }
}

/// The 16-byte header's fields in wire order, shared by every packet role
/// (§3). Declared as `from_entries` literals rather than read from JSON so
/// the loader's own offset-assignment path is exercised even when a caller
/// never supplies a field-spec file.
const HEADER_ENTRIES: &[(&str, u8, FieldKind)] = &[
    ("version", 4, FieldKind::Uint),
    ("packet_id", 12, FieldKind::Uint),
    ("type", 3, FieldKind::Uint),
    ("flags", 8, FieldKind::Uint),
    ("day", 3, FieldKind::Uint),
    ("reserved", 2, FieldKind::Reserved),
    ("timestamp", 64, FieldKind::Uint),
    ("area_code", 20, FieldKind::Uint),
    ("checksum", 12, FieldKind::Uint),
];

/// The fixed body fields carried by `WeatherResp`/`ReportResp` (§3),
/// appended after the header fields.
const WEATHER_BODY_ENTRIES: &[(&str, u8, FieldKind)] = &[
    ("weather_code", 16, FieldKind::Uint),
    ("temperature", 8, FieldKind::Int),
    ("precipitation_prob", 8, FieldKind::Uint),
];

/// One declaration from a JSON extended-field spec file (§4.C): extended
/// entries carry `{key, type, encoding, format?}` rather than a base
/// entry's `{length, type}`, since their position on the wire comes from
/// their own TLV header, not declaration order.
#[derive(Debug, Clone)]
pub struct ExtendedFieldSpec {
    pub key: u8,
    pub kind: String,
    pub encoding: String,
    pub format: HashMap<String, u32>,
}

#[derive(Deserialize)]
struct RawExtendedFieldSpec {
    key: u32,
    #[serde(rename = "type")]
    kind: String,
    encoding: String,
    #[serde(default)]
    format: HashMap<String, u32>,
}

/// Validates an extended-field declaration's key range (§4.C: keys 0-63
/// are type-indexed) and, for types with a fixed-width format, that the
/// declared bit widths fit the value (e.g. coordinate's
/// `latitude_bits`/`longitude_bits` summing to at most 64).
fn validate_extended_entry(key: u8, kind: &str, format: &HashMap<String, u32>) -> WipResult<()> {
    if kind == "coordinate" {
        let latitude_bits = format.get("latitude_bits").copied().unwrap_or(32);
        let longitude_bits = format.get("longitude_bits").copied().unwrap_or(32);
        if latitude_bits + longitude_bits > 64 {
            return Err(WipError::ConfigError(format!(
                "extended field {key} (coordinate) format exceeds 64 bits: \
                 latitude_bits={latitude_bits} longitude_bits={longitude_bits}"
            )));
        }
    }
    Ok(())
}

/// A key-indexed table of extended-field declarations for one packet role,
/// built once from a JSON array (or literal entries) and shared read-only
/// thereafter — the extended-field sibling of `FieldTable`.
#[derive(Debug, Clone)]
pub struct ExtendedFieldTable {
    fields: Vec<ExtendedFieldSpec>,
    index: HashMap<u8, usize>,
}

impl ExtendedFieldTable {
    /// Builds a table from already-assembled entries, validating each the
    /// same way `from_json` does.
    pub fn from_entries(entries: &[ExtendedFieldSpec]) -> WipResult<Self> {
        let mut fields = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.key > 63 {
                return Err(WipError::ConfigError(format!(
                    "extended field key {} exceeds the 6-bit range 0-63",
                    entry.key
                )));
            }
            validate_extended_entry(entry.key, &entry.kind, &entry.format)?;
            index.insert(entry.key, fields.len());
            fields.push(entry.clone());
        }
        Ok(Self { fields, index })
    }

    /// Parses a JSON array of `{key, type, encoding, format?}` extended
    /// field declarations (§4.C).
    pub fn from_json(json: &str) -> WipResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| WipError::ConfigError(format!("invalid extended-field JSON: {e}")))?;
        let array = value
            .as_array()
            .ok_or_else(|| WipError::ConfigError("extended field spec must be a JSON array".into()))?;

        let mut fields = Vec::with_capacity(array.len());
        let mut index = HashMap::with_capacity(array.len());
        for raw in array {
            let entry: RawExtendedFieldSpec = serde_json::from_value(raw.clone())
                .map_err(|e| WipError::ConfigError(format!("extended field entry: {e}")))?;
            if entry.key > 63 {
                return Err(WipError::ConfigError(format!(
                    "extended field key {} exceeds the 6-bit range 0-63",
                    entry.key
                )));
            }
            let key = entry.key as u8;
            validate_extended_entry(key, &entry.kind, &entry.format)?;
            index.insert(key, fields.len());
            fields.push(ExtendedFieldSpec {
                key,
                kind: entry.kind,
                encoding: entry.encoding,
                format: entry.format,
            });
        }
        Ok(Self { fields, index })
    }

    pub fn get(&self, key: u8) -> Option<&ExtendedFieldSpec> {
        self.index.get(&key).map(|&i| &self.fields[i])
    }

    pub fn fields(&self) -> &[ExtendedFieldSpec] {
        &self.fields
    }

    /// The eight built-in TLV types the codec knows how to serialize and
    /// deserialize (`extended_field::ExtendedKey`), expressed as spec
    /// entries so the loader's own validation runs over the crate's
    /// defaults too, not only over caller-supplied JSON.
    pub fn default_table() -> WipResult<Self> {
        Self::from_entries(&[
            ExtendedFieldSpec {
                key: 0,
                kind: "string_list".into(),
                encoding: "utf8".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 1,
                kind: "coordinate".into(),
                encoding: "fixed32".into(),
                format: HashMap::from([("latitude_bits".to_string(), 32), ("longitude_bits".to_string(), 32)]),
            },
            ExtendedFieldSpec {
                key: 2,
                kind: "source_info".into(),
                encoding: "binary".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 3,
                kind: "binary".into(),
                encoding: "raw".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 4,
                kind: "float32".into(),
                encoding: "ieee754".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 5,
                kind: "int64".into(),
                encoding: "le".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 6,
                kind: "bool".into(),
                encoding: "u8".into(),
                format: HashMap::new(),
            },
            ExtendedFieldSpec {
                key: 7,
                kind: "json".into(),
                encoding: "utf8".into(),
                format: HashMap::new(),
            },
        ])
    }
}

impl FieldTable {
    /// The shared 16-byte header layout, common to all four packet roles.
    pub fn header_default() -> WipResult<Self> {
        Self::from_entries(HEADER_ENTRIES)
    }

    /// Field spec for the weather role: header + fixed weather body.
    pub fn weather_default() -> WipResult<Self> {
        Self::from_entries(&[HEADER_ENTRIES, WEATHER_BODY_ENTRIES].concat())
    }

    /// Field spec for the location role: header only — coordinates travel
    /// as a TLV extended field, not a fixed body.
    pub fn location_default() -> WipResult<Self> {
        Self::from_entries(HEADER_ENTRIES)
    }

    /// Field spec for the query role: header only.
    pub fn query_default() -> WipResult<Self> {
        Self::from_entries(HEADER_ENTRIES)
    }

    /// Field spec for the report role: header + fixed weather body, per
    /// §3's "present for WeatherResp and ReportResp only".
    pub fn report_default() -> WipResult<Self> {
        Self::from_entries(&[HEADER_ENTRIES, WEATHER_BODY_ENTRIES].concat())
    }
}
