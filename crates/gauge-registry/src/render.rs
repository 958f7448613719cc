use crate::bits::extract;
use crate::{DecodeError, RegisterDescriptor, RegisterKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes fetched for one register, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData {
    Word(u16),
    Block(Vec<u8>),
}

/// A raw reading tagged with the descriptor it was fetched for.
#[derive(Debug, Clone)]
pub struct RawReading<'a> {
    pub descriptor: &'a RegisterDescriptor,
    pub data: RawData,
}

impl RawReading<'_> {
    pub fn render(&self) -> Result<RenderedValue, DecodeError> {
        render(self.descriptor, &self.data)
    }
}

/// A decoded register value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RenderedValue {
    Flag(bool),
    UnsignedInt(u32),
    ScaledNumber { value: f64, decimals: u8 },
    Text(String),
    HexString(String),
    /// Named sub-values of one block, in definition order.
    Fields(Vec<FieldValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    pub value: RenderedValue,
}

impl RenderedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RenderedValue::ScaledNumber { value, .. } => Some(*value),
            RenderedValue::UnsignedInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[FieldValue] {
        match self {
            RenderedValue::Fields(f) => f,
            _ => &[],
        }
    }
}

impl fmt::Display for RenderedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedValue::Flag(true) => f.write_str("set"),
            RenderedValue::Flag(false) => f.write_str("clear"),
            RenderedValue::UnsignedInt(v) => write!(f, "0x{v:x}"),
            RenderedValue::ScaledNumber { value, decimals } => {
                write!(f, "{value:.prec$}", prec = *decimals as usize)
            }
            RenderedValue::Text(s) | RenderedValue::HexString(s) => f.write_str(s),
            RenderedValue::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", field.label, field.value)?;
                    if !field.unit.is_empty() {
                        write!(f, " {}", field.unit)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Render raw register bytes according to the descriptor kind.
///
/// The only failure is a reading whose shape does not match the kind (a word
/// for a block register or the reverse).
pub fn render(descriptor: &RegisterDescriptor, data: &RawData) -> Result<RenderedValue, DecodeError> {
    match (&descriptor.kind, data) {
        (RegisterKind::WordHex, RawData::Word(raw)) => {
            Ok(RenderedValue::HexString(format!("0x{raw:08X}")))
        }
        (RegisterKind::WordFloat { offset, scaling }, RawData::Word(raw)) => {
            Ok(RenderedValue::ScaledNumber {
                value: scale(*raw, *scaling, *offset),
                decimals: 3,
            })
        }
        (RegisterKind::WordInteger { offset, scaling }, RawData::Word(raw)) => {
            let value = scale(*raw, *scaling, *offset).trunc();
            Ok(RenderedValue::ScaledNumber {
                // -0.0 prints as "-0"
                value: if value == 0.0 { 0.0 } else { value },
                decimals: 0,
            })
        }
        (RegisterKind::BlockAscii, RawData::Block(payload)) => {
            Ok(RenderedValue::Text(sanitize_ascii(payload)))
        }
        (RegisterKind::BlockHex, RawData::Block(payload)) => {
            Ok(RenderedValue::HexString(hex_string(payload)))
        }
        (RegisterKind::BlockBits { fields }, RawData::Block(payload)) => {
            let values = fields
                .iter()
                .map(|field| {
                    let raw = extract(payload, field.lsb_index as usize, field.width);
                    FieldValue {
                        label: field.short_label.clone(),
                        description: field.long_label.clone(),
                        unit: String::new(),
                        value: if field.width == 1 {
                            RenderedValue::Flag(raw != 0)
                        } else {
                            RenderedValue::UnsignedInt(raw)
                        },
                    }
                })
                .collect();
            Ok(RenderedValue::Fields(values))
        }
        (kind, data) => Err(DecodeError::InvalidArgument(format!(
            "{}: {} register cannot render a {} reading",
            descriptor.name,
            kind.as_str(),
            match data {
                RawData::Word(_) => "word",
                RawData::Block(_) => "block",
            }
        ))),
    }
}

fn scale(raw: u16, scaling: f64, offset: f64) -> f64 {
    raw as f64 * scaling + offset
}

/// Replace bytes outside printable ASCII `[0x20, 0x7F)` with `.`.
pub fn sanitize_ascii(payload: &[u8]) -> String {
    payload
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
        .collect()
}

/// Space-separated two-digit uppercase hex.
pub fn hex_string(payload: &[u8]) -> String {
    payload
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
