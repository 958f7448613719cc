use crate::render::RenderedValue;
use crate::{DecodeError, DecodedEntry, RegisterDescriptor, RegisterSchema};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Serializable result of one full decode pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeReport {
    pub device: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub command: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RenderedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportEntry {
    pub fn new(descriptor: &RegisterDescriptor, result: &Result<RenderedValue, DecodeError>) -> Self {
        let (value, error) = match result {
            Ok(v) => (Some(v.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            command: format!("0x{:02X}", descriptor.command),
            name: descriptor.name.clone(),
            unit: descriptor.unit.clone(),
            value,
            error,
        }
    }
}

impl DecodeReport {
    pub fn new(
        schema: &RegisterSchema,
        address: u8,
        entries: &[DecodedEntry<'_>],
        ts: Option<OffsetDateTime>,
    ) -> Self {
        Self {
            device: schema.device.clone(),
            address: format!("0x{address:02X}"),
            ts: ts.and_then(|t| {
                t.format(&time::format_description::well_known::Rfc3339)
                    .ok()
            }),
            entries: entries
                .iter()
                .map(|e| ReportEntry::new(e.descriptor, &e.result))
                .collect(),
        }
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_some()).count()
    }
}

/// Terminal lines for one register: `name: value unit`, or a heading followed
/// by one indented line per field for block values with sub-fields. Block
/// text and hex payloads are quoted.
pub fn format_lines(
    descriptor: &RegisterDescriptor,
    result: &Result<RenderedValue, DecodeError>,
) -> Vec<String> {
    let name = descriptor.name.as_str();
    let suffix = if descriptor.unit.is_empty() {
        String::new()
    } else {
        format!(" {}", descriptor.unit)
    };
    match result {
        Err(e) => vec![format!("{name:<32}: error: {e}")],
        Ok(RenderedValue::Fields(fields)) => {
            let mut lines = Vec::with_capacity(fields.len() + 1);
            lines.push(format!("{name}:"));
            for field in fields {
                let label = if field.description.is_empty() {
                    field.label.clone()
                } else {
                    format!("{} - {}", field.label, field.description)
                };
                let line = match &field.value {
                    RenderedValue::Flag(set) => {
                        format!("  [{}] {label}", if *set { "X" } else { " " })
                    }
                    other if field.unit.is_empty() => format!("  {label}: {other}"),
                    other => format!("  {label}: {other} {}", field.unit),
                };
                lines.push(line);
            }
            lines
        }
        Ok(v @ (RenderedValue::Text(_) | RenderedValue::HexString(_))) if descriptor.kind.is_block() => {
            vec![format!("{name:<32}: '{v}'{suffix}")]
        }
        Ok(v) => vec![format!("{name:<32}: {v}{suffix}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FieldValue;
    use crate::{decode_all, RegisterKind};
    use smbus_transport::{MockBus, TransportError};

    fn desc(name: &str, unit: &str, kind: RegisterKind) -> RegisterDescriptor {
        RegisterDescriptor::new(0x01, name, unit, kind)
    }

    #[test]
    fn test_scalar_line() {
        let v = Ok(RenderedValue::ScaledNumber {
            value: 16.42,
            decimals: 3,
        });
        let voltage = RegisterDescriptor::word_float(0x09, "Voltage", "V", 0.001, 0.0);
        assert_eq!(
            format_lines(&voltage, &v),
            vec![format!("{:<32}: 16.420 V", "Voltage")]
        );
    }

    #[test]
    fn test_text_is_quoted_and_word_hex_is_not() {
        let text = Ok(RenderedValue::Text("LION".into()));
        assert_eq!(
            format_lines(&desc("DeviceChemistry", "", RegisterKind::BlockAscii), &text),
            vec![format!("{:<32}: 'LION'", "DeviceChemistry")]
        );
        let hex = Ok(RenderedValue::HexString("0x00005A4C".into()));
        assert_eq!(
            format_lines(&desc("ManufacturerDate", "", RegisterKind::WordHex), &hex),
            vec![format!("{:<32}: 0x00005A4C", "ManufacturerDate")]
        );
    }

    #[test]
    fn test_field_lines() {
        let v = Ok(RenderedValue::Fields(vec![
            FieldValue {
                label: "DSG".into(),
                description: "Discharging".into(),
                unit: String::new(),
                value: RenderedValue::Flag(true),
            },
            FieldValue {
                label: "EC".into(),
                description: String::new(),
                unit: String::new(),
                value: RenderedValue::UnsignedInt(3),
            },
        ]));
        assert_eq!(
            format_lines(&RegisterDescriptor::bits(0x16, "BatteryStatus", vec![]), &v),
            vec![
                "BatteryStatus:".to_string(),
                "  [X] DSG - Discharging".to_string(),
                "  EC: 0x3".to_string(),
            ]
        );
    }

    #[test]
    fn test_error_line() {
        let e = Err(DecodeError::Transport(TransportError::Nack));
        assert_eq!(
            format_lines(&desc("Voltage", "V", RegisterKind::WordHex), &e),
            vec![format!("{:<32}: error: transport: device did not acknowledge", "Voltage")]
        );
    }

    #[test]
    fn test_report_json() {
        let schema = RegisterSchema::new(
            "test",
            0x0B,
            vec![
                RegisterDescriptor::word_float(0x09, "Voltage", "V", 0.001, 0.0),
                RegisterDescriptor::new(0x21, "DeviceName", "", RegisterKind::BlockAscii),
            ],
        );
        let mut bus = MockBus::new(0x0B);
        bus.set_word(0x09, 300);
        let entries = decode_all(&mut bus, 0x0B, &schema);
        let report = DecodeReport::new(&schema, 0x0B, &entries, None);
        assert_eq!(report.failures(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["address"], "0x0B");
        assert_eq!(json["entries"][0]["value"]["type"], "scaled_number");
        assert_eq!(json["entries"][1]["error"], "transport: device did not acknowledge");
        assert!(json.get("ts").is_none());
    }

    #[test]
    fn test_report_timestamp() {
        let schema = RegisterSchema::new("empty", 0x0B, vec![]);
        let ts = OffsetDateTime::from_unix_timestamp(0).unwrap();
        let report = DecodeReport::new(&schema, 0x0B, &[], Some(ts));
        assert_eq!(report.ts.as_deref(), Some("1970-01-01T00:00:00Z"));
    }
}
