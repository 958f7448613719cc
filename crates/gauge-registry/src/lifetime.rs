//! Lifetime Data blocks (`0x60`..`0x62`).
//!
//! Block 1 holds the cell voltage and current extremes the gauge has ever
//! recorded and is decoded into named values. Blocks 2 and 3 are counters and
//! timers without a stable word layout; they are returned as hex.

use crate::bits::{extract, le16};
use crate::block::read_block;
use crate::builtin::commands::LIFETIME_DATA1;
use crate::render::{hex_string, FieldValue, RenderedValue};
use crate::{DecodeError, RegisterDescriptor, RegisterKind};
use smbus_transport::SmbusBus;
use std::ops::RangeInclusive;
use tracing::debug;

/// Valid block indexes.
pub const LIFETIME_BLOCKS: RangeInclusive<u8> = 1..=3;

struct Slot {
    label: &'static str,
    offset: usize,
    bytes: usize,
    scaling: f64,
    decimals: u8,
    unit: &'static str,
}

const fn millis(label: &'static str, offset: usize, unit: &'static str) -> Slot {
    Slot {
        label,
        offset,
        bytes: 2,
        scaling: 0.001,
        decimals: 3,
        unit,
    }
}

const BLOCK1: [Slot; 13] = [
    millis("Max Cell Voltage 1", 0, "V"),
    millis("Max Cell Voltage 2", 2, "V"),
    millis("Max Cell Voltage 3", 4, "V"),
    millis("Max Cell Voltage 4", 6, "V"),
    millis("Min Cell Voltage 1", 8, "V"),
    millis("Min Cell Voltage 2", 10, "V"),
    millis("Min Cell Voltage 3", 12, "V"),
    millis("Min Cell Voltage 4", 14, "V"),
    millis("Max Delta Cell Voltage", 16, "V"),
    millis("Max Charge Current", 18, "A"),
    millis("Max Discharge Current", 20, "A"),
    millis("Max Avg Discharge Current", 22, "A"),
    Slot {
        label: "Max Avg Discharge Power",
        offset: 24,
        bytes: 1,
        scaling: 1.0,
        decimals: 0,
        unit: "W",
    },
];

/// Command code for a lifetime block index, rejecting indexes outside 1..=3.
pub fn lifetime_command(index: u8) -> Result<u8, DecodeError> {
    if !LIFETIME_BLOCKS.contains(&index) {
        return Err(DecodeError::InvalidArgument(format!(
            "LifetimeData block index {index} out of range ({}..{})",
            LIFETIME_BLOCKS.start(),
            LIFETIME_BLOCKS.end()
        )));
    }
    Ok(LIFETIME_DATA1 + (index - 1))
}

/// Descriptor naming lifetime block `index`, for display and reports.
pub fn lifetime_descriptor(index: u8) -> Result<RegisterDescriptor, DecodeError> {
    let command = lifetime_command(index)?;
    Ok(RegisterDescriptor::new(
        command,
        &format!("LifetimeData{index}"),
        "",
        RegisterKind::BlockHex,
    ))
}

/// Read and decode Lifetime Data block `index`.
///
/// The index is checked before any bus traffic. Values past the end of a
/// short block read as zero.
pub fn decode_lifetime<B>(bus: &mut B, address: u8, index: u8) -> Result<RenderedValue, DecodeError>
where
    B: SmbusBus + ?Sized,
{
    let command = lifetime_command(index)?;
    let payload = read_block(bus, address, command)?;
    debug!(index, len = payload.len(), "lifetime block read");
    Ok(render_lifetime(index, &payload))
}

/// Render a lifetime block payload that has already been read.
pub fn render_lifetime(index: u8, payload: &[u8]) -> RenderedValue {
    if index != 1 {
        return RenderedValue::HexString(hex_string(payload));
    }
    let fields = BLOCK1
        .iter()
        .map(|slot| {
            let raw = match slot.bytes {
                2 => u32::from(le16(payload, slot.offset)),
                _ => extract(payload, slot.offset * 8, 8),
            };
            FieldValue {
                label: slot.label.to_string(),
                description: String::new(),
                unit: slot.unit.to_string(),
                value: RenderedValue::ScaledNumber {
                    value: raw as f64 * slot.scaling,
                    decimals: slot.decimals,
                },
            }
        })
        .collect();
    RenderedValue::Fields(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smbus_transport::{MockBus, TransportError};

    #[test]
    fn test_index_out_of_range_issues_no_io() {
        for index in [0u8, 4, 255] {
            let mut bus = MockBus::with_gauge_defaults(0x0B);
            let res = decode_lifetime(&mut bus, 0x0B, index);
            assert!(matches!(res, Err(DecodeError::InvalidArgument(_))));
            assert!(bus.calls().is_empty());
        }
    }

    #[test]
    fn test_command_mapping() {
        assert_eq!(lifetime_command(1), Ok(0x60));
        assert_eq!(lifetime_command(2), Ok(0x61));
        assert_eq!(lifetime_command(3), Ok(0x62));
    }

    #[test]
    fn test_descriptor_names_block() {
        let desc = lifetime_descriptor(2).unwrap();
        assert_eq!(desc.name, "LifetimeData2");
        assert_eq!(desc.command, 0x61);
        assert!(lifetime_descriptor(0).is_err());
    }

    #[test]
    fn test_block1_decoded() {
        let mut bus = MockBus::with_gauge_defaults(0x0B);
        let v = decode_lifetime(&mut bus, 0x0B, 1).unwrap();
        let fields = v.fields();
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[0].label, "Max Cell Voltage 1");
        assert_eq!(fields[0].value.to_string(), "4.142");
        assert_eq!(fields[0].unit, "V");
        assert_eq!(fields[9].value.to_string(), "2.000");
        assert_eq!(fields[12].value.to_string(), "45");
        assert_eq!(bus.calls()[0].write, vec![0x60]);
    }

    #[test]
    fn test_short_block1_reads_zero() {
        let v = render_lifetime(1, &[0x2E, 0x10]);
        assert_eq!(v.fields()[0].value.to_string(), "4.142");
        assert_eq!(v.fields()[1].value.as_f64(), Some(0.0));
    }

    #[test]
    fn test_blocks_2_and_3_are_hex() {
        let mut bus = MockBus::with_gauge_defaults(0x0B);
        assert_eq!(
            decode_lifetime(&mut bus, 0x0B, 2),
            Ok(RenderedValue::HexString("23 02 1E 05".into()))
        );
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut bus = MockBus::with_gauge_defaults(0x0B);
        bus.fail_command(0x62, TransportError::Busy);
        assert_eq!(
            decode_lifetime(&mut bus, 0x0B, 3),
            Err(DecodeError::Transport(TransportError::Busy))
        );
    }
}
