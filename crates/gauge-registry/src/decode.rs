use crate::block::{read_block, read_word};
use crate::render::{RawData, RawReading, RenderedValue};
use crate::{DecodeError, RegisterDescriptor, RegisterSchema};
use smbus_transport::SmbusBus;
use tracing::{debug, warn};

/// Outcome of decoding one schema entry.
#[derive(Debug, Clone)]
pub struct DecodedEntry<'a> {
    pub descriptor: &'a RegisterDescriptor,
    pub result: Result<RenderedValue, DecodeError>,
}

impl DecodedEntry<'_> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch the bytes for one register using the transaction its kind needs.
pub fn read_raw<'a, B>(
    bus: &mut B,
    address: u8,
    descriptor: &'a RegisterDescriptor,
) -> Result<RawReading<'a>, DecodeError>
where
    B: SmbusBus + ?Sized,
{
    let data = if descriptor.kind.is_word() {
        RawData::Word(read_word(bus, address, descriptor.command)?)
    } else {
        RawData::Block(read_block(bus, address, descriptor.command)?)
    };
    Ok(RawReading { descriptor, data })
}

/// Read and render a single register. The first failure is returned as-is.
pub fn decode_one<B>(
    bus: &mut B,
    address: u8,
    descriptor: &RegisterDescriptor,
) -> Result<RenderedValue, DecodeError>
where
    B: SmbusBus + ?Sized,
{
    read_raw(bus, address, descriptor)?.render()
}

/// Decode every register of `schema` in order.
///
/// A failing register is recorded in its own entry and the walk continues, so
/// the result always has one entry per descriptor.
pub fn decode_all<'a, B>(bus: &mut B, address: u8, schema: &'a RegisterSchema) -> Vec<DecodedEntry<'a>>
where
    B: SmbusBus + ?Sized,
{
    let mut out = Vec::with_capacity(schema.len());
    for descriptor in schema.iter() {
        let result = decode_one(bus, address, descriptor);
        match &result {
            Ok(_) => debug!(register = %descriptor.name, command = descriptor.command, "decoded"),
            Err(e) => warn!(register = %descriptor.name, command = descriptor.command, error = %e, "decode failed"),
        }
        out.push(DecodedEntry { descriptor, result });
    }
    out
}
