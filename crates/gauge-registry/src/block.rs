use smbus_transport::{hex_bytes, SmbusBus, TransportError};
use tracing::debug;

/// Largest payload a length byte can announce.
pub const MAX_BLOCK_LEN: usize = u8::MAX as usize;

/// Read an SMBus word: write the command, read two bytes, little-endian.
pub fn read_word<B>(bus: &mut B, address: u8, command: u8) -> Result<u16, TransportError>
where
    B: SmbusBus + ?Sized,
{
    let mut resp = [0u8; 2];
    bus.write_then_read(address, &[command], &mut resp)?;
    let raw = u16::from_le_bytes(resp);
    debug!(address, command, raw, "word read");
    Ok(raw)
}

/// Read a length-prefixed SMBus block.
///
/// The first transaction fetches only the length byte. The second re-sends
/// the command and reads `1 + len` bytes; the repeated length byte is dropped.
/// The announced length is trusted as-is. Either failure aborts the read.
pub fn read_block<B>(bus: &mut B, address: u8, command: u8) -> Result<Vec<u8>, TransportError>
where
    B: SmbusBus + ?Sized,
{
    let mut len = [0u8; 1];
    bus.write_then_read(address, &[command], &mut len)?;
    let len = len[0] as usize;

    let mut resp = [0u8; 1 + MAX_BLOCK_LEN];
    let frame = &mut resp[..1 + len];
    bus.write_then_read(address, &[command], frame)?;
    let payload = frame[1..].to_vec();
    debug!(address, command, len, data = %hex_bytes(&payload), "block read");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smbus_transport::MockBus;

    #[test]
    fn test_read_word_little_endian() {
        let mut bus = MockBus::new(0x0B);
        bus.set_word(0x09, 16_420);
        assert_eq!(read_word(&mut bus, 0x0B, 0x09), Ok(16_420));
        assert_eq!(bus.calls()[0].write, vec![0x09]);
        assert_eq!(bus.calls()[0].read_len, 2);
    }

    #[test]
    fn test_two_phase_read_discards_length_byte() {
        let mut bus = MockBus::new(0x0B);
        bus.set_raw(0x21, vec![5, 0xD0, 0xD1, 0xD2, 0xD3, 0xD4]);
        let payload = read_block(&mut bus, 0x0B, 0x21).unwrap();
        assert_eq!(payload, vec![0xD0, 0xD1, 0xD2, 0xD3, 0xD4]);

        let calls = bus.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].write, vec![0x21]);
        assert_eq!(calls[0].read_len, 1);
        assert_eq!(calls[1].write, vec![0x21]);
        assert_eq!(calls[1].read_len, 6);
    }

    #[test]
    fn test_announced_length_is_trusted() {
        // Device claims 4 bytes but only has 2; the remainder is idle-bus fill.
        let mut bus = MockBus::new(0x0B);
        bus.set_raw(0x22, vec![4, b'L', b'I']);
        let payload = read_block(&mut bus, 0x0B, 0x22).unwrap();
        assert_eq!(payload, vec![b'L', b'I', 0xFF, 0xFF]);
    }

    #[test]
    fn test_zero_length_block() {
        let mut bus = MockBus::new(0x0B);
        bus.set_block(0x23, &[]);
        assert_eq!(read_block(&mut bus, 0x0B, 0x23), Ok(Vec::new()));
        assert_eq!(bus.calls()[1].read_len, 1);
    }

    #[test]
    fn test_maximum_length_block() {
        let mut bus = MockBus::new(0x0B);
        let payload = vec![0xAB; MAX_BLOCK_LEN];
        bus.set_block(0x70, &payload);
        assert_eq!(read_block(&mut bus, 0x0B, 0x70), Ok(payload));
        assert_eq!(bus.calls()[1].read_len, 256);
    }

    #[test]
    fn test_failure_in_either_phase() {
        let mut bus = MockBus::new(0x0B);
        bus.set_block(0x21, b"abc");
        bus.fail_transaction(0, TransportError::Timeout);
        assert_eq!(read_block(&mut bus, 0x0B, 0x21), Err(TransportError::Timeout));
        assert_eq!(bus.calls().len(), 1);

        let mut bus = MockBus::new(0x0B);
        bus.set_block(0x21, b"abc");
        bus.fail_transaction(1, TransportError::Nack);
        assert_eq!(read_block(&mut bus, 0x0B, 0x21), Err(TransportError::Nack));
        assert_eq!(bus.calls().len(), 2);
    }
}
