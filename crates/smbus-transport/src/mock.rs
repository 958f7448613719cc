use crate::{BusInfo, Result, SmbusBus, TransportError, DEFAULT_GAUGE_ADDRESS};
use std::collections::HashMap;

/// One write-then-read issued against a [`MockBus`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub address: u8,
    pub write: Vec<u8>,
    pub read_len: usize,
}

#[derive(Clone, Debug)]
enum Register {
    Word(u16),
    /// Exact response bytes, length prefix included.
    Raw(Vec<u8>),
}

/// A simulated SMBus device. Each bus instance is independent.
///
/// Registers answer the way a gauge does: words as two little-endian bytes,
/// blocks as `[len, payload...]`. Reads longer than the stored response are
/// padded with `0xFF` (idle bus). Commands without a register NACK.
#[derive(Clone, Debug)]
pub struct MockBus {
    name: String,
    address: u8,
    registers: HashMap<u8, Register>,
    command_failures: HashMap<u8, TransportError>,
    transaction_failures: HashMap<usize, TransportError>,
    log: Vec<Transaction>,
}

impl MockBus {
    pub fn new(address: u8) -> Self {
        Self {
            name: "mock0".to_string(),
            address,
            registers: HashMap::new(),
            command_failures: HashMap::new(),
            transaction_failures: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Open a named mock bus preloaded with a plausible BQ30Z555 gauge.
    pub fn open(name: &str) -> Result<Self> {
        let mut bus = Self::with_gauge_defaults(DEFAULT_GAUGE_ADDRESS);
        bus.name = name.to_string();
        Ok(bus)
    }

    pub fn list() -> Result<Vec<BusInfo>> {
        Ok(vec![BusInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_word(&mut self, command: u8, raw: u16) -> &mut Self {
        self.registers.insert(command, Register::Word(raw));
        self
    }

    /// Store a block payload; the length prefix is derived from it.
    pub fn set_block(&mut self, command: u8, payload: &[u8]) -> &mut Self {
        let mut raw = Vec::with_capacity(payload.len() + 1);
        raw.push(payload.len().min(u8::MAX as usize) as u8);
        raw.extend_from_slice(payload);
        self.set_raw(command, raw)
    }

    /// Store the exact response bytes for a command, length prefix included.
    pub fn set_raw(&mut self, command: u8, response: Vec<u8>) -> &mut Self {
        self.registers.insert(command, Register::Raw(response));
        self
    }

    /// Every transaction addressing `command` fails with `err`.
    pub fn fail_command(&mut self, command: u8, err: TransportError) -> &mut Self {
        self.command_failures.insert(command, err);
        self
    }

    /// The `index`-th transaction (zero based, counted over the bus lifetime)
    /// fails with `err`.
    pub fn fail_transaction(&mut self, index: usize, err: TransportError) -> &mut Self {
        self.transaction_failures.insert(index, err);
        self
    }

    pub fn calls(&self) -> &[Transaction] {
        &self.log
    }

    pub fn with_gauge_defaults(address: u8) -> Self {
        let mut bus = Self::new(address);
        bus.set_word(0x08, 2982) // 25.05 degC
            .set_word(0x09, 16_420)
            .set_word(0x0A, 1_250)
            .set_word(0x0B, 1_180)
            .set_word(0x0D, 87)
            .set_word(0x0E, 81)
            .set_word(0x0F, 4_350)
            .set_word(0x10, 5_000)
            .set_word(0x11, 209)
            .set_word(0x12, 221)
            .set_word(0x13, 65_535)
            .set_word(0x14, 2_000)
            .set_word(0x15, 16_800)
            .set_word(0x17, 42)
            .set_word(0x18, 5_200)
            .set_word(0x19, 14_400)
            .set_word(0x1B, 0x5A4C)
            .set_word(0x1C, 1_337)
            .set_word(0x3C, 4_101)
            .set_word(0x3D, 4_104)
            .set_word(0x3E, 4_107)
            .set_word(0x3F, 4_108)
            .set_word(0x5D, 12_000)
            .set_word(0x5E, 3_500)
            .set_block(0x16, &[0xC0, 0x00])
            .set_block(0x20, b"Texas Inst.")
            .set_block(0x21, b"bq30z555")
            .set_block(0x22, b"LION")
            .set_block(0x23, &[0x00, 0x01, 0x7F, 0x41])
            .set_block(0x50, &[0x00, 0x00])
            .set_block(0x51, &[0x00, 0x00, 0x00, 0x00])
            .set_block(0x52, &[0x00, 0x00, 0x00, 0x00])
            .set_block(0x53, &[0x00, 0x00, 0x00, 0x00])
            .set_block(0x54, &[0x07, 0x03, 0x00, 0x00])
            .set_block(0x55, &[0x08, 0x02])
            .set_block(0x56, &[0x14, 0x00])
            .set_block(0x57, &[0x18, 0x00])
            .set_block(
                0x60,
                &[
                    0x2E, 0x10, 0x30, 0x10, 0x31, 0x10, 0x2F, 0x10, // max cell mV
                    0x60, 0x0B, 0x62, 0x0B, 0x5F, 0x0B, 0x61, 0x0B, // min cell mV
                    0x28, 0x00, // max delta mV
                    0xD0, 0x07, // max charge mA
                    0x88, 0x13, // max discharge mA
                    0xB8, 0x0B, // max avg discharge mA
                    0x2D, // max avg discharge W
                ],
            )
            .set_block(0x61, &[0x23, 0x02, 0x1E, 0x05])
            .set_block(0x62, &[0x10, 0x27, 0x00, 0x00, 0x64, 0x00]);
        bus
    }

    fn response(&self, command: u8) -> Option<Vec<u8>> {
        match self.registers.get(&command)? {
            Register::Word(raw) => Some(raw.to_le_bytes().to_vec()),
            Register::Raw(bytes) => Some(bytes.clone()),
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new(DEFAULT_GAUGE_ADDRESS)
    }
}

impl SmbusBus for MockBus {
    fn write_then_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let index = self.log.len();
        self.log.push(Transaction {
            address,
            write: write.to_vec(),
            read_len: read.len(),
        });
        if let Some(err) = self.transaction_failures.get(&index) {
            return Err(err.clone());
        }
        if address != self.address {
            return Err(TransportError::Nack);
        }
        let command = *write
            .first()
            .ok_or(TransportError::Unsupported("write-then-read without command byte"))?;
        if let Some(err) = self.command_failures.get(&command) {
            return Err(err.clone());
        }
        let response = self.response(command).ok_or(TransportError::Nack)?;
        for (i, slot) in read.iter_mut().enumerate() {
            *slot = response.get(i).copied().unwrap_or(0xFF);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_is_little_endian() {
        let mut bus = MockBus::new(0x0B);
        bus.set_word(0x09, 0x1234);
        let mut buf = [0u8; 2];
        bus.write_then_read(0x0B, &[0x09], &mut buf).unwrap();
        assert_eq!(buf, [0x34, 0x12]);
        assert_eq!(bus.calls().len(), 1);
        assert_eq!(bus.calls()[0].read_len, 2);
    }

    #[test]
    fn test_block_prefix_and_padding() {
        let mut bus = MockBus::new(0x0B);
        bus.set_block(0x21, b"ab");
        let mut buf = [0u8; 5];
        bus.write_then_read(0x0B, &[0x21], &mut buf).unwrap();
        assert_eq!(buf, [2, b'a', b'b', 0xFF, 0xFF]);
    }

    #[test]
    fn test_unknown_command_and_wrong_address_nack() {
        let mut bus = MockBus::new(0x0B);
        let mut buf = [0u8; 2];
        assert_eq!(
            bus.write_then_read(0x0B, &[0x42], &mut buf),
            Err(TransportError::Nack)
        );
        bus.set_word(0x42, 1);
        assert_eq!(
            bus.write_then_read(0x0C, &[0x42], &mut buf),
            Err(TransportError::Nack)
        );
        assert_eq!(bus.calls().len(), 2);
    }

    #[test]
    fn test_programmed_failures() {
        let mut bus = MockBus::new(0x0B);
        bus.set_word(0x09, 1).set_word(0x0A, 2);
        bus.fail_command(0x0A, TransportError::Busy);
        bus.fail_transaction(2, TransportError::Timeout);
        let mut buf = [0u8; 2];
        assert!(bus.write_then_read(0x0B, &[0x09], &mut buf).is_ok());
        assert_eq!(
            bus.write_then_read(0x0B, &[0x0A], &mut buf),
            Err(TransportError::Busy)
        );
        assert_eq!(
            bus.write_then_read(0x0B, &[0x09], &mut buf),
            Err(TransportError::Timeout)
        );
    }

    #[test]
    fn test_open_preloads_gauge() -> anyhow::Result<()> {
        let mut bus = MockBus::open("mock-gauge")?;
        assert_eq!(bus.name(), "mock-gauge");
        let mut buf = [0u8; 2];
        bus.write_then_read(DEFAULT_GAUGE_ADDRESS, &[0x08], &mut buf)?;
        assert_eq!(u16::from_le_bytes(buf), 2982);
        Ok(())
    }
}
