use crate::Result;

/// A minimal blocking SMBus/I2C master.
///
/// Every operation is a combined write-then-read: the command bytes are
/// written, then exactly `read.len()` bytes are clocked back into `read`.
/// Implementations either fill the whole buffer or return an error; they never
/// report a short read as success.
pub trait SmbusBus {
    /// Write `write` to the 7-bit `address`, then read `read.len()` bytes.
    fn write_then_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}

impl<B: SmbusBus + ?Sized> SmbusBus for &mut B {
    fn write_then_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).write_then_read(address, write, read)
    }
}

impl<B: SmbusBus + ?Sized> SmbusBus for Box<B> {
    fn write_then_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).write_then_read(address, write, read)
    }
}
