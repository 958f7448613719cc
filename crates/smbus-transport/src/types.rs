/// Highest valid 7-bit bus address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Factory default SMBus address of TI gas gauges.
pub const DEFAULT_GAUGE_ADDRESS: u8 = 0x0B;

#[derive(Clone, Debug)]
pub struct BusInfo {
    pub name: String,
    pub driver: String,
}

/// Format bytes as `0xNN 0xNN ...` for logs.
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
