//! smbus-transport: write-then-read SMBus/I2C bus abstractions
//!
//! This crate provides the single transaction primitive the gauge decoder needs
//! (write a command, read back a fixed number of bytes) together with
//! feature-gated backends. The default build enables a `mock` backend so that
//! binaries and tests run on any host without hardware attached.

mod types;
pub use types::{hex_bytes, BusInfo, DEFAULT_GAUGE_ADDRESS, MAX_ADDRESS};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::SmbusBus;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, Transaction};

#[cfg(feature = "serial")]
mod bridge;

#[cfg(feature = "serial")]
pub use bridge::{parse_bridge_line, BridgeLine, BridgeRequest, ConsoleBridgeBus, ConsolePort};
