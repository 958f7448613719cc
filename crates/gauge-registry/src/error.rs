use smbus_transport::TransportError;
use thiserror::Error;

/// Failure of one register decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate command 0x{command:02X} ({first} and {second})")]
    DuplicateCommand {
        command: u8,
        first: String,
        second: String,
    },
    #[error("{register}.{field}: bit width {width} outside 1..=32")]
    BitWidth {
        register: String,
        field: String,
        width: u8,
    },
    #[error("address 0x{0:02X} is not a 7-bit address")]
    Address(u8),
    #[error("register 0x{0:02X} has no name")]
    EmptyName(u8),
    #[error("{register}: scaling and offset must be finite")]
    NonFiniteTransform { register: String },
}
