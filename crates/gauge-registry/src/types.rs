use crate::SchemaError;
use serde::{Deserialize, Serialize};
use smbus_transport::{DEFAULT_GAUGE_ADDRESS, MAX_ADDRESS};
use std::collections::HashMap;

/// A device command set: the ordered list of registers to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct RegisterSchema {
    pub device: String,
    #[serde(default = "default_address")]
    pub address: u8,
    #[serde(default)]
    pub registers: Vec<RegisterDescriptor>,
}

fn default_address() -> u8 {
    DEFAULT_GAUGE_ADDRESS
}

/// One SMBus command of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct RegisterDescriptor {
    pub command: u8,
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(flatten)]
    pub kind: RegisterKind,
}

/// How a command is read off the bus and rendered.
///
/// Word kinds are fetched with a 2-byte read, block kinds with the
/// length-prefixed block protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegisterKind {
    /// `raw * scaling + offset`, truncated toward zero.
    WordInteger {
        #[serde(default)]
        offset: f64,
        #[serde(default = "unit_scaling")]
        scaling: f64,
    },
    /// `raw * scaling + offset`, shown with three decimals.
    WordFloat {
        #[serde(default)]
        offset: f64,
        #[serde(default = "unit_scaling")]
        scaling: f64,
    },
    WordHex,
    BlockAscii,
    BlockHex,
    BlockBits {
        #[serde(default)]
        fields: Vec<BitField>,
    },
}

fn unit_scaling() -> f64 {
    1.0
}

impl RegisterKind {
    pub fn is_word(&self) -> bool {
        matches!(
            self,
            RegisterKind::WordInteger { .. } | RegisterKind::WordFloat { .. } | RegisterKind::WordHex
        )
    }

    pub fn is_block(&self) -> bool {
        !self.is_word()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterKind::WordInteger { .. } => "word_integer",
            RegisterKind::WordFloat { .. } => "word_float",
            RegisterKind::WordHex => "word_hex",
            RegisterKind::BlockAscii => "block_ascii",
            RegisterKind::BlockHex => "block_hex",
            RegisterKind::BlockBits { .. } => "block_bits",
        }
    }
}

/// A named bit range inside a status block.
///
/// `lsb_index` counts from bit 0 of byte 0 with little-endian byte order.
/// Fields may extend past the bytes a device actually returns; the missing
/// bits read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct BitField {
    pub lsb_index: u16,
    #[serde(default = "single_bit")]
    pub width: u8,
    pub short_label: String,
    #[serde(default)]
    pub long_label: String,
}

fn single_bit() -> u8 {
    1
}

impl BitField {
    pub fn new(lsb_index: u16, width: u8, short_label: &str, long_label: &str) -> Self {
        Self {
            lsb_index,
            width,
            short_label: short_label.to_string(),
            long_label: long_label.to_string(),
        }
    }

    pub fn flag(lsb_index: u16, short_label: &str, long_label: &str) -> Self {
        Self::new(lsb_index, 1, short_label, long_label)
    }
}

impl RegisterDescriptor {
    pub fn new(command: u8, name: &str, unit: &str, kind: RegisterKind) -> Self {
        Self {
            command,
            name: name.to_string(),
            unit: unit.to_string(),
            kind,
        }
    }

    pub fn word_float(command: u8, name: &str, unit: &str, scaling: f64, offset: f64) -> Self {
        Self::new(command, name, unit, RegisterKind::WordFloat { offset, scaling })
    }

    pub fn word_integer(command: u8, name: &str, unit: &str) -> Self {
        Self::new(
            command,
            name,
            unit,
            RegisterKind::WordInteger {
                offset: 0.0,
                scaling: 1.0,
            },
        )
    }

    pub fn bits(command: u8, name: &str, fields: Vec<BitField>) -> Self {
        Self::new(command, name, "", RegisterKind::BlockBits { fields })
    }
}

impl RegisterSchema {
    pub fn new(device: &str, address: u8, registers: Vec<RegisterDescriptor>) -> Self {
        Self {
            device: device.to_string(),
            address,
            registers,
        }
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescriptor> {
        self.registers.iter()
    }

    pub fn find_by_command(&self, command: u8) -> Option<&RegisterDescriptor> {
        self.registers.iter().find(|r| r.command == command)
    }

    /// Case-insensitive lookup by register name.
    pub fn find_by_name(&self, name: &str) -> Option<&RegisterDescriptor> {
        self.registers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.address > MAX_ADDRESS {
            return Err(SchemaError::Address(self.address));
        }
        let mut seen: HashMap<u8, &str> = HashMap::new();
        for reg in &self.registers {
            if reg.name.trim().is_empty() {
                return Err(SchemaError::EmptyName(reg.command));
            }
            if let Some(first) = seen.insert(reg.command, &reg.name) {
                return Err(SchemaError::DuplicateCommand {
                    command: reg.command,
                    first: first.to_string(),
                    second: reg.name.clone(),
                });
            }
            if let RegisterKind::WordInteger { offset, scaling }
            | RegisterKind::WordFloat { offset, scaling } = &reg.kind
            {
                if !offset.is_finite() || !scaling.is_finite() {
                    return Err(SchemaError::NonFiniteTransform {
                        register: reg.name.clone(),
                    });
                }
            }
            if let RegisterKind::BlockBits { fields } = &reg.kind {
                for f in fields {
                    if f.width == 0 || f.width > 32 {
                        return Err(SchemaError::BitWidth {
                            register: reg.name.clone(),
                            field: f.short_label.clone(),
                            width: f.width,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
