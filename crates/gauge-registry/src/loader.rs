use crate::types::RegisterSchema;
use anyhow::Context;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Schemas keyed by device name.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    pub devices: HashMap<String, RegisterSchema>,
}

impl SchemaRegistry {
    pub fn insert(&mut self, schema: RegisterSchema) {
        self.devices.insert(schema.device.clone(), schema);
    }

    pub fn get(&self, device: &str) -> Option<&RegisterSchema> {
        self.devices.get(device)
    }
}

/// Parse and validate a schema from YAML (JSON is accepted as a subset).
pub fn load_schema_str(raw: &str) -> anyhow::Result<RegisterSchema> {
    let val: Value = serde_yaml::from_str(raw).context("parsing yaml")?;
    let schema: RegisterSchema = serde_yaml::from_value(val).context("decoding schema")?;
    schema
        .validate()
        .with_context(|| format!("validating schema: {}", schema.device))?;
    Ok(schema)
}

pub fn load_schema_file(path: impl AsRef<Path>) -> anyhow::Result<RegisterSchema> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading schema: {}", path.display()))?;
    let schema =
        load_schema_str(&raw).with_context(|| format!("loading schema: {}", path.display()))?;
    info!(device = %schema.device, registers = schema.len(), path = %path.display(), "schema loaded");
    Ok(schema)
}

pub fn load_schemas_dir(dir: impl AsRef<Path>) -> anyhow::Result<SchemaRegistry> {
    let mut reg = SchemaRegistry::default();
    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if ext == "yml" || ext == "yaml" {
                entries.push(path);
            }
        }
    }
    entries.sort();
    for p in entries {
        let schema = load_schema_file(&p)?;
        reg.insert(schema);
    }
    Ok(reg)
}

/// Serialize a schema back to YAML, e.g. to start a custom table from the
/// built-in one.
pub fn schema_to_yaml(schema: &RegisterSchema) -> anyhow::Result<String> {
    serde_yaml::to_string(schema).context("encoding schema")
}

/// JSON Schema of the schema file format, for editor completion.
#[cfg(feature = "schema")]
pub fn schema_json_schema() -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(schemars::schema_for!(RegisterSchema)).context("encoding json schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegisterDescriptor, RegisterKind};

    const GAUGE_YAML: &str = r#"
device: tiny-gauge
address: 0x0B
registers:
  - command: 0x09
    name: Voltage
    unit: V
    kind: word_float
    scaling: 0.001
  - command: 0x08
    name: Temperature
    unit: "°C"
    kind: word_float
    scaling: 0.1
    offset: -273.15
  - command: 0x17
    name: CycleCount
    kind: word_integer
  - command: 0x21
    name: DeviceName
    kind: block_ascii
  - command: 0x16
    name: BatteryStatus
    kind: block_bits
    fields:
      - { lsb_index: 0, width: 4, short_label: EC, long_label: Error Code }
      - { lsb_index: 6, short_label: DSG }
"#;

    #[test]
    fn test_load_yaml_schema() {
        let schema = load_schema_str(GAUGE_YAML).unwrap();
        assert_eq!(schema.device, "tiny-gauge");
        assert_eq!(schema.address, 0x0B);
        assert_eq!(schema.len(), 5);
        assert_eq!(
            schema.registers[1].kind,
            RegisterKind::WordFloat {
                offset: -273.15,
                scaling: 0.1
            }
        );
        assert_eq!(
            schema.registers[2].kind,
            RegisterKind::WordInteger {
                offset: 0.0,
                scaling: 1.0
            }
        );
        match &schema.registers[4].kind {
            RegisterKind::BlockBits { fields } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1].width, 1);
                assert_eq!(fields[1].long_label, "");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let yaml = r#"
device: broken
registers:
  - { command: 9, name: A, kind: word_hex }
  - { command: 9, name: B, kind: word_hex }
"#;
        let err = load_schema_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate command 0x09"));
    }

    #[test]
    fn test_non_finite_scaling_rejected() {
        let yaml = "device: x\nregisters:\n  - { command: 9, name: Voltage, kind: word_float, scaling: .inf }\n";
        let err = load_schema_str(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("must be finite"));
        let yaml = "device: x\nregisters:\n  - { command: 9, name: Voltage, kind: word_float, offset: .nan }\n";
        assert!(load_schema_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let yaml = "device: x\nregisters:\n  - { command: 1, name: A, kind: word_double }\n";
        assert!(load_schema_str(yaml).is_err());
    }

    #[test]
    fn test_builtin_round_trips_through_yaml() {
        let builtin = RegisterSchema::bq30z555();
        let yaml = schema_to_yaml(&builtin).unwrap();
        let back = load_schema_str(&yaml).unwrap();
        assert_eq!(back, builtin);
    }

    #[test]
    fn test_registry_insert() {
        let mut reg = SchemaRegistry::default();
        reg.insert(RegisterSchema::new(
            "g",
            0x0B,
            vec![RegisterDescriptor::word_integer(0x17, "CycleCount", "")],
        ));
        assert_eq!(reg.get("g").map(|s| s.len()), Some(1));
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_json_schema_names_kinds() {
        let schema = schema_json_schema().unwrap();
        let text = schema.to_string();
        assert!(text.contains("block_bits"));
        assert!(text.contains("lsb_index"));
    }
}
