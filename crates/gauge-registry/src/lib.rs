//! gauge-registry: declarative SMBus register schemas and the decode engine
//!
//! A [`RegisterSchema`] lists a device's commands. [`decode_all`] walks it over
//! any [`smbus_transport::SmbusBus`], issuing word or two-phase block reads per
//! register kind, and renders each result into a [`RenderedValue`].

mod error;
pub use error::{DecodeError, SchemaError};

mod types;
pub use types::*;

pub mod builtin;

mod loader;
pub use loader::{load_schema_file, load_schema_str, load_schemas_dir, schema_to_yaml, SchemaRegistry};
#[cfg(feature = "schema")]
pub use loader::schema_json_schema;

pub mod bits;
pub use bits::extract;

mod block;
pub use block::{read_block, read_word, MAX_BLOCK_LEN};

mod render;
pub use render::{hex_string, render, sanitize_ascii, FieldValue, RawData, RawReading, RenderedValue};

mod decode;
pub use decode::{decode_all, decode_one, read_raw, DecodedEntry};

pub mod lifetime;
pub use lifetime::{decode_lifetime, lifetime_descriptor};

mod metrics;
pub use metrics::{BusMetrics, MeteredBus, MetricsHub};

mod report;
pub use report::{format_lines, DecodeReport, ReportEntry};
