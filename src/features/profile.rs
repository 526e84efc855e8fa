//! The filesystem profile summary (`output.json`).

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// Summary of one unpacked firmware filesystem.
///
/// Every field is optional so an absent section can be told apart from an
/// empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FirmwareProfile {
    pub directory_structure_info: Option<Vec<String>>,
    pub file_set: Option<Vec<String>>,
    pub architecture: Option<String>,
    pub filesystem: Option<String>,
    pub operating_system: Option<String>,
    pub ip_addresses: Option<Vec<String>>,
    pub urls: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
    pub configuration_file_info: Option<Vec<String>>,
    /// CA filename -> content hash
    pub ca_file_hashes: Option<IndexMap<String, String>>,
    /// Key filename -> `[{file_hash}, {private_key}, {public_key}]`
    pub public_private_key: Option<IndexMap<String, Vec<Value>>>,
    /// Scanner category -> findings (object or newline-separated text)
    pub file_info: Option<IndexMap<String, Value>>,
    pub bin_file_info: Option<Vec<String>>,
}

impl FirmwareProfile {
    /// The three basic metadata fields in a fixed order.
    #[must_use]
    pub fn basic_info(&self) -> [Option<&str>; 3] {
        [
            self.architecture.as_deref(),
            self.filesystem.as_deref(),
            self.operating_system.as_deref(),
        ]
    }
}

/// Turn an optional list into a set, `None` staying `None`.
#[must_use]
pub fn to_set(items: Option<&Vec<String>>) -> Option<HashSet<String>> {
    items.map(|v| v.iter().cloned().collect())
}

/// The three parts recorded for a key file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMaterial {
    pub file_hash: Option<Value>,
    pub private_key: Option<Value>,
    pub public_key: Option<Value>,
}

impl KeyMaterial {
    /// Parse the positional three-object form; `None` when fewer than three.
    #[must_use]
    pub fn from_entries(entries: &[Value]) -> Option<Self> {
        if entries.len() < 3 {
            return None;
        }
        let field = |idx: usize, name: &str| {
            entries[idx]
                .get(name)
                .filter(|v| !v.is_null())
                .cloned()
        };
        Some(Self {
            file_hash: field(0, "file_hash"),
            private_key: field(1, "private_key"),
            public_key: field(2, "public_key"),
        })
    }
}

/// True for values that carry content: not null, `false`, `""`, `[]` or `{}`.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}
