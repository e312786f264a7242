use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One not-yet-parsed key/value candidate, as cut out of the input by the
/// record splitter.
pub type RawRecord = String;

/// Raw key -> raw value for one input block.
///
/// Insertion ordered. Re-inserting an existing key keeps its original
/// position and replaces the value, so later duplicates win.
pub type KeyValueMap = IndexMap<String, String>;

/// Canonical field name -> final string value.
pub type FieldValueMap = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
