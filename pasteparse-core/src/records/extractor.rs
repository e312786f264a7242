use crate::error::ConfigError;
use crate::types::{KeyValue, KeyValueMap, RawRecord};
use regex::Regex;
use tracing::{debug, trace};

/// Splits one record into a key and a value around a delimiter.
///
/// The delimiter is spliced into the pattern as a regex fragment without
/// escaping, so a delimiter such as `.` or `|` must be escaped by whoever
/// writes the rule set. Groups are addressed by name, so capture groups
/// inside the delimiter do not shift the key and value.
#[derive(Debug, Clone)]
pub struct KeyValueExtractor {
    pattern: Regex,
}

impl KeyValueExtractor {
    pub fn new(delimiter: &str) -> Result<Self, ConfigError> {
        // `^` without multi-line mode anchors to the start of the record.
        // The key is the shortest run before the first delimiter, the value
        // is everything after it, newlines included.
        let source = format!(r"^\s*(?P<key>.+?)\s*{delimiter}\s*(?P<value>[\s\S]*)");
        let pattern = Regex::new(&source).map_err(|source| ConfigError::InvalidPattern {
            setting: "key_value_delimiter",
            pattern: delimiter.to_string(),
            source,
        })?;
        Ok(Self { pattern })
    }

    /// `None` when the record has no delimiter occurrence after a non-empty
    /// key. The value is returned untrimmed.
    pub fn extract(&self, record: &str) -> Option<KeyValue> {
        let captures = self.pattern.captures(record)?;
        let key = captures.name("key")?.as_str();
        let value = captures.name("value").map_or("", |m| m.as_str());
        Some(KeyValue::new(key, value))
    }

    /// Extract every record in order; later duplicate keys overwrite earlier
    /// ones. Records that do not match are dropped.
    pub fn extract_all(&self, records: &[RawRecord]) -> KeyValueMap {
        let mut key_values = KeyValueMap::new();
        let mut dropped = 0;

        for record in records {
            match self.extract(record) {
                Some(KeyValue { key, value }) => {
                    trace!("extracted {:?} = {:?}", key, value);
                    key_values.insert(key, value);
                }
                None => {
                    trace!("dropped record without key/value: {:?}", record);
                    dropped += 1;
                }
            }
        }

        debug!(
            "extracted {} keys from {} records ({} dropped)",
            key_values.len(),
            records.len(),
            dropped
        );
        key_values
    }
}
