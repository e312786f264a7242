use crate::config::CrossRefRule;
use crate::types::{FieldValueMap, KeyValueMap};
use tracing::{debug, trace};

/// Renames extracted keys to canonical field names.
///
/// Keys are matched exactly (case and whitespace sensitive) against each
/// rule's `source_key`. Keys with no matching rule are dropped. When two
/// keys map to the same field, the key extracted later wins.
pub struct FieldMapper<'a> {
    rules: &'a [CrossRefRule],
}

impl<'a> FieldMapper<'a> {
    pub fn new(rules: &'a [CrossRefRule]) -> Self {
        Self { rules }
    }

    pub fn map(&self, key_values: &KeyValueMap) -> FieldValueMap {
        let mut fields = FieldValueMap::new();

        for (key, value) in key_values {
            for rule in self.rules {
                // Empty source keys never match
                let Some(source_key) = rule.source_key.as_deref().filter(|k| !k.is_empty()) else {
                    continue;
                };
                if source_key == key {
                    trace!("mapped key {:?} to field {:?}", key, rule.name);
                    fields.insert(rule.name.clone(), value.clone());
                }
            }
        }

        debug!("mapped {} of {} keys to fields", fields.len(), key_values.len());
        fields
    }
}
