use crate::config::{compile_pattern, RuleSet};
use crate::error::{ConfigError, RuleFailure};
use crate::records::{KeyValueExtractor, RecordSplitter};
use crate::rules::{FieldMapper, ValueTranslator};
use crate::types::*;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics; lets you inspect/compare each boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStages {
    /// Capture group 1 of the region pattern
    pub region: String,
    pub records: Vec<RawRecord>,
    pub key_values: KeyValueMap,
    /// Fields after mapping, before translation
    pub mapped: FieldValueMap,
    /// Fields after translation
    pub fields: FieldValueMap,
    pub failures: Vec<RuleFailure>,
}

/// Result of a run whose region pattern matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseOutcome {
    pub fields: FieldValueMap,
    /// Rules whose expressions failed; their fields were left untouched
    pub failures: Vec<RuleFailure>,
}

/// Outcome of one pipeline run.
///
/// `NoMatch` means the input is not something this rule set parses, which
/// is different from a parse that produced no fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Parsed(ParseOutcome),
    NoMatch,
}

impl RunOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, RunOutcome::Parsed(_))
    }

    /// Final fields, or `None` when the region pattern did not match.
    pub fn fields(&self) -> Option<&FieldValueMap> {
        match self {
            RunOutcome::Parsed(outcome) => Some(&outcome.fields),
            RunOutcome::NoMatch => None,
        }
    }
}

/// One form control to fill in from a parsed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormAssignment {
    pub field_name: String,
    pub field_id: String,
    /// Field value with surrounding whitespace trimmed
    pub value: String,
}

/// Field name -> form field id rewrite.
#[derive(Debug, Clone)]
struct FieldIdTransform {
    pattern: Regex,
    replacement: String,
}

/// A compiled rule set, ready to run over any number of inputs.
///
/// Built by [`RuleSet::compile`]; all patterns are compiled up front so a
/// bad rule set fails once instead of on every input.
#[derive(Debug, Clone)]
pub struct PasteProcessor {
    rules: RuleSet,
    region: Regex,
    splitter: RecordSplitter,
    extractor: KeyValueExtractor,
    field_id: Option<FieldIdTransform>,
}

impl PasteProcessor {
    pub fn new(rules: RuleSet) -> Result<Self, ConfigError> {
        let region = compile_pattern("pasted_text_pattern", &rules.pasted_text_pattern)?;
        // Group 0 is the whole match
        if region.captures_len() < 2 {
            return Err(ConfigError::MissingCaptureGroup(
                rules.pasted_text_pattern.clone(),
            ));
        }

        let splitter = RecordSplitter::new(
            rules.ignore_pattern.as_deref(),
            rules.key_value_end_pattern.as_deref(),
        )?;
        let extractor = KeyValueExtractor::new(&rules.key_value_delimiter)?;

        let field_id = match rules.field_name_to_id_match.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(FieldIdTransform {
                pattern: compile_pattern("field_name_to_id_match", pattern)?,
                replacement: rules.field_name_to_id_replace.clone().unwrap_or_default(),
            }),
            _ => None,
        };

        debug!("compiled rule set with {} xrefs", rules.xrefs.len());
        Ok(Self {
            rules,
            region,
            splitter,
            extractor,
            field_id,
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Text captured by the region pattern, or `None` if it does not match.
    /// A capture group that takes no part in the match yields empty text.
    pub fn match_region<'t>(&self, raw_text: &'t str) -> Option<&'t str> {
        let captures = self.region.captures(raw_text)?;
        Some(captures.get(1).map_or("", |m| m.as_str()))
    }

    /// Run the whole pipeline over `raw_text`.
    pub fn run(&self, raw_text: &str) -> RunOutcome {
        let Some(region) = self.match_region(raw_text) else {
            debug!("pasted_text_pattern did not match, nothing to parse");
            return RunOutcome::NoMatch;
        };

        let records = self.splitter.split(region);
        let key_values = self.extractor.extract_all(&records);
        let mut fields = FieldMapper::new(&self.rules.xrefs).map(&key_values);
        let failures =
            ValueTranslator::new(&self.rules.xrefs, &self.rules.limits).translate(&mut fields);

        RunOutcome::Parsed(ParseOutcome { fields, failures })
    }

    /// Like [`PasteProcessor::run`], keeping the output of every stage.
    pub fn run_capture_stages(&self, raw_text: &str) -> Option<PipelineStages> {
        let region = self.match_region(raw_text)?;

        let records = self.splitter.split(region);
        let key_values = self.extractor.extract_all(&records);
        let mapped = FieldMapper::new(&self.rules.xrefs).map(&key_values);
        let mut fields = mapped.clone();
        let failures =
            ValueTranslator::new(&self.rules.xrefs, &self.rules.limits).translate(&mut fields);

        Some(PipelineStages {
            region: region.to_string(),
            records,
            key_values,
            mapped,
            fields,
            failures,
        })
    }

    /// Form field id for a canonical field name, using the configured
    /// `field_name_to_id_match` / `field_name_to_id_replace` rewrite.
    ///
    /// `None` when no rewrite is configured, the name is empty or the
    /// pattern does not match it.
    pub fn field_id(&self, field_name: &str) -> Option<String> {
        let transform = self.field_id.as_ref()?;
        if field_name.is_empty() || !transform.pattern.is_match(field_name) {
            return None;
        }
        Some(
            transform
                .pattern
                .replace(field_name, transform.replacement.as_str())
                .into_owned(),
        )
    }

    /// Form controls to fill in for `fields`, in field order.
    pub fn form_assignments(&self, fields: &FieldValueMap) -> Vec<FormAssignment> {
        fields
            .iter()
            .map(|(name, value)| FormAssignment {
                field_name: name.clone(),
                field_id: self.field_id(name).unwrap_or_else(|| name.clone()),
                value: value.trim().to_string(),
            })
            .collect()
    }
}
