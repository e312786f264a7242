use crate::error::{ConfigError, EvalError};
use crate::expression::{self, EvalLimits};
use crate::processor::PasteProcessor;
use crate::rules::translator::{placeholders, substitute_placeholders};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

// Default value functions for serde
fn default_pasted_text_pattern() -> String {
    r"([\s\S]*)".to_string()
}

fn default_key_value_delimiter() -> String {
    ":".to_string()
}

/// Everything one pipeline run needs: the splitter/extractor patterns and
/// the ordered cross-reference rules. Read-only once constructed.
///
/// Field names are snake_case; the camelCase names used by older
/// configurations are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Regex with one capture group marking the region of the input to parse
    #[serde(alias = "pastedTextPattern", default = "default_pasted_text_pattern")]
    pub pasted_text_pattern: String,
    /// Regex fragment between key and value (not escaped)
    #[serde(alias = "keyValueDelimiter", default = "default_key_value_delimiter")]
    pub key_value_delimiter: String,
    /// Text matching this regex is removed before splitting
    #[serde(alias = "ignorePattern", default, skip_serializing_if = "Option::is_none")]
    pub ignore_pattern: Option<String>,
    /// Each match of this regex ends a record; newline splitting when absent
    #[serde(alias = "keyValueEndPattern", default, skip_serializing_if = "Option::is_none")]
    pub key_value_end_pattern: Option<String>,
    /// Cross-reference rules, applied in order
    #[serde(default)]
    pub xrefs: Vec<CrossRefRule>,
    /// Name of the form field the text is pasted into
    #[serde(alias = "fieldToParse", default, skip_serializing_if = "Option::is_none")]
    pub field_to_parse: Option<String>,
    /// Regex matched against a canonical field name to derive a form field id
    #[serde(alias = "fieldNameToIdMatch", default, skip_serializing_if = "Option::is_none")]
    pub field_name_to_id_match: Option<String>,
    /// Replacement applied with `field_name_to_id_match` (`${1}` style groups)
    #[serde(alias = "fieldNameToIdReplace", default, skip_serializing_if = "Option::is_none")]
    pub field_name_to_id_replace: Option<String>,
    /// Guard limits for rule expressions
    #[serde(default)]
    pub limits: EvalLimits,
}

/// One cross-reference rule. `source_key` maps an extracted key onto
/// `name`; `expression` or `value` then derives the final value of `name`.
/// The two are independent and a rule may do both.
///
/// The expression may be given as `expression` or under its legacy name
/// `js`, but not both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CrossRefRuleFields")]
pub struct CrossRefRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Template with `${field}` placeholders; takes precedence over `value`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// Wire form of [`CrossRefRule`], keeping `js` apart from `expression` so a
/// rule that sets both gets a readable error.
#[derive(Deserialize)]
struct CrossRefRuleFields {
    #[serde(alias = "sourceKey", default)]
    source_key: Option<String>,
    name: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    js: Option<String>,
}

impl TryFrom<CrossRefRuleFields> for CrossRefRule {
    type Error = String;

    fn try_from(fields: CrossRefRuleFields) -> std::result::Result<Self, Self::Error> {
        let expression = match (fields.expression, fields.js) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "xref '{}' sets both `expression` and `js`; keep only one",
                    fields.name
                ))
            }
            (expression, js) => expression.or(js),
        };
        Ok(Self {
            source_key: fields.source_key,
            name: fields.name,
            value: fields.value,
            expression,
        })
    }
}

impl CrossRefRule {
    /// Rule that copies the value of extracted key `source_key` into `name`.
    pub fn mapping(source_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_key: Some(source_key.into()),
            name: name.into(),
            value: None,
            expression: None,
        }
    }

    /// Rule that always assigns the literal `value` to `name`.
    pub fn fixed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            source_key: None,
            name: name.into(),
            value: Some(value.into()),
            expression: None,
        }
    }

    /// Rule that assigns the result of `expression` to `name`.
    pub fn derived(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            source_key: None,
            name: name.into(),
            value: None,
            expression: Some(expression.into()),
        }
    }

    /// Build rules from flat `name.qualifier = value` options, the layout
    /// used by ini-style configuration sections.
    ///
    /// Rules come out in order of the first option seen for each name. An
    /// option without a qualifier sets the unused `regexp` qualifier.
    pub fn from_options<I, K, V>(options: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut rules: IndexMap<String, CrossRefRule> = IndexMap::new();

        for (option, value) in options {
            let option = option.as_ref();
            let (name, qualifier) = option.split_once('.').unwrap_or((option, "regexp"));
            let rule = rules
                .entry(name.to_string())
                .or_insert_with(|| CrossRefRule {
                    source_key: None,
                    name: name.to_string(),
                    value: None,
                    expression: None,
                });

            match qualifier {
                "source_key" | "sourceKey" => rule.source_key = Some(value.into()),
                "value" => rule.value = Some(value.into()),
                "js" | "expression" => rule.expression = Some(value.into()),
                "regexp" => {}
                other => debug!("ignoring unknown xref qualifier '{}' on '{}'", other, name),
            }
        }

        rules.into_values().collect()
    }
}

/// Non-fatal findings from [`RuleSet::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuleWarning {
    /// Rule has no source key, value or expression
    NoEffect { index: usize, name: String },
    /// Both value and expression are set; the expression wins
    ValueShadowed { index: usize, name: String },
    /// Expression does not parse even with every placeholder empty
    ExpressionSyntax {
        index: usize,
        name: String,
        error: EvalError,
    },
    /// Placeholder names a field that no rule produces
    UnknownPlaceholder {
        index: usize,
        name: String,
        placeholder: String,
    },
}

impl fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleWarning::NoEffect { index, name } => {
                write!(f, "rule #{index} ('{name}') has no source_key, value or expression")
            }
            RuleWarning::ValueShadowed { index, name } => write!(
                f,
                "rule #{index} ('{name}') sets both value and expression; the value is ignored"
            ),
            RuleWarning::ExpressionSyntax { index, name, error } => {
                write!(f, "rule #{index} ('{name}') has an invalid expression: {error}")
            }
            RuleWarning::UnknownPlaceholder {
                index,
                name,
                placeholder,
            } => write!(
                f,
                "rule #{index} ('{name}') references '${{{placeholder}}}', which no rule produces"
            ),
        }
    }
}

impl RuleSet {
    /// Load a rule set from a YAML or JSON file (by extension; YAML unless `.json`).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule set {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let rules = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON rule set {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML rule set {}", path.display()))?
        };
        Ok(rules)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("failed to load rule set from {}, using defaults: {:#}", p.display(), e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Compile every pattern once. The processor can then run any number of
    /// inputs.
    pub fn compile(&self) -> Result<PasteProcessor, ConfigError> {
        PasteProcessor::new(self.clone())
    }

    /// SHA-256 over the canonical JSON form, so an output can be tied to the
    /// exact rule set that produced it.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Lint the rules. Nothing here stops a run; invalid patterns are
    /// reported by [`RuleSet::compile`] instead.
    pub fn validate(&self) -> Vec<RuleWarning> {
        let produced: HashSet<&str> = self.xrefs.iter().map(|rule| rule.name.as_str()).collect();
        let mut warnings = Vec::new();

        for (index, rule) in self.xrefs.iter().enumerate() {
            let name = rule.name.clone();
            if rule.source_key.is_none() && rule.value.is_none() && rule.expression.is_none() {
                warnings.push(RuleWarning::NoEffect { index, name });
                continue;
            }

            let Some(template) = &rule.expression else {
                continue;
            };
            if rule.value.is_some() {
                warnings.push(RuleWarning::ValueShadowed {
                    index,
                    name: name.clone(),
                });
            }

            for placeholder in placeholders(template) {
                if !produced.contains(placeholder) {
                    warnings.push(RuleWarning::UnknownPlaceholder {
                        index,
                        name: name.clone(),
                        placeholder: placeholder.to_string(),
                    });
                }
            }

            let blank = substitute_placeholders(template, |_| None);
            if let Err(error) = expression::parse(&blank, &self.limits) {
                warnings.push(RuleWarning::ExpressionSyntax { index, name, error });
            }
        }

        warnings
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            pasted_text_pattern: default_pasted_text_pattern(),
            key_value_delimiter: default_key_value_delimiter(),
            ignore_pattern: None,
            key_value_end_pattern: None,
            xrefs: Vec::new(),
            field_to_parse: None,
            field_name_to_id_match: None,
            field_name_to_id_replace: None,
            limits: EvalLimits::default(),
        }
    }
}

/// Compile a configured pattern in multi-line mode.
pub(crate) fn compile_pattern(setting: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            setting,
            pattern: pattern.to_string(),
            source,
        })
}
