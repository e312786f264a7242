use crate::config::CrossRefRule;
use crate::error::RuleFailure;
use crate::expression::{self, EvalLimits};
use crate::types::FieldValueMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{(.*?)\}").unwrap())
}

fn line_break_pair_regex() -> &'static Regex {
    static LINE_BREAK_PAIR: OnceLock<Regex> = OnceLock::new();
    LINE_BREAK_PAIR.get_or_init(|| Regex::new(r"\r\n|\n\r").unwrap())
}

/// Names referenced as `${name}` in `template`, in order of appearance.
pub fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Escape `value` so it can sit between single quotes in an expression.
///
/// CRLF and LFCR pairs collapse to one newline in a single left-to-right
/// pass, so a lone CR left over after a pair is kept. Newlines then become
/// the two characters `\\n`, which the lexer reads back as a backslash
/// followed by `n`; [`ValueTranslator`] turns those into real newlines again
/// after evaluation.
pub fn sanitize_for_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    line_break_pair_regex()
        .replace_all(&escaped, "\n")
        .replace('\n', "\\\\n")
}

/// Replace every placeholder in one pass with the quoted, sanitized value
/// returned by `lookup`. Unknown names become `''`.
pub fn substitute_placeholders<'v, F>(template: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<&'v str>,
{
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            let value = lookup(name).unwrap_or("");
            trace!("placeholder ${{{}}} -> {:?}", name, value);
            format!("'{}'", sanitize_for_literal(value))
        })
        .into_owned()
}

/// Assigns fixed or derived values to fields, rule by rule.
///
/// Rules run in order against the live field map, so an expression sees the
/// values written by the rules before it. A rule with an expression ignores
/// its `value`. A failing expression skips that rule only.
pub struct ValueTranslator<'a> {
    rules: &'a [CrossRefRule],
    limits: &'a EvalLimits,
}

impl<'a> ValueTranslator<'a> {
    pub fn new(rules: &'a [CrossRefRule], limits: &'a EvalLimits) -> Self {
        Self { rules, limits }
    }

    pub fn translate(&self, fields: &mut FieldValueMap) -> Vec<RuleFailure> {
        let mut failures = Vec::new();
        let mut assigned = 0;

        for (index, rule) in self.rules.iter().enumerate() {
            if let Some(template) = &rule.expression {
                let source =
                    substitute_placeholders(template, |name| fields.get(name).map(String::as_str));
                match expression::evaluate(&source, self.limits) {
                    Ok(result) => {
                        let result = result.replace("\\n", "\n");
                        trace!("rule #{} set {:?} = {:?}", index, rule.name, result);
                        fields.insert(rule.name.clone(), result);
                        assigned += 1;
                    }
                    Err(error) => {
                        let failure = RuleFailure {
                            rule_index: index,
                            rule_name: rule.name.clone(),
                            expression: template.clone(),
                            error,
                        };
                        warn!("{}", failure);
                        failures.push(failure);
                    }
                }
            } else if let Some(value) = &rule.value {
                trace!("rule #{} set {:?} = {:?}", index, rule.name, value);
                fields.insert(rule.name.clone(), value.clone());
                assigned += 1;
            }
        }

        debug!(
            "translated {} fields ({} rule failures)",
            assigned,
            failures.len()
        );
        failures
    }
}
