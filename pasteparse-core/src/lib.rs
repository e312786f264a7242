// Pasteparse Core Library
//
// Turns a block of pasted free-form text into canonical field values.
// Stages: region match -> record split -> key/value extraction -> field
// mapping -> value translation. The rule set is passed in explicitly and
// compiled once; each run is a pure function of the input text.

pub mod config;
pub mod error;
pub mod expression;
pub mod processor;
pub mod records;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{CrossRefRule, RuleSet, RuleWarning};
pub use error::{ConfigError, EvalError, RuleFailure};
pub use expression::EvalLimits;
pub use processor::{FormAssignment, ParseOutcome, PasteProcessor, PipelineStages, RunOutcome};
pub use records::{KeyValueExtractor, RecordSplitter};
pub use rules::{FieldMapper, ValueTranslator};
pub use types::*;

/// Compile `rules` and run the pipeline once over `raw_text`.
///
/// Callers that parse many inputs with the same rule set should compile a
/// [`PasteProcessor`] once via [`RuleSet::compile`] instead.
pub fn run(raw_text: &str, rules: &RuleSet) -> Result<RunOutcome, ConfigError> {
    Ok(rules.compile()?.run(raw_text))
}
