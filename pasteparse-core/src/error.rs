use serde::{Serialize, Serializer};
use thiserror::Error;

/// A rule set that cannot be compiled. These are configuration mistakes,
/// reported once when the rule set is compiled rather than per input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {setting} '{pattern}': {source}")]
    InvalidPattern {
        setting: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("pasted_text_pattern '{0}' has no capture group marking the text to parse")]
    MissingCaptureGroup(String),
}

/// Failure while tokenizing, parsing or evaluating a rule expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },
    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    #[error("unknown member '.{0}'")]
    UnknownMember(String),
    #[error("'.{member}' {reason}")]
    InvalidMemberUse { member: String, reason: &'static str },
    #[error("'.{member}' takes {expected} argument(s), got {found}")]
    WrongArity {
        member: String,
        expected: &'static str,
        found: usize,
    },
    #[error("invalid argument to '.{member}': {reason}")]
    InvalidArgument { member: String, reason: String },
    #[error("expression exceeded the step budget of {0}")]
    StepBudgetExceeded(usize),
    #[error("expression nesting exceeds depth {0}")]
    TooDeep(usize),
    #[error("string result exceeds {0} bytes")]
    OutputTooLong(usize),
}

/// A rule whose expression could not be evaluated. The rule's assignment is
/// skipped and the rest of the translation pass continues.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("rule #{rule_index} ('{rule_name}') failed: {error}")]
pub struct RuleFailure {
    pub rule_index: usize,
    pub rule_name: String,
    /// Expression template as configured, before placeholder substitution
    pub expression: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: EvalError,
}

fn serialize_display<S: Serializer>(error: &EvalError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
