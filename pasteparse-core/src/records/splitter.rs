use crate::config::compile_pattern;
use crate::error::ConfigError;
use crate::types::RawRecord;
use regex::Regex;
use std::borrow::Cow;
use tracing::{debug, trace};

/// Cuts a text block into raw records.
///
/// Without an end pattern every line is a record. With one, each match of
/// the end pattern closes the record before it, which lets values span
/// several lines.
#[derive(Debug, Clone)]
pub struct RecordSplitter {
    ignore: Option<Regex>,
    end: Option<Regex>,
}

impl RecordSplitter {
    /// Compile the optional ignore and end patterns (multi-line mode). Empty
    /// patterns count as absent.
    pub fn new(ignore_pattern: Option<&str>, end_pattern: Option<&str>) -> Result<Self, ConfigError> {
        Ok(Self {
            ignore: compile_optional("ignore_pattern", ignore_pattern)?,
            end: compile_optional("key_value_end_pattern", end_pattern)?,
        })
    }

    /// Remove every match of the ignore pattern.
    pub fn strip_ignored<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.ignore {
            Some(ignore) => ignore.replace_all(text, ""),
            None => Cow::Borrowed(text),
        }
    }

    pub fn split(&self, text: &str) -> Vec<RawRecord> {
        let text = self.strip_ignored(text);
        if let Cow::Owned(stripped) = &text {
            trace!("stripped ignored text, {} bytes remain", stripped.len());
        }

        let records = match &self.end {
            Some(end) => split_on_end_pattern(&text, end),
            None => text.split('\n').map(str::to_string).collect(),
        };

        debug!("split text into {} records", records.len());
        records
    }
}

fn compile_optional(setting: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern {
        Some(p) if !p.is_empty() => compile_pattern(setting, p).map(Some),
        _ => Ok(None),
    }
}

/// Each end-pattern match closes the record running up to it; that record
/// is trimmed. Whatever follows the last match becomes a final record as-is.
fn split_on_end_pattern(text: &str, end: &Regex) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut start = 0;

    for found in end.find_iter(text) {
        let record = text[start..found.start()].trim();
        trace!("record closed at offset {}: {:?}", found.start(), record);
        records.push(record.to_string());
        start = found.end();
    }

    if start < text.len() {
        records.push(text[start..].to_string());
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_keeps_empty_lines() {
        let splitter = RecordSplitter::new(None, None).unwrap();
        assert_eq!(
            splitter.split("a: 1\n\nb: 2"),
            vec!["a: 1".to_string(), String::new(), "b: 2".to_string()]
        );
    }

    #[test]
    fn test_ignore_pattern_runs_before_split() {
        let splitter = RecordSplitter::new(Some(r"^#.*\n"), None).unwrap();
        assert_eq!(
            splitter.split("# header\na: 1\n# note\nb: 2"),
            vec!["a: 1".to_string(), "b: 2".to_string()]
        );
    }

    #[test]
    fn test_end_pattern_split_trims_closed_records() {
        let splitter = RecordSplitter::new(None, Some(r"^---$")).unwrap();
        let records = splitter.split("a: first\n  line two\n---\n b: 2 \n---\nc: tail ");
        assert_eq!(
            records,
            vec![
                "a: first\n  line two".to_string(),
                "b: 2".to_string(),
                "\nc: tail ".to_string(),
            ]
        );
    }

    #[test]
    fn test_end_pattern_without_trailing_text() {
        let splitter = RecordSplitter::new(None, Some(";")).unwrap();
        assert_eq!(
            splitter.split("a=1;b=2;"),
            vec!["a=1".to_string(), "b=2".to_string()]
        );
    }

    #[test]
    fn test_adjacent_end_matches_emit_empty_records() {
        let splitter = RecordSplitter::new(None, Some(";")).unwrap();
        assert_eq!(
            splitter.split("a=1;;b=2"),
            vec!["a=1".to_string(), String::new(), "b=2".to_string()]
        );
    }

    #[test]
    fn test_empty_patterns_are_ignored() {
        let splitter = RecordSplitter::new(Some(""), Some("")).unwrap();
        assert_eq!(splitter.split("x\ny").len(), 2);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RecordSplitter::new(Some("("), None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidPattern {
                setting: "ignore_pattern",
                ..
            }
        ));
    }
}
