use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use pasteparse_core::{FormAssignment, PasteProcessor, PipelineStages, RuleSet, RunOutcome};
use serde::Serialize;

/// How the result of a run is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Result envelope as pretty JSON
    Json,
    /// Result envelope as YAML
    Yaml,
    /// Form assignments (field id, trimmed value) as JSON, with the field
    /// the text was pasted into
    Form,
}

/// Result envelope printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub outcome: RunOutcome,
    /// Form field the text was pasted into, when the rule set names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_to_parse: Option<String>,
    /// SHA-256 of the rule set that produced the outcome
    pub ruleset_fingerprint: String,
    pub parsed_at: DateTime<Utc>,
}

/// Body of `--format form` output.
#[derive(Debug, Clone, Serialize)]
pub struct FormReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_to_parse: Option<&'a str>,
    pub assignments: Vec<FormAssignment>,
}

impl Report {
    pub fn new(outcome: RunOutcome, rules: &RuleSet) -> Result<Self> {
        Ok(Self {
            outcome,
            field_to_parse: rules.field_to_parse.clone(),
            ruleset_fingerprint: rules.fingerprint()?,
            parsed_at: Utc::now(),
        })
    }

    pub fn render(&self, format: OutputFormat, processor: &PasteProcessor) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            OutputFormat::Form => {
                let assignments = match &self.outcome {
                    RunOutcome::Parsed(outcome) => processor.form_assignments(&outcome.fields),
                    RunOutcome::NoMatch => Vec::new(),
                };
                let form = FormReport {
                    field_to_parse: self.field_to_parse.as_deref(),
                    assignments,
                };
                Ok(serde_json::to_string_pretty(&form)?)
            }
        }
    }
}

/// Every pipeline stage as pretty JSON, for `--dump-stages`.
pub fn render_stages(stages: &PipelineStages) -> Result<String> {
    Ok(serde_json::to_string_pretty(stages)?)
}
