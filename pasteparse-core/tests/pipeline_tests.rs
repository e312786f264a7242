//! Pipeline boundary tests.
//!
//! Each module exercises one boundary of the pipeline through the public
//! API only:
//!
//! - Region match: the input either yields a region or a `NoMatch`
//! - Records: splitting and key/value extraction
//! - Mapping: extracted keys onto canonical field names
//! - Translation: fixed and derived values
//! - Config files: rule sets loaded from disk

use pasteparse_core::{
    run, CrossRefRule, FieldValueMap, KeyValueExtractor, RecordSplitter, RuleSet, RunOutcome,
};

// ============================================================================
// Fixture helpers
// ============================================================================

fn start_end_rules(xrefs: Vec<CrossRefRule>) -> RuleSet {
    RuleSet {
        pasted_text_pattern: r"START\n([\s\S]*)\nEND".to_string(),
        key_value_delimiter: ":".to_string(),
        xrefs,
        ..RuleSet::default()
    }
}

fn parsed_fields(text: &str, rules: &RuleSet) -> FieldValueMap {
    match run(text, rules).expect("rule set compiles") {
        RunOutcome::Parsed(outcome) => {
            assert!(outcome.failures.is_empty(), "failures: {:?}", outcome.failures);
            outcome.fields
        }
        RunOutcome::NoMatch => panic!("expected the region pattern to match"),
    }
}

fn field_pairs(fields: &FieldValueMap) -> Vec<(&str, &str)> {
    fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

// ============================================================================
// Region match boundary
// ============================================================================

mod region_boundary {
    use super::*;

    #[test]
    fn end_to_end_example() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Name", "fullName"),
            CrossRefRule::mapping("Role", "role"),
            CrossRefRule::derived("greeting", "'Hi ' + ${fullName}"),
        ]);

        let fields = parsed_fields("START\nName: Alice\nRole: Eng\nEND", &rules);
        assert_eq!(
            field_pairs(&fields),
            vec![
                ("fullName", "Alice"),
                ("role", "Eng"),
                ("greeting", "Hi Alice")
            ]
        );
    }

    #[test]
    fn missing_markers_is_no_match() {
        let rules = start_end_rules(vec![CrossRefRule::mapping("Name", "fullName")]);
        let outcome = run("Name: Alice\nRole: Eng", &rules).unwrap();
        assert_eq!(outcome, RunOutcome::NoMatch);
        assert!(!outcome.is_match());
        assert_eq!(outcome.fields(), None);
    }

    #[test]
    fn match_without_fields_is_not_no_match() {
        let rules = start_end_rules(vec![CrossRefRule::mapping("Name", "fullName")]);
        let outcome = run("START\nnothing useful\nEND", &rules).unwrap();
        assert!(outcome.is_match());
        assert_eq!(outcome.fields().map(|f| f.len()), Some(0));
    }

    #[test]
    fn default_rule_set_takes_whole_input() {
        let rules = RuleSet {
            xrefs: vec![CrossRefRule::mapping("Name", "name")],
            ..RuleSet::default()
        };
        let fields = parsed_fields("Name: Alice", &rules);
        assert_eq!(fields["name"], "Alice");
    }
}

// ============================================================================
// Records boundary
// ============================================================================

mod records_boundary {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_without_delimiter_is_dropped() {
        let splitter = RecordSplitter::new(None, None).unwrap();
        let extractor = KeyValueExtractor::new(":").unwrap();

        let records = splitter.split("Name: Alice\nthis line has no delimiter\nRole: Eng");
        let key_values = extractor.extract_all(&records);

        assert_eq!(records.len(), 3);
        assert_eq!(key_values.len(), 2);
        assert!(key_values.values().all(|v| !v.contains("no delimiter")));
    }

    #[test]
    fn multi_line_values_with_end_pattern() {
        let mut rules = start_end_rules(vec![
            CrossRefRule::mapping("Summary", "summary"),
            CrossRefRule::mapping("Notes", "notes"),
        ]);
        rules.ignore_pattern = Some(r"^//.*\n".to_string());
        rules.key_value_end_pattern = Some(r"^\.$".to_string());

        let text = "START\nSummary: short\n.\n// reviewer comment\nNotes: first line\nsecond line\n.\nEND";
        let fields = parsed_fields(text, &rules);
        assert_eq!(fields["summary"], "short");
        assert_eq!(fields["notes"], "first line\nsecond line");
    }

    proptest! {
        #[test]
        fn stripping_ignored_text_is_idempotent(text in "[a-z0-9 \n#]{0,80}") {
            let splitter = RecordSplitter::new(Some("[0-9]+"), None).unwrap();
            let once = splitter.strip_ignored(&text).into_owned();
            let twice = splitter.strip_ignored(&once).into_owned();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn literal_delimiter_round_trip(
            key in "[A-Za-z][A-Za-z0-9 ]{0,10}[A-Za-z0-9]",
            value in "[a-z0-9][a-z0-9 ]{0,20}",
            delimiter in prop::sample::select(vec!["=", "::", "->", "=>"]),
        ) {
            let extractor = KeyValueExtractor::new(delimiter).unwrap();
            let record = format!("{key}{delimiter}{value}");
            let kv = extractor.extract(&record).unwrap();
            prop_assert_eq!(kv.key, key);
            prop_assert_eq!(kv.value, value);
        }
    }
}

// ============================================================================
// Mapping boundary
// ============================================================================

mod mapping_boundary {
    use super::*;

    #[test]
    fn one_key_two_names() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Name", "fullName"),
            CrossRefRule::mapping("Name", "contact"),
        ]);
        let fields = parsed_fields("START\nName: Alice\nEND", &rules);
        assert_eq!(fields["fullName"], "Alice");
        assert_eq!(fields["contact"], "Alice");
    }

    #[test]
    fn same_name_last_input_key_wins() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Phone", "phone"),
            CrossRefRule::mapping("Mobile", "phone"),
        ]);

        let fields = parsed_fields("START\nMobile: 222\nPhone: 111\nEND", &rules);
        assert_eq!(fields["phone"], "111");

        let fields = parsed_fields("START\nPhone: 111\nMobile: 222\nEND", &rules);
        assert_eq!(fields["phone"], "222");
    }

    #[test]
    fn duplicate_input_key_last_value_wins() {
        let rules = start_end_rules(vec![CrossRefRule::mapping("Name", "name")]);
        let fields = parsed_fields("START\nName: first\nName: second\nEND", &rules);
        assert_eq!(fields["name"], "second");
    }
}

// ============================================================================
// Translation boundary
// ============================================================================

mod translation_boundary {
    use super::*;

    #[test]
    fn later_rules_see_earlier_results() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Name", "r1"),
            CrossRefRule::derived("r1", "${r1}.toUpperCase()"),
            CrossRefRule::derived("r2", "${r1}"),
        ]);
        let fields = parsed_fields("START\nName: alice\nEND", &rules);
        assert_eq!(fields["r2"], "ALICE");
    }

    #[test]
    fn earlier_rules_see_mapped_values_only() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Name", "r1"),
            CrossRefRule::derived("r2", "${r1}"),
            CrossRefRule::derived("r1", "'replaced'"),
            CrossRefRule::derived("r3", "${absent}"),
        ]);
        let fields = parsed_fields("START\nName: alice\nEND", &rules);
        assert_eq!(fields["r2"], "alice");
        assert_eq!(fields["r1"], "replaced");
        assert_eq!(fields["r3"], "");
    }

    #[test]
    fn newlines_survive_expressions() {
        let mut rules = start_end_rules(vec![
            CrossRefRule::mapping("Notes", "x"),
            CrossRefRule::derived("y", "${x} + \"!\""),
        ]);
        rules.key_value_end_pattern = Some(";".to_string());

        let fields = parsed_fields("START\nNotes: line1\nline2;\nEND", &rules);
        assert_eq!(fields["x"], "line1\nline2");
        assert_eq!(fields["y"], "line1\nline2!");
    }

    #[test]
    fn broken_rule_is_reported_not_fatal() {
        let rules = start_end_rules(vec![
            CrossRefRule::mapping("Name", "name"),
            CrossRefRule::derived("bad", "${name}.eval()"),
            CrossRefRule::fixed("source", "paste"),
        ]);

        let RunOutcome::Parsed(outcome) = run("START\nName: Alice\nEND", &rules).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].rule_name, "bad");
        assert!(!outcome.fields.contains_key("bad"));
        assert_eq!(outcome.fields["source"], "paste");
    }
}

// ============================================================================
// Config file boundary
// ============================================================================

mod config_boundary {
    use super::*;

    #[test]
    fn legacy_camel_case_file_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{
                "pastedTextPattern": "^-- ticket --$\\n([\\s\\S]*)",
                "keyValueDelimiter": "=",
                "ignorePattern": "^#.*$",
                "xrefs": [
                    {"sourceKey": "Subject", "name": "summary"},
                    {"name": "summary", "js": "${summary}.trim() || 'untitled'"}
                ]
            }"#,
        )
        .unwrap();

        let rules = RuleSet::load_from_file(&path).unwrap();
        assert!(rules.validate().is_empty());

        let fields = parsed_fields("-- ticket --\n# internal\nSubject =  Printer on fire  ", &rules);
        assert_eq!(field_pairs(&fields), vec![("summary", "Printer on fire")]);
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = RuleSet::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.yaml"));
    }
}
