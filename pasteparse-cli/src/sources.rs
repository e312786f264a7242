use anyhow::{Context, Result};
use pasteparse_core::RuleSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// `<config dir>/pasteparse/rules.yaml`, if the platform has a config dir.
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pasteparse").join("rules.yaml"))
}

/// Resolve the rule set for a run.
///
/// An explicit `config` must load. Otherwise `default_path` is used when it
/// exists, falling back to the built-in rule set if it cannot be loaded.
pub fn load_rules(config: Option<&Path>, default_path: Option<&Path>) -> Result<RuleSet> {
    if let Some(path) = config {
        let rules = RuleSet::load_from_file(path)?;
        eprintln!("📋 Loaded rule set from: {}", path.display());
        info!("loaded rule set from {}", path.display());
        return Ok(rules);
    }

    let Some(path) = default_path.filter(|path| path.exists()) else {
        eprintln!("📋 Using default rule set");
        return Ok(RuleSet::default());
    };

    match RuleSet::load_from_file(path) {
        Ok(rules) => {
            eprintln!("📋 Loaded rule set from: {}", path.display());
            info!("loaded rule set from {}", path.display());
            Ok(rules)
        }
        Err(e) => {
            eprintln!("⚠️  Could not load {}, using default rule set", path.display());
            warn!("failed to load rule set from {}: {:#}", path.display(), e);
            Ok(RuleSet::default())
        }
    }
}

/// Input text from `input`, or stdin when absent.
pub fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasteparse_core::CrossRefRule;

    const RULES_YAML: &str = "xrefs:\n  - source_key: Name\n    name: name\n";

    #[test]
    fn test_explicit_config_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, RULES_YAML).unwrap();

        let rules = load_rules(Some(&path), None).unwrap();
        assert_eq!(rules.xrefs, vec![CrossRefRule::mapping("Name", "name")]);
    }

    #[test]
    fn test_broken_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "xrefs: [unclosed").unwrap();

        let err = load_rules(Some(&path), None).unwrap_err();
        assert!(format!("{err:#}").contains("rules.yaml"));
    }

    #[test]
    fn test_default_path_used_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, RULES_YAML).unwrap();

        let rules = load_rules(None, Some(&path)).unwrap();
        assert_eq!(rules.xrefs.len(), 1);
    }

    #[test]
    fn test_missing_or_broken_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert_eq!(load_rules(None, Some(&missing)).unwrap(), RuleSet::default());
        assert_eq!(load_rules(None, None).unwrap(), RuleSet::default());

        let broken = dir.path().join("broken.yaml");
        std::fs::write(&broken, "xrefs: [unclosed").unwrap();
        assert_eq!(load_rules(None, Some(&broken)).unwrap(), RuleSet::default());
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paste.txt");
        std::fs::write(&path, "Name: Alice\r\n").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "Name: Alice\r\n");

        let err = read_input(Some(&dir.path().join("absent.txt"))).unwrap_err();
        assert!(format!("{err:#}").contains("absent.txt"));
    }
}
