use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::builders::patterns::{IgnoreRule, RuleFile};

/// Interchange formats understood by `import` and `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleFormat {
    /// Plain gitignore syntax, one rule per line.
    Gitignore,
    Json,
    Yaml,
    Toml,
}

impl RuleFormat {
    /// Guesses the format from a file extension, defaulting to gitignore
    /// syntax for anything unrecognised (`.gitignore`, `exclude`, ...).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => RuleFormat::Json,
            Some("yaml") | Some("yml") => RuleFormat::Yaml,
            Some("toml") => RuleFormat::Toml,
            _ => RuleFormat::Gitignore,
        }
    }
}

/// Serialized shape of an exported rule file. TOML needs a table at the top
/// level, so the rules are wrapped rather than written as a bare list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExport {
    pub source: String,
    pub rules: Vec<IgnoreRule>,
}

/// A trait that defines the behavior for importing ignore rules from a source.
///
/// This trait allows for different implementations of rule importers (e.g., from
/// files, from a network source) to be used interchangeably.
pub trait PatternImporter {
    /// Imports rules from a file, in file order.
    ///
    /// # Arguments
    /// * `file_path`: The path to the file to be imported.
    /// * `format`: How the file is encoded.
    fn import_from_file(&mut self, file_path: &Path, format: RuleFormat) -> Result<Vec<IgnoreRule>>;
}

/// Reads rules from files on disk.
#[derive(Default)]
pub struct FileImporter;

impl PatternImporter for FileImporter {
    fn import_from_file(&mut self, file_path: &Path, format: RuleFormat) -> Result<Vec<IgnoreRule>> {
        let content = fs::read_to_string(file_path).context("Failed to read import file")?;

        match format {
            RuleFormat::Gitignore => Ok(self.parse_gitignore_style(&content, file_path)),
            RuleFormat::Json => {
                let export: RuleExport =
                    serde_json::from_str(&content).context("Failed to parse JSON rules")?;
                Ok(self.reparse_structured(export.rules, file_path))
            }
            RuleFormat::Yaml => {
                let export: RuleExport =
                    serde_yaml::from_str(&content).context("Failed to parse YAML rules")?;
                Ok(self.reparse_structured(export.rules, file_path))
            }
            RuleFormat::Toml => {
                let export: RuleExport =
                    toml::from_str(&content).context("Failed to parse TOML rules")?;
                Ok(self.reparse_structured(export.rules, file_path))
            }
        }
    }
}

impl FileImporter {
    /// Constructs a new `FileImporter` instance.
    pub fn new() -> Self {
        Self
    }

    /// Parses `.gitignore`-style content. Malformed lines are skipped with a
    /// warning, as git itself would skip them.
    fn parse_gitignore_style(&self, content: &str, file_path: &Path) -> Vec<IgnoreRule> {
        let (file, errors) = RuleFile::parse_lenient(content, Some(file_path.to_path_buf()), "");
        for e in errors {
            warn!(file = %file_path.display(), error = %e, "skipping line during import");
        }
        file.rules
    }

    /// Structured exports can be edited by hand, so their flags are not
    /// trusted. Each rule is rendered and parsed again, which normalizes
    /// flags that disagree with the pattern text and drops rules that would
    /// render as an empty or marker-only line.
    fn reparse_structured(&self, rules: Vec<IgnoreRule>, file_path: &Path) -> Vec<IgnoreRule> {
        rules
            .into_iter()
            .filter_map(|rule| {
                let line = rule.to_line();
                match IgnoreRule::from_pattern(&line) {
                    Ok(mut parsed) => {
                        parsed.line = rule.line;
                        Some(parsed)
                    }
                    Err(e) => {
                        warn!(file = %file_path.display(), rule = %line, error = %e, "skipping rule during import");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Serializes the rules of `file` in the requested format.
pub fn export_rules(file: &RuleFile, source: &str, format: RuleFormat) -> Result<String> {
    let export = RuleExport {
        source: source.to_string(),
        rules: file
            .rules
            .iter()
            .cloned()
            .map(|mut rule| {
                rule.source = None;
                rule
            })
            .collect(),
    };

    let content = match format {
        RuleFormat::Gitignore => {
            let mut out = String::new();
            for rule in &export.rules {
                out.push_str(&rule.to_string());
                out.push('\n');
            }
            out
        }
        RuleFormat::Json => {
            serde_json::to_string_pretty(&export).context("Failed to serialize to JSON")?
        }
        RuleFormat::Yaml => serde_yaml::to_string(&export).context("Failed to serialize to YAML")?,
        RuleFormat::Toml => toml::to_string_pretty(&export).context("Failed to serialize to TOML")?,
    };
    Ok(content)
}

/// Appends `incoming` rules to an ignore file's text, skipping any rule that
/// is already present. Returns the new text and how many rules were added.
pub fn merge_rules(content: &str, existing: &RuleFile, incoming: &[IgnoreRule]) -> (String, usize) {
    let mut out = content.to_string();
    let mut known: Vec<&IgnoreRule> = existing.rules.iter().collect();
    let mut added = 0;

    for rule in incoming {
        if known.iter().any(|k| k.same_rule(rule)) {
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&rule.to_line());
        out.push('\n');
        known.push(rule);
        added += 1;
    }

    (out, added)
}
