use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::builders::matcher::{Match, RuleSet, compile_rule};
use crate::builders::patterns::{self, IgnoreRule, RuleError};
use crate::core::config;

static REDUNDANT_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{3,}").expect("static regex is valid"));

/// How serious a lint finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// git will skip or misread the line.
    Error,
    /// The line parses, but almost certainly does not do what was meant.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One finding of the static check, tied to a line of the checked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl LintIssue {
    fn error(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.severity, self.message)
    }
}

/// Static checks over the text of an ignore file.
pub trait RuleValidator {
    /// Checks every line of `content` and returns the findings in line order.
    fn validate_file(&self, content: &str) -> Vec<LintIssue>;
}

/// The `ConfigValidator` trait defines the public interface for validating the
/// tool's own configuration.
pub trait ConfigValidator {
    /// Performs a full validation of the `IgnoreRulesConfig` and returns
    /// a list of issues found.
    ///
    /// # Arguments
    /// * `config`: The configuration to be validated.
    /// * `repo_root`: Directory that relative ignore-file paths resolve against.
    fn validate_config(
        &self,
        config: &config::IgnoreRulesConfig,
        repo_root: &Path,
    ) -> Result<Vec<String>>;
}

/// The `StandardValidator` is the concrete implementation of both traits.
///
/// Besides syntax errors it looks for lines that git accepts but that will
/// not behave as written: silently stripped whitespace, duplicates, and
/// negations that can never re-include anything.
pub struct StandardValidator {
    case_insensitive: bool,
    nested: bool,
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardValidator {
    /// Creates a new instance of `StandardValidator`.
    pub fn new() -> Self {
        Self {
            case_insensitive: false,
            nested: false,
        }
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Marks the checked file as living below the repository root. Such a
    /// file may legitimately hold nothing but negations that re-include
    /// paths excluded by a shallower file.
    pub fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    /// Finds the first literal parent directory of a negated rule that the
    /// preceding rules already exclude. git does not descend into excluded
    /// directories, so such a negation has no effect.
    fn excluded_parent(&self, preceding: &RuleSet, rule: &IgnoreRule) -> Option<(String, usize)> {
        for dir in rule.literal_parent_dirs() {
            if let Match::Ignore(excluding) = preceding.matched(&dir, true) {
                return Some((dir, excluding.line));
            }
        }
        None
    }

    fn describe_parse_error(error: &RuleError) -> String {
        match error {
            RuleError::EmptyPattern { original, .. } => {
                format!("`{original}` has no pattern after its `!`/`/` markers and matches nothing")
            }
            RuleError::InvalidGlob { pattern, message, .. } => {
                format!("`{pattern}` is not a valid glob: {message}")
            }
        }
    }
}

impl RuleValidator for StandardValidator {
    fn validate_file(&self, content: &str) -> Vec<LintIssue> {
        let mut issues = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut preceding = RuleSet::empty("", self.case_insensitive);

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;

            let rule = match IgnoreRule::parse_line(raw, line_no) {
                Ok(Some(rule)) => rule,
                Ok(None) => continue,
                Err(e) => {
                    issues.push(LintIssue::error(line_no, Self::describe_parse_error(&e)));
                    continue;
                }
            };

            if patterns::has_unescaped_trailing_space(raw) {
                issues.push(LintIssue::warning(
                    line_no,
                    "trailing whitespace is stripped by git; escape it as `\\ ` if it is part of the name",
                ));
            }

            let matcher = match compile_rule(&rule, self.case_insensitive) {
                Ok(matcher) => matcher,
                Err(e) => {
                    issues.push(LintIssue::error(line_no, Self::describe_parse_error(&e)));
                    continue;
                }
            };

            let key = rule.to_line();
            if let Some(first) = first_seen.get(&key) {
                issues.push(LintIssue::warning(
                    line_no,
                    format!("`{key}` duplicates line {first}"),
                ));
            } else {
                first_seen.insert(key, line_no);
            }

            if REDUNDANT_STARS.is_match(&rule.pattern) {
                issues.push(LintIssue::warning(
                    line_no,
                    "runs of three or more `*` behave like `**`",
                ));
            }

            if rule.negated {
                if !self.nested && !preceding.rules().any(|r| !r.negated) {
                    issues.push(LintIssue::warning(
                        line_no,
                        format!("`{}` re-includes paths but no earlier rule excludes anything", rule.original),
                    ));
                } else if let Some((dir, line)) = self.excluded_parent(&preceding, &rule) {
                    issues.push(LintIssue::warning(
                        line_no,
                        format!(
                            "`{}` cannot take effect: parent directory `{dir}` is excluded by line {line}",
                            rule.original
                        ),
                    ));
                }
            }

            preceding.push_compiled(rule, matcher);
        }

        issues
    }
}

impl ConfigValidator for StandardValidator {
    /// Checks the config version and that every configured rule file exists.
    fn validate_config(
        &self,
        config: &config::IgnoreRulesConfig,
        repo_root: &Path,
    ) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if config.version != config::CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        for file in config.ignore_files.iter().chain(&config.extra_rules) {
            if !repo_root.join(file).exists() {
                issues.push(format!("Ignore file not found: {file}"));
            }
        }

        if config.ignore_files.is_empty() {
            issues.push("No ignore files configured; only nested .gitignore files will be read".to_string());
        }

        Ok(issues)
    }
}
