use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning ignore-file text into rules.
///
/// Each variant carries the 1-based line number of the offending rule so the
/// caller can point the user at the exact place in the file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The line held only markers (`!`, `/`) and no pattern text.
    #[error("line {line}: `{original}` has no pattern left after removing `!` and `/`")]
    EmptyPattern { line: usize, original: String },
    /// The pattern could not be compiled into a glob.
    #[error("line {line}: invalid glob `{pattern}`: {message}")]
    InvalidGlob {
        line: usize,
        pattern: String,
        message: String,
    },
}

impl RuleError {
    /// The 1-based line number the error refers to.
    pub fn line(&self) -> usize {
        match self {
            RuleError::EmptyPattern { line, .. } | RuleError::InvalidGlob { line, .. } => *line,
        }
    }
}

/// A single parsed line of an ignore file.
///
/// The markers that change a rule's meaning are lifted out of the text into
/// flags, so `pattern` holds only the glob itself:
///
/// * `!build/`   -> pattern `build`, negated, directory-only
/// * `/target`   -> pattern `target`, anchored
/// * `docs/*.md` -> pattern `docs/*.md`, anchored (inner slash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Glob text with the `!`, leading `/` and trailing `/` markers removed.
    pub pattern: String,
    /// The line exactly as written (minus a trailing `\r`).
    #[serde(default)]
    pub original: String,
    /// 1-based line number in the source file.
    #[serde(default)]
    pub line: usize,
    /// `true` when the rule re-includes paths (leading `!`).
    #[serde(default)]
    pub negated: bool,
    /// `true` when the rule only matches relative to its base directory.
    #[serde(default)]
    pub anchored: bool,
    /// `true` when the rule only matches directories (trailing `/`).
    #[serde(default)]
    pub dir_only: bool,
    /// File the rule was read from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original.is_empty() {
            write!(f, "{}", self.to_line())
        } else {
            write!(f, "{}", self.original)
        }
    }
}

impl IgnoreRule {
    /// Parses one line of an ignore file.
    ///
    /// Returns `Ok(None)` for blank lines and comments. Trailing spaces are
    /// dropped unless escaped with a backslash, and `\#` / `\!` introduce a
    /// literal `#` or `!`.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Option<Self>, RuleError> {
        let raw = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = trim_trailing_spaces(raw);

        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let mut body = trimmed;
        let mut negated = false;
        if let Some(rest) = body.strip_prefix('!') {
            negated = true;
            body = rest;
        } else if body.starts_with("\\!") || body.starts_with("\\#") {
            body = &body[1..];
        }

        let dir_only = body.ends_with('/') && !body.ends_with("\\/");
        if dir_only {
            body = &body[..body.len() - 1];
        }

        let leading_slash = body.starts_with('/');
        if leading_slash {
            body = &body[1..];
        }

        if body.is_empty() {
            return Err(RuleError::EmptyPattern {
                line: line_no,
                original: raw.to_string(),
            });
        }

        Ok(Some(Self {
            pattern: body.to_string(),
            original: raw.to_string(),
            line: line_no,
            negated,
            anchored: leading_slash || body.contains('/'),
            dir_only,
            source: None,
        }))
    }

    /// Builds a rule from pattern text outside of any file.
    pub fn from_pattern(pattern: &str) -> Result<Self, RuleError> {
        Self::parse_line(pattern, 0)?.ok_or_else(|| RuleError::EmptyPattern {
            line: 0,
            original: pattern.to_string(),
        })
    }

    /// Renders the rule back into ignore-file syntax.
    ///
    /// The output is canonical rather than a copy of `original`: an anchored
    /// pattern gets a leading `/` only when it has no inner slash to anchor it.
    pub fn to_line(&self) -> String {
        let mut out = String::new();
        if self.negated {
            out.push('!');
        } else if self.pattern.starts_with('#') || self.pattern.starts_with('!') {
            out.push('\\');
        }
        if self.anchored && !self.pattern.contains('/') {
            out.push('/');
        }
        out.push_str(&self.pattern);
        if self.dir_only {
            out.push('/');
        }
        out
    }

    /// `true` when both rules select the same paths with the same effect,
    /// regardless of where they were written.
    pub fn same_rule(&self, other: &IgnoreRule) -> bool {
        self.pattern == other.pattern
            && self.negated == other.negated
            && self.anchored == other.anchored
            && self.dir_only == other.dir_only
    }

    /// The glob the matcher compiles for this rule, relative to the base
    /// directory of its file.
    ///
    /// Unanchored rules may match at any depth, so they get a `**/` prefix.
    /// Braces are escaped because gitignore has no alternation syntax.
    pub fn glob_text(&self) -> String {
        let escaped = escape_braces(&self.pattern);
        if self.anchored {
            escaped
        } else {
            format!("**/{escaped}")
        }
    }

    /// Literal parent directories named by an anchored pattern, shallowest
    /// first. Stops at the first component containing glob syntax.
    ///
    /// `logs/archive/*.gz` yields `["logs", "logs/archive"]`.
    pub fn literal_parent_dirs(&self) -> Vec<String> {
        if !self.anchored {
            return Vec::new();
        }
        let components: Vec<&str> = self.pattern.split('/').collect();
        let mut parents = Vec::new();
        let mut prefix = String::new();
        for component in &components[..components.len().saturating_sub(1)] {
            if component.is_empty() || has_glob_meta(component) {
                break;
            }
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            parents.push(prefix.clone());
        }
        parents
    }
}

/// `true` if the raw line ends in whitespace that git will silently drop.
pub fn has_unescaped_trailing_space(line: &str) -> bool {
    let raw = line.strip_suffix('\r').unwrap_or(line);
    !raw.trim().is_empty() && trim_trailing_spaces(raw).len() != raw.len()
}

fn trim_trailing_spaces(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b' ' {
        // An odd run of backslashes escapes the space; an even run is literal.
        let backslashes = bytes[..end - 1]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &line[..end]
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '\\'])
}

fn escape_braces(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '{' | '}' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// All rules parsed from one ignore file, together with the directory the
/// file applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFile {
    /// Where the rules came from, for reporting.
    pub source: Option<PathBuf>,
    /// Repository-relative directory the rules are evaluated against, `""`
    /// for the repository root.
    pub base: String,
    pub rules: Vec<IgnoreRule>,
}

impl RuleFile {
    /// Parses a whole file, failing on the first malformed line.
    pub fn parse(
        content: &str,
        source: Option<PathBuf>,
        base: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let (file, mut errors) = Self::parse_lenient(content, source, base);
        if errors.is_empty() {
            Ok(file)
        } else {
            Err(errors.remove(0))
        }
    }

    /// Parses a whole file, skipping malformed lines the way git does and
    /// returning them alongside the rules that did parse.
    pub fn parse_lenient(
        content: &str,
        source: Option<PathBuf>,
        base: impl Into<String>,
    ) -> (Self, Vec<RuleError>) {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            match IgnoreRule::parse_line(line, idx + 1) {
                Ok(Some(mut rule)) => {
                    rule.source = source.clone();
                    rules.push(rule);
                }
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        let base: String = base.into();
        (
            Self {
                source,
                base: base.trim_matches('/').to_string(),
                rules,
            },
            errors,
        )
    }

    /// Convenience constructor for rules that live at the repository root.
    pub fn from_patterns(patterns: &[&str]) -> Result<Self, RuleError> {
        Self::parse(&patterns.join("\n"), None, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> IgnoreRule {
        IgnoreRule::parse_line(line, 1).unwrap().unwrap()
    }

    #[test]
    fn test_blank_and_comment_lines_yield_nothing() {
        assert!(IgnoreRule::parse_line("", 1).unwrap().is_none());
        assert!(IgnoreRule::parse_line("   ", 2).unwrap().is_none());
        assert!(IgnoreRule::parse_line("# build output", 3).unwrap().is_none());
        assert!(IgnoreRule::parse_line("\r", 4).unwrap().is_none());
    }

    #[test]
    fn test_flags_are_lifted_out_of_the_pattern() {
        let rule = parse("!/build/");
        assert_eq!(rule.pattern, "build");
        assert!(rule.negated);
        assert!(rule.anchored);
        assert!(rule.dir_only);

        let rule = parse("*.log");
        assert_eq!(rule.pattern, "*.log");
        assert!(!rule.negated && !rule.anchored && !rule.dir_only);
    }

    #[test]
    fn test_inner_slash_anchors() {
        assert!(parse("docs/*.md").anchored);
        assert!(parse("**/cache").anchored);
        assert!(!parse("cache/").anchored);
    }

    #[test]
    fn test_escapes() {
        let rule = parse("\\#notes");
        assert_eq!(rule.pattern, "#notes");
        assert!(!rule.negated);

        let rule = parse("\\!important");
        assert_eq!(rule.pattern, "!important");
        assert!(!rule.negated);

        let rule = parse("trailing\\ ");
        assert_eq!(rule.pattern, "trailing\\ ");
    }

    #[test]
    fn test_trailing_whitespace_and_crlf_are_stripped() {
        let rule = parse("*.tmp   \r");
        assert_eq!(rule.pattern, "*.tmp");
        assert_eq!(rule.original, "*.tmp   ");
        assert!(has_unescaped_trailing_space("*.tmp   \r"));
        assert!(!has_unescaped_trailing_space("*.tmp"));
        assert!(!has_unescaped_trailing_space("foo\\ "));
    }

    #[test]
    fn test_escaped_backslash_does_not_protect_trailing_space() {
        assert_eq!(parse("abc\\\\ ").pattern, "abc\\\\");
        assert!(has_unescaped_trailing_space("abc\\\\ "));

        assert_eq!(parse("abc\\\\\\  ").pattern, "abc\\\\\\ ");
    }

    #[test]
    fn test_marker_only_lines_are_errors() {
        for line in ["!", "/", "!/", "//"] {
            let err = IgnoreRule::parse_line(line, 7).unwrap_err();
            assert_eq!(err.line(), 7, "line {line:?}");
        }
    }

    #[test]
    fn test_to_line_is_canonical() {
        assert_eq!(parse("/target").to_line(), "/target");
        assert_eq!(parse("/docs/build/").to_line(), "docs/build/");
        assert_eq!(parse("!*.keep").to_line(), "!*.keep");
        assert_eq!(parse("\\#hash").to_line(), "\\#hash");
    }

    #[test]
    fn test_glob_text() {
        assert_eq!(parse("*.log").glob_text(), "**/*.log");
        assert_eq!(parse("/out").glob_text(), "out");
        assert_eq!(parse("a/{b}").glob_text(), "a/\\{b\\}");
        assert_eq!(parse("[{]x").glob_text(), "**/[{]x");
    }

    #[test]
    fn test_literal_parent_dirs() {
        assert_eq!(
            parse("logs/archive/*.gz").literal_parent_dirs(),
            vec!["logs".to_string(), "logs/archive".to_string()]
        );
        assert!(parse("**/logs/x").literal_parent_dirs().is_empty());
        assert!(parse("keep.txt").literal_parent_dirs().is_empty());
    }

    #[test]
    fn test_rule_file_keeps_line_numbers_and_base() {
        let content = "# header\n\n*.log\n!keep.log\nbuild/\n";
        let file = RuleFile::parse(content, Some(PathBuf::from("sub/.gitignore")), "/sub/").unwrap();
        assert_eq!(file.base, "sub");
        let lines: Vec<usize> = file.rules.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert_eq!(
            file.rules[0].source.as_deref(),
            Some(std::path::Path::new("sub/.gitignore"))
        );
    }

    #[test]
    fn test_lenient_parse_skips_bad_lines() {
        let (file, errors) = RuleFile::parse_lenient("a\n!\nb\n", None, "");
        assert_eq!(file.rules.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 2);
        assert!(RuleFile::parse("a\n!\nb\n", None, "").is_err());
    }
}
