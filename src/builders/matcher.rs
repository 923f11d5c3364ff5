use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::builders::patterns::{IgnoreRule, RuleError, RuleFile};

/// The outcome of evaluating a path against ignore rules.
///
/// Borrowing the deciding rule lets callers report which line of which file
/// made the decision, the way `git check-ignore -v` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<'a> {
    /// No rule matched the path.
    None,
    /// A plain rule matched last; the path is ignored.
    Ignore(&'a IgnoreRule),
    /// A negated rule matched last; the path is explicitly kept.
    Whitelist(&'a IgnoreRule),
}

impl<'a> Match<'a> {
    pub fn is_none(&self) -> bool {
        matches!(self, Match::None)
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, Match::Ignore(_))
    }

    pub fn is_whitelist(&self) -> bool {
        matches!(self, Match::Whitelist(_))
    }

    /// The rule that decided this match, if any.
    pub fn rule(&self) -> Option<&'a IgnoreRule> {
        match self {
            Match::None => None,
            Match::Ignore(rule) | Match::Whitelist(rule) => Some(rule),
        }
    }
}

/// Strips `./` and leading or trailing slashes so that paths from the command
/// line line up with index paths.
pub fn normalize_path(path: &str) -> String {
    let mut trimmed = path;
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_matches('/').to_string()
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: IgnoreRule,
    matcher: GlobMatcher,
}

/// Compiles a single rule into a glob matcher.
///
/// `*` and `?` never cross a `/`, and a backslash escapes the next character,
/// matching gitignore's `fnmatch(FNM_PATHNAME)` behaviour.
pub fn compile_rule(rule: &IgnoreRule, case_insensitive: bool) -> Result<GlobMatcher, RuleError> {
    let glob_text = rule.glob_text();
    GlobBuilder::new(&glob_text)
        .literal_separator(true)
        .backslash_escape(true)
        .case_insensitive(case_insensitive)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| RuleError::InvalidGlob {
            line: rule.line,
            pattern: rule.pattern.clone(),
            message: e.to_string(),
        })
}

/// The compiled rules of one ignore file.
///
/// Rules are evaluated last to first; the first hit is the last matching rule
/// in file order, which is the one that wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    base: String,
    source: Option<PathBuf>,
    case_insensitive: bool,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compiles every rule of `file`, failing on the first invalid glob.
    pub fn new(file: RuleFile, case_insensitive: bool) -> Result<Self, RuleError> {
        let (set, mut errors) = Self::build(file, case_insensitive);
        if errors.is_empty() {
            Ok(set)
        } else {
            Err(errors.remove(0))
        }
    }

    /// Compiles what it can and hands back the rules that failed.
    pub fn build(file: RuleFile, case_insensitive: bool) -> (Self, Vec<RuleError>) {
        let mut set = Self {
            base: file.base,
            source: file.source,
            case_insensitive,
            rules: Vec::with_capacity(file.rules.len()),
        };
        let mut errors = Vec::new();
        for rule in file.rules {
            if let Err(e) = set.push_rule(rule) {
                errors.push(e);
            }
        }
        (set, errors)
    }

    /// Empty rule set rooted at `base`.
    pub fn empty(base: &str, case_insensitive: bool) -> Self {
        Self {
            base: base.trim_matches('/').to_string(),
            source: None,
            case_insensitive,
            rules: Vec::new(),
        }
    }

    /// Appends a rule. It overrides every rule already in the set.
    pub fn push_rule(&mut self, rule: IgnoreRule) -> Result<(), RuleError> {
        let matcher = compile_rule(&rule, self.case_insensitive)?;
        self.push_compiled(rule, matcher);
        Ok(())
    }

    /// Appends a rule whose matcher was already built by [`compile_rule`]
    /// with this set's case sensitivity.
    pub fn push_compiled(&mut self, rule: IgnoreRule, matcher: GlobMatcher) {
        self.rules.push(CompiledRule { rule, matcher });
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &IgnoreRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Evaluates a single repository-relative path against this set only.
    ///
    /// Parent directories are not consulted; see
    /// [`IgnoreStack::matched_path_or_any_parents`] for that.
    pub fn matched(&self, path: &str, is_dir: bool) -> Match<'_> {
        let path = normalize_path(path);
        let Some(relative) = self.relative(&path) else {
            return Match::None;
        };
        if relative.is_empty() {
            return Match::None;
        }

        for compiled in self.rules.iter().rev() {
            if compiled.rule.dir_only && !is_dir {
                continue;
            }
            if compiled.matcher.is_match(relative) {
                trace!(path = %path, rule = %compiled.rule, "rule matched");
                return if compiled.rule.negated {
                    Match::Whitelist(&compiled.rule)
                } else {
                    Match::Ignore(&compiled.rule)
                };
            }
        }
        Match::None
    }

    fn relative<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.base.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

/// Rule sets layered by precedence, lowest first.
///
/// The engine pushes global extras, then `.git/info/exclude`, then each
/// `.gitignore` from the root downwards, so a deeper file overrides a
/// shallower one.
#[derive(Debug, Clone, Default)]
pub struct IgnoreStack {
    sets: Vec<RuleSet>,
}

impl IgnoreStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a set that takes precedence over every set already pushed.
    pub fn push(&mut self, set: RuleSet) {
        self.sets.push(set);
    }

    pub fn sets(&self) -> &[RuleSet] {
        &self.sets
    }

    pub fn rule_count(&self) -> usize {
        self.sets.iter().map(RuleSet::len).sum()
    }

    /// Evaluates `path` without looking at its parents. The highest
    /// precedence set with an opinion decides.
    pub fn matched(&self, path: &str, is_dir: bool) -> Match<'_> {
        for set in self.sets.iter().rev() {
            let m = set.matched(path, is_dir);
            if !m.is_none() {
                return m;
            }
        }
        Match::None
    }

    /// Evaluates `path` the way git decides whether to track it.
    ///
    /// If any parent directory is ignored, git never looks inside it, so a
    /// later negation cannot re-include the path and the parent's decision
    /// is returned.
    pub fn matched_path_or_any_parents(&self, path: &str, is_dir: bool) -> Match<'_> {
        let path = normalize_path(path);
        for (idx, _) in path.match_indices('/') {
            let parent = &path[..idx];
            let m = self.matched(parent, true);
            if m.is_ignore() {
                return m;
            }
        }
        self.matched(&path, is_dir)
    }

    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        self.matched_path_or_any_parents(path, is_dir).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_set(patterns: &[&str]) -> RuleSet {
        RuleSet::new(RuleFile::from_patterns(patterns).unwrap(), false).unwrap()
    }

    fn stack(patterns: &[&str]) -> IgnoreStack {
        let mut stack = IgnoreStack::new();
        stack.push(root_set(patterns));
        stack
    }

    #[test]
    fn test_unanchored_matches_at_any_depth() {
        let set = root_set(&["*.log"]);
        assert!(set.matched("debug.log", false).is_ignore());
        assert!(set.matched("a/b/debug.log", false).is_ignore());
        assert!(set.matched("debug.txt", false).is_none());
    }

    #[test]
    fn test_anchored_matches_only_at_base() {
        let set = root_set(&["/target"]);
        assert!(set.matched("target", true).is_ignore());
        assert!(set.matched("crates/a/target", true).is_none());

        let set = root_set(&["docs/*.md"]);
        assert!(set.matched("docs/intro.md", false).is_ignore());
        assert!(set.matched("sub/docs/intro.md", false).is_none());
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let set = root_set(&["docs/*.md"]);
        assert!(set.matched("docs/deep/intro.md", false).is_none());

        let set = root_set(&["docs/**/*.md"]);
        assert!(set.matched("docs/deep/intro.md", false).is_ignore());
        assert!(set.matched("docs/intro.md", false).is_ignore());
    }

    #[test]
    fn test_dir_only_rules_skip_files() {
        let set = root_set(&["build/"]);
        assert!(set.matched("build", true).is_ignore());
        assert!(set.matched("build", false).is_none());
    }

    #[test]
    fn test_last_match_wins() {
        let set = root_set(&["*.log", "!important.log"]);
        assert!(set.matched("important.log", false).is_whitelist());
        assert!(set.matched("other.log", false).is_ignore());

        let set = root_set(&["!important.log", "*.log"]);
        assert!(set.matched("important.log", false).is_ignore());
    }

    #[test]
    fn test_negation_cannot_escape_excluded_parent() {
        let stack = stack(&["logs/", "!logs/keep.txt"]);
        let m = stack.matched_path_or_any_parents("logs/keep.txt", false);
        assert!(m.is_ignore());
        assert_eq!(m.rule().unwrap().line, 1);
    }

    #[test]
    fn test_negation_works_when_only_contents_excluded() {
        let stack = stack(&["logs/*", "!logs/keep.txt"]);
        assert!(!stack.is_ignored("logs/keep.txt", false));
        assert!(stack.is_ignored("logs/other.txt", false));
    }

    #[test]
    fn test_directory_rule_covers_contents() {
        let stack = stack(&["node_modules"]);
        assert!(stack.is_ignored("web/node_modules/react/index.js", false));
        assert!(!stack.is_ignored("web/src/index.js", false));
    }

    #[test]
    fn test_nested_base_and_precedence() {
        let mut stack = IgnoreStack::new();
        stack.push(root_set(&["*.dat"]));
        let nested = RuleFile::parse("!keep.dat\n/local", None, "data").unwrap();
        stack.push(RuleSet::new(nested, false).unwrap());

        assert!(stack.is_ignored("other/x.dat", false));
        assert!(!stack.is_ignored("data/keep.dat", false));
        assert!(stack.is_ignored("data/local", false));
        assert!(!stack.is_ignored("local", false));
    }

    #[test]
    fn test_case_insensitive() {
        let file = RuleFile::from_patterns(&["*.LOG"]).unwrap();
        let set = RuleSet::new(file.clone(), true).unwrap();
        assert!(set.matched("debug.log", false).is_ignore());
        let set = RuleSet::new(file, false).unwrap();
        assert!(set.matched("debug.log", false).is_none());
    }

    #[test]
    fn test_invalid_glob_is_reported_with_line() {
        let file = RuleFile::from_patterns(&["ok", "bad[", "also-ok"]).unwrap();
        let (set, errors) = RuleSet::build(file, false);
        assert_eq!(set.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 2);
    }

    #[test]
    fn test_braces_are_literal() {
        let set = root_set(&["{a,b}.txt"]);
        assert!(set.matched("{a,b}.txt", false).is_ignore());
        assert!(set.matched("a.txt", false).is_none());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_path("/build/"), "build");
        assert_eq!(normalize_path("././a/b"), "a/b");
    }
}
