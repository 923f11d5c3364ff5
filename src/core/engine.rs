use crate::builders::matcher::{IgnoreStack, Match, RuleSet, normalize_path};
use crate::builders::patterns::RuleFile;
use crate::builders::validator::{LintIssue, RuleValidator, StandardValidator};
use crate::core::config::{ConfigManager, ConfigProvider, IgnoreRulesConfig};
use crate::core::git::{Git2Client, GitClient};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Display name used for the repository-local exclude file.
pub const INFO_EXCLUDE: &str = ".git/info/exclude";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckOutcome {
    Ignored,
    /// A negated rule matched last, so the path is kept.
    Whitelisted,
    NotMatched,
}

/// Where the deciding rule lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleLocation {
    pub source: String,
    pub line: usize,
    pub pattern: String,
}

/// Decision for one path, with the rule that made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub path: String,
    pub outcome: CheckOutcome,
    pub rule: Option<RuleLocation>,
}

impl CheckResult {
    fn from_match(path: String, m: Match<'_>) -> Self {
        let outcome = match m {
            Match::None => CheckOutcome::NotMatched,
            Match::Ignore(_) => CheckOutcome::Ignored,
            Match::Whitelist(_) => CheckOutcome::Whitelisted,
        };
        let rule = m.rule().map(|r| RuleLocation {
            source: r
                .source
                .as_ref()
                .map(|s| s.display().to_string())
                .unwrap_or_default(),
            line: r.line,
            pattern: r.to_string(),
        });
        Self {
            path,
            outcome,
            rule,
        }
    }

    pub fn is_ignored(&self) -> bool {
        self.outcome == CheckOutcome::Ignored
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub tracked_files: usize,
    pub ignore_files: Vec<String>,
    pub rule_count: usize,
    /// Tracked files the current rules would ignore if they were new.
    pub tracked_ignored: Vec<CheckResult>,
}

/// A tracked path on which our evaluation and libgit2 disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Disagreement {
    pub path: String,
    pub ours: bool,
    pub git: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossCheck {
    pub checked: usize,
    pub disagreements: Vec<Disagreement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLint {
    pub source: String,
    pub issues: Vec<LintIssue>,
}

struct LoadedFile {
    display: String,
    base: String,
    content: String,
}

pub struct IgnoreEngine {
    config: IgnoreRulesConfig,
    git: Box<dyn GitClient>,
    stack: IgnoreStack,
    loaded: Vec<LoadedFile>,
}

impl IgnoreEngine {
    pub fn new(config_manager: ConfigManager) -> Result<Self> {
        let git = Git2Client::new(config_manager.get_repo_root())?;
        Self::with_client(config_manager, Box::new(git))
    }

    /// Builds the engine on top of any [`GitClient`].
    ///
    /// Rule sources are layered lowest precedence first: configured extra
    /// rules, `.git/info/exclude`, then `.gitignore` files from the root down.
    pub fn with_client(config_manager: ConfigManager, git: Box<dyn GitClient>) -> Result<Self> {
        let config = config_manager.load_config()?;
        let mut engine = Self {
            config,
            git,
            stack: IgnoreStack::new(),
            loaded: Vec::new(),
        };

        let repo_root = config_manager.get_repo_root().to_path_buf();
        for extra in engine.config.extra_rules.clone() {
            let path = repo_root.join(&extra);
            match std::fs::read_to_string(&path) {
                Ok(content) => engine.load(extra, content, String::new()),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping extra rule file"),
            }
        }

        if engine.config.global_settings.include_info_exclude {
            let path = engine.git.get_git_dir().join("info").join("exclude");
            if let Ok(content) = std::fs::read_to_string(&path) {
                engine.load(INFO_EXCLUDE.to_string(), content, String::new());
            }
        }

        engine.load_working_tree_rules();

        debug!(
            files = engine.loaded.len(),
            rules = engine.stack.rule_count(),
            "ignore stack ready"
        );
        Ok(engine)
    }

    /// Walks the working tree the way git does: a directory's rule files are
    /// loaded before its subdirectories are entered, and directories the
    /// rules so far exclude are not entered at all. Rule files are every
    /// `.gitignore` plus the configured `ignore_files`, tracked or not.
    fn load_working_tree_rules(&mut self) {
        let root = self.git.get_repo_root();
        let configured: BTreeSet<String> = self
            .config
            .ignore_files
            .iter()
            .map(|f| normalize_path(f))
            .collect();

        let mut walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by(|a, b| {
                (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
            })
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");

            if entry.file_type().is_dir() {
                if entry.file_name() == OsStr::new(".git") || self.stack.is_ignored(&relative, true) {
                    walker.skip_current_dir();
                }
                continue;
            }

            if entry.file_name() != OsStr::new(".gitignore") && !configured.contains(&relative) {
                continue;
            }
            match self.git.read_working_file(Path::new(&relative)) {
                Ok(content) => {
                    let base = parent_dir(&relative);
                    self.load(relative, content, base);
                }
                Err(e) => warn!(file = %relative, error = %e, "skipping unreadable ignore file"),
            }
        }
    }

    fn load(&mut self, name: String, content: String, base: String) {
        let case_insensitive = self.config.global_settings.case_insensitive;
        let (file, parse_errors) =
            RuleFile::parse_lenient(&content, Some(PathBuf::from(&name)), base.clone());
        let (set, compile_errors) = RuleSet::build(file, case_insensitive);

        for e in parse_errors.iter().chain(&compile_errors) {
            warn!(file = %name, error = %e, "ignoring malformed rule");
        }
        debug!(file = %name, base = set.base(), rules = set.len(), "loaded rules");

        self.stack.push(set);
        self.loaded.push(LoadedFile {
            display: name,
            base,
            content,
        });
    }

    pub fn config(&self) -> &IgnoreRulesConfig {
        &self.config
    }

    pub fn stack(&self) -> &IgnoreStack {
        &self.stack
    }

    /// Display names of every rule source, lowest precedence first.
    pub fn sources(&self) -> Vec<String> {
        self.loaded.iter().map(|f| f.display.clone()).collect()
    }

    /// Converts a command-line path into a repository-relative one.
    fn relativize(&self, path: &str) -> String {
        let root = self.git.get_repo_root();
        match Path::new(path).strip_prefix(&root) {
            Ok(relative) => normalize_path(&relative.to_string_lossy()),
            Err(_) => normalize_path(path),
        }
    }

    /// Decides each path the way `git check-ignore -v --no-index` would.
    ///
    /// A path is treated as a directory if `force_dir` is set, it ends with
    /// `/`, or it is a directory in the working tree.
    pub fn check_paths(&self, paths: &[String], force_dir: bool) -> Vec<CheckResult> {
        paths
            .iter()
            .map(|raw| {
                let relative = self.relativize(raw);
                let is_dir = force_dir
                    || raw.ends_with('/')
                    || self.git.get_repo_root().join(&relative).is_dir();
                let m = self.stack.matched_path_or_any_parents(&relative, is_dir);
                CheckResult::from_match(relative, m)
            })
            .collect()
    }

    /// Reports tracked files that the rules would ignore.
    pub fn collect_status(&self) -> Result<StatusSummary> {
        let tracked = self.git.get_tracked_files()?;
        let tracked_ignored: Vec<CheckResult> = tracked
            .iter()
            .filter_map(|path| {
                let m = self.stack.matched_path_or_any_parents(path, false);
                m.is_ignore()
                    .then(|| CheckResult::from_match(path.clone(), m))
            })
            .collect();

        Ok(StatusSummary {
            tracked_files: tracked.len(),
            ignore_files: self.sources(),
            rule_count: self.stack.rule_count(),
            tracked_ignored,
        })
    }

    /// Fails if any staged addition or modification matches an ignore rule.
    /// Run from the pre-commit hook to catch `git add -f` accidents.
    pub fn verify_staging(&self) -> Result<()> {
        let staged = self.git.get_staged_files()?;
        let offenders: Vec<CheckResult> = staged
            .iter()
            .filter_map(|path| {
                let path = path.to_string_lossy().into_owned();
                let m = self.stack.matched_path_or_any_parents(&path, false);
                m.is_ignore().then(|| CheckResult::from_match(path, m))
            })
            .collect();

        if offenders.is_empty() {
            info!(staged = staged.len(), "no staged file matches an ignore rule");
            return Ok(());
        }

        let details: Vec<String> = offenders
            .iter()
            .map(|r| match &r.rule {
                Some(rule) => format!("{} ({}:{}: {})", r.path, rule.source, rule.line, rule.pattern),
                None => r.path.clone(),
            })
            .collect();
        anyhow::bail!(
            "{} staged file(s) match ignore rules:\n  {}",
            offenders.len(),
            details.join("\n  ")
        );
    }

    /// Compares our decision with libgit2's for every tracked file.
    pub fn cross_check(&self) -> Result<CrossCheck> {
        let tracked = self.git.get_tracked_files()?;
        let checked = tracked.len();
        let mut disagreements = Vec::new();
        for path in tracked {
            let ours = self.stack.is_ignored(&path, false);
            let git = self.git.is_path_ignored(Path::new(&path))?;
            if ours != git {
                debug!(path = %path, ours, git, "decision differs from libgit2");
                disagreements.push(Disagreement { path, ours, git });
            }
        }
        Ok(CrossCheck {
            checked,
            disagreements,
        })
    }

    /// Runs the static check over every loaded rule source. Sources without
    /// findings are omitted.
    pub fn lint(&self) -> Vec<FileLint> {
        self.loaded
            .iter()
            .filter_map(|file| {
                let issues = StandardValidator::new()
                    .with_case_insensitive(self.config.global_settings.case_insensitive)
                    .with_nested(!file.base.is_empty())
                    .validate_file(&file.content);
                (!issues.is_empty()).then(|| FileLint {
                    source: file.display.clone(),
                    issues,
                })
            })
            .collect()
    }
}

fn parent_dir(file: &str) -> String {
    match file.rfind('/') {
        Some(idx) => file[..idx].to_string(),
        None => String::new(),
    }
}
