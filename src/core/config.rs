use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::builders::importer::{FileImporter, PatternImporter, RuleFormat, export_rules, merge_rules};
use crate::builders::patterns::{IgnoreRule, RuleFile};
use crate::builders::validator::{ConfigValidator, StandardValidator};

/// The only config layout this build understands.
pub const CONFIG_VERSION: &str = "1.0";

/// Name of the config file inside the `.git` directory.
pub const CONFIG_FILE_NAME: &str = "ignore-rules.toml";

/// Ignore file edited when a command does not name one.
pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalSettings {
    /// Match paths without regard to case, like `core.ignorecase`.
    pub case_insensitive: bool,
    /// Read `.git/info/exclude` as a lower-precedence rule source.
    pub include_info_exclude: bool,
    /// Make `lint` fail on warnings, not just errors.
    pub fail_on_warnings: bool,
    pub verbose: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            include_info_exclude: true,
            fail_on_warnings: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct IgnoreRulesConfig {
    pub version: String,
    /// Repository-relative ignore files read in addition to every tracked
    /// `.gitignore`.
    pub ignore_files: Vec<String>,
    /// Rule files applied below everything else, the way `core.excludesFile`
    /// is. Relative paths resolve against the repository root.
    pub extra_rules: Vec<String>,
    pub global_settings: GlobalSettings,
}

impl Default for IgnoreRulesConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            ignore_files: vec![DEFAULT_IGNORE_FILE.to_string()],
            extra_rules: Vec::new(),
            global_settings: GlobalSettings::default(),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    repo_root: PathBuf,
}

impl ConfigManager {
    /// Locates the repository by walking up from the current directory.
    pub fn new() -> Result<Self> {
        let repo_root = find_git_root()?;
        Ok(Self::new_at(repo_root))
    }

    /// Uses a known repository root.
    pub fn new_at(repo_root: PathBuf) -> Self {
        let config_path = repo_root.join(".git").join(CONFIG_FILE_NAME);
        Self {
            config_path,
            repo_root,
        }
    }

    pub fn initialize(&self) -> Result<()> {
        if self.config_path.exists() {
            debug!(path = %self.config_path.display(), "config already present");
            return Ok(());
        }

        let default_config = IgnoreRulesConfig::default();
        self.save_config(&default_config)?;
        info!(path = %self.config_path.display(), "wrote default config");
        Ok(())
    }

    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new();
        let issues = validator.validate_config(&config, &self.repo_root)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    /// Absolute path of an ignore file named relative to the repository root,
    /// falling back to the root `.gitignore`.
    pub fn ignore_file_path(&self, file: Option<&str>) -> PathBuf {
        self.repo_root.join(file.unwrap_or(DEFAULT_IGNORE_FILE))
    }

    /// Reads and parses an ignore file. A missing file yields no rules.
    pub fn read_rule_file(&self, file: Option<&str>) -> Result<(RuleFile, String)> {
        let path = self.ignore_file_path(file);
        let content = if path.exists() {
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        } else {
            String::new()
        };
        let relative = file.unwrap_or(DEFAULT_IGNORE_FILE);
        let base = Path::new(relative)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (rules, errors) =
            RuleFile::parse_lenient(&content, Some(PathBuf::from(relative)), base);
        for e in errors {
            debug!(file = relative, error = %e, "skipping malformed line");
        }
        Ok((rules, content))
    }

    /// Appends `pattern` to an ignore file. Returns `false` when an equivalent
    /// rule is already present.
    pub fn add_pattern(&self, file: Option<&str>, pattern: &str) -> Result<bool> {
        let rule = IgnoreRule::from_pattern(pattern)
            .with_context(|| format!("Refusing to add `{pattern}`"))?;
        let (existing, content) = self.read_rule_file(file)?;

        let (updated, added) = merge_rules(&content, &existing, std::slice::from_ref(&rule));
        if added == 0 {
            return Ok(false);
        }

        let path = self.ignore_file_path(file);
        fs::write(&path, updated)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(file = %path.display(), pattern, "added rule");
        Ok(true)
    }

    /// Removes every line whose rule is equivalent to `pattern`. Comments and
    /// unrelated lines are left untouched. Returns the number of lines removed.
    pub fn remove_pattern(&self, file: Option<&str>, pattern: &str) -> Result<usize> {
        let target = IgnoreRule::from_pattern(pattern)
            .with_context(|| format!("`{pattern}` is not a rule"))?;
        let path = self.ignore_file_path(file);
        if !path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut removed = 0;
        let kept: Vec<&str> = content
            .lines()
            .filter(|line| match IgnoreRule::parse_line(line, 0) {
                Ok(Some(rule)) if rule.same_rule(&target) => {
                    removed += 1;
                    false
                }
                _ => true,
            })
            .collect();

        if removed > 0 {
            let mut updated = kept.join("\n");
            if !updated.is_empty() {
                updated.push('\n');
            }
            fs::write(&path, updated)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(file = %path.display(), pattern, removed, "removed rule");
        }
        Ok(removed)
    }

    pub fn list_patterns(&self, file: Option<&str>) -> Result<()> {
        let (rule_file, _) = self.read_rule_file(file)?;
        let name = file.unwrap_or(DEFAULT_IGNORE_FILE);

        if rule_file.rules.is_empty() {
            println!("No ignore patterns in {name}.");
            return Ok(());
        }

        println!("\n📁 File: {name}");
        for rule in &rule_file.rules {
            let mut flags = Vec::new();
            if rule.negated {
                flags.push("negated");
            }
            if rule.anchored {
                flags.push("anchored");
            }
            if rule.dir_only {
                flags.push("dir-only");
            }
            println!(
                "  {:>4} | {} | [{}]",
                rule.line,
                rule.original,
                flags.join(", ")
            );
        }
        Ok(())
    }

    /// Imports rules from `source` and appends the new ones to `target`.
    /// Returns the number of rules added.
    pub fn import_patterns(
        &self,
        source: &Path,
        format: RuleFormat,
        target: Option<&str>,
    ) -> Result<usize> {
        let mut importer = FileImporter::new();
        let imported = importer.import_from_file(source, format)?;

        let (existing, content) = self.read_rule_file(target)?;
        let (updated, added) = merge_rules(&content, &existing, &imported);
        if added > 0 {
            let path = self.ignore_file_path(target);
            fs::write(&path, updated)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        info!(source = %source.display(), added, skipped = imported.len() - added, "imported rules");
        Ok(added)
    }

    pub fn export_patterns(
        &self,
        output: &Path,
        format: RuleFormat,
        file: Option<&str>,
    ) -> Result<()> {
        let (rule_file, _) = self.read_rule_file(file)?;
        let content = export_rules(&rule_file, file.unwrap_or(DEFAULT_IGNORE_FILE), format)?;
        fs::write(output, content).context("Failed to write export file")?;
        Ok(())
    }

    pub fn get_repo_root(&self) -> &Path {
        &self.repo_root
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<IgnoreRulesConfig>;
    fn save_config(&self, config: &IgnoreRulesConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<IgnoreRulesConfig> {
        if !self.config_path.exists() {
            return Ok(IgnoreRulesConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &IgnoreRulesConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}

fn find_git_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    let mut dir = current_dir.as_path();

    loop {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => anyhow::bail!("Not in a Git repository"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manager() -> (tempfile::TempDir, ConfigManager) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf());
        (dir, manager)
    }

    #[test]
    fn test_missing_config_loads_default() {
        let (_dir, manager) = manager();
        assert_eq!(manager.load_config().unwrap(), IgnoreRulesConfig::default());
    }

    #[test]
    fn test_initialize_round_trips_through_toml() {
        let (_dir, manager) = manager();
        manager.initialize().unwrap();
        assert!(manager.get_config_path().unwrap().exists());
        assert_eq!(manager.load_config().unwrap(), IgnoreRulesConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let (_dir, manager) = manager();
        fs::write(
            manager.get_config_path().unwrap(),
            "version = \"1.0\"\n[global_settings]\ncase_insensitive = true\n",
        )
        .unwrap();
        let config = manager.load_config().unwrap();
        assert!(config.global_settings.case_insensitive);
        assert!(config.global_settings.include_info_exclude);
        assert_eq!(config.ignore_files, vec![".gitignore".to_string()]);
    }

    #[test]
    fn test_add_and_remove_pattern() {
        let (dir, manager) = manager();
        fs::write(dir.path().join(".gitignore"), "# deps\nnode_modules/").unwrap();

        assert!(manager.add_pattern(None, "*.log").unwrap());
        assert!(!manager.add_pattern(None, "*.log").unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join(".gitignore")).unwrap(),
            "# deps\nnode_modules/\n*.log\n"
        );

        assert_eq!(manager.remove_pattern(None, "node_modules/").unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join(".gitignore")).unwrap(),
            "# deps\n*.log\n"
        );
        assert_eq!(manager.remove_pattern(None, "missing").unwrap(), 0);
    }

    #[test]
    fn test_add_rejects_comments() {
        let (_dir, manager) = manager();
        assert!(manager.add_pattern(None, "# not a rule").is_err());
        assert!(manager.add_pattern(None, "!").is_err());
    }

    #[test]
    fn test_nested_file_base() {
        let (dir, manager) = manager();
        fs::create_dir_all(dir.path().join("web")).unwrap();
        fs::write(dir.path().join("web/.gitignore"), "dist/\n").unwrap();
        let (rules, _) = manager.read_rule_file(Some("web/.gitignore")).unwrap();
        assert_eq!(rules.base, "web");
        assert_eq!(rules.rules.len(), 1);
    }
}
