use crate::builders::hooks;
use crate::builders::importer::RuleFormat;
use crate::builders::reporter::{ConsoleReporter, StatusReporter};
use crate::builders::validator::{RuleValidator, Severity, StandardValidator};
use crate::core::config::{ConfigManager, ConfigProvider, DEFAULT_IGNORE_FILE};
use crate::core::engine::{FileLint, IgnoreEngine};
use crate::core::git::{Git2Client, GitClient};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;

pub fn initialize_repository() -> Result<()> {
    let config_manager = get_config_manager()?;
    config_manager.initialize()?;
    println!("✓ Initialized ignore rules for this repository");
    println!("Run 'git-ignore-rules install-hooks' to block commits of ignored files");
    Ok(())
}

pub fn install_hooks() -> Result<()> {
    let git = open_git()?;
    hooks::install_git_hooks(&git.get_git_dir())?;
    println!("✓ Installed Git hooks for automatic verification");
    Ok(())
}

pub fn uninstall_hooks() -> Result<()> {
    let git = open_git()?;
    hooks::uninstall_git_hooks(&git.get_git_dir())?;
    println!("✓ Removed Git hooks");
    Ok(())
}

pub fn validate_config() -> Result<()> {
    get_config_manager()?.validate_config()
}

/// Exit status follows `git check-ignore`: success when at least one path
/// is ignored, failure otherwise.
pub fn check_paths(paths: &[String], dir: bool, verbose: bool) -> Result<ExitCode> {
    let engine = get_engine()?;
    let results = engine.check_paths(paths, dir);
    ConsoleReporter::new().report_checks(&results, verbose);

    if results.iter().any(|r| r.is_ignored()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Lints a single file when one is named, otherwise every rule source the
/// engine loads.
pub fn lint(file: Option<&str>) -> Result<ExitCode> {
    let config_manager = get_config_manager()?;
    let settings = config_manager.load_config()?.global_settings;

    let files = match file {
        Some(name) => {
            let path = config_manager.ignore_file_path(Some(name));
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let issues = StandardValidator::new()
                .with_case_insensitive(settings.case_insensitive)
                .validate_file(&content);
            if issues.is_empty() {
                Vec::new()
            } else {
                vec![FileLint {
                    source: name.to_string(),
                    issues,
                }]
            }
        }
        None => IgnoreEngine::new(config_manager)?.lint(),
    };

    ConsoleReporter::new().report_lint(&files);
    Ok(lint_exit_code(&files, settings.fail_on_warnings))
}

pub fn lint_exit_code(files: &[FileLint], fail_on_warnings: bool) -> ExitCode {
    let failing = files.iter().flat_map(|f| &f.issues).any(|issue| {
        issue.severity == Severity::Error || (fail_on_warnings && issue.severity == Severity::Warning)
    });
    if failing {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

pub fn show_status(verbose: bool) -> Result<()> {
    let engine = get_engine()?;
    let summary = engine.collect_status()?;
    let verbose = verbose || engine.config().global_settings.verbose;
    ConsoleReporter::new().generate_status_report(&summary, verbose);
    Ok(())
}

pub fn verify() -> Result<()> {
    get_engine()?.verify_staging()?;
    println!("✓ No staged file matches an ignore rule");
    Ok(())
}

pub fn cross_check() -> Result<ExitCode> {
    let report = get_engine()?.cross_check()?;
    ConsoleReporter::new().report_cross_check(&report);
    if report.disagreements.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

pub fn add_pattern(pattern: &str, file: Option<&str>) -> Result<()> {
    let target = file.unwrap_or(DEFAULT_IGNORE_FILE);
    if get_config_manager()?.add_pattern(file, pattern)? {
        println!("✓ Added `{pattern}` to {target}");
    } else {
        println!("ℹ️  `{pattern}` is already in {target}");
    }
    Ok(())
}

pub fn remove_pattern(pattern: &str, file: Option<&str>) -> Result<()> {
    let target = file.unwrap_or(DEFAULT_IGNORE_FILE);
    let removed = get_config_manager()?.remove_pattern(file, pattern)?;
    if removed == 0 {
        println!("ℹ️  `{pattern}` not found in {target}");
    } else {
        println!("✓ Removed {removed} line(s) matching `{pattern}` from {target}");
    }
    Ok(())
}

pub fn list_patterns(file: Option<&str>) -> Result<()> {
    get_config_manager()?.list_patterns(file)
}

pub fn import_patterns(source: &Path, format: Option<RuleFormat>, file: Option<&str>) -> Result<()> {
    let format = format.unwrap_or_else(|| RuleFormat::from_path(source));
    let added = get_config_manager()?.import_patterns(source, format, file)?;
    println!(
        "✓ Imported {added} new rule(s) into {}",
        file.unwrap_or(DEFAULT_IGNORE_FILE)
    );
    Ok(())
}

pub fn export_patterns(output: &Path, format: Option<RuleFormat>, file: Option<&str>) -> Result<()> {
    let format = format.unwrap_or_else(|| RuleFormat::from_path(output));
    get_config_manager()?.export_patterns(output, format, file)?;
    println!("✓ Exported rules to {}", output.display());
    Ok(())
}

// Helper function to create ConfigManager instance
fn get_config_manager() -> Result<ConfigManager> {
    ConfigManager::new()
}

fn get_engine() -> Result<IgnoreEngine> {
    IgnoreEngine::new(get_config_manager()?)
}

fn open_git() -> Result<Git2Client> {
    let config_manager = get_config_manager()?;
    Git2Client::new(config_manager.get_repo_root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::validator::LintIssue;

    fn lint_with(severity: Severity) -> Vec<FileLint> {
        vec![FileLint {
            source: ".gitignore".to_string(),
            issues: vec![LintIssue {
                line: 1,
                severity,
                message: "x".to_string(),
            }],
        }]
    }

    #[test]
    fn test_lint_exit_code() {
        assert_eq!(lint_exit_code(&[], true), ExitCode::SUCCESS);
        assert_eq!(lint_exit_code(&lint_with(Severity::Error), false), ExitCode::FAILURE);
        assert_eq!(lint_exit_code(&lint_with(Severity::Warning), false), ExitCode::SUCCESS);
        assert_eq!(lint_exit_code(&lint_with(Severity::Warning), true), ExitCode::FAILURE);
    }
}
