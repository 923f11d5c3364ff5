use crate::builders::validator::Severity;
use crate::core::engine::{CheckOutcome, CheckResult, CrossCheck, FileLint, StatusSummary};

/// Output side of every read-only command.
pub trait StatusReporter {
    fn report_checks(&self, results: &[CheckResult], verbose: bool);
    fn generate_status_report(&self, summary: &StatusSummary, verbose: bool);
    fn report_lint(&self, files: &[FileLint]);
    fn report_cross_check(&self, report: &CrossCheck);
}

/// A concrete implementation of `StatusReporter` that prints to the console.
pub struct ConsoleReporter;

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    /// Constructs a new `ConsoleReporter` instance.
    pub fn new() -> Self {
        Self
    }

    /// Formats one decision in `git check-ignore -v` style:
    /// `source:line:pattern<TAB>path`. Unmatched paths print `::<TAB>path`.
    pub fn format_check(result: &CheckResult) -> String {
        match &result.rule {
            Some(rule) => format!("{}:{}:{}\t{}", rule.source, rule.line, rule.pattern, result.path),
            None => format!("::\t{}", result.path),
        }
    }

    pub fn format_lint(file: &FileLint) -> Vec<String> {
        file.issues
            .iter()
            .map(|issue| {
                let icon = match issue.severity {
                    Severity::Error => "❌",
                    Severity::Warning => "⚠️ ",
                };
                format!("{icon} {}:{}: {}: {}", file.source, issue.line, issue.severity, issue.message)
            })
            .collect()
    }
}

impl StatusReporter for ConsoleReporter {
    /// Without `verbose` only ignored paths are printed, one per line, like
    /// plain `git check-ignore`.
    fn report_checks(&self, results: &[CheckResult], verbose: bool) {
        for result in results {
            if verbose {
                println!("{}", Self::format_check(result));
            } else if result.outcome == CheckOutcome::Ignored {
                println!("{}", result.path);
            }
        }
    }

    fn generate_status_report(&self, summary: &StatusSummary, verbose: bool) {
        println!("📊 Ignore Rules Status Report");
        println!("=============================");

        if summary.ignore_files.is_empty() {
            println!("No ignore files found.");
        } else {
            for source in &summary.ignore_files {
                println!("📁 {source}");
            }
        }

        if summary.tracked_ignored.is_empty() {
            println!("\n🟢 No tracked file matches an ignore rule.");
        } else {
            println!("\n🟡 Tracked files matching ignore rules:");
            for result in &summary.tracked_ignored {
                if verbose {
                    println!("  {}", Self::format_check(result));
                } else {
                    println!("  {}", result.path);
                }
            }
        }

        println!("\n📈 Summary:");
        println!("  Rule files: {}", summary.ignore_files.len());
        println!("  Total rules: {}", summary.rule_count);
        println!("  Tracked files: {}", summary.tracked_files);
        println!("  Tracked but ignored: {}", summary.tracked_ignored.len());

        if !summary.tracked_ignored.is_empty() && !verbose {
            println!("\n⚠️  Run with --verbose to see which rule matched each file");
        }
    }

    fn report_lint(&self, files: &[FileLint]) {
        if files.is_empty() {
            println!("✓ No issues found.");
            return;
        }
        for file in files {
            for line in Self::format_lint(file) {
                println!("{line}");
            }
        }
    }

    fn report_cross_check(&self, report: &CrossCheck) {
        let checked = report.checked;
        let disagreements = &report.disagreements;
        if disagreements.is_empty() {
            println!("✓ All {checked} tracked files agree with libgit2.");
            return;
        }
        println!("⚠️  {} of {checked} tracked files disagree with libgit2:", disagreements.len());
        for d in disagreements {
            let verdict = |ignored: bool| if ignored { "ignored" } else { "kept" };
            println!("  {} (ours: {}, libgit2: {})", d.path, verdict(d.ours), verdict(d.git));
        }
    }
}
