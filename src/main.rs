/// The Big IDEA:
/// A `.gitignore` is plain text that git interprets silently. A typo, a
/// stray trailing space, or a negation under an already-excluded directory
/// just does nothing, and a forced `git add` of an ignored file goes
/// unnoticed. This tool parses the rules the same way git does, tells you
/// which line decided each path, lints the files, and can refuse commits
/// that stage ignored files.
use anyhow::Result;
use clap::{Parser, Subcommand};
use git_ignore_rules::builders::importer::RuleFormat;
use git_ignore_rules::utils;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "git-ignore-rules")]
#[command(about = "Parse, lint and evaluate gitignore rules in a Git repository")]
struct Cli {
    /// Print debug logs and per-rule detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ignore-rules config for this repository
    Init,
    /// Install the pre-commit hook that runs `verify`
    InstallHooks,
    /// Remove the pre-commit hook and restore any previous one
    UninstallHooks,
    /// Check the tool's own configuration
    ValidateConfig,
    /// Show which rule, if any, decides each path (paths are repository-relative)
    Check {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Treat every path as a directory
        #[arg(long)]
        dir: bool,
    },
    /// Statically check ignore files for mistakes
    Lint {
        /// A single ignore file to check; defaults to every loaded rule source
        file: Option<String>,
    },
    /// Report tracked files that the ignore rules would exclude
    Status,
    /// Fail if any staged file matches an ignore rule
    Verify,
    /// Compare decisions for tracked files against libgit2
    CrossCheck,
    /// Append a rule to an ignore file
    Add {
        pattern: String,
        /// Ignore file to edit, relative to the repository root
        #[arg(long)]
        file: Option<String>,
    },
    /// Remove every line equivalent to a rule from an ignore file
    Remove {
        pattern: String,
        #[arg(long)]
        file: Option<String>,
    },
    /// List the rules of an ignore file with their flags
    List {
        #[arg(long)]
        file: Option<String>,
    },
    /// Merge rules from another file into an ignore file
    Import {
        source: PathBuf,
        /// Defaults to a guess from the source extension
        #[arg(long, value_enum)]
        format: Option<RuleFormat>,
        #[arg(long)]
        file: Option<String>,
    },
    /// Write the parsed rules of an ignore file to another file
    Export {
        output: PathBuf,
        /// Defaults to a guess from the output extension
        #[arg(long, value_enum)]
        format: Option<RuleFormat>,
        #[arg(long)]
        file: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => utils::initialize_repository().map(|_| ExitCode::SUCCESS),
        Commands::InstallHooks => utils::install_hooks().map(|_| ExitCode::SUCCESS),
        Commands::UninstallHooks => utils::uninstall_hooks().map(|_| ExitCode::SUCCESS),
        Commands::ValidateConfig => utils::validate_config().map(|_| ExitCode::SUCCESS),
        Commands::Check { paths, dir } => utils::check_paths(&paths, dir, cli.verbose),
        Commands::Lint { file } => utils::lint(file.as_deref()),
        Commands::Status => utils::show_status(cli.verbose).map(|_| ExitCode::SUCCESS),
        Commands::Verify => utils::verify().map(|_| ExitCode::SUCCESS),
        Commands::CrossCheck => utils::cross_check(),
        Commands::Add { pattern, file } => {
            utils::add_pattern(&pattern, file.as_deref()).map(|_| ExitCode::SUCCESS)
        }
        Commands::Remove { pattern, file } => {
            utils::remove_pattern(&pattern, file.as_deref()).map(|_| ExitCode::SUCCESS)
        }
        Commands::List { file } => utils::list_patterns(file.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::Import {
            source,
            format,
            file,
        } => utils::import_patterns(&source, format, file.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::Export {
            output,
            format,
            file,
        } => utils::export_patterns(&output, format, file.as_deref()).map(|_| ExitCode::SUCCESS),
    }
}
