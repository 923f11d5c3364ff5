use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Marker used to recognise hooks this tool wrote.
const HOOK_MARKER: &str = "Git Ignore Rules";

const PRE_COMMIT_HOOK: &str = r#"#!/bin/sh
# Git Ignore Rules - Pre-commit Hook

# Check if git-ignore-rules is available
if ! command -v git-ignore-rules > /dev/null 2>&1; then
    echo "Warning: git-ignore-rules not found in PATH"
    exit 0
fi

# Refuse to commit files that the ignore rules exclude
git-ignore-rules verify
if [ $? -ne 0 ]; then
    echo "Error: staged files match ignore rules (unstage them or adjust .gitignore)"
    exit 1
fi
"#;

/// Hooks managed by this tool, with their script bodies.
const HOOKS: &[(&str, &str)] = &[("pre-commit", PRE_COMMIT_HOOK)];

pub fn install_git_hooks(git_dir: &Path) -> Result<()> {
    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir).context("Failed to create hooks directory")?;

    for (name, content) in HOOKS {
        install_hook(&hooks_dir, name, content)?;
    }

    Ok(())
}

/// Removes hooks this tool installed and restores any backup it made.
pub fn uninstall_git_hooks(git_dir: &Path) -> Result<()> {
    let hooks_dir = git_dir.join("hooks");

    for (name, _) in HOOKS {
        let hook_path = hooks_dir.join(name);
        if !hook_path.exists() {
            continue;
        }

        let existing_content = fs::read_to_string(&hook_path)?;
        if !existing_content.contains(HOOK_MARKER) {
            println!("ℹ️  {name} hook was not installed by git-ignore-rules; leaving it");
            continue;
        }

        fs::remove_file(&hook_path)?;
        let backup_path = hooks_dir.join(format!("{name}.backup"));
        if backup_path.exists() {
            fs::rename(&backup_path, &hook_path)?;
            println!("ℹ️  Restored previous {name} hook");
        }
        info!(hook = name, "removed hook");
    }

    Ok(())
}

fn install_hook(hooks_dir: &Path, hook_name: &str, hook_content: &str) -> Result<()> {
    let hook_path = hooks_dir.join(hook_name);

    if hook_path.exists() {
        // Check if it's already our hook
        let existing_content = fs::read_to_string(&hook_path)?;
        if existing_content.contains(HOOK_MARKER) {
            println!("ℹ️  {hook_name} hook already installed");
            return Ok(());
        }

        // Backup existing hook, never over an older backup
        let backup_path = hooks_dir.join(format!("{hook_name}.backup"));
        if backup_path.exists() {
            anyhow::bail!(
                "Cannot back up the existing {hook_name} hook: {} already exists. Move it away and retry.",
                backup_path.display()
            );
        }
        fs::rename(&hook_path, backup_path)?;
        println!("ℹ️  Backed up existing {hook_name} hook");
    }

    fs::write(&hook_path, hook_content)?;

    // Make executable on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&hook_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&hook_path, perms)?;
    }

    info!(hook = hook_name, "installed hook");
    Ok(())
}
