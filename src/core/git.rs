use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Repository};
use std::path::{Path, PathBuf};
use std::str;

/// Trait defining the Git operations required by the engine.
/// This abstraction allows for easier testing and decoupling from specific git implementations.
pub trait GitClient {
    /// Returns the files added or modified in the index relative to HEAD.
    /// Deletions are left out; a removed file cannot be an ignored addition.
    fn get_staged_files(&self) -> Result<Vec<PathBuf>>;

    /// Get all tracked files, as repository-relative `/`-separated paths.
    fn get_tracked_files(&self) -> Result<Vec<String>>;

    /// Returns the root path of the working tree.
    fn get_repo_root(&self) -> PathBuf;

    /// Returns the .git directory path
    fn get_git_dir(&self) -> PathBuf;

    /// Read file from working directory
    fn read_working_file(&self, path: &Path) -> Result<String>;

    /// Asks git itself whether `path` is ignored. Used as the reference
    /// answer when cross-checking our own evaluation.
    fn is_path_ignored(&self, path: &Path) -> Result<bool>;
}

/// Concrete implementation of GitClient using the git2 crate.
pub struct Git2Client {
    repo: Repository,
}

impl Git2Client {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path.as_ref())
            .with_context(|| format!("Failed to open repository at {}", path.as_ref().display()))?;
        Ok(Self { repo })
    }
}

impl GitClient for Git2Client {
    fn get_staged_files(&self) -> Result<Vec<PathBuf>> {
        let index = self.repo.index()?;
        let mut options = DiffOptions::new();

        // Before the first commit there is no HEAD; diff against an empty tree.
        let base_tree = match self.repo.head().ok().and_then(|h| h.peel_to_tree().ok()) {
            Some(tree) => tree,
            None => {
                let empty_tree = self.repo.treebuilder(None)?.write()?;
                self.repo.find_tree(empty_tree)?
            }
        };

        let diff = self
            .repo
            .diff_tree_to_index(Some(&base_tree), Some(&index), Some(&mut options))?;

        let mut staged_files = Vec::new();
        for delta in diff.deltas() {
            if delta.status() == Delta::Deleted {
                continue;
            }
            if let Some(path) = delta.new_file().path() {
                staged_files.push(path.to_path_buf());
            }
        }

        Ok(staged_files)
    }

    fn get_tracked_files(&self) -> Result<Vec<String>> {
        let index = self.repo.index()?;
        let mut files = Vec::new();
        for entry in index.iter() {
            if let Ok(path_str) = str::from_utf8(&entry.path) {
                files.push(path_str.to_string());
            }
        }
        Ok(files)
    }

    fn get_repo_root(&self) -> PathBuf {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.repo.path().to_path_buf())
    }

    fn get_git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn read_working_file(&self, path: &Path) -> Result<String> {
        let full = self.get_repo_root().join(path);
        std::fs::read_to_string(&full).with_context(|| format!("Failed to read {}", full.display()))
    }

    fn is_path_ignored(&self, path: &Path) -> Result<bool> {
        Ok(self.repo.is_path_ignored(path)?)
    }
}
