#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigManager, ConfigProvider};
    use crate::core::engine::{CheckOutcome, IgnoreEngine};
    use git2::Repository;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn setup_test_repo(files: &[(&str, &str)]) -> (tempfile::TempDir, Repository, PathBuf) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let repo_path = dir.path().to_path_buf();
        for (path, content) in files {
            let full = repo_path.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        (dir, repo, repo_path)
    }

    fn stage(repo: &Repository, paths: &[&str]) {
        let mut index = repo.index().unwrap();
        for path in paths {
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
    }

    fn engine_for(repo_path: &Path) -> IgnoreEngine {
        IgnoreEngine::new(ConfigManager::new_at(repo_path.to_path_buf())).unwrap()
    }

    #[test]
    fn test_initialization() {
        let (_dir, _repo, repo_path) = setup_test_repo(&[]);

        let config_manager = ConfigManager::new_at(repo_path.clone());
        config_manager.initialize().unwrap();

        let config_file = repo_path.join(".git").join("ignore-rules.toml");
        assert!(config_file.exists());
        assert_eq!(config_manager.get_config_path().unwrap(), config_file);
    }

    #[test]
    fn test_force_added_file_shows_in_status() {
        let (_dir, repo, repo_path) = setup_test_repo(&[
            (".gitignore", "*.env\nbuild/\n"),
            ("src/main.rs", "fn main() {}\n"),
            ("prod.env", "TOKEN=1\n"),
            ("build/app", "bin\n"),
        ]);
        stage(&repo, &[".gitignore", "src/main.rs", "prod.env", "build/app"]);

        let status = engine_for(&repo_path).collect_status().unwrap();
        assert_eq!(status.tracked_files, 4);
        let paths: Vec<&str> = status.tracked_ignored.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["build/app", "prod.env"]);
    }

    #[test]
    fn test_verify_rejects_staged_ignored_file() {
        let (_dir, repo, repo_path) = setup_test_repo(&[
            (".gitignore", "secrets/\n"),
            ("README.md", "hello\n"),
            ("secrets/key.pem", "-----\n"),
        ]);
        stage(&repo, &[".gitignore", "README.md"]);
        assert!(engine_for(&repo_path).verify_staging().is_ok());

        stage(&repo, &["secrets/key.pem"]);
        let err = engine_for(&repo_path).verify_staging().unwrap_err();
        assert!(err.to_string().contains("secrets/key.pem"));
    }

    #[test]
    fn test_check_uses_working_tree_to_detect_directories() {
        let (_dir, repo, repo_path) = setup_test_repo(&[
            (".gitignore", "out/\n"),
            ("out/.keep", ""),
            ("src/out", "a file named out\n"),
        ]);
        stage(&repo, &[".gitignore"]);

        let results = engine_for(&repo_path).check_paths(
            &["out".to_string(), "src/out".to_string()],
            false,
        );
        assert_eq!(results[0].outcome, CheckOutcome::Ignored);
        assert_eq!(results[1].outcome, CheckOutcome::NotMatched);
    }

    #[test]
    fn test_untracked_nested_gitignore_matches_libgit2() {
        let (_dir, repo, repo_path) = setup_test_repo(&[
            (".gitignore", "*.log\n"),
            ("web/.gitignore", "*.tmp\n"),
            ("web/a.tmp", ""),
        ]);
        stage(&repo, &[".gitignore"]);

        let results = engine_for(&repo_path).check_paths(&["web/a.tmp".to_string()], false);
        assert_eq!(results[0].outcome, CheckOutcome::Ignored);
        assert!(repo.is_path_ignored(Path::new("web/a.tmp")).unwrap());
    }

    #[test]
    fn test_info_exclude_can_be_disabled() {
        let (_dir, repo, repo_path) = setup_test_repo(&[("notes.txt", "x\n")]);
        fs::create_dir_all(repo_path.join(".git/info")).unwrap();
        fs::write(repo_path.join(".git/info/exclude"), "notes.txt\n").unwrap();
        stage(&repo, &["notes.txt"]);

        let status = engine_for(&repo_path).collect_status().unwrap();
        assert_eq!(status.tracked_ignored.len(), 1);

        let manager = ConfigManager::new_at(repo_path.clone());
        let mut config = manager.load_config().unwrap();
        config.global_settings.include_info_exclude = false;
        manager.save_config(&config).unwrap();

        let status = engine_for(&repo_path).collect_status().unwrap();
        assert!(status.tracked_ignored.is_empty());
    }

    #[test]
    fn test_decisions_agree_with_libgit2() {
        let (_dir, repo, repo_path) = setup_test_repo(&[
            (
                ".gitignore",
                "# generated\n*.log\n!keep.log\n/dist/\ndocs/*.pdf\ntmp/\n",
            ),
            ("web/.gitignore", "cache\n/local.json\n"),
            ("app.log", ""),
            ("keep.log", ""),
            ("sub/deep.log", ""),
            ("dist/bundle.js", ""),
            ("sub/dist/bundle.js", ""),
            ("docs/guide.pdf", ""),
            ("docs/img/diagram.pdf", ""),
            ("tmp/scratch", ""),
            ("web/cache/entry", ""),
            ("web/local.json", ""),
            ("web/src/local.json", ""),
            ("src/lib.rs", ""),
        ]);
        stage(
            &repo,
            &[
                ".gitignore",
                "web/.gitignore",
                "app.log",
                "keep.log",
                "sub/deep.log",
                "dist/bundle.js",
                "sub/dist/bundle.js",
                "docs/guide.pdf",
                "docs/img/diagram.pdf",
                "tmp/scratch",
                "web/cache/entry",
                "web/local.json",
                "web/src/local.json",
                "src/lib.rs",
            ],
        );

        let engine = engine_for(&repo_path);
        let report = engine.cross_check().unwrap();
        assert_eq!(report.checked, 14);
        assert!(report.disagreements.is_empty(), "{:?}", report.disagreements);

        let ignored: Vec<String> = engine
            .collect_status()
            .unwrap()
            .tracked_ignored
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert_eq!(
            ignored,
            vec![
                "app.log",
                "dist/bundle.js",
                "docs/guide.pdf",
                "sub/deep.log",
                "tmp/scratch",
                "web/cache/entry",
                "web/local.json",
            ]
        );
    }
}
