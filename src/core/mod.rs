// This file is the module declaration file for the `core` module.
// It declares the submodules in `src/core/` and exposes them to the crate.

// `config` module:
// Loads and saves `.git/ignore-rules.toml` through the `ConfigProvider`
// trait, and edits ignore files on the user's behalf via `ConfigManager`.
pub mod config;

// `engine` module:
// Builds the layered ignore stack for a repository and answers the questions
// the CLI asks of it: check, status, verify, cross-check and lint.
pub mod engine;

// `git` module:
// The `GitClient` abstraction over the index, with a `git2` implementation.
pub mod git;
