// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory: everything that turns ignore-file text into rules, decisions
// and reports.

// `hooks` module:
// Installs and removes the `pre-commit` hook that runs `verify`, backing up
// any hook that was already there.
pub mod hooks;

// `importer` module:
// Reads rules from another ignore file or from a JSON/YAML/TOML export,
// writes exports, and merges new rules into an existing file.
pub mod importer;

// `matcher` module:
// Compiles rules into glob matchers (`RuleSet`) and layers rule sets by
// precedence (`IgnoreStack`). Last match wins; an excluded parent directory
// cannot be re-entered by a later negation.
pub mod matcher;

// `patterns` module:
// The `IgnoreRule` data model and the line parser: comments, blank lines,
// escapes, and the negation / anchoring / directory-only markers.
pub mod patterns;

// `reporter` module:
// The `StatusReporter` trait and its `ConsoleReporter` implementation.
pub mod reporter;

// `validator` module:
// The static check over ignore files (`RuleValidator`) and the config
// sanity check (`ConfigValidator`).
pub mod validator;
