//! Parse, lint and evaluate gitignore-style rule files.
//!
//! [`builders::patterns`] turns ignore-file text into [`IgnoreRule`]s,
//! [`builders::matcher`] compiles them and applies git's precedence rules, and
//! [`core::engine::IgnoreEngine`] ties the rules of a whole repository to its
//! index.
//!
//! [`IgnoreRule`]: builders::patterns::IgnoreRule
pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;
