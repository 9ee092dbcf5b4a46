//! Add-on repository builder library.
//!
//! This crate turns a tree of add-on source directories into a static,
//! checksummed distribution repository: one deterministic `.zip` archive per
//! add-on version, an aggregated `addons.xml` index, a digest file for that
//! index, and plain HTML listing pages so the tree can be browsed over HTTP.
//! It is used by the `addonrepo-builder` CLI binary and can be driven
//! programmatically for testing or custom build workflows.
//!
//! # Modules
//!
//! - [`aggregate`] - Repository index aggregation
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Explicit build configuration loaded from `addonrepo.toml`
//! - [`digest`] - Integrity digest computation for the index document
//! - [`discovery`] - Locating the repository descriptor and add-on directories
//! - [`error`] - Fatal build errors and the user-visible condition taxonomy
//! - [`manifest`] - `addon.xml` manifest reader
//! - [`output`] - Report formatting for the CLI
//! - [`packaging`] - Deterministic per-version archive creation
//! - [`packaging_error`] - Error types for packaging operations
//! - [`pipeline`] - Build orchestration
//! - [`site`] - Static listing page generation
//! - [`stale`] - Handling of archive folders left over from earlier builds

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod digest;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod output;
pub mod packaging;
pub mod packaging_error;
pub mod pipeline;
pub mod site;
pub mod stale;
