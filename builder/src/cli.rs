//! CLI argument definitions for the repository builder.
//!
//! Kept apart from the binary entrypoint so the parser and the mapping onto
//! [`BuildConfig`] can be unit tested.

use crate::config::{BuildConfig, ConfigError, StalePolicy};
use crate::digest::DigestAlgorithm;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::LevelFilter;

/// Build a static, checksummed add-on repository.
#[derive(Parser, Debug, Default)]
#[command(name = "addonrepo-builder")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build a static, checksummed add-on repository.\n\n",
    "Every add-on directory is packaged into <output>/zips/<id>/<id>-<version>.zip, ",
    "all manifests are merged into <output>/addons.xml next to its digest file, ",
    "and index.html listing pages are written so the tree can be served by any ",
    "static HTTP host.\n\n",
    "Settings are read from addonrepo.toml in the input root when present; ",
    "command-line flags take precedence.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build from the current directory into docs/:\n",
    "    $ addonrepo-builder\n\n",
    "  Build with four packaging threads and prune removed add-ons:\n",
    "    $ addonrepo-builder -j 4 --stale prune\n\n",
    "  Check a published index against its digest:\n",
    "    $ addonrepo-builder verify\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build arguments (used when no subcommand is given).
    #[command(flatten)]
    pub build: BuildArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the repository (default when no subcommand given).
    Build(BuildArgs),

    /// Recompute the index digest and compare it with the digest file.
    Verify(VerifyArgs),
}

/// Options locating the input tree and its output.
#[derive(Parser, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Input root containing the descriptor and add-ons [default: .].
    #[arg(short = 'C', long, value_name = "DIR")]
    pub root: Option<Utf8PathBuf>,

    /// Configuration file [default: <root>/addonrepo.toml if present].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Output directory, relative to the root.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<Utf8PathBuf>,

    /// Digest algorithm for the index checksum.
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub digest: Option<DigestAlgorithm>,
}

impl SourceArgs {
    /// Input root, defaulting to the current directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.root.as_deref().unwrap_or(Utf8Path::new("."))
    }

    /// Load the configuration file and apply these overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration cannot be loaded.
    pub fn load_config(&self) -> Result<BuildConfig, ConfigError> {
        let mut config = BuildConfig::load(self.root(), self.config.as_deref())?;
        if let Some(output) = &self.output {
            config.output_dir.clone_from(output);
        }
        if let Some(digest) = self.digest {
            config.digest = digest;
        }
        Ok(config)
    }
}

/// Arguments for the build command.
#[derive(Parser, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Input and output locations.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory holding the add-on directories, relative to the root.
    #[arg(long, value_name = "DIR")]
    pub addons: Option<Utf8PathBuf>,

    /// Repository descriptor directory [default: the single repository.* directory].
    #[arg(long, value_name = "DIR")]
    pub repository: Option<Utf8PathBuf>,

    /// Archive root below the output directory; "" writes archives next to the index.
    #[arg(long, value_name = "DIR")]
    pub archive_dir: Option<Utf8PathBuf>,

    /// What to do with archive folders whose add-on was not packaged.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub stale: Option<StalePolicy>,

    /// Do not write index.html listing pages.
    #[arg(long)]
    pub no_site: bool,

    /// Number of packaging threads.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors (the final report is still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Print the build summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl BuildArgs {
    /// Build the effective configuration: file values, then flags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be loaded or the
    /// combined settings are invalid.
    pub fn to_config(&self) -> Result<BuildConfig, ConfigError> {
        let mut config = self.source.load_config()?;
        if let Some(addons) = &self.addons {
            config.addons_dir.clone_from(addons);
        }
        if let Some(repository) = &self.repository {
            config.repository_dir = Some(repository.clone());
        }
        if let Some(archive_dir) = &self.archive_dir {
            config.archive_dir.clone_from(archive_dir);
        }
        if let Some(stale) = self.stale {
            config.stale_archives = stale;
        }
        if self.no_site {
            config.site.enabled = false;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        config.validate()?;
        Ok(config)
    }

    /// Log level selected by `-v`/`-q`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        log_level(self.verbosity, self.quiet)
    }
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Input and output locations.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only report mismatches and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl VerifyArgs {
    /// Log level selected by `-q`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        log_level(0, self.quiet)
    }
}

/// Map verbosity flags onto a log level.
#[must_use]
pub const fn log_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
