//! Explicit build configuration.
//!
//! A [`BuildConfig`] value is created once (defaults, then an optional
//! `addonrepo.toml`, then command-line overrides) and handed to every stage
//! of the build. Paths in the file are relative to the input root.
//!
//! # TOML Configuration
//!
//! ```toml
//! addons_dir = "addons"
//! output_dir = "docs"
//! archive_dir = "zips"
//! digest = "md5"
//! stale_archives = "warn"
//! jobs = 4
//!
//! [site]
//! title = "My Add-ons"
//! ```
//!
//! Unknown keys are rejected so that typos surface instead of silently
//! falling back to defaults.

use crate::digest::{DigestAlgorithm, digest_file_name};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

/// Name of the configuration file looked up in the input root.
pub const CONFIG_FILE_NAME: &str = "addonrepo.toml";

/// What to do with archive folders whose add-on was not packaged this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Leave them alone and say nothing.
    Keep,
    /// Leave them in place and report them.
    #[default]
    Warn,
    /// Delete them before listing pages are generated.
    Prune,
}

/// Settings for the static listing pages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Whether `index.html` pages are written at all.
    pub enabled: bool,
    /// Title shown on the output root page.
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Add-on Repository".to_owned(),
        }
    }
}

/// Complete configuration for one build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Input root every relative path is resolved against.
    #[serde(skip)]
    pub root: Utf8PathBuf,
    /// Directory whose immediate children are add-on directories.
    pub addons_dir: Utf8PathBuf,
    /// Repository descriptor directory; auto-detected when unset.
    pub repository_dir: Option<Utf8PathBuf>,
    /// Directory receiving the index, digest and archives.
    pub output_dir: Utf8PathBuf,
    /// Archive root below `output_dir`; empty for a flat layout.
    pub archive_dir: Utf8PathBuf,
    /// File name of the index document.
    pub index_file: String,
    /// Digest algorithm used for the integrity stamp.
    pub digest: DigestAlgorithm,
    /// Handling of archive folders left over from earlier builds.
    pub stale_archives: StalePolicy,
    /// Number of packaging worker threads.
    pub jobs: usize,
    /// Listing page settings.
    pub site: SiteConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            addons_dir: Utf8PathBuf::from("addons"),
            repository_dir: None,
            output_dir: Utf8PathBuf::from("docs"),
            archive_dir: Utf8PathBuf::from("zips"),
            index_file: "addons.xml".to_owned(),
            digest: DigestAlgorithm::default(),
            stale_archives: StalePolicy::default(),
            jobs: 1,
            site: SiteConfig::default(),
        }
    }
}

/// Errors arising while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file {path} does not exist")]
    NotFound {
        /// The requested file.
        path: Utf8PathBuf,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// The configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// The configuration file.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl BuildConfig {
    /// Default configuration for the input tree at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration for `root`.
    ///
    /// Reads `explicit` when given, otherwise `<root>/addonrepo.toml` if it
    /// exists, otherwise falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `explicit` does not exist,
    /// [`ConfigError::Read`]/[`ConfigError::Parse`] for unreadable or
    /// invalid files, and [`ConfigError::Invalid`] for rejected values.
    pub fn load(root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::NotFound {
                    path: path.to_owned(),
                });
            }
            Some(path) => path.to_owned(),
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                if !default_path.is_file() {
                    return Ok(Self::new(root));
                }
                default_path
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(root, &path, &text)
    }

    /// Parse configuration text read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown keys and
    /// [`ConfigError::Invalid`] for rejected values.
    pub fn from_toml_str(root: &Utf8Path, path: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source: Box::new(source),
        })?;
        config.root = root.to_owned();
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `jobs` is zero, `output_dir` is
    /// empty, `index_file` is not a bare file name, or the archive root
    /// would contain the input root, the add-ons directory or the configured
    /// descriptor directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(invalid("jobs", "must be at least 1"));
        }
        if self.output_dir.as_str().is_empty() {
            return Err(invalid("output_dir", "must not be empty"));
        }
        let index = self.index_file.as_str();
        if index.is_empty() || index == "." || index == ".." || index.contains(['/', '\\']) {
            return Err(invalid(
                "index_file",
                format!("\"{index}\" must be a plain file name"),
            ));
        }
        self.ensure_outside_archive_root(&self.root)?;
        self.ensure_outside_archive_root(&self.addons_path())?;
        if let Some(repository) = self.repository_path() {
            self.ensure_outside_archive_root(&repository)?;
        }
        Ok(())
    }

    /// Check that `dir` is neither the archive root nor below it.
    ///
    /// Stale archive pruning deletes folders under the archive root, so
    /// source directories must never live there. Paths are compared
    /// lexically after resolving `.` and `..`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming `output_dir` for a flat
    /// layout and `archive_dir` otherwise.
    pub fn ensure_outside_archive_root(&self, dir: &Utf8Path) -> Result<(), ConfigError> {
        let archive_root = self.archive_path();
        if !normalize(dir).starts_with(normalize(&archive_root)) {
            return Ok(());
        }
        let field = if self.is_flat() { "output_dir" } else { "archive_dir" };
        Err(invalid(
            field,
            format!("archive root {archive_root} must not contain {dir}"),
        ))
    }

    /// Directory holding the add-on directories.
    #[must_use]
    pub fn addons_path(&self) -> Utf8PathBuf {
        self.resolve(&self.addons_dir)
    }

    /// Configured descriptor directory, if any.
    #[must_use]
    pub fn repository_path(&self) -> Option<Utf8PathBuf> {
        self.repository_dir.as_deref().map(|dir| self.resolve(dir))
    }

    /// Directory receiving all build output.
    #[must_use]
    pub fn output_path(&self) -> Utf8PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Directory under which `<id>/` archive folders are created.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        if self.is_flat() {
            self.output_path()
        } else {
            self.output_path().join(&self.archive_dir)
        }
    }

    /// True when archives share the output root with the index.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        matches!(self.archive_dir.as_str(), "" | ".")
    }

    /// Path of the index document.
    #[must_use]
    pub fn index_path(&self) -> Utf8PathBuf {
        self.output_path().join(&self.index_file)
    }

    /// File name of the digest file.
    #[must_use]
    pub fn digest_file(&self) -> String {
        digest_file_name(&self.index_file, self.digest)
    }

    /// Path of the digest file.
    #[must_use]
    pub fn digest_path(&self) -> Utf8PathBuf {
        self.output_path().join(self.digest_file())
    }

    fn resolve(&self, relative: &Utf8Path) -> Utf8PathBuf {
        if relative.as_str() == "." {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match normalized.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_str()),
        }
    }
    normalized
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
