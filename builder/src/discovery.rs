//! Locating the repository descriptor and the add-on directories.

use crate::config::BuildConfig;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use std::io;
use thiserror::Error;

/// Directory-name prefix that marks a repository descriptor.
pub const DESCRIPTOR_PREFIX: &str = "repository.";

/// Input directories resolved for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// The repository descriptor add-on.
    pub descriptor_dir: Utf8PathBuf,
    /// Add-on directories in byte-wise name order.
    pub addon_dirs: Vec<Utf8PathBuf>,
}

/// Errors raised while resolving the input layout.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No `repository.*` directory exists in the input root.
    #[error("no repository.* descriptor directory in {root}")]
    DescriptorNotFound {
        /// The input root that was searched.
        root: Utf8PathBuf,
    },

    /// More than one `repository.*` directory exists and none was chosen.
    #[error(
        "several descriptor directories in {root} ({}); set repository_dir",
        .candidates.join(", ")
    )]
    AmbiguousDescriptor {
        /// The input root that was searched.
        root: Utf8PathBuf,
        /// Names of the competing directories.
        candidates: Vec<String>,
    },

    /// The configured descriptor path is not a directory.
    #[error("repository descriptor {path} is not a directory")]
    DescriptorNotDirectory {
        /// The configured path.
        path: Utf8PathBuf,
    },

    /// A directory listing failed.
    #[error("failed to list {path}: {source}")]
    ReadDir {
        /// The directory being listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Resolve the descriptor and add-on directories for `config`.
///
/// # Errors
///
/// Returns a [`DiscoveryError`] when the descriptor cannot be determined or
/// a directory cannot be listed. A missing add-ons directory is not an
/// error; it yields an empty list.
pub fn discover(config: &BuildConfig) -> Result<SourceLayout, DiscoveryError> {
    let descriptor_dir = match config.repository_path() {
        Some(path) if path.is_dir() => path,
        Some(path) => return Err(DiscoveryError::DescriptorNotDirectory { path }),
        None => find_descriptor(&config.root)?,
    };
    let output_dir = config.output_path();
    let addon_dirs = list_addon_dirs(&config.addons_path(), &[&descriptor_dir, &output_dir])?;
    debug!(
        "Resolved descriptor {descriptor_dir} and {} add-on directories",
        addon_dirs.len()
    );
    Ok(SourceLayout {
        descriptor_dir,
        addon_dirs,
    })
}

/// Find the single `repository.*` directory directly below `root`.
///
/// # Errors
///
/// Returns [`DiscoveryError::DescriptorNotFound`] when there is none and
/// [`DiscoveryError::AmbiguousDescriptor`] when there are several.
pub fn find_descriptor(root: &Utf8Path) -> Result<Utf8PathBuf, DiscoveryError> {
    let mut candidates: Vec<Utf8PathBuf> = child_dirs(root)?
        .into_iter()
        .filter(|dir| {
            dir.file_name()
                .is_some_and(|name| name.starts_with(DESCRIPTOR_PREFIX))
        })
        .collect();

    match candidates.len() {
        0 => Err(DiscoveryError::DescriptorNotFound {
            root: root.to_owned(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::AmbiguousDescriptor {
            root: root.to_owned(),
            candidates: candidates
                .iter()
                .filter_map(|dir| dir.file_name().map(str::to_owned))
                .collect(),
        }),
    }
}

/// List the add-on directories directly below `addons_dir`.
///
/// Hidden directories and any directory that is one of `excluded` are left
/// out. The result is sorted so that runs over the same tree agree.
///
/// # Errors
///
/// Returns [`DiscoveryError::ReadDir`] if `addons_dir` exists but cannot be
/// listed.
pub fn list_addon_dirs(
    addons_dir: &Utf8Path,
    excluded: &[&Utf8Path],
) -> Result<Vec<Utf8PathBuf>, DiscoveryError> {
    if !addons_dir.is_dir() {
        warn!("Add-ons directory {addons_dir} does not exist; building without add-ons");
        return Ok(Vec::new());
    }
    Ok(child_dirs(addons_dir)?
        .into_iter()
        .filter(|dir| !dir.file_name().is_some_and(|name| name.starts_with('.')))
        .filter(|dir| !excluded.iter().any(|skip| same_dir(dir, skip)))
        .collect())
}

/// Immediate subdirectories of `parent`, sorted. Names that are not UTF-8
/// are skipped with a warning.
fn child_dirs(parent: &Utf8Path) -> Result<Vec<Utf8PathBuf>, DiscoveryError> {
    let read_error = |source| DiscoveryError::ReadDir {
        path: parent.to_owned(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(parent).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if !path.is_dir() {
            continue;
        }
        match Utf8PathBuf::from_path_buf(path) {
            Ok(dir) => dirs.push(dir),
            Err(path) => warn!("Ignoring directory with non-UTF-8 name: {}", path.display()),
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn same_dir(left: &Utf8Path, right: &Utf8Path) -> bool {
    match (left.canonicalize_utf8(), right.canonicalize_utf8()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
