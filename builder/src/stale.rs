//! Archive folders left over from earlier builds.
//!
//! An identifier folder under the archive root is stale when no add-on with
//! that identifier was packaged in the current run, typically because the
//! add-on was removed from the source tree or failed to repackage.
//!
//! Only folders that look like archive folders are ever considered: they
//! hold at least one `<name>-*.zip` and nothing but zip files and a listing
//! page. Any other directory under the archive root is left alone.

use crate::config::StalePolicy;
use crate::site::PAGE_FILE_NAME;
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use serde::Serialize;
use std::fs;

/// An identifier folder that no longer matches a packaged add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleArchive {
    /// Folder name, i.e. the identifier it was created for.
    pub identifier: String,
    /// Full path of the folder.
    pub path: Utf8PathBuf,
    /// Whether the folder was deleted.
    pub pruned: bool,
}

/// Find archive folders below `archive_root` not named in `packaged`.
///
/// Hidden directories and directories that do not look like archive
/// folders are ignored. An unreadable or missing archive root yields an
/// empty list.
#[must_use]
pub fn find_stale<S: AsRef<str>>(archive_root: &Utf8Path, packaged: &[S]) -> Vec<StaleArchive> {
    let Ok(entries) = archive_root.read_dir_utf8() else {
        return Vec::new();
    };
    let mut stale: Vec<StaleArchive> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter(|entry| !entry.file_name().starts_with('.'))
        .filter(|entry| !packaged.iter().any(|id| id.as_ref() == entry.file_name()))
        .filter(|entry| is_archive_folder(entry.path(), entry.file_name()))
        .map(|entry| StaleArchive {
            identifier: entry.file_name().to_owned(),
            path: entry.path().to_owned(),
            pruned: false,
        })
        .collect();
    stale.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    stale
}

/// True when `dir` holds at least one `<name>-*.zip` and otherwise only zip
/// files and a listing page.
fn is_archive_folder(dir: &Utf8Path, name: &str) -> bool {
    let Ok(entries) = dir.read_dir_utf8() else {
        return false;
    };
    let prefix = format!("{name}-");
    let mut has_archive = false;
    for entry in entries {
        let Ok(entry) = entry else {
            return false;
        };
        if !entry.file_type().is_ok_and(|kind| kind.is_file()) {
            return false;
        }
        let file_name = entry.file_name();
        let is_zip = Utf8Path::new(file_name).extension() == Some("zip");
        if is_zip && file_name.starts_with(&prefix) {
            has_archive = true;
        } else if !is_zip && file_name != PAGE_FILE_NAME {
            return false;
        }
    }
    has_archive
}

/// Find stale folders and apply `policy` to them.
///
/// Returns the folders that are reported in the build summary: none for
/// [`StalePolicy::Keep`], all of them otherwise. A folder that cannot be
/// pruned is logged and reported with `pruned == false`.
#[must_use]
pub fn apply_policy<S: AsRef<str>>(
    archive_root: &Utf8Path,
    packaged: &[S],
    policy: StalePolicy,
) -> Vec<StaleArchive> {
    if policy == StalePolicy::Keep {
        return Vec::new();
    }
    let mut stale = find_stale(archive_root, packaged);
    for archive in &mut stale {
        match policy {
            StalePolicy::Prune => match fs::remove_dir_all(&archive.path) {
                Ok(()) => {
                    info!("Pruned stale archive folder {}", archive.path);
                    archive.pruned = true;
                }
                Err(err) => warn!("Failed to prune stale archive folder {}: {err}", archive.path),
            },
            StalePolicy::Warn | StalePolicy::Keep => warn!(
                "Archive folder {} has no add-on in this build",
                archive.path
            ),
        }
    }
    stale
}
