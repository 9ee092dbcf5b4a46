//! Archive packaging for add-on distribution.
//!
//! Creates one `.zip` archive per add-on version at
//! `<archive_root>/<id>/<id>-<version>.zip`. Every entry is rooted under a
//! directory named after the add-on identifier, whatever the source folder
//! is called on disk. Entries are written in sorted order with a fixed
//! timestamp and mode, so identical inputs produce identical archives.

use crate::manifest::read_manifest;
use crate::packaging_error::PackagingError;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// File extension of generated archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Unix mode recorded for every archive entry.
const ENTRY_PERMISSIONS: u32 = 0o644;

/// Output produced by packaging one add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageArchive {
    /// Identifier from the add-on manifest.
    pub identifier: String,
    /// Version from the add-on manifest.
    pub version: String,
    /// Path to the written archive.
    pub archive_path: Utf8PathBuf,
    /// Entry names in the order they were written.
    #[serde(skip)]
    pub entries: Vec<String>,
}

/// Packages add-on directories into archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait Packager {
    /// Package the add-on in `addon_dir` below `archive_root`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Manifest`] when the add-on's manifest is
    /// missing or malformed, and the other variants when the archive cannot
    /// be written.
    fn package(
        &self,
        addon_dir: &Utf8Path,
        archive_root: &Utf8Path,
    ) -> Result<PackageArchive, PackagingError>;
}

/// Default packager writing Deflate-compressed zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackager;

impl Packager for ZipPackager {
    fn package(
        &self,
        addon_dir: &Utf8Path,
        archive_root: &Utf8Path,
    ) -> Result<PackageArchive, PackagingError> {
        package_addon(addon_dir, archive_root)
    }
}

/// Return the archive location for `identifier` at `version`.
///
/// # Examples
///
/// ```
/// use addonrepo_builder::packaging::archive_path;
/// use camino::Utf8Path;
///
/// let path = archive_path(Utf8Path::new("docs/zips"), "plugin.video.a", "1.2.0");
/// assert_eq!(path, "docs/zips/plugin.video.a/plugin.video.a-1.2.0.zip");
/// ```
#[must_use]
pub fn archive_path(archive_root: &Utf8Path, identifier: &str, version: &str) -> Utf8PathBuf {
    archive_root
        .join(identifier)
        .join(format!("{identifier}-{version}.{ARCHIVE_EXTENSION}"))
}

/// Package the add-on in `addon_dir` into its versioned archive.
///
/// Reads the manifest, creates `<archive_root>/<id>/` if needed and writes
/// every regular file of the add-on as `<id>/<relative path>`. Symlinks and
/// other special files are skipped.
///
/// # Errors
///
/// Manifest failures are returned unchanged as [`PackagingError::Manifest`];
/// I/O and compression failures as [`PackagingError::Io`] and
/// [`PackagingError::Zip`].
pub fn package_addon(
    addon_dir: &Utf8Path,
    archive_root: &Utf8Path,
) -> Result<PackageArchive, PackagingError> {
    let manifest = read_manifest(addon_dir)?;
    let identifier = manifest.identifier();
    let version = manifest.version();

    let folder = archive_root.join(identifier);
    fs::create_dir_all(&folder).map_err(|source| PackagingError::Io {
        path: folder.clone(),
        source,
    })?;

    let files = collect_entries(addon_dir, identifier)?;
    let target = archive_path(archive_root, identifier, version);
    create_archive(&target, &files)?;
    info!("Packaged {identifier} {version} into {target}");

    Ok(PackageArchive {
        identifier: identifier.to_owned(),
        version: version.to_owned(),
        archive_path: target,
        entries: files.into_iter().map(|(_, name)| name).collect(),
    })
}

/// Create a zip archive at `output_path`.
///
/// Each entry in `files` is a `(source_path, entry_name)` pair. The archive
/// is assembled in a temporary file beside `output_path` and renamed into
/// place only once complete.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if a source file cannot be read or the
/// archive cannot be persisted, and [`PackagingError::Zip`] if the zip
/// writer fails.
pub fn create_archive(
    output_path: &Utf8Path,
    files: &[(Utf8PathBuf, String)],
) -> Result<(), PackagingError> {
    let folder = output_path.parent().unwrap_or(Utf8Path::new("."));
    let temp = NamedTempFile::new_in(folder).map_err(|source| PackagingError::Io {
        path: folder.to_owned(),
        source,
    })?;

    let zip_error = |source| PackagingError::Zip {
        path: output_path.to_owned(),
        source,
    };
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(ENTRY_PERMISSIONS);

    let mut writer = ZipWriter::new(temp);
    for (source_path, entry_name) in files {
        debug!("Adding {source_path} as {entry_name}");
        writer
            .start_file(entry_name.as_str(), options)
            .map_err(zip_error)?;
        let mut input = fs::File::open(source_path).map_err(|source| PackagingError::Io {
            path: source_path.clone(),
            source,
        })?;
        io::copy(&mut input, &mut writer).map_err(|source| PackagingError::Io {
            path: source_path.clone(),
            source,
        })?;
    }
    let temp = writer.finish().map_err(zip_error)?;

    temp.persist(output_path)
        .map_err(|err| PackagingError::Io {
            path: output_path.to_owned(),
            source: err.error,
        })?;
    Ok(())
}

/// Walk `addon_dir` in file-name order and pair each regular file with its
/// identifier-rooted entry name.
fn collect_entries(
    addon_dir: &Utf8Path,
    identifier: &str,
) -> Result<Vec<(Utf8PathBuf, String)>, PackagingError> {
    let mut entries = Vec::new();
    let walker = WalkDir::new(addon_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for item in walker {
        let item = item.map_err(|err| walk_error(addon_dir, err))?;
        if !item.file_type().is_file() {
            if !item.file_type().is_dir() {
                debug!("Skipping non-regular file {}", item.path().display());
            }
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(item.into_path()).map_err(PackagingError::NonUtf8Path)?;
        let relative = path
            .strip_prefix(addon_dir)
            .map_err(|err| PackagingError::Io {
                path: path.clone(),
                source: io::Error::other(err),
            })?;
        let name = entry_name(identifier, relative);
        entries.push((path, name));
    }
    Ok(entries)
}

fn walk_error(addon_dir: &Utf8Path, err: walkdir::Error) -> PackagingError {
    let path = err
        .path()
        .and_then(Utf8Path::from_path)
        .map_or_else(|| addon_dir.to_owned(), Utf8Path::to_owned);
    PackagingError::Io {
        path,
        source: err.into(),
    }
}

/// Build `<identifier>/<relative>` with `/` separators on every platform.
fn entry_name(identifier: &str, relative: &Utf8Path) -> String {
    relative
        .components()
        .fold(identifier.to_owned(), |mut name, component| {
            name.push('/');
            name.push_str(component.as_str());
            name
        })
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
