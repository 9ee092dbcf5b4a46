//! Build orchestration.
//!
//! Sequences one complete repository build: resolve the input layout,
//! package the repository descriptor, aggregate the index, package every
//! accepted add-on, write the index and its digest, deal with stale archive
//! folders and finally write the listing pages.
//!
//! Failures tied to a single add-on become [`AddonWarning`]s and the build
//! continues; anything that would leave the repository without a usable
//! index is returned as a [`BuildError`].

use crate::aggregate::aggregate;
use crate::config::BuildConfig;
use crate::digest::{DigestAlgorithm, IndexDigest, digest_file_name};
use crate::discovery::discover;
use crate::error::{AddonWarning, BuildError, Result, merge_warnings};
use crate::packaging::{PackageArchive, Packager, ZipPackager};
use crate::packaging_error::PackagingError;
use crate::site;
use crate::stale::{StaleArchive, apply_policy};
use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::panic;
use std::thread;
use tempfile::NamedTempFile;

/// Result of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    /// Archives written, descriptor first, then add-ons in directory order.
    pub packaged: Vec<PackageArchive>,
    /// Add-ons skipped or excluded, one entry per directory and condition.
    pub warnings: Vec<AddonWarning>,
    /// Path of the index document.
    pub index_path: Utf8PathBuf,
    /// Path of the digest file.
    pub digest_path: Utf8PathBuf,
    /// Digest of the index document.
    pub digest: IndexDigest,
    /// Archive folders with no add-on in this build.
    pub stale: Vec<StaleArchive>,
    /// Listing pages written.
    pub pages: Vec<Utf8PathBuf>,
}

/// Build the repository described by `config` with the zip packager.
///
/// # Errors
///
/// See [`run_with`].
pub fn run(config: &BuildConfig) -> Result<BuildSummary> {
    run_with(config, &ZipPackager)
}

/// Build the repository described by `config` using `packager`.
///
/// # Errors
///
/// Returns a [`BuildError`] when the configuration is invalid, the
/// descriptor cannot be located, packaged or aggregated, or the index,
/// digest or listing pages cannot be written.
pub fn run_with<P>(config: &BuildConfig, packager: &P) -> Result<BuildSummary>
where
    P: Packager + Sync + ?Sized,
{
    config.validate()?;
    let layout = discover(config)?;
    config.ensure_outside_archive_root(&layout.descriptor_dir)?;
    let output_root = config.output_path();
    let archive_root = config.archive_path();
    fs::create_dir_all(&archive_root).map_err(|source| BuildError::Output {
        path: archive_root.clone(),
        source,
    })?;
    info!(
        "Building repository from {} with {} add-on directories",
        layout.descriptor_dir,
        layout.addon_dirs.len()
    );

    let descriptor = packager
        .package(&layout.descriptor_dir, &archive_root)
        .map_err(|source| BuildError::Descriptor {
            path: layout.descriptor_dir.clone(),
            source,
        })?;

    let index = aggregate(&layout.descriptor_dir, &layout.addon_dirs)?;
    let mut warnings = Vec::new();
    merge_warnings(&mut warnings, index.warnings);

    let accepted: Vec<Utf8PathBuf> = index
        .manifests
        .iter()
        .skip(1)
        .map(|manifest| manifest.source_dir().to_owned())
        .collect();
    let mut packaged = vec![descriptor];
    let results = package_addons(packager, &accepted, &archive_root, config.jobs);
    for (addon_dir, result) in accepted.iter().zip(results) {
        match result {
            Ok(archive) => packaged.push(archive),
            Err(err) => {
                warn!("Skipping {addon_dir}: {err}");
                merge_warnings(
                    &mut warnings,
                    [AddonWarning::new(addon_dir, err.condition(), err.to_string())],
                );
            }
        }
    }

    let index_path = config.index_path();
    let digest_path = config.digest_path();
    let digest = IndexDigest::compute(config.digest, &index.document);
    write_atomic(&index_path, &index.document)?;
    write_atomic(&digest_path, digest.as_str().as_bytes())?;
    remove_other_digests(config)?;
    info!("Wrote {index_path} ({} {digest})", config.digest);

    let identifiers: Vec<&str> = packaged.iter().map(|a| a.identifier.as_str()).collect();
    let stale = apply_policy(&archive_root, &identifiers, config.stale_archives);

    let pages = if config.site.enabled {
        site::generate(config)?
    } else {
        Vec::new()
    };

    info!(
        "Built repository in {output_root}: {} archives, {} warnings",
        packaged.len(),
        warnings.len()
    );
    Ok(BuildSummary {
        packaged,
        warnings,
        index_path,
        digest_path,
        digest,
        stale,
        pages,
    })
}

/// Package `addon_dirs`, spreading the work over up to `jobs` threads.
///
/// Results are returned in the order of `addon_dirs` regardless of which
/// thread finishes first.
fn package_addons<P>(
    packager: &P,
    addon_dirs: &[Utf8PathBuf],
    archive_root: &Utf8Path,
    jobs: usize,
) -> Vec<std::result::Result<PackageArchive, PackagingError>>
where
    P: Packager + Sync + ?Sized,
{
    if jobs <= 1 || addon_dirs.len() <= 1 {
        return addon_dirs
            .iter()
            .map(|dir| packager.package(dir, archive_root))
            .collect();
    }

    let chunk_size = addon_dirs.len().div_ceil(jobs);
    thread::scope(|scope| {
        let workers: Vec<_> = addon_dirs
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|dir| packager.package(dir, archive_root))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    })
}

/// Delete digest files written by earlier builds with another algorithm.
///
/// They would otherwise keep the checksum of an older index.
fn remove_other_digests(config: &BuildConfig) -> Result<()> {
    for algorithm in DigestAlgorithm::ALL {
        if algorithm == config.digest {
            continue;
        }
        let path = config
            .output_path()
            .join(digest_file_name(&config.index_file, algorithm));
        match fs::remove_file(&path) {
            Ok(()) => info!("Removed outdated digest file {path}"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(BuildError::Output { path, source }),
        }
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file in the same directory.
fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    let output_error = |source| BuildError::Output {
        path: path.to_owned(),
        source,
    };
    let folder = path.parent().unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(folder).map_err(output_error)?;
    let mut temp = NamedTempFile::new_in(folder).map_err(output_error)?;
    temp.write_all(bytes).map_err(output_error)?;
    temp.persist(path).map_err(|err| output_error(err.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
