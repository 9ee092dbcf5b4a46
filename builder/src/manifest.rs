//! Reader for `addon.xml` add-on manifests.
//!
//! A manifest's root element carries the add-on's `id` and `version`
//! attributes. Besides those two values the reader keeps the manifest text
//! itself, minus any `<?xml …?>` declaration, so the aggregator can splice it
//! into a single index document under one shared prolog.

use crate::error::Condition;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::sync::LazyLock;
use thiserror::Error;

/// File name of the manifest at the top level of every add-on directory.
pub const MANIFEST_FILE_NAME: &str = "addon.xml";

#[expect(clippy::expect_used, reason = "the pattern is a literal checked by the tests")]
static XML_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*<\?xml(?:\s[^>]*)?\?>").expect("XML declaration pattern is valid")
});

/// A parsed add-on manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonManifest {
    identifier: String,
    version: String,
    source_dir: Utf8PathBuf,
    fragment: String,
}

impl AddonManifest {
    /// The add-on identifier from the root element's `id` attribute.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The version string from the root element's `version` attribute.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The add-on directory the manifest was read from.
    #[must_use]
    pub fn source_dir(&self) -> &Utf8Path {
        &self.source_dir
    }

    /// The manifest text with its XML declaration removed.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

/// Errors arising while reading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The add-on directory has no manifest file.
    #[error("no addon.xml in {dir}")]
    Missing {
        /// The add-on directory that was searched.
        dir: Utf8PathBuf,
    },

    /// The manifest exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest does not parse or lacks a required attribute.
    #[error("invalid manifest {path}: {reason}")]
    Malformed {
        /// Path to the manifest.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

impl ManifestError {
    /// Return the user-visible condition for this failure.
    #[must_use]
    pub const fn condition(&self) -> Condition {
        match self {
            Self::Missing { .. } => Condition::MissingManifest,
            Self::Read { .. } | Self::Malformed { .. } => Condition::MalformedManifest,
        }
    }
}

/// Read and parse the manifest of the add-on in `addon_dir`.
///
/// # Errors
///
/// Returns [`ManifestError::Missing`] when the directory has no
/// `addon.xml`, [`ManifestError::Read`] when it cannot be read, and
/// [`ManifestError::Malformed`] when it is not well-formed XML or its root
/// element lacks a usable `id` or `version`.
///
/// # Examples
///
/// ```no_run
/// use addonrepo_builder::manifest::read_manifest;
/// use camino::Utf8Path;
///
/// let manifest = read_manifest(Utf8Path::new("addons/plugin.video.example"))?;
/// println!("{} {}", manifest.identifier(), manifest.version());
/// # Ok::<(), addonrepo_builder::manifest::ManifestError>(())
/// ```
pub fn read_manifest(addon_dir: &Utf8Path) -> Result<AddonManifest, ManifestError> {
    let path = addon_dir.join(MANIFEST_FILE_NAME);
    if !path.is_file() {
        return Err(ManifestError::Missing {
            dir: addon_dir.to_owned(),
        });
    }
    let bytes = fs::read(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    parse_manifest(addon_dir, &path, &bytes)
}

fn parse_manifest(
    addon_dir: &Utf8Path,
    path: &Utf8Path,
    bytes: &[u8],
) -> Result<AddonManifest, ManifestError> {
    let raw = std::str::from_utf8(bytes)
        .map_err(|err| malformed(path, format!("not valid UTF-8: {err}")))?;
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let document = roxmltree::Document::parse(text).map_err(|err| malformed(path, err.to_string()))?;
    let root = document.root_element();
    let identifier = required_attribute(&root, "id", path)?;
    let version = required_attribute(&root, "version", path)?;

    Ok(AddonManifest {
        identifier,
        version,
        source_dir: addon_dir.to_owned(),
        fragment: strip_prolog(text),
    })
}

/// Fetch a root attribute that will later become part of a file path.
fn required_attribute(
    root: &roxmltree::Node<'_, '_>,
    name: &str,
    path: &Utf8Path,
) -> Result<String, ManifestError> {
    let value = root
        .attribute(name)
        .ok_or_else(|| {
            malformed(
                path,
                format!("root element <{}> has no {name} attribute", root.tag_name().name()),
            )
        })?;
    if value.is_empty() {
        return Err(malformed(path, format!("{name} attribute is empty")));
    }
    if value.trim() != value {
        return Err(malformed(
            path,
            format!("{name} \"{value}\" has leading or trailing whitespace"),
        ));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(malformed(
            path,
            format!("{name} \"{value}\" cannot be used as a path component"),
        ));
    }
    Ok(value.to_owned())
}

fn malformed(path: &Utf8Path, reason: String) -> ManifestError {
    ManifestError::Malformed {
        path: path.to_owned(),
        reason,
    }
}

/// Remove every `<?xml …?>` declaration and trim surrounding whitespace.
///
/// Other processing instructions such as `<?xml-stylesheet …?>` are kept.
#[must_use]
pub fn strip_prolog(text: &str) -> String {
    XML_DECLARATION.replace_all(text, "").trim().to_owned()
}
