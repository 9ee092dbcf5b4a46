//! Repository index aggregation.
//!
//! Reads the repository descriptor's manifest and then every add-on
//! manifest, and splices their prolog-free fragments into one `<addons>`
//! document. The descriptor always comes first; the remaining entries keep
//! the order of the add-on directory list.

use crate::error::{AddonWarning, Condition};
use crate::manifest::{AddonManifest, ManifestError, read_manifest};
use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use thiserror::Error;

/// XML declaration opening the index document.
pub const INDEX_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Name of the element wrapping all manifest fragments.
pub const INDEX_ROOT_ELEMENT: &str = "addons";

/// Errors that prevent an index document from being produced.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// The repository descriptor's own manifest could not be read.
    #[error("repository descriptor {path} has no usable manifest: {source}")]
    Descriptor {
        /// The descriptor directory.
        path: Utf8PathBuf,
        /// The underlying manifest failure.
        #[source]
        source: ManifestError,
    },
}

/// The assembled index together with what went into it.
#[derive(Debug, Clone)]
pub struct AggregatedIndex {
    /// The complete index document.
    pub document: Vec<u8>,
    /// Manifests included in the document, descriptor first.
    pub manifests: Vec<AddonManifest>,
    /// Add-ons left out of the document and why.
    pub warnings: Vec<AddonWarning>,
}

/// Build the index document for `descriptor_dir` followed by `addon_dirs`.
///
/// An add-on whose manifest cannot be read, or whose identifier is already
/// in the index, is excluded and reported as a warning.
///
/// # Errors
///
/// Returns [`AggregationError::Descriptor`] when the descriptor manifest is
/// missing or malformed; without it the repository cannot describe itself.
pub fn aggregate(
    descriptor_dir: &Utf8Path,
    addon_dirs: &[Utf8PathBuf],
) -> Result<AggregatedIndex, AggregationError> {
    let descriptor = read_manifest(descriptor_dir).map_err(|source| {
        AggregationError::Descriptor {
            path: descriptor_dir.to_owned(),
            source,
        }
    })?;

    let mut manifests = vec![descriptor];
    let mut warnings = Vec::new();
    for addon_dir in addon_dirs {
        match read_manifest(addon_dir) {
            Ok(manifest) => {
                if let Some(owner) = manifests
                    .iter()
                    .find(|known| known.identifier() == manifest.identifier())
                {
                    let detail = format!(
                        "identifier {} is already provided by {}",
                        manifest.identifier(),
                        owner.source_dir()
                    );
                    warn!("Excluding {addon_dir} from the index: {detail}");
                    warnings.push(AddonWarning::new(
                        addon_dir,
                        Condition::DuplicateIdentifier,
                        detail,
                    ));
                } else {
                    manifests.push(manifest);
                }
            }
            Err(err) => {
                warn!("Excluding {addon_dir} from the index: {err}");
                warnings.push(AddonWarning::new(addon_dir, err.condition(), err.to_string()));
            }
        }
    }

    let document = render_index(manifests.iter().map(AddonManifest::fragment));
    Ok(AggregatedIndex {
        document,
        manifests,
        warnings,
    })
}

/// Wrap `fragments` in a single `<addons>` element under one prolog.
///
/// # Examples
///
/// ```
/// use addonrepo_builder::aggregate::render_index;
///
/// let document = render_index(["<addon id=\"a\" version=\"1\"/>"]);
/// assert_eq!(
///     String::from_utf8(document).unwrap(),
///     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<addons>\n<addon id=\"a\" version=\"1\"/>\n</addons>"
/// );
/// ```
#[must_use]
pub fn render_index<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let body = fragments.into_iter().collect::<Vec<_>>().join("\n");
    format!("{INDEX_PROLOG}\n<{INDEX_ROOT_ELEMENT}>\n{body}\n</{INDEX_ROOT_ELEMENT}>").into_bytes()
}
