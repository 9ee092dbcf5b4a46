//! Fatal build errors and the user-visible condition taxonomy.
//!
//! Per-add-on failures never surface as [`BuildError`]; they are recorded as
//! [`AddonWarning`]s and the build carries on. `BuildError` is reserved for
//! failures that leave no usable repository behind: an unreadable
//! configuration, a missing or broken repository descriptor, or an index
//! that cannot be written.

use crate::aggregate::AggregationError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::packaging_error::PackagingError;
use crate::site::SiteError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Named failure conditions reported to users alongside the offending path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    /// The directory has no `addon.xml`.
    MissingManifest,
    /// `addon.xml` does not parse or lacks its `id`/`version` attributes.
    MalformedManifest,
    /// Filesystem or compression fault while writing an archive.
    ArchiveWriteFailure,
    /// The repository descriptor's own manifest could not be aggregated.
    AggregationFailure,
    /// A second add-on declared an identifier already in the index.
    DuplicateIdentifier,
    /// No repository descriptor directory could be located.
    DescriptorNotFound,
    /// The configuration file or flags are invalid.
    InvalidConfiguration,
    /// The index, digest or a listing page could not be written.
    OutputWriteFailure,
}

impl Condition {
    /// Return the taxonomy name shown in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingManifest => "MissingManifest",
            Self::MalformedManifest => "MalformedManifest",
            Self::ArchiveWriteFailure => "ArchiveWriteFailure",
            Self::AggregationFailure => "AggregationFailure",
            Self::DuplicateIdentifier => "DuplicateIdentifier",
            Self::DescriptorNotFound => "DescriptorNotFound",
            Self::InvalidConfiguration => "InvalidConfiguration",
            Self::OutputWriteFailure => "OutputWriteFailure",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable, per-add-on problem. The add-on is left out of the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonWarning {
    /// The add-on directory that was skipped.
    pub addon_dir: Utf8PathBuf,
    /// What went wrong.
    pub condition: Condition,
    /// Human-readable detail, usually the underlying error message.
    pub detail: String,
}

impl AddonWarning {
    /// Create a warning for `addon_dir`.
    #[must_use]
    pub fn new(addon_dir: &Utf8Path, condition: Condition, detail: impl Into<String>) -> Self {
        Self {
            addon_dir: addon_dir.to_owned(),
            condition,
            detail: detail.into(),
        }
    }

    /// Return true when the add-on is still listed in the index even though
    /// no archive was written for it.
    #[must_use]
    pub fn still_indexed(&self) -> bool {
        self.condition == Condition::ArchiveWriteFailure
    }

    /// Return true when both warnings describe the same add-on and condition.
    #[must_use]
    pub fn same_issue(&self, other: &Self) -> bool {
        self.addon_dir == other.addon_dir && self.condition == other.condition
    }
}

impl fmt::Display for AddonWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.addon_dir, self.condition, self.detail)
    }
}

/// Append `incoming` warnings to `warnings`, skipping repeats of an issue
/// already recorded for the same add-on.
///
/// Packaging and aggregation both read every manifest, so a broken add-on
/// would otherwise be reported twice.
pub fn merge_warnings(
    warnings: &mut Vec<AddonWarning>,
    incoming: impl IntoIterator<Item = AddonWarning>,
) {
    for warning in incoming {
        if !warnings.iter().any(|known| known.same_issue(&warning)) {
            warnings.push(warning);
        }
    }
}

/// Errors that abort the build without producing a usable repository.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input layout could not be resolved.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The repository descriptor could not be packaged.
    #[error("repository descriptor {path} could not be packaged: {source}")]
    Descriptor {
        /// The descriptor directory.
        path: Utf8PathBuf,
        /// The underlying packaging failure.
        #[source]
        source: PackagingError,
    },

    /// The index document could not be assembled.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// A repository-level output file could not be written.
    #[error("failed to write {path}: {source}")]
    Output {
        /// The file or directory being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Listing pages could not be generated.
    #[error(transparent)]
    Site(#[from] SiteError),
}

impl BuildError {
    /// Return the user-visible condition for this failure.
    #[must_use]
    pub fn condition(&self) -> Condition {
        match self {
            Self::Config(_) => Condition::InvalidConfiguration,
            Self::Discovery(_) => Condition::DescriptorNotFound,
            Self::Descriptor { source, .. } => source.condition(),
            Self::Aggregation(_) => Condition::AggregationFailure,
            Self::Output { .. } | Self::Site(_) => Condition::OutputWriteFailure,
        }
    }
}

/// Result type alias using [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing(Condition::MissingManifest, "MissingManifest")]
    #[case::malformed(Condition::MalformedManifest, "MalformedManifest")]
    #[case::archive(Condition::ArchiveWriteFailure, "ArchiveWriteFailure")]
    #[case::aggregation(Condition::AggregationFailure, "AggregationFailure")]
    fn condition_display_uses_taxonomy_name(#[case] condition: Condition, #[case] name: &str) {
        assert_eq!(condition.to_string(), name);
    }

    #[test]
    fn warning_display_names_path_and_condition() {
        let warning = AddonWarning::new(
            Utf8Path::new("addons/b"),
            Condition::MissingManifest,
            "no addon.xml in addons/b",
        );
        assert_eq!(
            warning.to_string(),
            "addons/b: MissingManifest: no addon.xml in addons/b"
        );
    }

    #[test]
    fn merge_warnings_drops_repeated_issue() {
        let first = AddonWarning::new(Utf8Path::new("b"), Condition::MissingManifest, "one");
        let repeat = AddonWarning::new(Utf8Path::new("b"), Condition::MissingManifest, "two");
        let other = AddonWarning::new(Utf8Path::new("c"), Condition::MissingManifest, "three");

        let mut warnings = vec![first];
        merge_warnings(&mut warnings, [repeat, other]);

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].detail, "one");
        assert_eq!(warnings[1].addon_dir, Utf8PathBuf::from("c"));
    }

    #[test]
    fn merge_warnings_keeps_distinct_conditions_for_same_addon() {
        let mut warnings = vec![AddonWarning::new(
            Utf8Path::new("b"),
            Condition::ArchiveWriteFailure,
            "disk full",
        )];
        merge_warnings(
            &mut warnings,
            [AddonWarning::new(
                Utf8Path::new("b"),
                Condition::DuplicateIdentifier,
                "id reused",
            )],
        );
        assert_eq!(warnings.len(), 2);
    }

    #[rstest]
    #[case::missing(Condition::MissingManifest, false)]
    #[case::duplicate(Condition::DuplicateIdentifier, false)]
    #[case::archive(Condition::ArchiveWriteFailure, true)]
    fn only_archive_failures_stay_indexed(#[case] condition: Condition, #[case] expected: bool) {
        let warning = AddonWarning::new(Utf8Path::new("addons/b"), condition, "detail");
        assert_eq!(warning.still_indexed(), expected);
    }
}
