//! Integrity digest for the index document.
//!
//! The digest is computed over the exact bytes written to disk and stored
//! as bare lowercase hex (no trailing newline) in `<index>.<algorithm>`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use thiserror::Error;

/// Checksum algorithms understood by repository clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// MD5, the checksum Kodi-style clients fetch as `addons.xml.md5`.
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 2] = [Self::Md5, Self::Sha256];

    /// File extension appended to the index file name.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hex-encoded digest.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors arising from digest parsing and verification.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The digest text is not valid for the algorithm.
    #[error("invalid {algorithm} digest: {reason}")]
    Invalid {
        /// Algorithm the digest was parsed for.
        algorithm: DigestAlgorithm,
        /// Description of the validation failure.
        reason: String,
    },

    /// The index or digest file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A validated lowercase hex digest of an index document.
///
/// # Examples
///
/// ```
/// use addonrepo_builder::digest::{DigestAlgorithm, IndexDigest};
///
/// let digest = IndexDigest::compute(DigestAlgorithm::Md5, b"");
/// assert_eq!(digest.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexDigest {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl IndexDigest {
    /// Compute the digest of `bytes`.
    #[must_use]
    pub fn compute(algorithm: DigestAlgorithm, bytes: &[u8]) -> Self {
        let hex = match algorithm {
            DigestAlgorithm::Md5 => format!("{:x}", Md5::digest(bytes)),
            DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        };
        Self { algorithm, hex }
    }

    /// Parse digest-file contents.
    ///
    /// Surrounding whitespace is ignored so files edited by hand still
    /// verify; the digest itself must be lowercase hex of the right length.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::Invalid`] for a wrong length, non-hex
    /// characters or uppercase hex.
    pub fn parse(algorithm: DigestAlgorithm, text: &str) -> Result<Self, DigestError> {
        let hex = text.trim();
        let invalid = |reason: String| DigestError::Invalid { algorithm, reason };
        if hex.len() != algorithm.hex_len() {
            return Err(invalid(format!(
                "expected {} hex characters, got {}",
                algorithm.hex_len(),
                hex.len()
            )));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(invalid(format!("non-hex character '{bad}'")));
        }
        if hex.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("digest must be lowercase".to_owned()));
        }
        Ok(Self {
            algorithm,
            hex: hex.to_owned(),
        })
    }

    /// The algorithm this digest was produced with.
    #[must_use]
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for IndexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Name of the digest file that accompanies `index_file`.
///
/// # Examples
///
/// ```
/// use addonrepo_builder::digest::{digest_file_name, DigestAlgorithm};
///
/// assert_eq!(digest_file_name("addons.xml", DigestAlgorithm::Md5), "addons.xml.md5");
/// ```
#[must_use]
pub fn digest_file_name(index_file: &str, algorithm: DigestAlgorithm) -> String {
    format!("{index_file}.{}", algorithm.extension())
}

/// Outcome of checking a published index against its digest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Digest recorded in the digest file.
    pub recorded: IndexDigest,
    /// Digest recomputed over the index bytes.
    pub actual: IndexDigest,
}

impl Verification {
    /// True when the recorded and recomputed digests agree.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.recorded == self.actual
    }
}

/// Recompute the digest of `index_path` and compare it with `digest_path`.
///
/// # Errors
///
/// Returns [`DigestError::Read`] if either file cannot be read and
/// [`DigestError::Invalid`] if the digest file is not valid hex.
pub fn verify_files(
    index_path: &Utf8Path,
    digest_path: &Utf8Path,
    algorithm: DigestAlgorithm,
) -> Result<Verification, DigestError> {
    let index = fs::read(index_path).map_err(|source| DigestError::Read {
        path: index_path.to_owned(),
        source,
    })?;
    let recorded_text = fs::read_to_string(digest_path).map_err(|source| DigestError::Read {
        path: digest_path.to_owned(),
        source,
    })?;
    Ok(Verification {
        recorded: IndexDigest::parse(algorithm, &recorded_text)?,
        actual: IndexDigest::compute(algorithm, &index),
    })
}
