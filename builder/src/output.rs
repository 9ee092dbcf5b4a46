//! Report formatting for the builder CLI.
//!
//! The final report is written independently of log output so that every
//! skipped add-on and every fatal abort is visible even with `-q`.

use crate::digest::Verification;
use crate::error::{AddonWarning, BuildError};
use crate::pipeline::BuildSummary;
use crate::stale::StaleArchive;
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; nothing useful to do if stderr is gone.
    }
}

/// Format the report line for an add-on left out of the build.
///
/// Add-ons whose archive could not be written stay in the index, so they are
/// reported as "not packaged" rather than "skipped".
///
/// # Example
///
/// ```
/// use addonrepo_builder::error::{AddonWarning, Condition};
/// use addonrepo_builder::output::warning_line;
/// use camino::Utf8Path;
///
/// let warning = AddonWarning::new(Utf8Path::new("addons/b"), Condition::MissingManifest, "no addon.xml in addons/b");
/// assert_eq!(
///     warning_line(&warning),
///     "warning: skipped addons/b: MissingManifest: no addon.xml in addons/b"
/// );
/// ```
#[must_use]
pub fn warning_line(warning: &AddonWarning) -> String {
    if warning.still_indexed() {
        format!("warning: not packaged {warning}")
    } else {
        format!("warning: skipped {warning}")
    }
}

/// Format the report line for a stale archive folder.
#[must_use]
pub fn stale_line(stale: &StaleArchive) -> String {
    if stale.pruned {
        format!("pruned stale archive folder {}", stale.path)
    } else {
        format!("warning: stale archive folder {} has no add-on in this build", stale.path)
    }
}

/// Format the report line for a fatal build error.
#[must_use]
pub fn error_line(err: &BuildError) -> String {
    format!("error: {}: {err}", err.condition())
}

/// Format a success message after a build.
///
/// `skipped` counts add-ons missing from the index, `not_packaged` counts
/// indexed add-ons without an archive.
#[must_use]
pub fn success_message(
    count: usize,
    skipped: usize,
    not_packaged: usize,
    index_path: &Utf8Path,
) -> String {
    let plural = if count == 1 { "archive" } else { "archives" };
    format!(
        "Built repository with {count} {plural}{}{}: {index_path}",
        addon_count(skipped, "skipped"),
        addon_count(not_packaged, "not packaged"),
    )
}

fn addon_count(count: usize, outcome: &str) -> String {
    match count {
        0 => String::new(),
        1 => format!(", 1 add-on {outcome}"),
        n => format!(", {n} add-ons {outcome}"),
    }
}

/// Write the full build report: warnings, stale folders, then the summary.
pub fn report_summary(summary: &BuildSummary, stderr: &mut dyn Write) {
    for warning in &summary.warnings {
        write_stderr_line(stderr, warning_line(warning));
    }
    for stale in &summary.stale {
        write_stderr_line(stderr, stale_line(stale));
    }
    let not_packaged = summary
        .warnings
        .iter()
        .filter(|warning| warning.still_indexed())
        .count();
    write_stderr_line(
        stderr,
        success_message(
            summary.packaged.len(),
            summary.warnings.len() - not_packaged,
            not_packaged,
            &summary.index_path,
        ),
    );
}

/// Format the outcome of a `verify` run.
#[must_use]
pub fn verification_message(verification: &Verification, index_path: &Utf8Path) -> String {
    if verification.matches() {
        format!("{index_path}: digest OK ({})", verification.actual)
    } else {
        format!(
            "{index_path}: digest mismatch (recorded {}, actual {})",
            verification.recorded, verification.actual
        )
    }
}
