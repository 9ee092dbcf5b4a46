//! Shared fixtures for the builder's integration tests.
//!
//! Provides a scratch source tree with helpers for writing a repository
//! descriptor, add-ons and stray directories, and for reading build output
//! back.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// File name of the add-on manifest.
pub const MANIFEST: &str = "addon.xml";

/// A temporary input root laid out like a repository checkout.
pub struct SourceTree {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl SourceTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
        Self { _temp: temp, root }
    }

    /// The input root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Write `repository.<id>/addon.xml`.
    pub fn descriptor(&self, id: &str, version: &str) -> Utf8PathBuf {
        self.manifest(&format!("repository.{id}"), id, version)
    }

    /// Write `addons/<id>/addon.xml` plus a source file.
    pub fn addon(&self, id: &str, version: &str) -> Utf8PathBuf {
        let dir = self.manifest(&format!("addons/{id}"), id, version);
        fs::create_dir_all(dir.join("resources")).expect("mkdir resources");
        fs::write(dir.join("default.py"), format!("# entry point for {id}\n")).expect("write");
        fs::write(dir.join("resources/settings.xml"), "<settings/>\n").expect("write");
        dir
    }

    /// Create `relative` as an empty directory.
    pub fn mkdir(&self, relative: &str) -> Utf8PathBuf {
        let dir = self.root.join(relative);
        fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    /// Read a file below the root.
    pub fn read(&self, relative: &str) -> Vec<u8> {
        fs::read(self.root.join(relative)).expect("file exists")
    }

    /// Overwrite a file below the root.
    pub fn write(&self, relative: &str, contents: &str) {
        fs::write(self.root.join(relative), contents).expect("write");
    }

    /// Entry names of a zip archive below the root.
    pub fn archive_entries(&self, relative: &str) -> Vec<String> {
        let file = fs::File::open(self.root.join(relative)).expect("open archive");
        let mut archive = zip::ZipArchive::new(file).expect("read zip");
        (0..archive.len())
            .map(|index| archive.by_index(index).expect("entry").name().to_owned())
            .collect()
    }

    fn manifest(&self, relative: &str, id: &str, version: &str) -> Utf8PathBuf {
        let dir = self.mkdir(relative);
        fs::write(
            dir.join(MANIFEST),
            format!(
                concat!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
                    "<addon id=\"{}\" name=\"{}\" version=\"{}\" provider-name=\"tests\">\n",
                    "  <extension point=\"xbmc.addon.metadata\"/>\n",
                    "</addon>\n"
                ),
                id, id, version
            ),
        )
        .expect("write manifest");
        dir
    }
}
