//! Static `index.html` listing pages.
//!
//! Plain HTTP hosts such as GitHub Pages do not list directories, so the
//! build writes a page at the output root, at the archive root and in every
//! identifier folder. Listings are sorted by name and every name is
//! HTML-escaped.

use crate::config::BuildConfig;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io;
use thiserror::Error;

/// File name of every listing page.
pub const PAGE_FILE_NAME: &str = "index.html";

/// Errors raised while writing listing pages.
#[derive(Debug, Error)]
pub enum SiteError {
    /// A page could not be written or a folder could not be listed.
    #[error("failed to write listing page {path}: {source}")]
    Io {
        /// The page or folder involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link target relative to the page.
    pub href: String,
    /// Visible link text.
    pub label: String,
}

impl Link {
    /// A link whose text equals its target.
    #[must_use]
    pub fn to(target: impl Into<String>) -> Self {
        let href = target.into();
        Self {
            label: href.clone(),
            href,
        }
    }
}

/// Write every listing page for the output described by `config`.
///
/// Returns the pages written, root page first.
///
/// # Errors
///
/// Returns [`SiteError::Io`] if a folder cannot be listed or a page cannot
/// be written.
pub fn generate(config: &BuildConfig) -> Result<Vec<Utf8PathBuf>, SiteError> {
    let output_root = config.output_path();
    let archive_root = config.archive_path();
    let folders = list_entries(&archive_root, EntryKind::Folder)?;
    let mut pages = Vec::with_capacity(folders.len() + 2);

    let mut root_links = vec![Link::to(&config.index_file), Link::to(config.digest_file())];
    if config.is_flat() {
        root_links.extend(folders.iter().map(|name| Link::to(format!("{name}/"))));
    } else {
        root_links.push(Link::to(format!("{}/", config.archive_dir)));
    }
    pages.push(write_page(&output_root, &config.site.title, &root_links)?);

    if !config.is_flat() {
        let links: Vec<Link> = folders.iter().map(|name| Link::to(format!("{name}/"))).collect();
        pages.push(write_page(&archive_root, &format!("{}/", config.archive_dir), &links)?);
    }

    for name in &folders {
        let folder = archive_root.join(name);
        let links: Vec<Link> = list_entries(&folder, EntryKind::File)?
            .into_iter()
            .map(Link::to)
            .collect();
        pages.push(write_page(&folder, &format!("{name}/"), &links)?);
    }

    info!("Wrote {} listing pages", pages.len());
    Ok(pages)
}

/// Render a complete listing page.
///
/// # Examples
///
/// ```
/// use addonrepo_builder::site::{render_page, Link};
///
/// let page = render_page("zips/", &[Link::to("a/")]);
/// assert!(page.contains("<li><a href=\"a/\">a/</a></li>"));
/// ```
#[must_use]
pub fn render_page(title: &str, links: &[Link]) -> String {
    let title = escape_html(title);
    let mut lines = vec![
        "<!DOCTYPE html>".to_owned(),
        format!(
            "<html lang=\"en\"><head><meta charset=\"UTF-8\"><title>{title}</title></head><body>"
        ),
        format!("<h1>{title}</h1>"),
        "<ul>".to_owned(),
    ];
    lines.extend(links.iter().map(|link| {
        format!(
            "  <li><a href=\"{}\">{}</a></li>",
            escape_html(&link.href),
            escape_html(&link.label)
        )
    }));
    lines.push("</ul>".to_owned());
    lines.push("</body></html>".to_owned());
    let mut page = lines.join("\n");
    page.push('\n');
    page
}

/// Escape text for use in HTML content and double-quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Folder,
    File,
}

/// Sorted names of visible folders or files in `dir`; listing pages and
/// dotfiles are never listed. A missing directory lists as empty.
fn list_entries(dir: &Utf8Path, kind: EntryKind) -> Result<Vec<String>, SiteError> {
    let io_error = |source| SiteError::Io {
        path: dir.to_owned(),
        source,
    };
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_error(err)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error)?;
        let name = entry.file_name();
        if name.starts_with('.') || name == PAGE_FILE_NAME {
            continue;
        }
        let file_type = entry.file_type().map_err(io_error)?;
        let wanted = match kind {
            EntryKind::Folder => file_type.is_dir(),
            EntryKind::File => file_type.is_file(),
        };
        if wanted {
            names.push(name.to_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn write_page(dir: &Utf8Path, title: &str, links: &[Link]) -> Result<Utf8PathBuf, SiteError> {
    fs::create_dir_all(dir).map_err(|source| SiteError::Io {
        path: dir.to_owned(),
        source,
    })?;
    let path = dir.join(PAGE_FILE_NAME);
    fs::write(&path, render_page(title, links)).map_err(|source| SiteError::Io {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote {path}");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Output {
        _temp: TempDir,
        config: BuildConfig,
    }

    impl Output {
        fn touch(&self, relative: &str) {
            let path = self.config.output_path().join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(path, b"x").expect("write");
        }

        fn page(&self, relative: &str) -> String {
            fs::read_to_string(self.config.output_path().join(relative)).expect("page exists")
        }
    }

    #[fixture]
    fn output() -> Output {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        Output {
            _temp: temp,
            config: BuildConfig::new(root),
        }
    }

    fn hrefs(page: &str) -> Vec<&str> {
        page.split("<a href=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect()
    }

    #[rstest]
    fn nested_layout_writes_three_levels(output: Output) {
        output.touch("addons.xml");
        output.touch("addons.xml.md5");
        output.touch("zips/b/b-1.0.zip");
        output.touch("zips/a/a-2.0.zip");
        output.touch("zips/a/a-1.0.zip");
        output.touch("zips/a/.DS_Store");

        let pages = generate(&output.config).expect("pages written");

        assert_eq!(pages.len(), 4);
        assert_eq!(hrefs(&output.page("index.html")), vec!["addons.xml", "addons.xml.md5", "zips/"]);
        assert_eq!(hrefs(&output.page("zips/index.html")), vec!["a/", "b/"]);
        assert_eq!(hrefs(&output.page("zips/a/index.html")), vec!["a-1.0.zip", "a-2.0.zip"]);
    }

    #[rstest]
    fn rerun_does_not_list_previous_pages(output: Output) {
        output.touch("zips/a/a-1.0.zip");
        generate(&output.config).expect("first run");
        generate(&output.config).expect("second run");

        assert_eq!(hrefs(&output.page("zips/a/index.html")), vec!["a-1.0.zip"]);
    }

    #[rstest]
    fn missing_archive_root_gets_an_empty_page(output: Output) {
        generate(&output.config).expect("pages written");

        let page = output.page("zips/index.html");
        assert!(hrefs(&page).is_empty());
        assert!(page.contains("<ul>\n</ul>"));
    }

    #[rstest]
    fn flat_layout_writes_one_combined_root_page(mut output: Output) {
        output.config.archive_dir = Utf8PathBuf::new();
        output.touch("a/a-1.0.zip");
        output.touch("addons.xml");

        let pages = generate(&output.config).expect("pages written");

        assert_eq!(pages.len(), 2);
        assert_eq!(hrefs(&output.page("index.html")), vec!["addons.xml", "addons.xml.md5", "a/"]);
        assert_eq!(hrefs(&output.page("a/index.html")), vec!["a-1.0.zip"]);
    }

    #[rstest]
    fn root_page_uses_configured_title(mut output: Output) {
        output.config.site.title = "Aurion <Repo>".to_owned();
        generate(&output.config).expect("pages written");

        assert!(output.page("index.html").contains("<h1>Aurion &lt;Repo&gt;</h1>"));
    }

    #[rstest]
    #[case::plain("plugin.video.a", "plugin.video.a")]
    #[case::markup("<b>&\"'", "&lt;b&gt;&amp;&quot;&#39;")]
    fn escape_html_replaces_special_characters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_html(input), expected);
    }

    #[test]
    fn rendered_page_shape() {
        let page = render_page("a/", &[Link::to("a-1.0.zip")]);
        assert_eq!(
            page,
            concat!(
                "<!DOCTYPE html>\n",
                "<html lang=\"en\"><head><meta charset=\"UTF-8\"><title>a/</title></head><body>\n",
                "<h1>a/</h1>\n",
                "<ul>\n",
                "  <li><a href=\"a-1.0.zip\">a-1.0.zip</a></li>\n",
                "</ul>\n",
                "</body></html>\n"
            )
        );
    }
}
