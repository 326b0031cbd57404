//! File export for the preview contents.
//!
//! HTML exports are wrapped as a minimal standalone document; markdown is
//! written verbatim. Raster export of the rendered panel is a host
//! concern and stays outside the engine.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write sanitized preview HTML as a standalone document, optionally
/// prefixed with a theme CSS block.
pub fn write_html(path: &Path, html: &str, theme_css: Option<&str>) -> Result<(), ExportError> {
    let mut document = String::from("<!doctype html>\n<meta charset=\"utf-8\">\n");
    if let Some(css) = theme_css {
        document.push_str("<style>\n");
        document.push_str(css);
        document.push_str("\n</style>\n");
    }
    document.push_str(html);
    write_file(path, &document)
}

/// Write the raw markdown source next to an HTML export.
pub fn write_markdown(path: &Path, markdown: &str) -> Result<(), ExportError> {
    write_file(path, markdown)
}

fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_export_is_a_standalone_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preview.html");

        write_html(&path, "<h1>Title</h1>", None).expect("write");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.starts_with("<!doctype html>"));
        assert!(written.contains("<meta charset=\"utf-8\">"));
        assert!(written.ends_with("<h1>Title</h1>"));
    }

    #[test]
    fn theme_css_lands_in_a_style_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("preview.html");

        write_html(&path, "<p>x</p>", Some(":root { --x: 1; }")).expect("write");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.contains("<style>\n:root { --x: 1; }\n</style>"));
    }

    #[test]
    fn markdown_export_is_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("content.md");

        write_markdown(&path, "# raw\n").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "# raw\n");
    }

    #[test]
    fn parent_directories_are_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper/out.html");

        write_html(&path, "<p>x</p>", None).expect("write");
        assert!(path.exists());
    }
}
