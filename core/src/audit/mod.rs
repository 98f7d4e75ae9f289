//! Audit images: one file per exam holding its source pages
//!
//! The exported file lets an operator check the extracted BI-RADS and
//! density against the original report. Rendering failures stay local to
//! the exam they belong to.

#[cfg(feature = "pdfium")]
mod pdfium;
mod split;

#[cfg(feature = "pdfium")]
pub use pdfium::{PdfiumRenderer, DEFAULT_RENDER_DPI};
pub use split::PageSplitRenderer;

use crate::error::{ConversionError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Failure rendering the pages of one exam
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Page {0} does not exist in the source document")]
    MissingPage(u32),

    #[error("No pages to render")]
    NoPages,

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rendered audit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,

    /// File extension without the dot
    pub extension: &'static str,
}

/// Turns selected pages of a source document into one file
pub trait PageRenderer: Send + Sync {
    /// Renders the given 1-based pages of `source`, in order
    fn render(&self, source: &[u8], pages: &[u32]) -> std::result::Result<RenderedImage, RenderError>;
}

/// Writes one audit file per exam and hands back its link
///
/// File names are `{index:04}_{hash:016x}.{ext}`: the section index keeps
/// names unique within a batch and the content hash keeps them stable
/// across identical runs.
///
/// # Example
///
/// ```no_run
/// use mamoscan_core::audit::{AuditImageExporter, PageSplitRenderer};
/// use std::sync::Arc;
///
/// let exporter = AuditImageExporter::new(
///     "out/laudos_pages",
///     Some("https://files.example.org/laudos".to_string()),
///     Arc::new(PageSplitRenderer),
/// )
/// .unwrap();
/// let source = std::fs::read("laudos.pdf").unwrap();
/// let link = exporter.export(&source, 0, &[1]).unwrap();
/// ```
pub struct AuditImageExporter {
    dir: PathBuf,
    link_base: Option<String>,
    renderer: Arc<dyn PageRenderer>,
}

impl AuditImageExporter {
    /// Creates the output directory if needed
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Export`] if the directory cannot be created
    pub fn new(
        dir: impl Into<PathBuf>,
        link_base: Option<String>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            ConversionError::Export(format!("cannot create {}: {}", dir.display(), e))
        })?;
        info!("Exporting audit images to {}", dir.display());
        Ok(Self {
            dir,
            link_base,
            renderer,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Renders and writes the pages of one exam, returning its link
    pub fn export(
        &self,
        source: &[u8],
        index: usize,
        pages: &[u32],
    ) -> std::result::Result<String, RenderError> {
        if pages.is_empty() {
            return Err(RenderError::NoPages);
        }
        let image = self.renderer.render(source, pages)?;
        let file_name = format!(
            "{:04}_{:016x}.{}",
            index,
            xxh3_64(&image.bytes),
            image.extension
        );
        let path = self.dir.join(&file_name);
        std::fs::write(&path, &image.bytes)?;
        debug!(
            "Exam {}: pages {:?} written to {} ({} bytes)",
            index,
            pages,
            path.display(),
            image.bytes.len()
        );
        Ok(self.link(&file_name, &path))
    }

    fn link(&self, file_name: &str, path: &Path) -> String {
        match &self.link_base {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), file_name),
            None => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticRenderer;

    impl PageRenderer for StaticRenderer {
        fn render(
            &self,
            _source: &[u8],
            pages: &[u32],
        ) -> std::result::Result<RenderedImage, RenderError> {
            Ok(RenderedImage {
                bytes: pages.iter().map(|p| *p as u8).collect(),
                extension: "bin",
            })
        }
    }

    struct FailingRenderer;

    impl PageRenderer for FailingRenderer {
        fn render(
            &self,
            _source: &[u8],
            _pages: &[u32],
        ) -> std::result::Result<RenderedImage, RenderError> {
            Err(RenderError::Pdf("broken xref".to_string()))
        }
    }

    #[test]
    fn test_links_are_unique_and_stable() {
        let dir = tempfile::tempdir().unwrap();
        let exporter =
            AuditImageExporter::new(dir.path().join("pages"), None, Arc::new(StaticRenderer))
                .unwrap();

        let first = exporter.export(b"", 0, &[1]).unwrap();
        let second = exporter.export(b"", 1, &[1]).unwrap();
        let again = exporter.export(b"", 0, &[1]).unwrap();

        assert_ne!(first, second);
        assert_eq!(first, again);
        assert!(first.ends_with(".bin"));
        assert!(Path::new(&first).exists());
    }

    #[test]
    fn test_link_base_replaces_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = AuditImageExporter::new(
            dir.path(),
            Some("https://files.example.org/laudos/".to_string()),
            Arc::new(StaticRenderer),
        )
        .unwrap();

        let link = exporter.export(b"", 7, &[3, 4]).unwrap();

        assert!(link.starts_with("https://files.example.org/laudos/0007_"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_render_failure_is_returned_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let exporter =
            AuditImageExporter::new(dir.path(), None, Arc::new(FailingRenderer)).unwrap();

        let err = exporter.export(b"", 0, &[1]).unwrap_err();

        assert!(matches!(err, RenderError::Pdf(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_page_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exporter =
            AuditImageExporter::new(dir.path(), None, Arc::new(StaticRenderer)).unwrap();
        assert!(matches!(
            exporter.export(b"", 0, &[]),
            Err(RenderError::NoPages)
        ));
    }

    #[test]
    fn test_unwritable_directory_is_an_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let err = AuditImageExporter::new(&file, None, Arc::new(StaticRenderer))
            .err()
            .unwrap();
        assert_eq!(err.code(), "EXPORT_FAILED");
    }
}
