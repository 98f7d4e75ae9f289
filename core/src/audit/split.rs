use super::{PageRenderer, RenderError, RenderedImage};
use lopdf::Document;

/// Copies an exam's pages into a standalone PDF
///
/// The output keeps the original vector content, so it is both exact and
/// small. Needs no native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageSplitRenderer;

impl PageRenderer for PageSplitRenderer {
    fn render(&self, source: &[u8], pages: &[u32]) -> Result<RenderedImage, RenderError> {
        let mut doc = Document::load_mem(source).map_err(|e| RenderError::Pdf(e.to_string()))?;
        let all = doc.get_pages();

        if let Some(missing) = pages.iter().find(|p| !all.contains_key(p)) {
            return Err(RenderError::MissingPage(*missing));
        }

        let others: Vec<u32> = all.keys().filter(|p| !pages.contains(p)).copied().collect();
        doc.delete_pages(&others);
        doc.prune_objects();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        Ok(RenderedImage {
            bytes,
            extension: "pdf",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ExamFixture, ReportFixture};

    #[test]
    fn test_keeps_only_requested_pages() {
        let source = ReportFixture::new()
            .exam(ExamFixture::default())
            .exam(ExamFixture::default().name("ANA SOUZA"))
            .exam(ExamFixture::default().name("LUCIA LIMA"))
            .build();

        let image = PageSplitRenderer.render(&source, &[2]).unwrap();

        assert_eq!(image.extension, "pdf");
        let split = Document::load_mem(&image.bytes).unwrap();
        assert_eq!(split.get_pages().len(), 1);
        let text = split.extract_text(&[1]).unwrap();
        assert!(text.contains("ANA SOUZA"));
        assert!(!text.contains("LUCIA LIMA"));
    }

    #[test]
    fn test_missing_page_is_reported() {
        let source = ReportFixture::new().exam(ExamFixture::default()).build();
        assert!(matches!(
            PageSplitRenderer.render(&source, &[1, 5]),
            Err(RenderError::MissingPage(5))
        ));
    }

    #[test]
    fn test_invalid_source_is_a_pdf_error() {
        assert!(matches!(
            PageSplitRenderer.render(b"%PDF-garbage", &[1]),
            Err(RenderError::Pdf(_))
        ));
    }
}
