use super::{PageRenderer, RenderError, RenderedImage};
use image::{imageops, DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use log::debug;
use pdfium_render::prelude::*;
use std::io::Cursor;

/// Rendering resolution; enough to read small narrative print
pub const DEFAULT_RENDER_DPI: u32 = 150;

const POINTS_PER_INCH: f32 = 72.0;
const MAX_DIMENSION_PX: u32 = 4096;

/// Rasterizes an exam's pages into one PNG, stacked top to bottom
///
/// A `Pdfium` handle is bound per call since the library type is neither
/// `Send` nor `Sync`; the OS caches the dynamic library load.
#[derive(Debug, Clone, Copy)]
pub struct PdfiumRenderer {
    dpi: u32,
}

impl PdfiumRenderer {
    /// Verifies that the PDFium library can be loaded
    pub fn new(dpi: u32) -> Result<Self, RenderError> {
        load_pdfium()?;
        Ok(Self { dpi: dpi.max(1) })
    }
}

/// Binds PDFium from `PDFIUM_DYNAMIC_LIB_PATH`, falling back to the system library
fn load_pdfium() -> Result<Pdfium, RenderError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!("Loading PDFium from {}", path);
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| RenderError::Pdf(format!("cannot load PDFium from {}: {}", path, e)))?;
        return Ok(Pdfium::new(bindings));
    }
    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        RenderError::Pdf(format!(
            "PDFium library not found, set PDFIUM_DYNAMIC_LIB_PATH: {}",
            e
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn target_width(width_points: f32, dpi: u32) -> i32 {
    let px = (width_points * dpi as f32 / POINTS_PER_INCH).max(1.0) as u32;
    px.min(MAX_DIMENSION_PX) as i32
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, source: &[u8], pages: &[u32]) -> Result<RenderedImage, RenderError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(source, None)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let all = document.pages();

        let mut rendered: Vec<RgbaImage> = Vec::with_capacity(pages.len());
        for &number in pages {
            let index = number
                .checked_sub(1)
                .and_then(|i| u16::try_from(i).ok())
                .ok_or(RenderError::MissingPage(number))?;
            let page = all.get(index).map_err(|_| RenderError::MissingPage(number))?;

            let config = PdfRenderConfig::new()
                .set_target_width(target_width(page.width().value, self.dpi))
                .set_maximum_height(MAX_DIMENSION_PX as i32);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RenderError::Pdf(format!("page {}: {}", number, e)))?;
            rendered.push(bitmap.as_image().to_rgba8());
        }

        let width = rendered.iter().map(RgbaImage::width).max().unwrap_or(1);
        let height: u32 = rendered.iter().map(RgbaImage::height).sum::<u32>().max(1);
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut y = 0;
        for page in &rendered {
            imageops::overlay(&mut canvas, page, 0, y);
            y += page.height();
        }

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| RenderError::Image(format!("PNG encoding failed: {}", e)))?;

        debug!("Rendered pages {:?} to {}x{} PNG", pages, width, height);
        Ok(RenderedImage {
            bytes: cursor.into_inner(),
            extension: "png",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_width_scales_and_caps() {
        assert_eq!(target_width(595.0, 72), 595);
        assert_eq!(target_width(595.0, 144), 1190);
        assert_eq!(target_width(595.0, 10_000), MAX_DIMENSION_PX as i32);
        assert_eq!(target_width(0.0, 150), 1);
    }
}
