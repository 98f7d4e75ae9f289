use super::content::{decode_runs, is_readable};
use super::layout::{group_lines, BoundingBox, TextLine, TextRun};
use crate::error::{ConversionError, Result};
use crate::extraction::text::heading_matches;
use crate::types::LayoutTemplate;
use log::{debug, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// A4 portrait height, used when a page declares no usable MediaBox
const DEFAULT_PAGE_HEIGHT: f32 = 842.0;
const DEFAULT_PAGE_WIDTH: f32 = 595.0;

/// Vertical spacing given to lines recovered without positions
const SYNTHETIC_LINE_HEIGHT: f32 = 14.0;

/// Text content of one source page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number in the source document
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TextLine>,

    /// False when positions were synthesized by the fallback text reader
    pub positioned: bool,
}

/// Pages describing one exam, starting at a page carrying the section marker
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSection {
    /// 0-based position of the exam in the document
    pub index: usize,
    pub pages: Vec<PageText>,
}

impl ExamSection {
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.number).collect()
    }

    /// All lines of the section in reading order
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.pages.iter().flat_map(|p| p.lines.iter())
    }
}

/// A parsed report document split into exam sections
///
/// Keeps the source bytes so page renderers can work from the original.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    source: Vec<u8>,
    page_count: usize,
    sections: Vec<ExamSection>,
    skipped_pages: Vec<u32>,
}

impl LoadedDocument {
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn sections(&self) -> &[ExamSection] {
        &self.sections
    }

    /// Pages preceding the first section marker
    pub fn skipped_pages(&self) -> &[u32] {
        &self.skipped_pages
    }
}

/// Opens exported report documents
///
/// # Example
///
/// ```no_run
/// use mamoscan_core::{DocumentLoader, LayoutTemplate};
///
/// let template = LayoutTemplate::siscan_mammography_v1();
/// let document = DocumentLoader::new(&template)
///     .load_file("laudos.pdf".as_ref())
///     .unwrap();
/// println!("{} exams", document.sections().len());
/// ```
pub struct DocumentLoader<'a> {
    template: &'a LayoutTemplate,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(template: &'a LayoutTemplate) -> Self {
        Self { template }
    }

    /// Reads and loads a document from disk
    pub fn load_file(&self, path: &Path) -> Result<LoadedDocument> {
        let bytes = std::fs::read(path)?;
        self.load(bytes)
    }

    /// Parses a document and splits it into exam sections
    ///
    /// # Algorithm
    ///
    /// 1. Parse the byte stream as PDF
    /// 2. For every page decode positioned text runs from the content
    ///    stream and group them into lines; pages whose runs do not decode
    ///    to readable text are re-read with the library text extractor
    /// 3. A page containing the section marker opens a new exam section;
    ///    other pages continue the previous section
    ///
    /// # Errors
    ///
    /// - [`ConversionError::UnreadableDocument`] if the bytes are not a
    ///   readable PDF or a page cannot be read at all
    /// - [`ConversionError::EmptyDocument`] if no exam section is found
    pub fn load(&self, source: Vec<u8>) -> Result<LoadedDocument> {
        let doc = Document::load_mem(&source)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ConversionError::EmptyDocument);
        }

        let mut sections: Vec<ExamSection> = Vec::new();
        let mut skipped_pages = Vec::new();

        for (&number, &page_id) in &pages {
            let page = self.read_page(&doc, number, page_id)?;
            let is_start = page.lines.iter().any(|line| {
                heading_matches(
                    &line.text(),
                    &self.template.section_marker,
                    self.template.max_label_edits,
                )
            });

            if is_start {
                sections.push(ExamSection {
                    index: sections.len(),
                    pages: vec![page],
                });
            } else if let Some(current) = sections.last_mut() {
                debug!(
                    "Page {} continues exam section {}",
                    number, current.index
                );
                current.pages.push(page);
            } else {
                warn!("Page {} precedes the first exam section, skipping", number);
                skipped_pages.push(number);
            }
        }

        if sections.is_empty() {
            return Err(ConversionError::EmptyDocument);
        }

        info!(
            "Loaded {} pages, {} exam sections",
            pages.len(),
            sections.len()
        );

        Ok(LoadedDocument {
            source,
            page_count: pages.len(),
            sections,
            skipped_pages,
        })
    }

    fn read_page(&self, doc: &Document, number: u32, page_id: ObjectId) -> Result<PageText> {
        let (width, height) = page_size(doc, page_id);

        let runs = doc
            .get_page_content(page_id)
            .and_then(|content| decode_runs(&content, height));

        let runs = match runs {
            Ok(runs) => runs,
            Err(e) => {
                warn!("Page {}: content stream not decodable ({})", number, e);
                Vec::new()
            }
        };

        let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
        if is_readable(&joined) {
            let lines = group_lines(runs, self.template.line_tolerance);
            debug!("Page {}: {} positioned lines", number, lines.len());
            return Ok(PageText {
                number,
                width,
                height,
                lines,
                positioned: true,
            });
        }

        warn!(
            "Page {}: positioned text unreadable, falling back to plain text extraction",
            number
        );
        let text = doc.extract_text(&[number]).map_err(|e| {
            ConversionError::UnreadableDocument(format!("page {}: {}", number, e))
        })?;

        Ok(PageText {
            number,
            width,
            height,
            lines: synthetic_lines(&text),
            positioned: false,
        })
    }
}

/// Lines of plain extracted text, stacked at a fixed spacing
fn synthetic_lines(text: &str) -> Vec<TextLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, l)| {
            let baseline = (i + 1) as f32 * SYNTHETIC_LINE_HEIGHT;
            TextLine {
                runs: vec![TextRun::new(
                    l,
                    BoundingBox::new(0.0, baseline - SYNTHETIC_LINE_HEIGHT, 0.0, baseline),
                )],
            }
        })
        .collect()
}

/// Page width and height from the (possibly inherited) MediaBox
fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let mut current = doc.get_dictionary(page_id).ok();
    // Page tree depth is small; the bound guards against reference cycles
    for _ in 0..16 {
        let Some(dict) = current else { break };
        if let Some(size) = media_box(doc, dict) {
            return size;
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    (DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<(f32, f32)> {
    let obj = dict.get(b"MediaBox").ok()?;
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let values: Vec<f32> = obj
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r as f32),
            _ => None,
        })
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
        _ => None,
    }
}
