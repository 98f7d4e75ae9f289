use crate::audit::{AuditImageExporter, PageRenderer, PageSplitRenderer};
use crate::batch::{Batch, BatchWriter, ImageOutcome, RecordAssembler};
use crate::document::{DocumentLoader, ExamSection};
use crate::error::{ConversionError, Result};
use crate::extraction::{narrative_lines, EntityRecognizer, FixedFieldLocator, NarrativeExtractor};
use crate::types::{ConversionOptions, ExamReportRecord};
use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

/// Converts report exports into outreach records
///
/// Holds no state between conversions: every call loads its own document
/// and builds its own batch, so one converter can serve concurrent
/// requests.
///
/// # Example
///
/// ```no_run
/// use mamoscan_core::{ConversionOptions, ReportConverter};
///
/// let converter = ReportConverter::new(ConversionOptions::default().with_workers(4))?;
/// let output = converter.convert_file("laudos.pdf".as_ref())?;
///
/// for record in output.batch.iter() {
///     println!("{:?} {}", record.name(), record.attention());
/// }
/// println!("{} need review", output.needs_review);
/// # Ok::<(), mamoscan_core::ConversionError>(())
/// ```
pub struct ReportConverter {
    options: ConversionOptions,
    narrative: NarrativeExtractor,
    renderer: Arc<dyn PageRenderer>,
}

/// Result of one conversion
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// One record per exam section, in document order
    pub batch: Batch,

    /// Records carrying at least one review reason
    pub needs_review: usize,

    pub page_count: usize,

    /// Pages before the first exam section
    pub skipped_pages: Vec<u32>,

    /// Directory holding the audit images, when exported
    pub image_dir: Option<PathBuf>,
}

impl ReportConverter {
    /// Creates a converter
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidTemplate`] if the configured
    /// layout template is inconsistent
    pub fn new(options: ConversionOptions) -> Result<Self> {
        options.template.validate()?;
        Ok(Self {
            options,
            narrative: NarrativeExtractor::new(),
            renderer: Arc::new(PageSplitRenderer),
        })
    }

    /// Builder: Replace the fallback entity recognizer
    pub fn with_recognizer(mut self, recognizer: Box<dyn EntityRecognizer>) -> Self {
        self.narrative = NarrativeExtractor::with_recognizer(recognizer);
        self
    }

    /// Builder: Replace the audit page renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Reads a document from disk and converts it
    pub fn convert_file(&self, path: &Path) -> Result<ConversionOutput> {
        info!("Converting {}", path.display());
        let bytes = std::fs::read(path)?;
        self.convert(bytes)
    }

    /// Converts one report document
    ///
    /// # Algorithm
    ///
    /// 1. Load and split the document into exam sections
    /// 2. Process sections in parallel: locate fixed fields, extract the
    ///    narrative, classify, export the audit image
    /// 3. Tag each record with its section index and restore document
    ///    order in the [`BatchWriter`], whatever the completion order
    ///
    /// # Errors
    ///
    /// - [`ConversionError::UnreadableDocument`] / [`ConversionError::EmptyDocument`]
    ///   from loading; nothing is emitted
    /// - [`ConversionError::Export`] if the image directory cannot be created
    /// - [`ConversionError::WorkerPool`] if the worker pool cannot start
    ///
    /// Problems confined to one exam never fail the conversion.
    pub fn convert(&self, source: Vec<u8>) -> Result<ConversionOutput> {
        let template = &self.options.template;
        let document = DocumentLoader::new(template).load(source)?;

        let exporter = match &self.options.image_dir {
            Some(dir) => Some(AuditImageExporter::new(
                dir.clone(),
                self.options.link_base.clone(),
                Arc::clone(&self.renderer),
            )?),
            None => None,
        };

        let locator = FixedFieldLocator::new(template);
        let assembler = RecordAssembler::new(
            self.options.age_reference,
            self.options.reference_date,
            self.options.min_fallback_confidence,
        );
        let worker = SectionWorker {
            converter: self,
            locator: &locator,
            assembler: &assembler,
            exporter: exporter.as_ref(),
            source: document.source(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.unwrap_or(0))
            .build()
            .map_err(|e| ConversionError::WorkerPool(e.to_string()))?;

        let sections = document.sections();
        let (sender, receiver) = mpsc::channel::<(usize, ExamReportRecord)>();
        pool.install(|| {
            sections.par_iter().for_each_with(sender, |sender, section| {
                let record = worker.process(section);
                if sender.send((section.index, record)).is_err() {
                    warn!("Exam {}: result dropped", section.index);
                }
            });
        });

        let mut writer = BatchWriter::new(sections.len());
        for (index, record) in receiver {
            writer.push(index, record)?;
        }
        let batch = writer.finish()?;
        let needs_review = batch.needs_review_count();

        info!(
            "Converted {} exams from {} pages, {} need review",
            batch.len(),
            document.page_count(),
            needs_review
        );

        Ok(ConversionOutput {
            batch,
            needs_review,
            page_count: document.page_count(),
            skipped_pages: document.skipped_pages().to_vec(),
            image_dir: exporter.map(|e| e.dir().to_path_buf()),
        })
    }
}

/// Everything one exam section needs, shared read-only across workers
struct SectionWorker<'a> {
    converter: &'a ReportConverter,
    locator: &'a FixedFieldLocator<'a>,
    assembler: &'a RecordAssembler,
    exporter: Option<&'a AuditImageExporter>,
    source: &'a [u8],
}

impl SectionWorker<'_> {
    fn process(&self, section: &ExamSection) -> ExamReportRecord {
        let template = &self.converter.options.template;
        let lines: Vec<String> = section.lines().map(|l| l.text()).collect();

        let fixed = self.locator.locate(section);
        let findings = self
            .converter
            .narrative
            .extract(&narrative_lines(&lines, template));

        let pages = section.page_numbers();
        let image = match self.exporter {
            Some(exporter) => match exporter.export(self.source, section.index, &pages) {
                Ok(link) => ImageOutcome::Exported(link),
                Err(e) => ImageOutcome::Failed(e),
            },
            None => ImageOutcome::Skipped,
        };

        self.assembler
            .assemble(section.index, pages, fixed, findings, image)
    }
}
