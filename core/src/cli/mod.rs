//! Command-line interface of the `mamoscan` binary

pub mod report;

use crate::audit::{PageRenderer, PageSplitRenderer};
use crate::error::Result;
use crate::types::{AgeReference, ConversionOptions, LayoutTemplate};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line arguments for mamoscan
#[derive(Parser, Debug)]
#[command(name = "mamoscan")]
#[command(about = "Convert SISCAN mammography report exports into an outreach table")]
#[command(version)]
pub struct Cli {
    /// Report export (PDF)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Write the table and audit images into DIR instead of printing to stdout
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Layout template (JSON); the built-in SISCAN template is used otherwise
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Reference date for age computation (YYYY-MM-DD); defaults to today
    #[arg(long, value_name = "DATE")]
    pub reference_date: Option<NaiveDate>,

    /// Date the patient's age is computed against
    #[arg(long, default_value = "exam-date")]
    pub age_reference: AgeReferenceArg,

    /// Audit image format; PNG needs the `pdfium` feature
    #[arg(long, default_value = "pdf")]
    pub render: RenderFormat,

    /// URL prefix for audit image links
    #[arg(long, value_name = "URL")]
    pub link_base: Option<String>,

    /// Worker threads for per-exam processing
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds conversion options from the arguments
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConversionError::InvalidTemplate`] if `--template`
    /// cannot be loaded
    pub fn conversion_options(&self) -> Result<ConversionOptions> {
        let mut options =
            ConversionOptions::default().with_age_reference(self.age_reference.into());
        if let Some(path) = &self.template {
            options = options.with_template(load_template(path)?);
        }
        if let Some(date) = self.reference_date {
            options = options.with_reference_date(date);
        }
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        if let Some(dir) = self.image_dir() {
            options = options.with_image_dir(dir);
        }
        if let Some(base) = &self.link_base {
            options = options.with_link_base(base.clone());
        }
        Ok(options)
    }

    /// Audit page renderer selected by `--render`
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConversionError::Export`] if PNG rendering is
    /// requested and PDFium cannot be used
    pub fn renderer(&self) -> Result<Arc<dyn PageRenderer>> {
        match self.render {
            RenderFormat::Pdf => Ok(Arc::new(PageSplitRenderer)),
            RenderFormat::Png => png_renderer(),
        }
    }

    /// Input file name without extension, used to name outputs
    pub fn stem(&self) -> String {
        self.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "laudos".to_string())
    }

    /// Table file inside the output directory
    pub fn table_path(&self) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", self.stem(), self.format.extension())))
    }

    /// Audit image directory; images are only exported with `--output-dir`
    pub fn image_dir(&self) -> Option<PathBuf> {
        self.output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_pages", self.stem())))
    }
}

#[cfg(feature = "json")]
fn load_template(path: &Path) -> Result<LayoutTemplate> {
    LayoutTemplate::from_json_file(path)
}

#[cfg(not(feature = "json"))]
fn load_template(path: &Path) -> Result<LayoutTemplate> {
    Err(crate::error::ConversionError::InvalidTemplate(format!(
        "cannot read {}: template files require the 'json' feature",
        path.display()
    )))
}

#[cfg(feature = "pdfium")]
fn png_renderer() -> Result<Arc<dyn PageRenderer>> {
    use crate::audit::{PdfiumRenderer, DEFAULT_RENDER_DPI};
    Ok(Arc::new(PdfiumRenderer::new(DEFAULT_RENDER_DPI)?))
}

#[cfg(not(feature = "pdfium"))]
fn png_renderer() -> Result<Arc<dyn PageRenderer>> {
    Err(crate::error::ConversionError::Export(
        "PNG audit images require the 'pdfium' feature".to_string(),
    ))
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// Outreach table as CSV
    Csv,
    /// Full records as JSON
    Json,
}

impl OutputFormat {
    /// Extension of the table file written to the output directory
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Audit image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    /// Per-exam PDF holding the exam's source pages
    Pdf,
    /// PNG raster of the exam's pages
    Png,
}

/// Age reference options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AgeReferenceArg {
    /// Age on the exam (emission) date
    ExamDate,
    /// Age on the reference date
    ReferenceDate,
}

impl From<AgeReferenceArg> for AgeReference {
    fn from(arg: AgeReferenceArg) -> Self {
        match arg {
            AgeReferenceArg::ExamDate => AgeReference::ExamDate,
            AgeReferenceArg::ReferenceDate => AgeReference::ReferenceDate,
        }
    }
}
