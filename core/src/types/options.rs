use crate::types::LayoutTemplate;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Date against which a patient's age is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum AgeReference {
    /// Age at the exam date; falls back to the reference date when the
    /// exam date is missing
    #[default]
    ExamDate,

    /// Age at the conversion's pinned reference date
    ReferenceDate,
}

/// Settings for one conversion run
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use mamoscan_core::{AgeReference, ConversionOptions};
///
/// let options = ConversionOptions::default()
///     .with_reference_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
///     .with_age_reference(AgeReference::ReferenceDate)
///     .with_workers(2);
///
/// assert_eq!(options.workers, Some(2));
/// assert_eq!(options.age_reference, AgeReference::ReferenceDate);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Layout template handed to the fixed-field locator
    pub template: LayoutTemplate,

    pub age_reference: AgeReference,

    /// Pinned once per conversion so a batch is reproducible
    pub reference_date: NaiveDate,

    /// Fallback values under this confidence are treated as unresolved
    pub min_fallback_confidence: f32,

    /// Size of the per-section worker pool; `None` uses the global pool
    pub workers: Option<usize>,

    /// Directory receiving audit images; export is skipped when `None`
    pub image_dir: Option<PathBuf>,

    /// Prefix for links written to the table; defaults to the file path
    pub link_base: Option<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            template: LayoutTemplate::siscan_mammography_v1(),
            age_reference: AgeReference::ExamDate,
            reference_date: chrono::Local::now().date_naive(),
            min_fallback_confidence: 0.6,
            workers: None,
            image_dir: None,
            link_base: None,
        }
    }
}

impl ConversionOptions {
    /// Builder: Set the layout template
    pub fn with_template(mut self, template: LayoutTemplate) -> Self {
        self.template = template;
        self
    }

    /// Builder: Set how age is computed
    pub fn with_age_reference(mut self, age_reference: AgeReference) -> Self {
        self.age_reference = age_reference;
        self
    }

    /// Builder: Pin the reference date
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Builder: Set the minimum trusted fallback confidence
    pub fn with_min_fallback_confidence(mut self, confidence: f32) -> Self {
        self.min_fallback_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Builder: Set the worker count (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    /// Builder: Export audit images into `dir`
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Builder: Prefix audit links with `base`
    pub fn with_link_base(mut self, base: impl Into<String>) -> Self {
        self.link_base = Some(base.into());
        self
    }
}
