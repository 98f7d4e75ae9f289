//! Core type definitions for mammography report conversion
//!
//! This module provides the fundamental types used throughout the mamoscan library:
//! - [`Birads`]: BI-RADS assessment category with 4a/4b/4c subdivisions
//! - [`Breast`]: Side a clinical finding refers to
//! - [`Attention`]: Classifier outcome (attention level or needs review)
//! - [`Extracted`]: Narrative value tagged with its provenance
//! - [`Cns`] / [`Cnes`]: Normalized national health identifiers
//! - [`LayoutTemplate`]: Versioned description of the export layout
//! - [`ConversionOptions`]: Settings for one conversion run
//! - [`ExamReportRecord`]: One output row

mod birads;
mod enums;
mod extracted;
mod identifiers;
mod options;
mod record;
mod template;

pub use birads::{Birads, Subcategory};
pub use enums::{Attention, AttentionLevel, Breast, ClinicalField, FixedField};
pub use extracted::{Extracted, Provenance};
pub use identifiers::{Cnes, Cns};
pub use options::{AgeReference, ConversionOptions};
pub use record::{ClinicalFindings, ExamReportRecord, ReviewReason, WorkflowFields};
pub use template::{FieldAnchor, LayoutTemplate};
