//! Converts SISCAN mammography report exports into an outreach table
//!
//! A report export is one PDF holding many exams. Each exam becomes one
//! [`ExamReportRecord`]: identity fields are read at fixed label positions,
//! BI-RADS, breast density and ultrasound recommendations come from the
//! free-text result, and a deterministic cascade assigns the "Alterado"
//! outreach tier. Values the converter is unsure about are flagged for
//! review instead of guessed.
//!
//! ```no_run
//! use mamoscan_core::{ConversionOptions, ReportConverter};
//! use mamoscan_core::batch::table;
//!
//! let converter = ReportConverter::new(ConversionOptions::default())?;
//! let output = converter.convert_file("laudos.pdf".as_ref())?;
//! table::write_csv(&output.batch, std::io::stdout())?;
//! # Ok::<(), mamoscan_core::ConversionError>(())
//! ```

pub mod api;
pub mod audit;
pub mod batch;
pub mod classification;
pub mod cli;
pub mod document;
pub mod error;
pub mod extraction;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{ConversionOutput, ReportConverter};
pub use cli::report::TextReport;
pub use document::DocumentLoader;
pub use error::{ConversionError, Result};
pub use types::*;
