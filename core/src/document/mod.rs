//! Report document loading
//!
//! Turns the exported PDF into exam sections made of positioned text lines:
//! - [`content`]: content-stream interpreter producing [`TextRun`]s
//! - [`layout`]: line grouping by vertical proximity
//! - [`loader`]: page reading and exam section detection

pub mod content;
pub mod layout;
pub mod loader;

pub use layout::{group_lines, BoundingBox, TextLine, TextRun};
pub use loader::{DocumentLoader, ExamSection, LoadedDocument, PageText};
