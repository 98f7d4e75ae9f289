//! Field extraction from exam sections
//!
//! Fixed fields are read relative to their labels; the radiology narrative
//! goes through deterministic pattern rules first and a fuzzy fallback
//! recognizer for whatever the rules leave unresolved.

pub mod fallback;
pub mod locator;
pub mod narrative;
pub mod patterns;
pub mod text;

pub use fallback::{Entity, EntityRecognizer, EntityValue, LexiconRecognizer};
pub use locator::{parse_date, FixedFieldLocator, FixedFieldSet};
pub use narrative::{narrative_lines, NarrativeExtractor};
pub use patterns::ScopedLine;
