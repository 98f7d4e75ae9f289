use super::fallback::{Entity, EntityRecognizer, EntityValue, LexiconRecognizer};
use super::patterns::{
    match_birads, match_density, match_ultrasound, scope_lines, RuleMatch, ScopedLine,
};
use super::text::heading_matches;
use crate::types::{Birads, Breast, ClinicalField, ClinicalFindings, Extracted, LayoutTemplate};
use log::debug;

/// Lines of the radiology narrative within a section's text
///
/// The narrative runs from the template's narrative heading to the next
/// section heading. Without that heading every line that is neither a
/// heading nor a banner is taken.
pub fn narrative_lines(lines: &[String], template: &LayoutTemplate) -> Vec<String> {
    let edits = template.max_label_edits;
    let heading_of = |line: &str| -> Option<&str> {
        template
            .sections
            .iter()
            .find(|s| heading_matches(line, s, edits))
            .map(String::as_str)
    };
    let is_banner = |line: &str| {
        heading_matches(line, &template.section_marker, edits)
            || template
                .ignore_lines
                .iter()
                .any(|l| heading_matches(line, l, edits))
    };

    let has_heading = lines
        .iter()
        .any(|l| heading_of(l) == Some(template.narrative_section.as_str()));

    let mut inside = !has_heading;
    let mut narrative = Vec::new();
    for line in lines {
        if let Some(heading) = heading_of(line) {
            inside = !has_heading || heading == template.narrative_section;
            continue;
        }
        if inside && !is_banner(line) {
            narrative.push(line.clone());
        }
    }
    narrative
}

/// Reads BI-RADS, density and the ultrasound suggestion from the narrative
///
/// Pattern rules run first. Each field they leave unresolved is handed to
/// the [`EntityRecognizer`]; a value it returns is tagged as a fallback
/// with its confidence. A field whose rule captured an out-of-domain token
/// is [`Extracted::Rejected`] and never reaches the recognizer.
///
/// # Example
///
/// ```
/// use mamoscan_core::extraction::NarrativeExtractor;
/// use mamoscan_core::{Birads, Provenance};
///
/// let lines = vec![
///     "Mama direita: Categoria 2".to_string(),
///     "Mama esquerda: Categora 1".to_string(),
/// ];
/// let findings = NarrativeExtractor::new().extract(&lines);
///
/// assert_eq!(findings.birads_right.copied_value(), Some(Birads::Two));
/// assert_eq!(findings.birads_left.provenance(), Provenance::Fallback);
/// ```
pub struct NarrativeExtractor {
    recognizer: Box<dyn EntityRecognizer>,
}

impl Default for NarrativeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeExtractor {
    /// Extractor using the [`LexiconRecognizer`] fallback
    pub fn new() -> Self {
        Self::with_recognizer(Box::new(LexiconRecognizer::default()))
    }

    pub fn with_recognizer(recognizer: Box<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Extracts the clinical findings from narrative lines
    pub fn extract(&self, lines: &[String]) -> ClinicalFindings {
        let scoped = scope_lines(lines);

        let birads = |side: Breast| {
            Self::rule(match_birads(&scoped, side))
                .or_else(|| self.birads_fallback(ClinicalField::Birads(side), &scoped))
        };
        let density = |side: Breast| {
            Self::rule(match_density(&scoped, side))
                .or_else(|| self.flag_fallback(ClinicalField::Density(side), &scoped))
        };

        ClinicalFindings {
            birads_right: birads(Breast::Right),
            birads_left: birads(Breast::Left),
            dense_right: density(Breast::Right),
            dense_left: density(Breast::Left),
            ultrasound_suggested: Self::rule(RuleMatch::from(match_ultrasound(&scoped)))
                .or_else(|| self.flag_fallback(ClinicalField::UltrasoundSuggested, &scoped)),
        }
    }

    fn rule<T>(matched: RuleMatch<T>) -> Extracted<T> {
        match matched {
            RuleMatch::Found(value) => Extracted::deterministic(value),
            RuleMatch::NotFound => Extracted::Unresolved,
            RuleMatch::Rejected(raw) => Extracted::rejected(raw),
        }
    }

    fn recognize(&self, field: ClinicalField, lines: &[ScopedLine]) -> Option<Entity> {
        let entity = self.recognizer.recognize(field, lines);
        if entity.is_none() {
            debug!(
                "{} unresolved after fallback '{}'",
                field,
                self.recognizer.name()
            );
        }
        entity
    }

    fn birads_fallback(&self, field: ClinicalField, lines: &[ScopedLine]) -> Extracted<Birads> {
        match self.recognize(field, lines) {
            Some(Entity {
                value: EntityValue::Birads(birads),
                confidence,
            }) => Extracted::fallback(birads, confidence),
            _ => Extracted::Unresolved,
        }
    }

    fn flag_fallback(&self, field: ClinicalField, lines: &[ScopedLine]) -> Extracted<bool> {
        match self.recognize(field, lines) {
            Some(Entity {
                value: EntityValue::Flag(flag),
                confidence,
            }) => Extracted::fallback(flag, confidence),
            _ => Extracted::Unresolved,
        }
    }
}
