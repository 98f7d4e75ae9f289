use super::patterns::ScopedLine;
use crate::types::{Birads, Breast, ClinicalField};
use log::debug;

/// Value recognized for a clinical field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityValue {
    Birads(Birads),
    Flag(bool),
}

/// Recognized value with a confidence in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub value: EntityValue,
    pub confidence: f32,
}

/// Spelling-tolerant recognizer invoked per unresolved field
///
/// A trained entity model can replace the default lexicon without touching
/// the rule layer.
pub trait EntityRecognizer: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Recognizes `field` in the scoped narrative, if possible
    fn recognize(&self, field: ClinicalField, lines: &[ScopedLine]) -> Option<Entity>;
}

const BIRADS_ANCHORS: &[&str] = &["categoria", "birads", "bi-rads"];
const DENSE_TERMS: &[&str] = &["densa", "densas", "denso", "densos"];
const FATTY_TERMS: &[&str] = &[
    "adiposa",
    "adiposas",
    "adiposo",
    "lipossubstituida",
    "liposubstituida",
];
const DENSITY_CONTEXT: &[&str] = &["mama", "mamas", "tipo", "parenquima", "composicao"];
const ULTRASOUND_TERMS: &[&str] = &["ultrassonografia", "ultrasonografia", "ultrassom", "ecografia"];
const CUE_TERMS: &[&str] = &[
    "sugere-se",
    "recomenda-se",
    "complementar",
    "complementacao",
    "complemento",
    "sugerimos",
    "recomendamos",
    "recomendacoes",
];

/// Fuzzy lexicon recognizer
///
/// # Algorithm
///
/// - BI-RADS: a token within two edits of `categoria`/`birads`, followed
///   within two tokens by a category; common OCR confusions on the digit
///   (`l`/`i`/`|` → 1, `o` → 0, `s` → 5, `z` → 2) are undone
/// - Density: a token close to `densa` or `adiposa`
/// - Ultrasound: a token close to `ultrassonografia`, counted as a
///   suggestion when the line carries a recommendation cue
///
/// Confidence starts at `base_confidence` and drops by `edit_penalty` for
/// every edit or character substitution needed.
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconRecognizer {
    pub base_confidence: f32,
    pub edit_penalty: f32,
}

impl Default for LexiconRecognizer {
    fn default() -> Self {
        Self {
            base_confidence: 0.9,
            edit_penalty: 0.15,
        }
    }
}

/// Smallest edit distance between `token` and any term, if within `max`
fn closest(token: &str, terms: &[&str], max: usize) -> Option<usize> {
    terms
        .iter()
        .map(|t| strsim::levenshtein(token, t))
        .filter(|d| *d <= max)
        .min()
}

fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Undoes OCR confusions on the leading digit; returns the repaired token
/// and the number of substitutions
pub(crate) fn repair_category(token: &str) -> (String, usize) {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return (String::new(), 0);
    };
    let (digit, subs) = match first {
        'l' | 'i' | '|' => ('1', 1),
        'o' => ('0', 1),
        's' => ('5', 1),
        'z' => ('2', 1),
        other => (other, 0),
    };
    let mut repaired = String::with_capacity(token.len());
    repaired.push(digit);
    repaired.extend(chars);
    (repaired, subs)
}

impl LexiconRecognizer {
    fn confidence(&self, penalties: usize) -> f32 {
        (self.base_confidence - self.edit_penalty * penalties as f32).clamp(0.0, 1.0)
    }

    fn side_lines<'l>(lines: &'l [ScopedLine], side: Breast) -> impl Iterator<Item = &'l ScopedLine> {
        lines
            .iter()
            .filter(move |l| l.scope == Some(side))
            .chain(lines.iter().filter(|l| l.scope.is_none()))
    }

    fn birads(&self, lines: &[ScopedLine], side: Breast) -> Option<Entity> {
        for line in Self::side_lines(lines, side) {
            let toks = tokens(&line.text);
            for (i, tok) in toks.iter().enumerate() {
                if tok.len() < 5 {
                    continue;
                }
                let Some(edits) = closest(tok, BIRADS_ANCHORS, 2) else {
                    continue;
                };
                for candidate in toks.iter().skip(i + 1).take(2) {
                    let (repaired, subs) = repair_category(candidate);
                    if let Ok(birads) = Birads::parse(&repaired) {
                        return Some(Entity {
                            value: EntityValue::Birads(birads),
                            confidence: self.confidence(edits + subs),
                        });
                    }
                }
            }
        }
        None
    }

    fn density(&self, lines: &[ScopedLine], side: Breast) -> Option<Entity> {
        for line in Self::side_lines(lines, side) {
            let toks = tokens(&line.text);
            let in_context = toks
                .iter()
                .any(|t| closest(t, DENSITY_CONTEXT, 1).is_some());
            let context_penalty = if in_context { 0 } else { 1 };

            for tok in &toks {
                if tok.len() < 5 {
                    continue;
                }
                if let Some(edits) = closest(tok, DENSE_TERMS, 1) {
                    return Some(Entity {
                        value: EntityValue::Flag(true),
                        confidence: self.confidence(edits + context_penalty),
                    });
                }
                if let Some(edits) = closest(tok, FATTY_TERMS, 2) {
                    return Some(Entity {
                        value: EntityValue::Flag(false),
                        confidence: self.confidence(edits + context_penalty),
                    });
                }
            }
        }
        None
    }

    fn ultrasound(&self, lines: &[ScopedLine]) -> Option<Entity> {
        let mut mention: Option<usize> = None;
        for line in lines {
            let toks = tokens(&line.text);
            let Some(edits) = toks
                .iter()
                .filter(|t| t.len() >= 6)
                .filter_map(|t| closest(t, ULTRASOUND_TERMS, 3))
                .min()
            else {
                continue;
            };

            let cued = line.recommendation
                || toks.iter().any(|t| closest(t, CUE_TERMS, 2).is_some());
            if cued {
                return Some(Entity {
                    value: EntityValue::Flag(true),
                    confidence: self.confidence(edits),
                });
            }
            mention = Some(mention.map_or(edits, |m| m.min(edits)));
        }

        // Mentioned but never recommended, e.g. a prior exam
        mention.map(|edits| Entity {
            value: EntityValue::Flag(false),
            confidence: self.confidence(edits + 1),
        })
    }
}

impl EntityRecognizer for LexiconRecognizer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn recognize(&self, field: ClinicalField, lines: &[ScopedLine]) -> Option<Entity> {
        let entity = match field {
            ClinicalField::Birads(side) => self.birads(lines, side),
            ClinicalField::Density(side) => self.density(lines, side),
            ClinicalField::UltrasoundSuggested => self.ultrasound(lines),
        };
        if let Some(entity) = &entity {
            debug!(
                "{} recognized {:?} for {} (confidence {:.2})",
                self.name(),
                entity.value,
                field,
                entity.confidence
            );
        }
        entity
    }
}
