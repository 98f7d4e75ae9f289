use super::fallback::repair_category;
use super::text::{fold, folded_label_matches};
use crate::types::{Birads, Breast};
use log::{debug, warn};
use regex::Regex;
use std::sync::OnceLock;

/// Narrative line with the breast it refers to
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedLine {
    /// `None` for text not tied to one side
    pub scope: Option<Breast>,

    /// Line belongs to a recommendations block
    pub recommendation: bool,

    /// Folded text, with any inline side prefix removed
    pub text: String,
}

/// Outcome of a rule search for one field
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMatch<T> {
    Found(T),
    /// Nothing the rules can read; the fallback may still resolve it
    NotFound,
    /// A trigger captured a token outside the field's domain
    Rejected(String),
}

impl<T> From<Option<T>> for RuleMatch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(RuleMatch::NotFound, RuleMatch::Found)
    }
}

/// Trigger phrases plus capture pattern
///
/// Both apply to folded (lowercase, accent-free) text. Rules are tried in
/// priority order and the first rule that captures decides the field.
#[derive(Debug)]
pub struct PatternRule {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    capture: Regex,
}

impl PatternRule {
    fn new(name: &'static str, triggers: &'static [&'static str], pattern: &str) -> Self {
        Self {
            name,
            triggers,
            capture: Regex::new(pattern).expect("Failed to compile regex"),
        }
    }

    /// True when any trigger phrase occurs in the folded line
    pub fn applies(&self, line: &str) -> bool {
        self.triggers.iter().any(|t| line.contains(t))
    }

    /// First capture group of the rule's pattern, if it matches
    pub fn capture<'t>(&self, line: &'t str) -> Option<&'t str> {
        self.capture
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    }
}

/// Phrases introducing a recommendation
pub const RECOMMENDATION_CUES: &[&str] = &[
    "sugere-se",
    "sugere se",
    "recomenda-se",
    "recomenda se",
    "complementar com",
    "complementacao com",
    "complemento com",
    "sugerimos",
    "recomendamos",
    "recomendacao",
    "recomendacoes",
];

/// Phrases that cancel a recommendation on the same line
const NEGATIONS: &[&str] = &[
    "nao ha necessidade",
    "sem necessidade",
    "dispensa",
    "nao se faz necessari",
];

/// Labels of statements about the whole exam
const GENERAL_LABELS: &[&str] = &[
    "conclusao",
    "impressao diagnostica",
    "birads",
    "bi-rads",
    "bi rads",
];

/// Headings opening a recommendations block
const RECOMMENDATION_HEADINGS: &[&str] = &["recomendacoes", "recomendacao", "conduta", "sugestao"];

/// BI-RADS rules, in priority order
pub fn birads_rules() -> &'static [PatternRule] {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            PatternRule::new(
                "categoria",
                &["categoria"],
                r"categoria\s*:?\s*(?:bi[\s\-]?rads\s*(?:®|\(r\))?\s*:?\s*)?([0-9a-z]+(?:\s?[abc]\b)?)",
            ),
            PatternRule::new(
                "bi-rads",
                &["birads", "bi-rads", "bi rads"],
                r"bi[\s\-]?rads\s*(?:®|\(r\))?\s*:?\s*(?:categoria\s*)?([0-9a-z]+(?:\s?[abc]\b)?)",
            ),
        ]
    })
}

/// Breast density rules, in priority order
pub fn density_rules() -> &'static [PatternRule] {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            PatternRule::new(
                "tipo de mama",
                &["tipo de mama", "tipo mama"],
                r"tipo\s+(?:de\s+)?mama\s*:?\s*([a-z][a-z ]*)",
            ),
            PatternRule::new(
                "composicao",
                &["composicao"],
                r"composicao(?:\s+mamaria)?\s*:?\s*(?:tipo\s*)?\(?([a-z0-9][a-z0-9 ]*)",
            ),
        ]
    })
}

/// Ultrasound mention rule
pub fn ultrasound_rule() -> &'static PatternRule {
    static RULE: OnceLock<PatternRule> = OnceLock::new();
    RULE.get_or_init(|| {
        PatternRule::new(
            "recomendacao de ultrassom",
            RECOMMENDATION_CUES,
            r"(ultra-?\s?s{1,2}onogra\w*|ultrass?om\w*|ecografi\w*|\busg\b)",
        )
    })
}

fn inline_side() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(?:mama\s+(direita|esquerda)|(md|me))\s*[:\-]\s*(.*)$")
            .expect("Failed to compile regex")
    })
}

fn side_heading(folded: &str) -> Option<Breast> {
    let folded = folded.trim_end_matches(':').trim_end();
    if folded_label_matches(folded, "mama direita", 1) {
        Some(Breast::Right)
    } else if folded_label_matches(folded, "mama esquerda", 1) {
        Some(Breast::Left)
    } else {
        None
    }
}

/// Upper-case line without digits or colon, e.g. "CLASSIFICAÇÃO RADIOLÓGICA"
fn is_block_heading(original: &str) -> bool {
    original.chars().any(char::is_alphabetic)
        && !original.chars().any(|c| c.is_lowercase() || c.is_ascii_digit() || c == ':')
}

/// Attaches a breast side to every narrative line
///
/// # Algorithm
///
/// 1. `MAMA DIREITA` / `MAMA ESQUERDA` alone on a line set the side for
///    the lines that follow
/// 2. Any other block heading clears the side; recommendation headings
///    additionally mark the following lines as recommendations
/// 3. A `Mama direita: ...` prefix scopes that line only
/// 4. A conclusion or BI-RADS statement without a side prefix is unscoped
///    and ends the current side block
pub fn scope_lines(lines: &[String]) -> Vec<ScopedLine> {
    let mut scoped = Vec::with_capacity(lines.len());
    let mut block_side: Option<Breast> = None;
    let mut in_recommendation = false;

    for original in lines {
        let folded = fold(original);
        if folded.is_empty() {
            continue;
        }

        if let Some(side) = side_heading(&folded) {
            block_side = Some(side);
            in_recommendation = false;
            continue;
        }

        if is_block_heading(original) {
            block_side = None;
            in_recommendation = RECOMMENDATION_HEADINGS
                .iter()
                .any(|h| folded.starts_with(h));
            continue;
        }

        if let Some(caps) = inline_side().captures(&folded) {
            let side = match caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) {
                Some("direita") | Some("md") => Breast::Right,
                _ => Breast::Left,
            };
            scoped.push(ScopedLine {
                scope: Some(side),
                recommendation: in_recommendation,
                text: caps.get(3).map(|m| m.as_str()).unwrap_or("").to_string(),
            });
            continue;
        }

        if GENERAL_LABELS.iter().any(|l| folded.starts_with(l)) {
            block_side = None;
        }

        scoped.push(ScopedLine {
            scope: block_side,
            recommendation: in_recommendation,
            text: folded,
        });
    }
    scoped
}

/// Lines for one side: the side's own lines first, then unscoped lines
fn side_passes(lines: &[ScopedLine], side: Breast) -> impl Iterator<Item = Vec<&ScopedLine>> {
    [Some(side), None]
        .into_iter()
        .map(move |pass| lines.iter().filter(|l| l.scope == pass).collect())
}

/// Whether an unparseable category token is a category with OCR confusions
fn ocr_confused_category(raw: &str) -> bool {
    let (repaired, subs) = repair_category(raw);
    subs > 0 && Birads::parse(&repaired).is_ok()
}

/// BI-RADS category of one breast
///
/// The first trigger with a capture decides. A captured token outside the
/// BI-RADS domain (`7`, `10`, `4d`, `indeterminada`) ends the search with
/// [`RuleMatch::Rejected`]: a wrong category must never be replaced by a
/// later, weaker match. A token that is a category misread by OCR (`l`,
/// `s`) ends it with [`RuleMatch::NotFound`] for the fallback to repair.
pub fn match_birads(lines: &[ScopedLine], side: Breast) -> RuleMatch<Birads> {
    for pass in side_passes(lines, side) {
        for rule in birads_rules() {
            for line in &pass {
                if !rule.applies(&line.text) {
                    continue;
                }
                let Some(raw) = rule.capture(&line.text) else {
                    continue;
                };
                return match Birads::parse(raw) {
                    Ok(birads) => {
                        debug!("BI-RADS {} {} via rule '{}'", side, birads, rule.name);
                        RuleMatch::Found(birads)
                    }
                    Err(_) if ocr_confused_category(raw) => {
                        debug!("BI-RADS {}: '{}' left to the fallback", side, raw);
                        RuleMatch::NotFound
                    }
                    Err(e) => {
                        warn!("BI-RADS {}: {}", side, e);
                        RuleMatch::Rejected(raw.to_string())
                    }
                };
            }
        }
    }
    RuleMatch::NotFound
}

/// Maps a breast type description to "dense"
pub fn classify_density(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.contains("dens") {
        Some(true)
    } else if ["adipos", "lipossubstitu", "liposubstitu", "esparsa"]
        .iter()
        .any(|t| value.contains(t))
    {
        Some(false)
    } else {
        match value {
            "c" | "d" => Some(true),
            "a" | "b" => Some(false),
            _ => None,
        }
    }
}

/// Loose check for density vocabulary, misspellings included
pub fn mentions_density_loosely(value: &str) -> bool {
    const TERMS: [(&str, usize); 3] = [("densa", 1), ("adiposa", 2), ("lipossubstituida", 3)];
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 5)
        .any(|t| {
            TERMS
                .iter()
                .any(|(term, max)| strsim::levenshtein(t, term) <= *max)
        })
}

/// Whether one breast is dense
///
/// An unknown breast type is [`RuleMatch::Rejected`] unless it resembles a
/// density term, in which case the fallback gets to read it.
pub fn match_density(lines: &[ScopedLine], side: Breast) -> RuleMatch<bool> {
    for pass in side_passes(lines, side) {
        for rule in density_rules() {
            for line in &pass {
                if !rule.applies(&line.text) {
                    continue;
                }
                let Some(raw) = rule.capture(&line.text) else {
                    continue;
                };
                return match classify_density(raw) {
                    Some(dense) => RuleMatch::Found(dense),
                    None if mentions_density_loosely(raw) => {
                        debug!("Breast type '{}' ({}) left to the fallback", raw, side);
                        RuleMatch::NotFound
                    }
                    None => {
                        warn!("Breast type '{}' ({}) not recognized", raw, side);
                        RuleMatch::Rejected(raw.to_string())
                    }
                };
            }
        }
    }
    RuleMatch::NotFound
}

fn negated(line: &str) -> bool {
    NEGATIONS.iter().any(|n| line.contains(n))
}

/// Loose check for ultrasound vocabulary, misspellings included
pub fn mentions_ultrasound_loosely(line: &str) -> bool {
    // "mamografia" is three edits from "ecografia"
    const TERMS: [(&str, usize); 3] = [("ultrassonografia", 3), ("ultrassom", 2), ("ecografia", 1)];
    line.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 6)
        .any(|t| {
            TERMS
                .iter()
                .any(|(term, max)| strsim::levenshtein(t, term) <= *max)
        })
}

/// Whether the narrative recommends an ultrasound
///
/// `Some(false)` only when nothing in the narrative even resembles an
/// ultrasound term; near-misses are left unresolved for the fallback
/// layer.
pub fn match_ultrasound(lines: &[ScopedLine]) -> Option<bool> {
    if lines.is_empty() {
        return None;
    }

    let rule = ultrasound_rule();
    let suggested = lines.iter().any(|line| {
        (line.recommendation || rule.applies(&line.text))
            && rule.capture(&line.text).is_some()
            && !negated(&line.text)
    });
    if suggested {
        debug!("Ultrasound suggested via rule '{}'", rule.name);
        return Some(true);
    }

    let near_miss = lines
        .iter()
        .any(|l| !negated(&l.text) && mentions_ultrasound_loosely(&l.text));
    if near_miss {
        None
    } else {
        Some(false)
    }
}
