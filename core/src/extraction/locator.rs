use super::text::{fold, folded_label_matches, heading_matches, tokenize};
use crate::document::ExamSection;
use crate::types::{Cnes, Cns, FixedField, LayoutTemplate, ReviewReason};
use chrono::NaiveDate;
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Fixed fields of one exam, each present only if found and valid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedFieldSet {
    pub name: Option<String>,
    pub mother_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub cns: Option<Cns>,
    pub exam_date: Option<NaiveDate>,
    pub facility_name: Option<String>,
    pub cnes: Option<Cnes>,

    /// One entry per missing or invalid field
    pub review: Vec<ReviewReason>,

    /// Lines outside the narrative that carried no known label
    pub unprocessed_lines: usize,
}

impl FixedFieldSet {
    /// Number of fields flagged missing
    pub fn missing_count(&self) -> usize {
        self.review
            .iter()
            .filter(|r| matches!(r, ReviewReason::MissingFixedField { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Field(FixedField),
    Stop,
}

#[derive(Debug, Clone, Copy)]
struct LabelHit {
    kind: LabelKind,
    first_token: usize,
    token_count: usize,
}

/// A label text with every anchor that uses it
#[derive(Debug, Clone)]
struct CompiledLabel {
    folded: String,
    tokens: usize,
    owners: Vec<(FixedField, Option<String>)>,
}

/// Extracts fields whose position is stable across the export template
///
/// Values are found relative to their label, never by absolute position:
/// the value is the text following the label on the same line up to the
/// next known label, or the next line when that text is empty. Labels
/// shared between sections (`Nome:`) are resolved through the section
/// heading currently in effect.
///
/// # Example
///
/// ```
/// use mamoscan_core::{FixedField, LayoutTemplate};
/// use mamoscan_core::extraction::FixedFieldLocator;
///
/// let template = LayoutTemplate::siscan_mammography_v1();
/// let locator = FixedFieldLocator::new(&template);
/// let lines = vec![
///     "PACIENTE".to_string(),
///     "Nome: MARIA DA SILVA Sexo: F".to_string(),
/// ];
///
/// let (values, _) = locator.raw_values(&lines);
/// assert_eq!(values[&FixedField::Name], "MARIA DA SILVA");
/// ```
pub struct FixedFieldLocator<'a> {
    template: &'a LayoutTemplate,
    labels: Vec<CompiledLabel>,
}

impl<'a> FixedFieldLocator<'a> {
    pub fn new(template: &'a LayoutTemplate) -> Self {
        let mut labels: Vec<CompiledLabel> = Vec::new();

        let mut add = |text: &str, owner: Option<(FixedField, Option<String>)>| {
            let folded = fold(text);
            if folded.is_empty() {
                return;
            }
            let entry = match labels.iter_mut().position(|l| l.folded == folded) {
                Some(i) => &mut labels[i],
                None => {
                    labels.push(CompiledLabel {
                        tokens: folded.split(' ').count(),
                        folded,
                        owners: Vec::new(),
                    });
                    let last = labels.len() - 1;
                    &mut labels[last]
                }
            };
            if let Some(owner) = owner {
                entry.owners.push(owner);
            }
        };

        for anchor in &template.fields {
            for label in &anchor.labels {
                add(label, Some((anchor.field, anchor.section.clone())));
            }
        }
        for label in &template.stop_labels {
            add(label, None);
        }

        // Longest labels first so "Nome da Mãe:" wins over "Nome:"
        labels.sort_by(|a, b| {
            b.tokens
                .cmp(&a.tokens)
                .then(b.folded.len().cmp(&a.folded.len()))
        });

        Self { template, labels }
    }

    /// Returns the template section a line opens, if it is a heading
    pub fn section_heading(&self, line: &str) -> Option<&'a str> {
        let template: &'a LayoutTemplate = self.template;
        template
            .sections
            .iter()
            .find(|s| heading_matches(line, s, template.max_label_edits))
            .map(String::as_str)
    }

    fn is_banner(&self, line: &str) -> bool {
        let edits = self.template.max_label_edits;
        heading_matches(line, &self.template.section_marker, edits)
            || self
                .template
                .ignore_lines
                .iter()
                .any(|l| heading_matches(line, l, edits))
    }

    fn find_labels(&self, folded_tokens: &[String], section: Option<&str>) -> Vec<LabelHit> {
        let edits = self.template.max_label_edits;
        let n = folded_tokens.len();
        let mut hits = Vec::new();
        let mut i = 0;

        while i < n {
            let mut found: Option<LabelHit> = None;
            for label in &self.labels {
                if label.tokens > n - i {
                    continue;
                }
                let candidate = folded_tokens[i..i + label.tokens].join(" ");
                if folded_label_matches(&candidate, &label.folded, edits) {
                    let kind = label
                        .owners
                        .iter()
                        .find(|(_, s)| s.is_none() || s.as_deref() == section)
                        .map(|(f, _)| LabelKind::Field(*f))
                        .unwrap_or(LabelKind::Stop);
                    found = Some(LabelHit {
                        kind,
                        first_token: i,
                        token_count: label.tokens,
                    });
                    break;
                }
            }

            // Unknown "Something:" tokens still end the preceding value
            if found.is_none() && folded_tokens[i].len() > 1 && folded_tokens[i].ends_with(':') {
                found = Some(LabelHit {
                    kind: LabelKind::Stop,
                    first_token: i,
                    token_count: 1,
                });
            }

            match found {
                Some(hit) => {
                    i += hit.token_count;
                    hits.push(hit);
                }
                None => i += 1,
            }
        }
        hits
    }

    /// Finds the raw text of every anchored field in reading order
    ///
    /// The first occurrence of a field wins. Returns the values and the
    /// number of lines outside the narrative section that matched nothing.
    pub fn raw_values(&self, lines: &[String]) -> (BTreeMap<FixedField, String>, usize) {
        let mut values: BTreeMap<FixedField, String> = BTreeMap::new();
        let mut section: Option<&str> = None;
        let mut awaiting: Option<FixedField> = None;
        let mut unprocessed = 0;

        for line in lines {
            if let Some(heading) = self.section_heading(line) {
                section = Some(heading);
                awaiting = None;
                continue;
            }
            if self.is_banner(line) {
                continue;
            }

            let tokens = tokenize(line);
            let folded: Vec<String> = tokens.iter().map(|t| fold(t.text)).collect();
            let hits = self.find_labels(&folded, section);

            let value_of = |from: usize, to: usize| -> String {
                if from >= to {
                    return String::new();
                }
                line[tokens[from].start..tokens[to - 1].end].trim().to_string()
            };

            if let Some(field) = awaiting.take() {
                let end = hits.first().map(|h| h.first_token).unwrap_or(tokens.len());
                let value = value_of(0, end);
                if !value.is_empty() {
                    debug!("{} taken from the line below its label", field);
                    values.entry(field).or_insert(value);
                    if hits.is_empty() {
                        continue;
                    }
                }
            }

            if hits.is_empty() {
                if section != Some(self.template.narrative_section.as_str()) {
                    debug!("No label on line: {}", line);
                    unprocessed += 1;
                }
                continue;
            }

            for (k, hit) in hits.iter().enumerate() {
                let LabelKind::Field(field) = hit.kind else {
                    continue;
                };
                if values.contains_key(&field) {
                    continue;
                }
                let end = hits
                    .get(k + 1)
                    .map(|h| h.first_token)
                    .unwrap_or(tokens.len());
                let value = value_of(hit.first_token + hit.token_count, end);
                if value.is_empty() {
                    awaiting = Some(field);
                } else {
                    values.insert(field, value);
                }
            }
        }

        (values, unprocessed)
    }

    /// Locates and validates all fixed fields of an exam section
    pub fn locate(&self, section: &ExamSection) -> FixedFieldSet {
        let lines: Vec<String> = section.lines().map(|l| l.text()).collect();
        let set = self.locate_lines(&lines);
        if set.unprocessed_lines > 0 {
            warn!(
                "Exam {}: {} lines matched no known label",
                section.index, set.unprocessed_lines
            );
        }
        let missing = set.missing_count();
        if missing > 0 {
            warn!("Exam {}: {} fixed fields missing", section.index, missing);
        }
        set
    }

    /// Same as [`FixedFieldLocator::locate`], from already joined lines
    pub fn locate_lines(&self, lines: &[String]) -> FixedFieldSet {
        let (values, unprocessed_lines) = self.raw_values(lines);
        let mut set = FixedFieldSet {
            unprocessed_lines,
            ..Default::default()
        };

        for field in FixedField::ALL {
            let Some(raw) = values.get(&field) else {
                set.review.push(ReviewReason::MissingFixedField { field });
                continue;
            };
            if let Err(detail) = set.assign(field, raw) {
                debug!("Rejected {} value '{}': {}", field, raw, detail);
                set.review
                    .push(ReviewReason::InvalidFixedField { field, detail });
            }
        }
        set
    }
}

impl FixedFieldSet {
    fn assign(&mut self, field: FixedField, raw: &str) -> Result<(), String> {
        match field {
            FixedField::Name => self.name = Some(clean_text(raw)?),
            FixedField::MotherName => self.mother_name = Some(clean_text(raw)?),
            FixedField::FacilityName => self.facility_name = Some(clean_text(raw)?),
            FixedField::BirthDate => self.birth_date = Some(parse_date(raw)?),
            FixedField::ExamDate => self.exam_date = Some(parse_date(raw)?),
            FixedField::Cns => self.cns = Some(Cns::normalize(raw)?),
            FixedField::Cnes => self.cnes = Some(Cnes::normalize(raw)?),
        }
        Ok(())
    }
}

fn clean_text(raw: &str) -> Result<String, String> {
    let cleaned = raw
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | ','))
        .to_string();
    if cleaned.is_empty() {
        return Err("empty value".to_string());
    }
    Ok(cleaned)
}

/// Parses the first dd/mm/yyyy (or dd/mm/yy) date in a value
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| {
        Regex::new(r"(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b")
            .expect("Failed to compile regex")
    });

    let caps = regex
        .captures(raw)
        .ok_or_else(|| format!("no date in '{}'", raw.trim()))?;
    let normalized = format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]);
    let format = if caps[3].len() == 4 { "%d/%m/%Y" } else { "%d/%m/%y" };
    NaiveDate::parse_from_str(&normalized, format)
        .map_err(|e| format!("invalid date '{}': {}", normalized, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentLoader;
    use crate::testing::{ExamFixture, ReportFixture};
    use rstest::rstest;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn siscan_lines() -> Vec<String> {
        lines(&[
            "SISCAN - Sistema de informação do Câncer",
            "LAUDO DO EXAME DE MAMOGRAFIA",
            "Emissão: 15/03/2024 Hora: 10:22 Página: 1/1",
            "UNIDADE DE SAÚDE",
            "Nome: UBS CENTRAL CNES: 2384299",
            "Município: RECIFE UF: PE",
            "PACIENTE",
            "Nome: MARIA DA SILVA",
            "Cartão SUS: 898 0012 3456 7890 Sexo: F",
            "Data do Nascimento: 10/05/1970 Idade: 53 anos",
            "Mãe: JOSEFA DA SILVA",
            "PRESTADOR DE SERVIÇO",
            "Nome: CLINICA IMAGEM CNES: 7654321",
            "RESULTADO EXAME",
            "Mama direita: Categoria 2 - Achados benignos",
        ])
    }

    #[test]
    fn test_locates_all_fields_of_a_siscan_page() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let set = FixedFieldLocator::new(&template).locate_lines(&siscan_lines());

        assert!(set.review.is_empty(), "{:?}", set.review);
        assert_eq!(set.name.as_deref(), Some("MARIA DA SILVA"));
        assert_eq!(set.mother_name.as_deref(), Some("JOSEFA DA SILVA"));
        assert_eq!(set.facility_name.as_deref(), Some("UBS CENTRAL"));
        assert_eq!(set.cnes.as_ref().map(Cnes::as_str), Some("2384299"));
        assert_eq!(set.cns.as_ref().map(Cns::as_str), Some("898001234567890"));
        assert_eq!(set.birth_date, NaiveDate::from_ymd_opt(1970, 5, 10));
        assert_eq!(set.exam_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(set.unprocessed_lines, 0);
    }

    #[test]
    fn test_value_on_next_line() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let locator = FixedFieldLocator::new(&template);
        let (values, _) = locator.raw_values(&lines(&[
            "PACIENTE",
            "Nome:",
            "MARIA DA SILVA",
            "Mãe: Sexo: F",
            "JOSEFA",
        ]));

        assert_eq!(values[&FixedField::Name], "MARIA DA SILVA");
        assert_eq!(values[&FixedField::MotherName], "JOSEFA");
    }

    #[test]
    fn test_labels_tolerate_case_accents_and_one_edit() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let locator = FixedFieldLocator::new(&template);
        let (values, _) = locator.raw_values(&lines(&[
            "paciente",
            "CARTAO SU5: 898001234567890",
            "Data do Nascimenfo: 01/02/1960",
            "Emissao: 02/03/2024",
        ]));

        assert_eq!(values[&FixedField::Cns], "898001234567890");
        assert_eq!(values[&FixedField::BirthDate], "01/02/1960");
        assert_eq!(values[&FixedField::ExamDate], "02/03/2024");
    }

    #[test]
    fn test_shared_label_resolved_by_section() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let locator = FixedFieldLocator::new(&template);
        let (values, _) = locator.raw_values(&lines(&[
            "PRESTADOR DE SERVIÇO",
            "Nome: CLINICA IMAGEM",
            "UNIDADE DE SAÚDE",
            "Nome: UBS CENTRAL",
        ]));

        assert_eq!(values[&FixedField::FacilityName], "UBS CENTRAL");
        assert!(!values.contains_key(&FixedField::Name));
    }

    #[test]
    fn test_unreadable_cns_is_flagged_not_truncated() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let mut raw = siscan_lines();
        raw[8] = "Cartão SUS: 898 0012 34?? Sexo: F".to_string();

        let set = FixedFieldLocator::new(&template).locate_lines(&raw);

        assert!(set.cns.is_none());
        assert_eq!(set.review.len(), 1);
        assert!(matches!(
            set.review[0],
            ReviewReason::InvalidFixedField {
                field: FixedField::Cns,
                ..
            }
        ));
        assert_eq!(set.name.as_deref(), Some("MARIA DA SILVA"));
    }

    #[test]
    fn test_missing_label_is_left_absent() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let raw: Vec<String> = siscan_lines()
            .into_iter()
            .filter(|l| !l.starts_with("Mãe"))
            .collect();

        let set = FixedFieldLocator::new(&template).locate_lines(&raw);

        assert!(set.mother_name.is_none());
        assert_eq!(set.missing_count(), 1);
        assert_eq!(
            set.review,
            vec![ReviewReason::MissingFixedField {
                field: FixedField::MotherName
            }]
        );
    }

    #[test]
    fn test_unlabelled_lines_are_counted() {
        let template = LayoutTemplate::siscan_mammography_v1();
        let mut raw = siscan_lines();
        raw.insert(7, "linha sem rótulo".to_string());
        raw.push("texto livre do laudo".to_string());

        let set = FixedFieldLocator::new(&template).locate_lines(&raw);
        assert_eq!(set.unprocessed_lines, 1);
    }

    #[test]
    fn test_locate_from_loaded_section() {
        let bytes = ReportFixture::new()
            .exam(ExamFixture::default().name("ANA SOUZA").cns("700 0000 0000 0001"))
            .build();
        let template = LayoutTemplate::siscan_mammography_v1();
        let document = DocumentLoader::new(&template).load(bytes).unwrap();

        let set = FixedFieldLocator::new(&template).locate(&document.sections()[0]);

        assert!(set.review.is_empty(), "{:?}", set.review);
        assert_eq!(set.name.as_deref(), Some("ANA SOUZA"));
        assert_eq!(set.cns.as_ref().map(Cns::as_str), Some("700000000000001"));
    }

    #[rstest]
    #[case("10/05/1970", NaiveDate::from_ymd_opt(1970, 5, 10))]
    #[case(" 01-02-1960 ", NaiveDate::from_ymd_opt(1960, 2, 1))]
    #[case("15/03/24", NaiveDate::from_ymd_opt(2024, 3, 15))]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<NaiveDate>) {
        assert_eq!(parse_date(raw).ok(), expected);
    }

    #[test]
    fn test_parse_date_rejects_impossible_dates() {
        assert!(parse_date("31/02/2020").is_err());
        assert!(parse_date("sem data").is_err());
    }
}
