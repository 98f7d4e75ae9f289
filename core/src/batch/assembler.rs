use crate::audit::RenderError;
use crate::classification::classify_findings;
use crate::extraction::FixedFieldSet;
use crate::types::{
    AgeReference, ClinicalFindings, ExamReportRecord, FixedField, ReviewReason, WorkflowFields,
};
use chrono::NaiveDate;
use log::{debug, warn};

/// Outcome of the audit export for one exam
#[derive(Debug)]
pub enum ImageOutcome {
    /// Export not configured
    Skipped,
    Exported(String),
    Failed(RenderError),
}

/// Merges the per-exam results into one record
///
/// Only computes what follows from its inputs: age, attention level and
/// review reasons. Workflow columns start from their defaults.
#[derive(Debug, Clone, Copy)]
pub struct RecordAssembler {
    age_reference: AgeReference,
    reference_date: NaiveDate,
    min_fallback_confidence: f32,
}

impl RecordAssembler {
    pub fn new(
        age_reference: AgeReference,
        reference_date: NaiveDate,
        min_fallback_confidence: f32,
    ) -> Self {
        Self {
            age_reference,
            reference_date,
            min_fallback_confidence,
        }
    }

    /// Date the age is computed against
    fn age_date(&self, exam_date: Option<NaiveDate>) -> NaiveDate {
        match self.age_reference {
            AgeReference::ExamDate => exam_date.unwrap_or(self.reference_date),
            AgeReference::ReferenceDate => self.reference_date,
        }
    }

    /// Builds the record of the exam at `section_index`
    pub fn assemble(
        &self,
        section_index: usize,
        pages: Vec<u32>,
        fixed: FixedFieldSet,
        findings: ClinicalFindings,
        image: ImageOutcome,
    ) -> ExamReportRecord {
        let mut review = fixed.review;

        let age_date = self.age_date(fixed.exam_date);
        let age = match fixed.birth_date {
            Some(birth) => {
                let age = age_date.years_since(birth);
                if age.is_none() {
                    warn!(
                        "Exam {}: birth date {} is after {}",
                        section_index, birth, age_date
                    );
                    review.push(ReviewReason::InvalidFixedField {
                        field: FixedField::BirthDate,
                        detail: format!("{} is after {}", birth, age_date),
                    });
                }
                age
            }
            None => None,
        };

        let classification = classify_findings(&findings, self.min_fallback_confidence);
        review.extend(classification.review);

        let image_link = match image {
            ImageOutcome::Skipped => None,
            ImageOutcome::Exported(link) => Some(link),
            ImageOutcome::Failed(e) => {
                warn!("Exam {}: audit image export failed: {}", section_index, e);
                review.push(ReviewReason::ImageExportFailure {
                    detail: e.to_string(),
                });
                None
            }
        };

        debug!(
            "Exam {}: attention {}, {} review reasons",
            section_index,
            classification.attention,
            review.len()
        );

        ExamReportRecord {
            section_index,
            pages,
            name: fixed.name,
            mother_name: fixed.mother_name,
            birth_date: fixed.birth_date,
            cns: fixed.cns,
            exam_date: fixed.exam_date,
            facility_name: fixed.facility_name,
            cnes: fixed.cnes,
            age,
            findings,
            min_confidence: self.min_fallback_confidence,
            attention: classification.attention,
            ultrasound_suggested: classification.ultrasound_suggested,
            image_link,
            workflow: WorkflowFields::default(),
            review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attention, AttentionLevel, Birads, Extracted};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed() -> FixedFieldSet {
        FixedFieldSet {
            name: Some("MARIA DA SILVA".to_string()),
            birth_date: Some(date(1970, 5, 10)),
            exam_date: Some(date(2024, 3, 15)),
            ..Default::default()
        }
    }

    fn routine_findings() -> ClinicalFindings {
        ClinicalFindings {
            birads_right: Extracted::deterministic(Birads::Two),
            birads_left: Extracted::deterministic(Birads::One),
            dense_right: Extracted::deterministic(false),
            dense_left: Extracted::deterministic(false),
            ultrasound_suggested: Extracted::deterministic(false),
        }
    }

    fn assembler(reference: AgeReference) -> RecordAssembler {
        RecordAssembler::new(reference, date(2025, 6, 1), 0.6)
    }

    #[test]
    fn test_age_at_exam_date() {
        let record = assembler(AgeReference::ExamDate).assemble(
            0,
            vec![1],
            fixed(),
            routine_findings(),
            ImageOutcome::Skipped,
        );

        assert_eq!(record.age(), Some(53));
        assert_eq!(record.attention(), Attention::Level(AttentionLevel::Routine));
        assert_eq!(record.ultrasound_suggested(), Some(false));
        assert!(record.workflow().pending);
        assert!(record.image_link().is_none());
        assert!(!record.needs_review());
    }

    #[test]
    fn test_age_at_reference_date() {
        let record = assembler(AgeReference::ReferenceDate).assemble(
            0,
            vec![1],
            fixed(),
            routine_findings(),
            ImageOutcome::Skipped,
        );
        assert_eq!(record.age(), Some(55));
    }

    #[test]
    fn test_missing_exam_date_uses_reference_date() {
        let mut set = fixed();
        set.exam_date = None;
        let record = assembler(AgeReference::ExamDate).assemble(
            0,
            vec![1],
            set,
            routine_findings(),
            ImageOutcome::Skipped,
        );
        assert_eq!(record.age(), Some(55));
    }

    #[test]
    fn test_birth_after_exam_is_flagged() {
        let mut set = fixed();
        set.birth_date = Some(date(2030, 1, 1));
        let record = assembler(AgeReference::ExamDate).assemble(
            0,
            vec![1],
            set,
            routine_findings(),
            ImageOutcome::Skipped,
        );

        assert_eq!(record.age(), None);
        assert!(matches!(
            record.review_reasons()[0],
            ReviewReason::InvalidFixedField {
                field: FixedField::BirthDate,
                ..
            }
        ));
    }

    #[test]
    fn test_export_failure_degrades_the_record() {
        let record = assembler(AgeReference::ExamDate).assemble(
            3,
            vec![4, 5],
            fixed(),
            routine_findings(),
            ImageOutcome::Failed(RenderError::MissingPage(5)),
        );

        assert!(record.image_link().is_none());
        assert_eq!(record.section_index(), 3);
        assert_eq!(record.pages(), &[4, 5]);
        assert_eq!(record.name(), Some("MARIA DA SILVA"));
        assert!(matches!(
            record.review_reasons(),
            [ReviewReason::ImageExportFailure { .. }]
        ));
    }

    #[test]
    fn test_exported_link_is_kept() {
        let record = assembler(AgeReference::ExamDate).assemble(
            0,
            vec![1],
            fixed(),
            routine_findings(),
            ImageOutcome::Exported("out/0000_ab.pdf".to_string()),
        );
        assert_eq!(record.image_link(), Some("out/0000_ab.pdf"));
    }
}
