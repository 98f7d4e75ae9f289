use super::{Attention, Birads, Breast, ClinicalField, Cnes, Cns, Extracted, FixedField};
use chrono::NaiveDate;
use std::fmt;

/// Why a record needs a human to look at it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "reason", rename_all = "snake_case"))]
pub enum ReviewReason {
    /// Label not found on the page
    MissingFixedField { field: FixedField },
    /// Label found but the value failed validation (e.g. CNS length)
    InvalidFixedField { field: FixedField, detail: String },
    /// Neither rule nor fallback produced a value
    UnresolvedClinicalField { field: ClinicalField },
    /// Only a low-confidence fallback value was found
    LowConfidence { field: ClinicalField, confidence: f32 },
    /// A rule captured a value outside the field's domain (e.g. BI-RADS 7)
    UnrecognizedClinicalValue { field: ClinicalField, raw: String },
    /// Audit image could not be rendered
    ImageExportFailure { detail: String },
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewReason::MissingFixedField { field } => write!(f, "missing {}", field),
            ReviewReason::InvalidFixedField { field, detail } => {
                write!(f, "invalid {}: {}", field, detail)
            }
            ReviewReason::UnresolvedClinicalField { field } => write!(f, "unresolved {}", field),
            ReviewReason::LowConfidence { field, confidence } => {
                write!(f, "low confidence {} ({:.2})", field, confidence)
            }
            ReviewReason::UnrecognizedClinicalValue { field, raw } => {
                write!(f, "unrecognized {} '{}'", field, raw)
            }
            ReviewReason::ImageExportFailure { detail } => {
                write!(f, "image export failed: {}", detail)
            }
        }
    }
}

/// Operator-facing tracking columns
///
/// Never computed by the converter; a separate tracking layer owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkflowFields {
    pub pending: bool,
    pub action_date: Option<NaiveDate>,
    pub action_result: Option<String>,
    pub observations: Option<String>,
}

impl Default for WorkflowFields {
    fn default() -> Self {
        Self {
            pending: true,
            action_date: None,
            action_result: None,
            observations: None,
        }
    }
}

/// Narrative fields of one exam, each tagged with its provenance
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ClinicalFindings {
    pub birads_right: Extracted<Birads>,
    pub birads_left: Extracted<Birads>,
    pub dense_right: Extracted<bool>,
    pub dense_left: Extracted<bool>,
    pub ultrasound_suggested: Extracted<bool>,
}

impl ClinicalFindings {
    pub fn birads(&self, side: Breast) -> &Extracted<Birads> {
        match side {
            Breast::Right => &self.birads_right,
            Breast::Left => &self.birads_left,
        }
    }

    pub fn density(&self, side: Breast) -> &Extracted<bool> {
        match side {
            Breast::Right => &self.dense_right,
            Breast::Left => &self.dense_left,
        }
    }
}

/// One mammography exam, as emitted to the output table
///
/// Assembled once per exam section and immutable afterwards; the
/// [`WorkflowFields`] are the only part a downstream tracker may replace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExamReportRecord {
    pub(crate) section_index: usize,
    pub(crate) pages: Vec<u32>,

    pub(crate) name: Option<String>,
    pub(crate) mother_name: Option<String>,
    pub(crate) birth_date: Option<NaiveDate>,
    pub(crate) cns: Option<Cns>,

    pub(crate) exam_date: Option<NaiveDate>,
    pub(crate) facility_name: Option<String>,
    pub(crate) cnes: Option<Cnes>,

    pub(crate) age: Option<u32>,

    pub(crate) findings: ClinicalFindings,
    /// Fallback values below this confidence are not projected
    #[cfg_attr(feature = "json", serde(skip))]
    pub(crate) min_confidence: f32,
    pub(crate) attention: Attention,
    pub(crate) ultrasound_suggested: Option<bool>,

    pub(crate) image_link: Option<String>,
    pub(crate) workflow: WorkflowFields,
    pub(crate) review: Vec<ReviewReason>,
}

impl ExamReportRecord {
    /// Position of the exam in the source document (0-based)
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    /// 1-based source pages of the exam
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mother_name(&self) -> Option<&str> {
        self.mother_name.as_deref()
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn cns(&self) -> Option<&Cns> {
        self.cns.as_ref()
    }

    pub fn exam_date(&self) -> Option<NaiveDate> {
        self.exam_date
    }

    pub fn facility_name(&self) -> Option<&str> {
        self.facility_name.as_deref()
    }

    pub fn cnes(&self) -> Option<&Cnes> {
        self.cnes.as_ref()
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn findings(&self) -> &ClinicalFindings {
        &self.findings
    }

    /// Trusted BI-RADS of one breast
    ///
    /// `None` unless the value came from a rule or from a fallback at or
    /// above the confidence threshold, so it agrees with the classification.
    pub fn birads(&self, side: Breast) -> Option<Birads> {
        self.findings.birads(side).trusted(self.min_confidence).copied()
    }

    /// Trusted density of one breast, gated like [`Self::birads`]
    pub fn dense_breast(&self, side: Breast) -> Option<bool> {
        self.findings.density(side).trusted(self.min_confidence).copied()
    }

    pub fn attention(&self) -> Attention {
        self.attention
    }

    /// `None` when the narrative could not settle the question
    pub fn ultrasound_suggested(&self) -> Option<bool> {
        self.ultrasound_suggested
    }

    pub fn image_link(&self) -> Option<&str> {
        self.image_link.as_deref()
    }

    pub fn workflow(&self) -> &WorkflowFields {
        &self.workflow
    }

    pub fn review_reasons(&self) -> &[ReviewReason] {
        &self.review
    }

    pub fn needs_review(&self) -> bool {
        !self.review.is_empty() || self.attention.is_needs_review()
    }

    /// Returns the record with its workflow columns replaced
    pub fn with_workflow(mut self, workflow: WorkflowFields) -> Self {
        self.workflow = workflow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttentionLevel;

    #[test]
    fn test_workflow_defaults() {
        let workflow = WorkflowFields::default();
        assert!(workflow.pending);
        assert!(workflow.action_date.is_none());
        assert!(workflow.action_result.is_none());
        assert!(workflow.observations.is_none());
    }

    #[test]
    fn test_with_workflow_keeps_clinical_fields() {
        let record = ExamReportRecord {
            section_index: 0,
            pages: vec![1],
            name: Some("MARIA".to_string()),
            mother_name: None,
            birth_date: None,
            cns: None,
            exam_date: None,
            facility_name: None,
            cnes: None,
            age: None,
            findings: ClinicalFindings {
                birads_right: Extracted::deterministic(Birads::Two),
                birads_left: Extracted::fallback(Birads::One, 0.45),
                ..Default::default()
            },
            min_confidence: 0.6,
            attention: Attention::Level(AttentionLevel::Routine),
            ultrasound_suggested: Some(false),
            image_link: None,
            workflow: WorkflowFields::default(),
            review: vec![],
        };

        let updated = record.clone().with_workflow(WorkflowFields {
            pending: false,
            observations: Some("contato realizado".to_string()),
            ..Default::default()
        });

        assert!(!updated.workflow().pending);
        assert_eq!(updated.birads(Breast::Right), Some(Birads::Two));
        assert_eq!(updated.birads(Breast::Left), None);
        assert_eq!(updated.attention(), record.attention());
    }

    #[test]
    fn test_review_reason_display() {
        let reason = ReviewReason::LowConfidence {
            field: ClinicalField::Birads(Breast::Left),
            confidence: 0.42,
        };
        assert_eq!(reason.to_string(), "low confidence birads_left (0.42)");

        let reason = ReviewReason::UnrecognizedClinicalValue {
            field: ClinicalField::Birads(Breast::Right),
            raw: "7".to_string(),
        };
        assert_eq!(reason.to_string(), "unrecognized birads_right '7'");
    }
}
