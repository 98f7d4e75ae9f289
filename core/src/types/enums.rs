use std::fmt;

/// Breast side a clinical finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Breast {
    Right,
    Left,
}

impl fmt::Display for Breast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breast::Right => write!(f, "right"),
            Breast::Left => write!(f, "left"),
        }
    }
}

/// Outreach urgency tier ("Alterado")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum AttentionLevel {
    /// BI-RADS 1 or 2 on both sides, no density, no ultrasound suggestion
    Routine,
    /// BI-RADS 3 (or 0), dense breast or ultrasound suggested
    Attention,
    /// BI-RADS 4 (any subcategory), 5 or 6
    Urgent,
}

impl AttentionLevel {
    /// Numeric value written to the output table
    pub fn value(&self) -> u8 {
        match self {
            AttentionLevel::Routine => 0,
            AttentionLevel::Attention => 1,
            AttentionLevel::Urgent => 2,
        }
    }
}

impl fmt::Display for AttentionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Classifier outcome
///
/// `NeedsReview` is produced when a missing clinical value could hide a
/// higher level than the resolved values support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum Attention {
    Level(AttentionLevel),
    NeedsReview,
}

impl Attention {
    pub fn is_needs_review(&self) -> bool {
        matches!(self, Attention::NeedsReview)
    }

    /// Level used where only {0,1,2} can be written
    ///
    /// A record needing review is reported at the highest tier so that it is
    /// never deprioritised.
    pub fn conservative_level(&self) -> AttentionLevel {
        match self {
            Attention::Level(level) => *level,
            Attention::NeedsReview => AttentionLevel::Urgent,
        }
    }
}

impl fmt::Display for Attention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attention::Level(level) => write!(f, "{}", level),
            Attention::NeedsReview => write!(f, "needs review"),
        }
    }
}

/// Fields read from stable label positions of the export template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum FixedField {
    Name,
    MotherName,
    BirthDate,
    Cns,
    ExamDate,
    FacilityName,
    Cnes,
}

impl FixedField {
    pub const ALL: [FixedField; 7] = [
        FixedField::Name,
        FixedField::MotherName,
        FixedField::BirthDate,
        FixedField::Cns,
        FixedField::ExamDate,
        FixedField::FacilityName,
        FixedField::Cnes,
    ];

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            FixedField::Name => "name",
            FixedField::MotherName => "mother_name",
            FixedField::BirthDate => "birth_date",
            FixedField::Cns => "cns",
            FixedField::ExamDate => "exam_date",
            FixedField::FacilityName => "facility_name",
            FixedField::Cnes => "cnes",
        }
    }
}

impl fmt::Display for FixedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Fields read from the free-text narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum ClinicalField {
    Birads(Breast),
    Density(Breast),
    UltrasoundSuggested,
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicalField::Birads(side) => write!(f, "birads_{}", side),
            ClinicalField::Density(side) => write!(f, "dense_breast_{}", side),
            ClinicalField::UltrasoundSuggested => write!(f, "ultrasound_suggested"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attention_level_ordering_and_values() {
        assert!(AttentionLevel::Routine < AttentionLevel::Attention);
        assert!(AttentionLevel::Attention < AttentionLevel::Urgent);
        assert_eq!(AttentionLevel::Urgent.value(), 2);
    }

    #[test]
    fn test_needs_review_is_never_deprioritised() {
        assert_eq!(
            Attention::NeedsReview.conservative_level(),
            AttentionLevel::Urgent
        );
        assert_eq!(
            Attention::Level(AttentionLevel::Routine).conservative_level(),
            AttentionLevel::Routine
        );
    }

    #[test]
    fn test_field_names() {
        assert_eq!(ClinicalField::Birads(Breast::Left).to_string(), "birads_left");
        assert_eq!(FixedField::Cns.to_string(), "cns");
        assert_eq!(Breast::Right.to_string(), "right");
    }
}
