use crate::types::{
    Attention, AttentionLevel, Birads, Breast, ClinicalField, ClinicalFindings, Extracted,
    ReviewReason,
};
use log::debug;

/// Classifier inputs, `None` meaning unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifierInput {
    pub birads_right: Option<Birads>,
    pub birads_left: Option<Birads>,
    pub dense_right: Option<bool>,
    pub dense_left: Option<bool>,
    pub ultrasound_suggested: Option<bool>,
}

/// Classifier outcome for one record
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub attention: Attention,
    pub ultrasound_suggested: Option<bool>,

    /// Unresolved or untrusted clinical fields
    pub review: Vec<ReviewReason>,
}

fn gate<T: Copy>(
    value: &Extracted<T>,
    field: ClinicalField,
    min_confidence: f32,
    review: &mut Vec<ReviewReason>,
) -> Option<T> {
    match value {
        Extracted::Deterministic { value } => Some(*value),
        Extracted::Fallback { value, confidence } if *confidence >= min_confidence => Some(*value),
        Extracted::Fallback { confidence, .. } => {
            review.push(ReviewReason::LowConfidence {
                field,
                confidence: *confidence,
            });
            None
        }
        Extracted::Unresolved => {
            review.push(ReviewReason::UnresolvedClinicalField { field });
            None
        }
        Extracted::Rejected { raw } => {
            review.push(ReviewReason::UnrecognizedClinicalValue {
                field,
                raw: raw.clone(),
            });
            None
        }
    }
}

impl ClassifierInput {
    /// Builds classifier inputs from extracted findings
    ///
    /// Fallback values below `min_confidence` are dropped to `None`. Every
    /// value that ends up unknown yields one [`ReviewReason`].
    pub fn from_findings(
        findings: &ClinicalFindings,
        min_confidence: f32,
    ) -> (Self, Vec<ReviewReason>) {
        let mut review = Vec::new();
        let birads = |side: Breast, review: &mut Vec<ReviewReason>| {
            gate(
                findings.birads(side),
                ClinicalField::Birads(side),
                min_confidence,
                review,
            )
        };
        let birads_right = birads(Breast::Right, &mut review);
        let birads_left = birads(Breast::Left, &mut review);

        let dense_right = gate(
            &findings.dense_right,
            ClinicalField::Density(Breast::Right),
            min_confidence,
            &mut review,
        );
        let dense_left = gate(
            &findings.dense_left,
            ClinicalField::Density(Breast::Left),
            min_confidence,
            &mut review,
        );
        let ultrasound_suggested = gate(
            &findings.ultrasound_suggested,
            ClinicalField::UltrasoundSuggested,
            min_confidence,
            &mut review,
        );

        (
            Self {
                birads_right,
                birads_left,
                dense_right,
                dense_left,
                ultrasound_suggested,
            },
            review,
        )
    }

    fn birads(&self) -> [Option<Birads>; 2] {
        [self.birads_right, self.birads_left]
    }

    fn density(&self) -> [Option<bool>; 2] {
        [self.dense_right, self.dense_left]
    }
}

/// Computes the attention level
///
/// Missing inputs never lower the outcome: whenever an unknown value could
/// hide a higher level than the known values support, the result is
/// [`Attention::NeedsReview`].
///
/// # Algorithm
///
/// 1. Either BI-RADS suspicious (4, 4a, 4b, 4c, 5, 6) → Urgent
/// 2. Either BI-RADS unknown → NeedsReview
/// 3. Either BI-RADS 3 or 0, either breast dense, or ultrasound
///    suggested → Attention
/// 4. Density or ultrasound unknown → NeedsReview
/// 5. Otherwise → Routine
///
/// # Example
///
/// ```
/// use mamoscan_core::classification::{classify, ClassifierInput};
/// use mamoscan_core::{Attention, AttentionLevel, Birads};
///
/// let input = ClassifierInput {
///     birads_right: Some(Birads::Two),
///     birads_left: Some(Birads::One),
///     dense_right: Some(false),
///     dense_left: Some(false),
///     ultrasound_suggested: Some(false),
/// };
/// assert_eq!(classify(&input), Attention::Level(AttentionLevel::Routine));
/// ```
pub fn classify(input: &ClassifierInput) -> Attention {
    let birads = input.birads();
    let density = input.density();

    if birads.iter().flatten().any(Birads::is_suspicious) {
        return Attention::Level(AttentionLevel::Urgent);
    }
    if birads.iter().any(Option::is_none) {
        return Attention::NeedsReview;
    }
    if birads.iter().flatten().any(Birads::needs_follow_up)
        || density.contains(&Some(true))
        || input.ultrasound_suggested == Some(true)
    {
        return Attention::Level(AttentionLevel::Attention);
    }
    if density.contains(&None) || input.ultrasound_suggested.is_none() {
        return Attention::NeedsReview;
    }
    Attention::Level(AttentionLevel::Routine)
}

/// Gates the findings and classifies them
pub fn classify_findings(findings: &ClinicalFindings, min_confidence: f32) -> Classification {
    let (input, review) = ClassifierInput::from_findings(findings, min_confidence);
    let attention = classify(&input);
    debug!("Classified {:?} as {}", input, attention);
    Classification {
        attention,
        ultrasound_suggested: input.ultrasound_suggested,
        review,
    }
}
