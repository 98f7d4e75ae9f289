/// How a narrative field was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Provenance {
    Deterministic,
    Fallback,
    Unresolved,
    Rejected,
}

/// A narrative field value tagged with the layer that produced it
///
/// Unresolved values carry no default: consumers decide what an absent
/// clinical value means.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "source", rename_all = "lowercase"))]
pub enum Extracted<T> {
    /// Matched by a pattern rule
    Deterministic { value: T },
    /// Recognized by the fuzzy fallback, with a confidence in [0, 1]
    Fallback { value: T, confidence: f32 },
    Unresolved,
    /// A rule matched but captured a token outside the field's domain
    Rejected { raw: String },
}

impl<T> Extracted<T> {
    pub fn deterministic(value: T) -> Self {
        Extracted::Deterministic { value }
    }

    pub fn fallback(value: T, confidence: f32) -> Self {
        Extracted::Fallback {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn rejected(raw: impl Into<String>) -> Self {
        Extracted::Rejected { raw: raw.into() }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            Extracted::Deterministic { .. } => Provenance::Deterministic,
            Extracted::Fallback { .. } => Provenance::Fallback,
            Extracted::Unresolved => Provenance::Unresolved,
            Extracted::Rejected { .. } => Provenance::Rejected,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Extracted::Unresolved)
    }

    /// Returns the value regardless of provenance
    pub fn value(&self) -> Option<&T> {
        match self {
            Extracted::Deterministic { value } | Extracted::Fallback { value, .. } => Some(value),
            Extracted::Unresolved | Extracted::Rejected { .. } => None,
        }
    }

    /// Confidence of the value: 1.0 for rule matches, 0.0 without a value
    pub fn confidence(&self) -> f32 {
        match self {
            Extracted::Deterministic { .. } => 1.0,
            Extracted::Fallback { confidence, .. } => *confidence,
            Extracted::Unresolved | Extracted::Rejected { .. } => 0.0,
        }
    }

    /// Returns the value only if its confidence reaches `min_confidence`
    pub fn trusted(&self, min_confidence: f32) -> Option<&T> {
        self.value().filter(|_| self.confidence() >= min_confidence)
    }

    /// Keeps `self` unless it is [`Extracted::Unresolved`], otherwise
    /// evaluates `other`; a rejected value is kept
    pub fn or_else(self, other: impl FnOnce() -> Extracted<T>) -> Extracted<T> {
        match self {
            Extracted::Unresolved => other(),
            resolved => resolved,
        }
    }
}

impl<T: Copy> Extracted<T> {
    pub fn copied_value(&self) -> Option<T> {
        self.value().copied()
    }
}

impl<T> Default for Extracted<T> {
    fn default() -> Self {
        Extracted::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_filters_low_confidence_fallback() {
        let strong = Extracted::fallback(3u8, 0.9);
        let weak = Extracted::fallback(3u8, 0.3);

        assert_eq!(strong.trusted(0.6), Some(&3));
        assert_eq!(weak.trusted(0.6), None);
        assert_eq!(Extracted::deterministic(2u8).trusted(0.99), Some(&2));
        assert_eq!(Extracted::<u8>::Unresolved.trusted(0.0), None);
    }

    #[test]
    fn test_or_else_only_runs_for_unresolved() {
        let resolved = Extracted::deterministic(1u8).or_else(|| panic!("must not run"));
        assert_eq!(resolved.provenance(), Provenance::Deterministic);

        let filled = Extracted::<u8>::Unresolved.or_else(|| Extracted::fallback(4, 0.7));
        assert_eq!(filled.provenance(), Provenance::Fallback);
        assert_eq!(filled.copied_value(), Some(4));

        let rejected = Extracted::<u8>::rejected("7").or_else(|| panic!("must not run"));
        assert_eq!(rejected.provenance(), Provenance::Rejected);
    }

    #[test]
    fn test_rejected_has_no_value() {
        let rejected = Extracted::<u8>::rejected("10");

        assert_eq!(rejected.value(), None);
        assert_eq!(rejected.trusted(0.0), None);
        assert_eq!(rejected.confidence(), 0.0);
        assert!(!rejected.is_unresolved());
    }

    #[test]
    fn test_fallback_confidence_is_clamped() {
        assert_eq!(Extracted::fallback(true, 1.7).confidence(), 1.0);
        assert_eq!(Extracted::fallback(true, -0.2).confidence(), 0.0);
    }
}
