use std::cmp::Ordering;
use std::fmt;

/// BI-RADS category 4 subdivision (low, moderate, high suspicion)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Subcategory {
    A,
    B,
    C,
}

impl Subcategory {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'a' => Some(Subcategory::A),
            'b' => Some(Subcategory::B),
            'c' => Some(Subcategory::C),
            _ => None,
        }
    }

    fn as_char(&self) -> char {
        match self {
            Subcategory::A => 'a',
            Subcategory::B => 'b',
            Subcategory::C => 'c',
        }
    }
}

/// BI-RADS assessment category for one breast
///
/// Ordered by [`Birads::rank`]: 0 < 1 < 2 < 3 < 4 < 4a < 4b < 4c < 5 < 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Birads {
    /// Incomplete, needs additional imaging
    Zero,
    One,
    Two,
    Three,
    Four(Option<Subcategory>),
    Five,
    Six,
}

impl Birads {
    /// Returns the integer category (0..=6), dropping any 4a/4b/4c subdivision
    pub fn category(&self) -> u8 {
        match self {
            Birads::Zero => 0,
            Birads::One => 1,
            Birads::Two => 2,
            Birads::Three => 3,
            Birads::Four(_) => 4,
            Birads::Five => 5,
            Birads::Six => 6,
        }
    }

    /// Position on the ordered scale, subcategories included
    pub fn rank(&self) -> u8 {
        match self {
            Birads::Zero => 0,
            Birads::One => 1,
            Birads::Two => 2,
            Birads::Three => 3,
            Birads::Four(None) => 4,
            Birads::Four(Some(Subcategory::A)) => 5,
            Birads::Four(Some(Subcategory::B)) => 6,
            Birads::Four(Some(Subcategory::C)) => 7,
            Birads::Five => 8,
            Birads::Six => 9,
        }
    }

    /// Suspicious or proven malignancy (4, any subcategory, 5 or 6)
    pub fn is_suspicious(&self) -> bool {
        self.category() >= 4
    }

    /// Probably benign (3) or incomplete (0)
    pub fn needs_follow_up(&self) -> bool {
        matches!(self, Birads::Zero | Birads::Three)
    }

    /// Parses a BI-RADS value as it appears in a report
    ///
    /// Accepts `"2"`, `"4a"`, `"4 A"`, `"4-b"`, `"4c."`. Anything outside
    /// the 0..=6 domain, or a subcategory on a category other than 4,
    /// is an error.
    ///
    /// # Errors
    ///
    /// Returns a description of the rejected token
    pub fn parse(s: &str) -> Result<Self, String> {
        let cleaned: String = s
            .trim()
            .trim_end_matches(['.', ',', ';', ')'])
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();

        let mut chars = cleaned.chars();
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| format!("Not a BI-RADS category: '{}'", s))?;
        let rest: Vec<char> = chars.collect();

        let sub = match rest.as_slice() {
            [] => None,
            [c] => Some(
                Subcategory::from_char(*c)
                    .ok_or_else(|| format!("Not a BI-RADS category: '{}'", s))?,
            ),
            _ => return Err(format!("Not a BI-RADS category: '{}'", s)),
        };

        match (digit, sub) {
            (0, None) => Ok(Birads::Zero),
            (1, None) => Ok(Birads::One),
            (2, None) => Ok(Birads::Two),
            (3, None) => Ok(Birads::Three),
            (4, sub) => Ok(Birads::Four(sub)),
            (5, None) => Ok(Birads::Five),
            (6, None) => Ok(Birads::Six),
            _ => Err(format!("BI-RADS category out of range: '{}'", s)),
        }
    }
}

impl PartialOrd for Birads {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Birads {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Birads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Birads::Four(Some(sub)) => write!(f, "4{}", sub.as_char()),
            other => write!(f, "{}", other.category()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", Birads::Zero)]
    #[case("2", Birads::Two)]
    #[case(" 3 ", Birads::Three)]
    #[case("4", Birads::Four(None))]
    #[case("4a", Birads::Four(Some(Subcategory::A)))]
    #[case("4 B", Birads::Four(Some(Subcategory::B)))]
    #[case("4-c.", Birads::Four(Some(Subcategory::C)))]
    #[case("6", Birads::Six)]
    fn test_parse_accepts_report_forms(#[case] input: &str, #[case] expected: Birads) {
        assert_eq!(Birads::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("7")]
    #[case("3a")]
    #[case("x")]
    #[case("")]
    #[case("4ab")]
    fn test_parse_rejects_out_of_domain(#[case] input: &str) {
        assert!(Birads::parse(input).is_err());
    }

    #[test]
    fn test_ordering_places_subcategories_between_four_and_five() {
        assert!(Birads::Three < Birads::Four(None));
        assert!(Birads::Four(None) < Birads::Four(Some(Subcategory::A)));
        assert!(Birads::Four(Some(Subcategory::C)) < Birads::Five);
        assert!(Birads::Five < Birads::Six);
    }

    #[test]
    fn test_category_and_display() {
        let b = Birads::Four(Some(Subcategory::B));
        assert_eq!(b.category(), 4);
        assert_eq!(b.to_string(), "4b");
        assert!(b.is_suspicious());
        assert!(!Birads::Three.is_suspicious());
        assert!(Birads::Zero.needs_follow_up());
    }
}
