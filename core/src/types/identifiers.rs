use std::fmt;

/// Brazilian national health card number (Cartão Nacional de Saúde)
///
/// Always exactly 15 ASCII digits. Formatting characters are stripped on
/// normalization; a value with any other digit count is rejected rather
/// than truncated or padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
pub struct Cns(String);

impl Cns {
    pub const DIGITS: usize = 15;

    /// Normalizes a raw CNS field
    ///
    /// # Errors
    ///
    /// Returns an error when the value does not hold exactly 15 digits
    pub fn normalize(raw: &str) -> Result<Self, String> {
        let digits = digits_only(raw);
        if digits.len() != Self::DIGITS {
            return Err(format!(
                "CNS must have {} digits, found {} in '{}'",
                Self::DIGITS,
                digits.len(),
                raw.trim()
            ));
        }
        Ok(Cns(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health facility registry code (Cadastro Nacional de Estabelecimentos de Saúde)
///
/// Always exactly 7 ASCII digits. Codes that lost leading zeros (a common
/// spreadsheet artifact) are left-padded; codes longer than 7 digits are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
pub struct Cnes(String);

impl Cnes {
    pub const DIGITS: usize = 7;

    /// Normalizes a raw CNES field
    ///
    /// # Errors
    ///
    /// Returns an error when the value holds no digits or more than 7
    pub fn normalize(raw: &str) -> Result<Self, String> {
        let digits = digits_only(raw);
        if digits.is_empty() || digits.len() > Self::DIGITS {
            return Err(format!(
                "CNES must have at most {} digits, found {} in '{}'",
                Self::DIGITS,
                digits.len(),
                raw.trim()
            ));
        }
        Ok(Cnes(format!("{:0>width$}", digits, width = Self::DIGITS)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cnes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
