use crate::error::{ConversionError, Result};
use crate::types::FixedField;
use std::collections::HashSet;

/// Where a fixed field lives in the export: an optional section heading
/// plus the label variants that precede its value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldAnchor {
    pub field: FixedField,

    /// Section heading the label belongs to; `None` matches anywhere on the page
    pub section: Option<String>,

    /// Label variants, tried longest first
    pub labels: Vec<String>,
}

impl FieldAnchor {
    pub fn new(field: FixedField, section: Option<&str>, labels: &[&str]) -> Self {
        Self {
            field,
            section: section.map(str::to_string),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Versioned description of the report export layout
///
/// Template drift between export versions is handled by shipping a new
/// template, not by changing the locator.
///
/// # Example
///
/// ```
/// use mamoscan_core::{FixedField, LayoutTemplate};
///
/// let template = LayoutTemplate::siscan_mammography_v1();
/// assert_eq!(template.version, 1);
/// assert!(template.anchor(FixedField::Cns).is_some());
/// assert!(template.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutTemplate {
    pub name: String,
    pub version: u32,

    /// Title line that opens every exam section
    pub section_marker: String,

    /// Banner lines carrying no data
    pub ignore_lines: Vec<String>,

    /// Section headings, each alone on its line
    pub sections: Vec<String>,

    /// Section holding the radiology narrative
    pub narrative_section: String,

    pub fields: Vec<FieldAnchor>,

    /// Labels that are not extracted but terminate a neighbouring value
    pub stop_labels: Vec<String>,

    /// Vertical distance (points) under which runs share a line
    pub line_tolerance: f32,

    /// Edit distance tolerated when matching labels and headings
    pub max_label_edits: usize,
}

impl LayoutTemplate {
    /// SISCAN mammography report export, first layout version
    pub fn siscan_mammography_v1() -> Self {
        Self {
            name: "siscan-mamografia".to_string(),
            version: 1,
            section_marker: "LAUDO DO EXAME DE MAMOGRAFIA".to_string(),
            ignore_lines: vec!["SISCAN - Sistema de informação do Câncer".to_string()],
            sections: [
                "UNIDADE DE SAÚDE",
                "PACIENTE",
                "PRESTADOR DE SERVIÇO",
                "RESULTADO EXAME",
                "RESPONSÁVEL PELO RESULTADO",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            narrative_section: "RESULTADO EXAME".to_string(),
            fields: vec![
                FieldAnchor::new(FixedField::Name, Some("PACIENTE"), &["Nome:"]),
                FieldAnchor::new(
                    FixedField::MotherName,
                    Some("PACIENTE"),
                    &["Nome da Mãe:", "Mãe:"],
                ),
                FieldAnchor::new(
                    FixedField::BirthDate,
                    Some("PACIENTE"),
                    &["Data do Nascimento:", "Data de Nascimento:"],
                ),
                FieldAnchor::new(FixedField::Cns, Some("PACIENTE"), &["Cartão SUS:", "CNS:"]),
                FieldAnchor::new(FixedField::ExamDate, None, &["Emissão:"]),
                FieldAnchor::new(FixedField::FacilityName, Some("UNIDADE DE SAÚDE"), &["Nome:"]),
                FieldAnchor::new(FixedField::Cnes, Some("UNIDADE DE SAÚDE"), &["CNES:"]),
            ],
            stop_labels: [
                "Hora:",
                "Página:",
                "UF:",
                "UF",
                "Município:",
                "Telefone",
                "Sexo:",
                "Idade:",
                "Nº do Prontuário:",
                "Data da liberação do resultado:",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            line_tolerance: 3.0,
            max_label_edits: 1,
        }
    }

    /// Loads a template from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidTemplate`] when the file cannot be
    /// parsed or fails [`LayoutTemplate::validate`]
    #[cfg(feature = "json")]
    pub fn from_json_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a template from JSON text
    #[cfg(feature = "json")]
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let template: LayoutTemplate = serde_json::from_str(raw)
            .map_err(|e| ConversionError::InvalidTemplate(format!("{}", e)))?;
        template.validate()?;
        Ok(template)
    }

    /// Returns the anchor configured for a field
    pub fn anchor(&self, field: FixedField) -> Option<&FieldAnchor> {
        self.fields.iter().find(|a| a.field == field)
    }

    /// Checks internal consistency
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidTemplate`] describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.section_marker.trim().is_empty() {
            return Err(ConversionError::InvalidTemplate(
                "section_marker must not be empty".to_string(),
            ));
        }
        if self.line_tolerance.is_nan() || self.line_tolerance <= 0.0 {
            return Err(ConversionError::InvalidTemplate(format!(
                "line_tolerance must be positive, got {}",
                self.line_tolerance
            )));
        }

        let sections: HashSet<&str> = self.sections.iter().map(String::as_str).collect();
        if !sections.contains(self.narrative_section.as_str()) {
            return Err(ConversionError::InvalidTemplate(format!(
                "narrative section '{}' is not a declared section",
                self.narrative_section
            )));
        }

        let mut seen = HashSet::new();
        for anchor in &self.fields {
            if !seen.insert(anchor.field) {
                return Err(ConversionError::InvalidTemplate(format!(
                    "field '{}' is anchored more than once",
                    anchor.field
                )));
            }
            if anchor.labels.iter().all(|l| l.trim().is_empty()) {
                return Err(ConversionError::InvalidTemplate(format!(
                    "field '{}' has no label",
                    anchor.field
                )));
            }
            if let Some(section) = &anchor.section {
                if !sections.contains(section.as_str()) {
                    return Err(ConversionError::InvalidTemplate(format!(
                        "field '{}' refers to unknown section '{}'",
                        anchor.field, section
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for LayoutTemplate {
    fn default() -> Self {
        Self::siscan_mammography_v1()
    }
}
