use crate::api::ConversionOutput;
use crate::types::Breast;
use std::fmt;

/// Text summary of one conversion
pub struct TextReport<'a> {
    output: &'a ConversionOutput,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(output: &'a ConversionOutput) -> Self {
        Self { output }
    }
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = self.output;
        writeln!(f, "Mammography Report Conversion")?;
        writeln!(f, "=============================")?;
        writeln!(f)?;
        writeln!(f, "Pages:          {}", output.page_count)?;
        if !output.skipped_pages.is_empty() {
            writeln!(f, "Skipped Pages:  {:?}", output.skipped_pages)?;
        }
        writeln!(f, "Exams:          {}", output.batch.len())?;
        writeln!(f, "Needs Review:   {}", output.needs_review)?;
        if let Some(dir) = &output.image_dir {
            writeln!(f, "Audit Images:   {}", dir.display())?;
        }
        writeln!(f)?;

        writeln!(f, "Exams")?;
        writeln!(f, "-----")?;
        for record in output.batch.iter() {
            writeln!(
                f,
                "[{:>3}] {:<32} BI-RADS R={} L={}  Alterado: {}",
                record.section_index() + 1,
                record.name().unwrap_or("?"),
                or_unknown(record.birads(Breast::Right)),
                or_unknown(record.birads(Breast::Left)),
                record.attention(),
            )?;
            for reason in record.review_reasons() {
                writeln!(f, "      review: {}", reason)?;
            }
        }

        Ok(())
    }
}
