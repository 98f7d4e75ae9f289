use super::Batch;
use crate::error::Result;
use crate::types::{Breast, ExamReportRecord};
use chrono::NaiveDate;
use std::io::Write;

/// Output columns, in order
pub const COLUMNS: [&str; 19] = [
    "Nome",
    "Data de nascimento",
    "Idade",
    "Nome da mãe",
    "CNS",
    "Data do exame",
    "Unidade de saúde",
    "CNES",
    "BIRADS MD",
    "BIRADS ME",
    "Mama densa MD",
    "Mama densa ME",
    "Alterado",
    "USG",
    "Link para arquivo",
    "Pendente",
    "Data de ação",
    "Resultado da ação",
    "Observações",
];

const DATE_FORMAT: &str = "%d/%m/%Y";

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "1".to_string(),
        Some(false) => "0".to_string(),
        None => String::new(),
    }
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Cells of one record, aligned with [`COLUMNS`]
///
/// Dates are written as `dd/mm/yyyy`, flags as `1`/`0` and unknown values
/// as empty cells. `Alterado` uses the conservative level, so a record
/// needing review reads `2`.
pub fn row(record: &ExamReportRecord) -> [String; 19] {
    let birads = |side: Breast| {
        record
            .birads(side)
            .map(|b| b.category().to_string())
            .unwrap_or_default()
    };
    let workflow = record.workflow();

    [
        text(record.name()),
        date(record.birth_date()),
        record.age().map(|a| a.to_string()).unwrap_or_default(),
        text(record.mother_name()),
        text(record.cns().map(|c| c.as_str())),
        date(record.exam_date()),
        text(record.facility_name()),
        text(record.cnes().map(|c| c.as_str())),
        birads(Breast::Right),
        birads(Breast::Left),
        flag(record.dense_breast(Breast::Right)),
        flag(record.dense_breast(Breast::Left)),
        record.attention().conservative_level().value().to_string(),
        flag(record.ultrasound_suggested()),
        text(record.image_link()),
        flag(Some(workflow.pending)),
        date(workflow.action_date),
        text(workflow.action_result.as_deref()),
        text(workflow.observations.as_deref()),
    ]
}

/// Writes the batch as CSV with a header row
pub fn write_csv<W: Write>(batch: &Batch, writer: W) -> Result<()> {
    write_csv_rows(batch.iter(), writer)
}

/// Writes records as CSV in the given order
pub fn write_csv_rows<'a, W: Write>(
    records: impl IntoIterator<Item = &'a ExamReportRecord>,
    writer: W,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(COLUMNS)?;
    for record in records {
        csv.write_record(row(record))?;
    }
    csv.flush()?;
    Ok(())
}

/// Full records as pretty-printed JSON
///
/// Unlike the table, attention keeps `needs_review` and every clinical
/// field carries its provenance.
#[cfg(feature = "json")]
pub fn to_json(batch: &Batch) -> Result<String> {
    Ok(serde_json::to_string_pretty(batch)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::writer::tests::record;
    use crate::batch::{BatchWriter, ImageOutcome, RecordAssembler};
    use crate::extraction::FixedFieldSet;
    use crate::types::{AgeReference, Birads, ClinicalFindings, Extracted, Subcategory};

    fn batch() -> Batch {
        let mut writer = BatchWriter::new(2);
        writer.push(0, record(0, "MARIA", "2384299", Birads::Two)).unwrap();
        writer
            .push(1, record(1, "ANA", "2384299", Birads::Four(Some(Subcategory::B))))
            .unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_row_cells() {
        let batch = batch();
        let cells = row(&batch.records()[1]);

        assert_eq!(cells[0], "ANA");
        assert_eq!(cells[1], "");
        assert_eq!(cells[7], "2384299");
        assert_eq!(cells[8], "4");
        assert_eq!(cells[9], "1");
        assert_eq!(cells[10], "0");
        assert_eq!(cells[12], "2");
        assert_eq!(cells[13], "0");
        assert_eq!(cells[15], "1");
        assert_eq!(cells[16], "");
    }

    #[test]
    fn test_untrusted_fallback_cells_are_blank() {
        let findings = ClinicalFindings {
            birads_right: Extracted::fallback(Birads::Two, 0.45),
            birads_left: Extracted::fallback(Birads::One, 0.8),
            dense_right: Extracted::fallback(true, 0.3),
            dense_left: Extracted::rejected("nao informado"),
            ultrasound_suggested: Extracted::deterministic(false),
        };
        let reference = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let record = RecordAssembler::new(AgeReference::ExamDate, reference, 0.6).assemble(
            0,
            vec![1],
            FixedFieldSet::default(),
            findings,
            ImageOutcome::Skipped,
        );

        let cells = row(&record);

        assert_eq!(cells[8], "");
        assert_eq!(cells[9], "1");
        assert_eq!(cells[10], "");
        assert_eq!(cells[11], "");
        assert_eq!(cells[12], "2");
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_record() {
        let mut out = Vec::new();
        write_csv(&batch(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Nome,Data de nascimento,Idade,Nome da mãe,CNS"));
        assert!(lines[0].ends_with("Resultado da ação,Observações"));
        assert!(lines[1].starts_with("MARIA,"));
    }

    #[test]
    fn test_date_format() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2024, 3, 5)), "05/03/2024");
        assert_eq!(date(None), "");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_keeps_provenance_and_attention() {
        let json = to_json(&batch()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let records = value["records"].as_array().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "MARIA");
        assert_eq!(records[1]["attention"]["level"], "urgent");
        assert_eq!(records[0]["findings"]["birads_right"]["source"], "deterministic");
        assert_eq!(records[0]["workflow"]["pending"], true);
    }
}
