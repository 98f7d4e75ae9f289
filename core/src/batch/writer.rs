use crate::error::{ConversionError, Result};
use crate::types::ExamReportRecord;
use log::debug;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Records of one converted document, in source order
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Batch {
    records: Vec<ExamReportRecord>,
}

impl Batch {
    pub fn records(&self) -> &[ExamReportRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExamReportRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records carrying at least one review reason
    pub fn needs_review_count(&self) -> usize {
        self.records.iter().filter(|r| r.needs_review()).count()
    }

    /// Records ordered for outreach
    ///
    /// Highest attention first, then CNES, facility and patient name.
    /// Records needing review sort with the urgent ones.
    pub fn sorted_for_outreach(&self) -> Vec<&ExamReportRecord> {
        let mut sorted: Vec<&ExamReportRecord> = self.records.iter().collect();
        sorted.sort_by_key(|r| {
            (
                Reverse(r.attention().conservative_level()),
                r.cnes().cloned(),
                r.facility_name().map(str::to_string),
                r.name().map(str::to_string),
            )
        });
        sorted
    }
}

impl IntoIterator for Batch {
    type Item = ExamReportRecord;
    type IntoIter = std::vec::IntoIter<ExamReportRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Collects records completed out of order and restores source order
///
/// Every record is tagged with its section index; [`BatchWriter::finish`]
/// emits them by index and fails if any index is missing.
#[derive(Debug)]
pub struct BatchWriter {
    expected: usize,
    pending: BTreeMap<usize, ExamReportRecord>,
}

impl BatchWriter {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            pending: BTreeMap::new(),
        }
    }

    /// Stores the record of section `index`
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Output`] for an index outside the batch
    /// or one already pushed
    pub fn push(&mut self, index: usize, record: ExamReportRecord) -> Result<()> {
        if index >= self.expected {
            return Err(ConversionError::Output(format!(
                "record index {} outside batch of {}",
                index, self.expected
            )));
        }
        if self.pending.insert(index, record).is_some() {
            return Err(ConversionError::Output(format!(
                "record {} written twice",
                index
            )));
        }
        debug!("Record {} received ({}/{})", index, self.pending.len(), self.expected);
        Ok(())
    }

    /// Returns all records in section order
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Output`] if any section produced no record
    pub fn finish(self) -> Result<Batch> {
        if self.pending.len() != self.expected {
            let missing: Vec<usize> = (0..self.expected)
                .filter(|i| !self.pending.contains_key(i))
                .collect();
            return Err(ConversionError::Output(format!(
                "no record for sections {:?}",
                missing
            )));
        }
        Ok(Batch {
            records: self.pending.into_values().collect(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::batch::{ImageOutcome, RecordAssembler};
    use crate::extraction::FixedFieldSet;
    use crate::types::{AgeReference, Birads, ClinicalFindings, Cnes, Extracted};
    use chrono::NaiveDate;

    pub(crate) fn record(index: usize, name: &str, cnes: &str, birads: Birads) -> ExamReportRecord {
        let fixed = FixedFieldSet {
            name: Some(name.to_string()),
            cnes: Cnes::normalize(cnes).ok(),
            facility_name: Some("UBS CENTRAL".to_string()),
            ..Default::default()
        };
        let findings = ClinicalFindings {
            birads_right: Extracted::deterministic(birads),
            birads_left: Extracted::deterministic(Birads::One),
            dense_right: Extracted::deterministic(false),
            dense_left: Extracted::deterministic(false),
            ultrasound_suggested: Extracted::deterministic(false),
        };
        let reference = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        RecordAssembler::new(AgeReference::ExamDate, reference, 0.6).assemble(
            index,
            vec![index as u32 + 1],
            fixed,
            findings,
            ImageOutcome::Skipped,
        )
    }

    #[test]
    fn test_restores_source_order() {
        let mut writer = BatchWriter::new(3);
        writer.push(2, record(2, "C", "1", Birads::One)).unwrap();
        writer.push(0, record(0, "A", "1", Birads::One)).unwrap();
        writer.push(1, record(1, "B", "1", Birads::One)).unwrap();

        let batch = writer.finish().unwrap();
        let names: Vec<_> = batch.iter().map(|r| r.name().unwrap()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_missing_record_fails_the_batch() {
        let mut writer = BatchWriter::new(2);
        writer.push(1, record(1, "B", "1", Birads::One)).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(err.to_string().contains("[0]"));
    }

    #[test]
    fn test_duplicate_and_out_of_range_index() {
        let mut writer = BatchWriter::new(1);
        writer.push(0, record(0, "A", "1", Birads::One)).unwrap();
        assert!(writer.push(0, record(0, "A", "1", Birads::One)).is_err());
        assert!(writer.push(1, record(1, "B", "1", Birads::One)).is_err());
    }

    #[test]
    fn test_outreach_order() {
        let mut writer = BatchWriter::new(4);
        writer.push(0, record(0, "ZELIA", "2", Birads::One)).unwrap();
        writer.push(1, record(1, "ANA", "2", Birads::Three)).unwrap();
        writer.push(2, record(2, "BIA", "1", Birads::Five)).unwrap();
        writer.push(3, record(3, "CARLA", "1", Birads::Three)).unwrap();
        let batch = writer.finish().unwrap();

        let names: Vec<_> = batch
            .sorted_for_outreach()
            .iter()
            .map(|r| r.name().unwrap())
            .collect();
        assert_eq!(names, vec!["BIA", "CARLA", "ANA", "ZELIA"]);
        // document order untouched
        assert_eq!(batch.records()[0].name(), Some("ZELIA"));
    }
}
