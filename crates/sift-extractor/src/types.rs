//! Result types for extraction

use crate::metrics::ExtractionSessionMetrics;
use serde::{Deserialize, Serialize};
use sift_domain::ValidatedRecord;
use std::collections::BTreeMap;

/// Result of an extraction run
///
/// Always best-effort: failed or timed-out windows are reflected in
/// `metrics`, never in an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Deduplicated records per type, ordered by source window then emission order
    pub records_by_type: BTreeMap<String, Vec<ValidatedRecord>>,

    /// Finalized run metrics
    pub metrics: ExtractionSessionMetrics,
}

impl ExtractionResult {
    /// Total records across all types
    pub fn total_records(&self) -> usize {
        self.records_by_type.values().map(Vec::len).sum()
    }

    /// Records of one type (empty when none were extracted)
    pub fn records(&self, record_type: &str) -> &[ValidatedRecord] {
        self.records_by_type
            .get(record_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when no record was extracted
    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_domain::Payload;

    fn record(record_type: &str, ordinal: usize) -> ValidatedRecord {
        ValidatedRecord {
            record_type: record_type.to_string(),
            payload: Payload::new(),
            citation: None,
            cited_text: None,
            source_window: 0,
            ordinal,
        }
    }

    #[test]
    fn test_accessors() {
        let mut records_by_type = BTreeMap::new();
        records_by_type.insert("allergy".to_string(), vec![record("allergy", 0), record("allergy", 1)]);
        records_by_type.insert("condition".to_string(), vec![record("condition", 2)]);

        let result = ExtractionResult {
            records_by_type,
            metrics: ExtractionSessionMetrics::default(),
        };

        assert_eq!(result.total_records(), 3);
        assert_eq!(result.records("allergy").len(), 2);
        assert!(result.records("procedure").is_empty());
        assert!(!result.is_empty());
    }
}
