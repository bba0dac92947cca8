//! ResultAggregator: validate, cite, deduplicate and group records

use crate::citation::CitationMatcher;
use sift_domain::{RawExtraction, SchemaError, SchemaSet, ValidatedRecord, Window};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Minimum citation overlap (fraction of the smaller span) for two records
/// to be the same fact
pub const DUPLICATE_OVERLAP_RATIO: f64 = 0.5;

/// Result of feeding one window's raw records to the aggregator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowAggregation {
    /// Records that passed validation
    pub accepted: usize,
    /// Records rejected by validation
    pub rejected: usize,
}

/// Grouped, deduplicated output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedRecords {
    /// Records per type, ordered by source window then emission order
    pub records_by_type: BTreeMap<String, Vec<ValidatedRecord>>,
    /// Records dropped as duplicates
    pub duplicates_removed: usize,
    /// Surviving records with a citation
    pub citations_found: usize,
    /// Surviving records without a citation
    pub uncited: usize,
}

/// Collects validated records from every window of a run
///
/// Records are keyed by `(source_window, ordinal)`, so the grouped output
/// does not depend on the order in which windows finish.
#[derive(Debug)]
pub struct ResultAggregator<'a> {
    schemas: &'a SchemaSet,
    matcher: CitationMatcher,
    records: BTreeMap<(usize, usize), ValidatedRecord>,
}

impl<'a> ResultAggregator<'a> {
    /// Create an aggregator over a schema set
    pub fn new(schemas: &'a SchemaSet, matcher: CitationMatcher) -> Self {
        Self {
            schemas,
            matcher,
            records: BTreeMap::new(),
        }
    }

    /// Validate one raw record produced by `window`
    ///
    /// Injected fields are overlaid before and after validation, so they
    /// always win over model output. A missing citation is not an error.
    pub fn validate(
        &self,
        raw: RawExtraction,
        window: &Window,
        ordinal: usize,
    ) -> Result<ValidatedRecord, SchemaError> {
        let entry = self
            .schemas
            .resolve(&raw.record_type)
            .ok_or_else(|| SchemaError::UnknownType(raw.record_type.clone()))?;

        let mut payload = raw.payload;
        entry.inject(&mut payload);
        let mut typed = entry.descriptor.validate(payload)?;
        entry.inject(&mut typed);

        let citation = self.matcher.locate(&raw.raw_text_hint, window);

        Ok(ValidatedRecord {
            record_type: entry.descriptor.name().to_string(),
            payload: typed,
            citation: citation.as_ref().map(|c| c.interval),
            cited_text: citation.map(|c| c.text),
            source_window: window.index,
            ordinal,
        })
    }

    /// Validate and store every raw record of a window
    pub fn add_window(&mut self, window: &Window, raws: Vec<RawExtraction>) -> WindowAggregation {
        let mut result = WindowAggregation::default();

        for (ordinal, raw) in raws.into_iter().enumerate() {
            match self.validate(raw, window, ordinal) {
                Ok(record) => {
                    self.records.insert((window.index, ordinal), record);
                    result.accepted += 1;
                }
                Err(e) => {
                    warn!(window = window.index, ordinal, "Rejected record: {}", e);
                    result.rejected += 1;
                }
            }
        }

        result
    }

    /// Validated records held so far, before deduplication
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record has been accepted
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Deduplicate and group by record type
    pub fn finish(self) -> AggregatedRecords {
        let mut output = AggregatedRecords::default();

        for record in self.records.into_values() {
            let kept = output
                .records_by_type
                .entry(record.record_type.clone())
                .or_default();

            match kept.iter().position(|existing| is_duplicate(existing, &record)) {
                Some(idx) => {
                    output.duplicates_removed += 1;
                    if prefer(&record, &kept[idx]) {
                        debug!(
                            record_type = %record.record_type,
                            window = record.source_window,
                            "Duplicate replaces earlier record"
                        );
                        // The survivor keeps the earlier slot
                        kept[idx] = record;
                    }
                }
                None => kept.push(record),
            }
        }

        for record in output.records_by_type.values().flatten() {
            if record.is_cited() {
                output.citations_found += 1;
            } else {
                output.uncited += 1;
            }
        }

        output
    }
}

/// Same type and either overlapping citations or, when one is uncited,
/// equal payloads
fn is_duplicate(a: &ValidatedRecord, b: &ValidatedRecord) -> bool {
    if a.record_type != b.record_type {
        return false;
    }
    match (&a.citation, &b.citation) {
        (Some(x), Some(y)) => x.overlap_ratio(y) > DUPLICATE_OVERLAP_RATIO,
        _ => a.payload == b.payload,
    }
}

/// Whether `candidate` should replace `existing`
fn prefer(candidate: &ValidatedRecord, existing: &ValidatedRecord) -> bool {
    match (candidate.is_cited(), existing.is_cited()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.populated_fields() > existing.populated_fields(),
    }
}
