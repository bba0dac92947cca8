//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use sift_domain::{ValidatedRecord, Window};
use sift_extractor::{ExtractionResult, ExtractionSessionMetrics};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const EXCERPT_CHARS: usize = 48;
const PAYLOAD_CHARS: usize = 72;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format an extraction result.
    pub fn format_result(&self, result: &ExtractionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Quiet => Ok(self.format_result_quiet(result)),
        }
    }

    /// Format records as a table followed by the metrics summary.
    fn format_result_table(&self, result: &ExtractionResult) -> Result<String> {
        let mut out = String::new();

        if result.is_empty() {
            out.push_str(&self.warning("No records extracted."));
        } else {
            let mut builder = Builder::default();
            builder.push_record(["Type", "Window", "Citation", "Text", "Payload"]);

            for records in result.records_by_type.values() {
                for record in records {
                    builder.push_record(self.record_row(record)?);
                }
            }

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            out.push_str(&table.to_string());
        }

        out.push_str("\n\n");
        out.push_str(&self.metrics_summary(&result.metrics));
        Ok(out)
    }

    fn record_row(&self, record: &ValidatedRecord) -> Result<[String; 5]> {
        let citation = match record.citation {
            Some(span) => format!("[{}, {})", span.start, span.end),
            None => self.colorize("uncited", "yellow"),
        };
        let text = record
            .cited_text
            .as_deref()
            .map(|t| excerpt(t, EXCERPT_CHARS))
            .unwrap_or_default();
        let payload = excerpt(&serde_json::to_string(&record.payload)?, PAYLOAD_CHARS);

        Ok([
            record.record_type.clone(),
            record.source_window.to_string(),
            citation,
            text,
            payload,
        ])
    }

    /// Format record counts per type, one per line.
    fn format_result_quiet(&self, result: &ExtractionResult) -> String {
        result
            .records_by_type
            .iter()
            .map(|(record_type, records)| format!("{}\t{}", record_type, records.len()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format a window plan.
    pub fn format_windows(&self, windows: &[Window]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let plan: Vec<serde_json::Value> = windows
                    .iter()
                    .map(|w| {
                        serde_json::json!({
                            "index": w.index,
                            "start": w.start,
                            "end": w.end,
                            "chars": w.len(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&plan)?)
            }
            OutputFormat::Quiet => Ok(windows.len().to_string()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Window", "Start", "End", "Chars", "Preview"]);
                for window in windows {
                    builder.push_record([
                        window.index.to_string(),
                        window.start.to_string(),
                        window.end.to_string(),
                        window.len().to_string(),
                        excerpt(&window.text, EXCERPT_CHARS),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Render the metrics report, highlighting failures.
    pub fn metrics_summary(&self, metrics: &ExtractionSessionMetrics) -> String {
        let summary = metrics.summary();
        if metrics.windows_failed + metrics.windows_timed_out > 0 || metrics.deadline_exceeded {
            self.colorize(&summary, "yellow")
        } else {
            self.colorize(&summary, "cyan")
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Single-line excerpt of at most `max` characters
fn excerpt(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_domain::CharInterval;
    use std::collections::BTreeMap;

    fn create_test_result() -> ExtractionResult {
        let record = ValidatedRecord {
            record_type: "medication".to_string(),
            payload: json!({"name": {"text": "metformin"}, "dose": "500 mg"})
                .as_object()
                .cloned()
                .unwrap(),
            citation: Some(CharInterval::new(6, 22)),
            cited_text: Some("metformin 500 mg".to_string()),
            source_window: 0,
            ordinal: 0,
        };
        let uncited = ValidatedRecord {
            citation: None,
            cited_text: None,
            ordinal: 1,
            ..record.clone()
        };

        let mut records_by_type = BTreeMap::new();
        records_by_type.insert("medication".to_string(), vec![record, uncited]);
        let mut metrics = ExtractionSessionMetrics {
            windows_total: 1,
            windows_succeeded: 1,
            success_rate: 1.0,
            total_records_extracted: 2,
            ..Default::default()
        };
        metrics.records_by_type.insert("medication".to_string(), 2);

        ExtractionResult {
            records_by_type,
            metrics,
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_result(&create_test_result()).unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, create_test_result());
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_result(&create_test_result()).unwrap();
        assert_eq!(output, "medication\t2");
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_result(&create_test_result()).unwrap();
        assert!(output.contains("Citation"));
        assert!(output.contains("[6, 22)"));
        assert!(output.contains("uncited"));
        assert!(output.contains("Extraction Metrics Summary"));
    }

    #[test]
    fn test_empty_result() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let result = ExtractionResult {
            records_by_type: BTreeMap::new(),
            metrics: ExtractionSessionMetrics::default(),
        };
        let output = formatter.format_result(&result).unwrap();
        assert!(output.contains("No records extracted"));
    }

    #[test]
    fn test_windows_plan() {
        let source = "abcdefghij";
        let windows = vec![Window::from_source(0, source, 0, 6), Window::from_source(1, source, 4, 10)];

        let table = Formatter::new(OutputFormat::Table, false).format_windows(&windows).unwrap();
        assert!(table.contains("efghij"));

        let json = Formatter::new(OutputFormat::Json, false).format_windows(&windows).unwrap();
        let plan: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(plan[1]["start"], 4);
        assert_eq!(plan[1]["chars"], 6);

        assert_eq!(Formatter::new(OutputFormat::Quiet, false).format_windows(&windows).unwrap(), "2");
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short\ntext", 20), "short text");
        assert_eq!(excerpt("ééééé", 3), "éé…");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
