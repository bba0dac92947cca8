//! LLM prompt engineering for record extraction

use sift_domain::{FieldSpec, SchemaSet};

/// Prompt view of one record type
#[derive(Debug, Clone)]
struct TypeBlock {
    name: String,
    description: Option<String>,
    fields: Vec<FieldSpec>,
}

/// Builds the prompt sent for one window
pub struct PromptBuilder {
    text: String,
    types: Vec<TypeBlock>,
    max_items: usize,
    fallback: bool,
}

impl PromptBuilder {
    /// Create a new prompt builder around a window's text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            types: Vec::new(),
            max_items: 50,
            fallback: false,
        }
    }

    /// Describe every record type in `schemas`
    ///
    /// Injected fields are left out, since the caller supplies them. Required
    /// fields are listed first and at most `max_fields` fields are described
    /// per type.
    pub fn with_schemas(mut self, schemas: &SchemaSet, max_fields: usize) -> Self {
        self.types = schemas
            .iter()
            .map(|entry| {
                let descriptor = &entry.descriptor;
                let (required, optional): (Vec<_>, Vec<_>) = descriptor
                    .fields()
                    .iter()
                    .filter(|f| !entry.is_injected(&f.name))
                    .cloned()
                    .partition(|f| f.required);

                TypeBlock {
                    name: descriptor.name().to_string(),
                    description: descriptor.description().map(str::to_string),
                    fields: required.into_iter().chain(optional).take(max_fields).collect(),
                }
            })
            .collect();
        self
    }

    /// Cap on records the model should return
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Mark the prompt as the whole-document pass after an empty run
    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Instructions
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");
        if self.fallback {
            prompt.push_str(FALLBACK_NOTE);
            prompt.push_str("\n\n");
        }

        // 2. Record types
        prompt.push_str("Record types:\n");
        for block in &self.types {
            match &block.description {
                Some(description) => prompt.push_str(&format!("\n## {} - {}\n", block.name, description)),
                None => prompt.push_str(&format!("\n## {}\n", block.name)),
            }
            for field in &block.fields {
                let marker = if field.required { ", required" } else { "" };
                match &field.description {
                    Some(description) => prompt.push_str(&format!(
                        "- {} ({}{}): {}\n",
                        field.name,
                        field.kind.as_str(),
                        marker,
                        description
                    )),
                    None => prompt.push_str(&format!("- {} ({}{})\n", field.name, field.kind.as_str(), marker)),
                }
            }
        }
        prompt.push('\n');

        // 3. The text to analyze
        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(&self.text);
        prompt.push_str("\n---\n\n");

        // 4. Output format reminder
        prompt.push_str(&format!("Return at most {} records.\n", self.max_items));
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract structured records from the following text.
Only use the record types listed below. Each record must be supported by the text.

Rules:
- One record per distinct fact; do not merge unrelated facts
- Fill only fields the text states; omit fields that are not mentioned
- Coded concepts may be given as plain text
- raw_text_hint must be a short fragment copied verbatim from the text"#;

const FALLBACK_NOTE: &str = "A previous pass over this document found no records. \
Read the whole text carefully; return an empty array only if nothing matches.";

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON array only, no additional text):
[
  {
    "record_type": "type name",
    "payload": { "field": "value" },
    "raw_text_hint": "exact text"
  }
]

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;
