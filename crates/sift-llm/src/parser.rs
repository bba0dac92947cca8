//! Parse LLM output into raw extractions

use crate::LlmError;
use serde_json::Value;
use sift_domain::{Payload, RawExtraction};
use tracing::warn;

const TYPE_KEYS: &[&str] = &["record_type", "type", "extraction_class"];
const PAYLOAD_KEYS: &[&str] = &["payload", "fields", "attributes"];
const HINT_KEYS: &[&str] = &["raw_text_hint", "extraction_text", "evidence", "text"];
const LIST_KEYS: &[&str] = &["extractions", "records"];

/// Parse an LLM JSON response into raw extractions
///
/// Accepts a bare JSON array, or an object wrapping the array under
/// `extractions` / `records`, optionally inside a markdown code fence.
/// Malformed elements are skipped; a response that is not JSON at all is an
/// [`LlmError::InvalidResponse`].
pub fn parse_completion_response(response: &str) -> Result<Vec<RawExtraction>, LlmError> {
    // LLMs sometimes wrap JSON in markdown code blocks
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    let items = match json {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let list = LIST_KEYS.iter().find_map(|key| match obj.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            });
            match list {
                Some(items) => items,
                None => {
                    return Err(LlmError::InvalidResponse(
                        "Expected a JSON array of extractions".to_string(),
                    ))
                }
            }
        }
        _ => {
            return Err(LlmError::InvalidResponse(
                "Expected a JSON array of extractions".to_string(),
            ))
        }
    };

    let mut extractions = Vec::new();
    for (idx, item) in items.into_iter().enumerate() {
        match parse_extraction(item) {
            Ok(raw) => extractions.push(raw),
            Err(e) => warn!("Skipping extraction {}: {}", idx, e),
        }
    }

    Ok(extractions)
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<String, LlmError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(LlmError::InvalidResponse("Empty code block".to_string()));
        }

        // Skip the opening fence and, if present, the closing one
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        Ok(lines[1..end].join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parse a single extraction object
fn parse_extraction(item: Value) -> Result<RawExtraction, String> {
    let mut obj = match item {
        Value::Object(obj) => obj,
        _ => return Err("extraction is not a JSON object".to_string()),
    };

    let record_type = take_string(&mut obj, TYPE_KEYS)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "missing 'record_type'".to_string())?;

    let hint = take_string(&mut obj, HINT_KEYS).unwrap_or_default();

    let payload = PAYLOAD_KEYS
        .iter()
        .find_map(|key| match obj.get(*key) {
            Some(Value::Object(map)) => Some(map.clone()),
            _ => None,
        })
        // No nested payload: the remaining keys are the fields
        .unwrap_or_else(|| {
            obj.into_iter()
                .filter(|(key, _)| !PAYLOAD_KEYS.contains(&key.as_str()))
                .collect::<Payload>()
        });

    Ok(RawExtraction {
        record_type: record_type.trim().to_string(),
        payload,
        raw_text_hint: hint,
    })
}

fn take_string(obj: &mut Payload, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(s)) = obj.get(*key) {
            let s = s.clone();
            obj.remove(*key);
            return Some(s);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_payload() {
        let response = r#"[
            {
                "record_type": "medication",
                "payload": {"name": "metformin", "dose_mg": 500},
                "raw_text_hint": "metformin 500 mg"
            }
        ]"#;

        let records = parse_completion_response(response).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_type, "medication");
        assert_eq!(records[0].payload["dose_mg"], json!(500));
        assert_eq!(records[0].raw_text_hint, "metformin 500 mg");
    }

    #[test]
    fn test_parse_flat_fields() {
        let response = r#"[{"type": "allergy", "substance": "penicillin", "evidence": "allergic to penicillin"}]"#;

        let records = parse_completion_response(response).unwrap();
        assert_eq!(records[0].record_type, "allergy");
        assert_eq!(records[0].payload["substance"], "penicillin");
        assert!(!records[0].payload.contains_key("type"));
        assert_eq!(records[0].raw_text_hint, "allergic to penicillin");
    }

    #[test]
    fn test_parse_wrapped_object_in_code_fence() {
        let response = "```json\n{\"extractions\": [{\"record_type\": \"condition\", \"payload\": {\"code\": \"asthma\"}}]}\n```";

        let records = parse_completion_response(response).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].raw_text_hint.is_empty());
    }

    #[test]
    fn test_parse_skips_malformed_items() {
        let response = r#"[
            {"record_type": "condition", "payload": {"code": "asthma"}},
            "not an object",
            {"payload": {"code": "missing type"}},
            {"record_type": "condition", "payload": {"code": "eczema"}}
        ]"#;

        let records = parse_completion_response(response).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payload["code"], "eczema");
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_completion_response("This is not JSON");
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_object_without_list() {
        let result = parse_completion_response(r#"{"record_type": "condition"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        let response = "```\n[]\n```";
        assert_eq!(extract_json(response).unwrap().trim(), "[]");
    }
}
