//! ChatGPT image-export metadata parsing.
//!
//! ChatGPT exports embed a JSON document in the `prompt` text chunk with a
//! `tool` field naming the generator. The filename prefix `chatgpt` is a
//! secondary signal, usable before content inspection.

use std::collections::HashMap;

use serde_json::Value;

use super::NormalizedMetadata;

const TAGS_CHATGPT: &str = "ChatGPT,AI-Generated,Image-Gen";
const TAGS_CHATGPT_FALLBACK: &str = "ChatGPT,AI-Generated";

/// True when the chunks or the filename identify a ChatGPT export.
pub fn matches(chunks: &HashMap<String, String>, filename: &str) -> bool {
    if filename.to_ascii_lowercase().starts_with("chatgpt") {
        return true;
    }
    chunks
        .get("prompt")
        .and_then(|p| serde_json::from_str::<Value>(p).ok())
        .and_then(|v| v.get("tool").and_then(Value::as_str).map(String::from))
        .is_some_and(|tool| tool.contains("ChatGPT"))
}

/// Parse a ChatGPT export into normalized metadata.
pub fn parse(chunks: &HashMap<String, String>, filename: &str) -> NormalizedMetadata {
    let mut meta = NormalizedMetadata::default();

    let doc = chunks
        .get("prompt")
        .map(|p| serde_json::from_str::<Value>(p));

    let root = match doc {
        Some(Ok(root)) => root,
        Some(Err(e)) => {
            // Filename matched but the payload is not valid JSON.
            meta.notes = format!("ChatGPT metadata could not be parsed: {e}");
            meta.tags = TAGS_CHATGPT_FALLBACK.to_string();
            return meta;
        }
        None => {
            meta.notes = format!("No embedded metadata found in {filename}");
            meta.tags = TAGS_CHATGPT_FALLBACK.to_string();
            return meta;
        }
    };

    if let Some(prompt) = root.get("prompt").and_then(Value::as_str) {
        meta.prompt = format!("USER PROMPT:\n{prompt}");
    }
    if let Some(internal) = root.get("internal_prompt").and_then(Value::as_str) {
        if !meta.prompt.is_empty() {
            meta.prompt.push_str("\n\n");
        }
        meta.prompt.push_str(&format!("INTERNAL PROMPT:\n{internal}"));
    }

    if let Some(tool) = root.get("tool").and_then(Value::as_str) {
        meta.model = tool.to_string();
    }

    meta.notes = build_notes(&root);
    meta.tags = TAGS_CHATGPT.to_string();
    meta
}

/// Structured digest of the optional export fields, date first.
fn build_notes(root: &Value) -> String {
    let mut lines = Vec::new();

    let fields: [(&str, &str, &str); 7] = [
        ("date_generated", "📅", "Generated"),
        ("filename", "📄", "Original file"),
        ("style", "🎨", "Style"),
        ("aspect_ratio", "📐", "Aspect ratio"),
        ("resolution", "🖼️", "Resolution"),
        ("file_size_mb", "💾", "File size"),
        ("source_image", "🔗", "Source image"),
    ];

    for (key, emoji, label) in fields {
        if let Some(value) = root.get(key).and_then(display_value) {
            if key == "file_size_mb" {
                lines.push(format!("{emoji} {label}: {value} MB"));
            } else {
                lines.push(format!("{emoji} {label}: {value}"));
            }
        }
    }

    lines.join("\n")
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn detects_by_tool_field() {
        let chunks = chunk_map(&[("prompt", r#"{"tool":"ChatGPT-4","prompt":"x"}"#)]);
        assert!(matches(&chunks, "image.png"));
    }

    #[test]
    fn detects_by_filename_prefix() {
        assert!(matches(&HashMap::new(), "ChatGPT Image Jan 1.png"));
        assert!(matches(&HashMap::new(), "chatgpt-export.png"));
        assert!(!matches(&HashMap::new(), "photo.png"));
    }

    #[test]
    fn other_tools_do_not_match() {
        let chunks = chunk_map(&[("prompt", r#"{"tool":"Midjourney","prompt":"x"}"#)]);
        assert!(!matches(&chunks, "image.png"));
    }

    #[test]
    fn parses_full_export() {
        let chunks = chunk_map(&[(
            "prompt",
            r#"{"tool":"ChatGPT-4","prompt":"a red fox","date_generated":"2024-01-01"}"#,
        )]);
        let meta = parse(&chunks, "chatgpt-fox.png");
        assert_eq!(meta.model, "ChatGPT-4");
        assert!(meta.prompt.contains("USER PROMPT:\na red fox"));
        assert!(meta.notes.contains("2024-01-01"));
        assert_eq!(meta.tags, "ChatGPT,AI-Generated,Image-Gen");
    }

    #[test]
    fn concatenates_internal_prompt_under_header() {
        let chunks = chunk_map(&[(
            "prompt",
            r#"{"tool":"ChatGPT-4","prompt":"a red fox","internal_prompt":"photoreal fox, winter"}"#,
        )]);
        let meta = parse(&chunks, "x.png");
        let user_pos = meta.prompt.find("USER PROMPT:").unwrap();
        let internal_pos = meta.prompt.find("INTERNAL PROMPT:").unwrap();
        assert!(user_pos < internal_pos);
        assert!(meta.prompt.contains("photoreal fox, winter"));
    }

    #[test]
    fn notes_keep_field_order_date_first() {
        let chunks = chunk_map(&[(
            "prompt",
            r#"{"tool":"ChatGPT-4","prompt":"p","style":"vivid","date_generated":"2024-03-05","file_size_mb":2.4}"#,
        )]);
        let notes = parse(&chunks, "x.png").notes;
        let date_pos = notes.find("2024-03-05").unwrap();
        let style_pos = notes.find("vivid").unwrap();
        assert!(date_pos < style_pos);
        assert!(notes.contains("2.4 MB"));
    }

    #[test]
    fn parse_failure_falls_back_to_generic_tags() {
        let chunks = chunk_map(&[("prompt", "not json {")]);
        let meta = parse(&chunks, "chatgpt-broken.png");
        assert_eq!(meta.tags, "ChatGPT,AI-Generated");
        assert!(meta.notes.contains("could not be parsed"));
        assert!(meta.prompt.is_empty());
    }

    #[test]
    fn filename_match_without_chunks() {
        let meta = parse(&HashMap::new(), "chatgpt-no-meta.png");
        assert_eq!(meta.tags, "ChatGPT,AI-Generated");
        assert!(meta.notes.contains("chatgpt-no-meta.png"));
    }
}
