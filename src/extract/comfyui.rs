//! ComfyUI and AUTOMATIC1111 metadata parsing.
//!
//! ComfyUI writes `workflow` (editor graph) and `prompt` (API graph) chunks;
//! A1111 writes a single `parameters` chunk holding the whole generation
//! string. Neither tool declares itself explicitly, so detection goes by
//! which keys are present.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use super::workflow::{node_strings, node_type, workflow_nodes};
use super::NormalizedMetadata;

const TAGS_COMFYUI: &str = "ComfyUI,AI-Generated";
const TAGS_A1111: &str = "AUTOMATIC1111,AI-Generated";

/// True when the chunk map carries ComfyUI or A1111 metadata keys.
pub fn matches(chunks: &HashMap<String, String>) -> bool {
    chunks.contains_key("workflow")
        || chunks.contains_key("prompt")
        || chunks.contains_key("parameters")
}

/// Parse ComfyUI/A1111 chunks into normalized metadata.
///
/// When both ComfyUI keys and an A1111 `parameters` key coexist, the ComfyUI
/// tag wins; tags are single-valued per record, not merged.
pub fn parse(chunks: &HashMap<String, String>) -> NormalizedMetadata {
    let mut meta = NormalizedMetadata::default();
    let mut notes = Vec::new();
    let comfy = chunks.contains_key("workflow") || chunks.contains_key("prompt");

    if let Some(workflow) = chunks.get("workflow") {
        match serde_json::from_str::<Value>(workflow) {
            Ok(root) => {
                let nodes = workflow_nodes(&root);
                let types: BTreeSet<&str> =
                    nodes.iter().map(|n| node_type(n)).filter(|t| !t.is_empty()).collect();
                notes.push(format!(
                    "ComfyUI workflow: {} nodes ({})",
                    nodes.len(),
                    types.into_iter().collect::<Vec<_>>().join(", ")
                ));
                for node in nodes {
                    if node_type(node) == "CLIPTextEncode" {
                        if let Some(text) =
                            node_strings(node).iter().find(|s| s.trim().len() > 10)
                        {
                            meta.prompt = text.trim().to_string();
                            break;
                        }
                    }
                }
            }
            Err(_) => {
                notes.push(format!("Workflow data (unparsed): {}", truncate(workflow, 200)));
            }
        }
    }

    if meta.prompt.is_empty() {
        if let Some(prompt) = chunks.get("prompt") {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(prompt) {
                for value in map.values() {
                    if let Some(s) = value.as_str() {
                        if s.trim().len() > 10 {
                            meta.prompt = s.trim().to_string();
                            break;
                        }
                    }
                }
            }
            if meta.prompt.is_empty() && prompt.trim().len() > 5 {
                meta.prompt = prompt.trim().to_string();
            }
        }
    }

    if let Some(parameters) = chunks.get("parameters") {
        if meta.prompt.is_empty() {
            meta.prompt = parameters.trim().to_string();
        }
    }

    if let Some(software) = chunks.get("Software").or_else(|| chunks.get("software")) {
        meta.model = software.trim().to_string();
    }

    meta.tags = if comfy {
        TAGS_COMFYUI.to_string()
    } else {
        TAGS_A1111.to_string()
    };
    meta.notes = notes.join("\n");
    meta
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
