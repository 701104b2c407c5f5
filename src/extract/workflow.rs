//! Free-text and model-name mining over ComfyUI workflow graphs.
//!
//! A workflow is a node graph embedded as JSON. Two shapes exist in the wild:
//! the editor export `{"nodes": [...]}` where each node carries `type` and
//! `widgets_values`, and the API format keyed by node id where each node
//! carries `class_type` and `inputs`. The miners here handle both.
//!
//! Both miners are pure: they return candidate values and leave the
//! "only fill if the stored field is empty" guard to the caller, so a user's
//! manual edit is never overwritten.

use serde_json::Value;

use super::cleaner::clean_model_name;

/// A mined prompt candidate with its tier and originating node type.
#[derive(Debug, Clone)]
struct PromptCandidate {
    text: String,
    priority: u8,
    source: String,
}

/// Collect the nodes of a workflow graph, whichever shape it uses.
pub(crate) fn workflow_nodes(root: &Value) -> Vec<&Value> {
    if let Some(nodes) = root.get("nodes").and_then(Value::as_array) {
        return nodes.iter().collect();
    }
    if let Some(map) = root.as_object() {
        return map
            .values()
            .filter(|v| v.get("class_type").is_some() || v.get("type").is_some())
            .collect();
    }
    Vec::new()
}

/// Node type identifier, from either graph shape.
pub(crate) fn node_type(node: &Value) -> &str {
    node.get("class_type")
        .or_else(|| node.get("type"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// All string widget/input values of a node, in declaration order.
pub(crate) fn node_strings(node: &Value) -> Vec<&str> {
    let mut out = Vec::new();
    if let Some(widgets) = node.get("widgets_values").and_then(Value::as_array) {
        out.extend(widgets.iter().filter_map(Value::as_str));
    }
    if let Some(inputs) = node.get("inputs").and_then(Value::as_object) {
        out.extend(inputs.values().filter_map(Value::as_str));
    }
    out
}

/// Mine the most plausible prompt text from a workflow JSON blob.
///
/// Candidates are scored by node tier (dedicated prompt nodes beat processed
/// text nodes beat encoders beat generic text nodes), deduplicated when one
/// is a substring of another, then sorted by (priority, length desc). A sole
/// survivor is returned verbatim; several survivors are combined into one
/// multi-section document ending with the top pick under `PRIMARY PROMPT`.
pub fn mine_prompt(workflow_json: &str) -> Option<String> {
    let root: Value = serde_json::from_str(workflow_json).ok()?;
    let mut candidates: Vec<PromptCandidate> = Vec::new();

    for node in workflow_nodes(&root) {
        let ntype = node_type(node);
        let lower = ntype.to_ascii_lowercase();
        let strings = node_strings(node);

        let tier = if lower.contains("prompt") && ntype != "CLIPTextEncode" {
            Some((1u8, 10usize))
        } else if lower.contains("showtext") {
            Some((2, 20))
        } else if lower.contains("replace") {
            // Find/replace nodes: only the second argument is the result text.
            if let Some(&text) = strings.get(1) {
                if text.trim().len() > 10 {
                    candidates.push(PromptCandidate {
                        text: text.trim().to_string(),
                        priority: 3,
                        source: ntype.to_string(),
                    });
                }
            }
            None
        } else if ntype == "CLIPTextEncode" {
            Some((4, 10))
        } else if lower.contains("text") {
            Some((5, 15))
        } else {
            None
        };

        if let Some((priority, min_len)) = tier {
            for text in strings {
                let trimmed = text.trim();
                if trimmed.len() > min_len {
                    candidates.push(PromptCandidate {
                        text: trimmed.to_string(),
                        priority,
                        source: ntype.to_string(),
                    });
                }
            }
        }
    }

    dedup_substrings(&mut candidates);
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.text.len().cmp(&a.text.len()))
    });

    match candidates.len() {
        0 => None,
        1 => Some(candidates.remove(0).text),
        _ => Some(combine_candidates(&candidates)),
    }
}

/// Drop candidates whose text is contained inside another candidate's text.
fn dedup_substrings(candidates: &mut Vec<PromptCandidate>) {
    let mut keep = vec![true; candidates.len()];
    for i in 0..candidates.len() {
        for j in 0..candidates.len() {
            if i == j || !keep[i] || !keep[j] {
                continue;
            }
            let (a, b) = (&candidates[i].text, &candidates[j].text);
            if a.len() < b.len() && b.contains(a.as_str()) {
                keep[i] = false;
            } else if a == b && i > j {
                keep[i] = false;
            }
        }
    }
    let mut it = keep.iter();
    candidates.retain(|_| *it.next().unwrap());
}

fn combine_candidates(candidates: &[PromptCandidate]) -> String {
    let mut out = String::from("EXTRACTED PROMPTS:\n");
    for candidate in candidates {
        out.push_str(&format!("\n--- {} ---\n{}\n", candidate.source, candidate.text));
    }
    out.push_str(&format!("\nPRIMARY PROMPT:\n{}", candidates[0].text));
    out
}

/// True when a widget value looks like a model file reference.
fn is_model_filename(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.ends_with(".safetensors") || lower.ends_with(".ckpt") || lower.ends_with(".pt")
}

/// Mine model names from a workflow JSON blob.
///
/// Checkpoint loaders rank first, LoRA loaders second, and any other
/// loader-ish node whose widget values look like model filenames third.
/// ControlNet and VAE loaders are excluded; they never name the base model.
pub fn mine_model(workflow_json: &str) -> Option<String> {
    let root: Value = serde_json::from_str(workflow_json).ok()?;
    let mut checkpoints: Vec<String> = Vec::new();
    let mut loras: Vec<String> = Vec::new();
    let mut others: Vec<String> = Vec::new();

    for node in workflow_nodes(&root) {
        let ntype = node_type(node);
        let strings = node_strings(node);

        if ntype.contains("CheckpointLoader") || ntype == "UNETLoader" {
            if let Some(name) = strings.first() {
                checkpoints.push((*name).to_string());
            }
        } else if ntype.contains("LoraLoader") {
            if let Some(name) = strings.iter().find(|s| is_model_filename(s)).or(strings.first()) {
                loras.push((*name).to_string());
            }
        } else if (ntype.contains("Loader") || ntype.contains("Model"))
            && !ntype.contains("ControlNet")
            && !ntype.contains("VAE")
        {
            others.extend(
                strings
                    .iter()
                    .filter(|s| is_model_filename(s))
                    .map(|s| (*s).to_string()),
            );
        }
    }

    let total = checkpoints.len() + loras.len() + others.len();
    if total == 0 {
        return None;
    }

    let primary = checkpoints
        .first()
        .or_else(|| loras.first())
        .or_else(|| others.first())
        .map(|n| clean_model_name(n))?;

    if total == 1 {
        return Some(primary);
    }

    // Count everything except the entry that became the primary name.
    let mut lora_count = loras.len();
    let mut other_count = checkpoints.len().saturating_sub(1) + others.len();
    if checkpoints.is_empty() {
        if lora_count > 0 {
            lora_count -= 1;
        } else {
            other_count -= 1;
        }
    }

    let mut summary = primary;
    if lora_count > 0 {
        summary.push_str(&format!(
            " + {} LoRA{}",
            lora_count,
            if lora_count == 1 { "" } else { "s" }
        ));
    }
    if other_count > 0 {
        summary.push_str(&format!(
            " + {} additional model{}",
            other_count,
            if other_count == 1 { "" } else { "s" }
        ));
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mines_clip_text_encode_from_node_array() {
        let json = r#"{"nodes":[
            {"type":"CLIPTextEncode","widgets_values":["a cat sitting on a mat, 4k"]},
            {"type":"KSampler","widgets_values":[42]}
        ]}"#;
        assert_eq!(
            mine_prompt(json).as_deref(),
            Some("a cat sitting on a mat, 4k")
        );
    }

    #[test]
    fn mines_from_api_format() {
        let json = r#"{"6":{"class_type":"CLIPTextEncode","inputs":{"text":"a fox in the snow, detailed"}}}"#;
        assert_eq!(
            mine_prompt(json).as_deref(),
            Some("a fox in the snow, detailed")
        );
    }

    #[test]
    fn prompt_nodes_outrank_encoders() {
        let json = r#"{"nodes":[
            {"type":"CLIPTextEncode","widgets_values":["encoder copy of the text"]},
            {"type":"CustomPromptBuilder","widgets_values":["the hand-written prompt text"]}
        ]}"#;
        let mined = mine_prompt(json).unwrap();
        assert!(mined.contains("PRIMARY PROMPT:\nthe hand-written prompt text"));
        assert!(mined.contains("encoder copy of the text"));
    }

    #[test]
    fn substring_candidates_are_deduplicated() {
        let json = r#"{"nodes":[
            {"type":"CLIPTextEncode","widgets_values":["a cat on a mat"]},
            {"type":"CLIPTextEncode","widgets_values":["a cat on a mat, masterwork detail"]}
        ]}"#;
        // The shorter candidate is a substring of the longer one.
        assert_eq!(
            mine_prompt(json).as_deref(),
            Some("a cat on a mat, masterwork detail")
        );
    }

    #[test]
    fn replace_nodes_use_second_argument() {
        let json = r#"{"nodes":[
            {"type":"FindReplaceText","widgets_values":["pattern-to-find","the replaced output text here"]}
        ]}"#;
        assert_eq!(
            mine_prompt(json).as_deref(),
            Some("the replaced output text here")
        );
    }

    #[test]
    fn short_strings_are_ignored() {
        let json = r#"{"nodes":[{"type":"CLIPTextEncode","widgets_values":["short"]}]}"#;
        assert_eq!(mine_prompt(json), None);
    }

    #[test]
    fn unparsable_json_yields_none() {
        assert_eq!(mine_prompt("not json"), None);
        assert_eq!(mine_model("not json"), None);
    }

    #[test]
    fn single_checkpoint_is_cleaned() {
        let json = r#"{"nodes":[
            {"type":"CheckpointLoaderSimple","widgets_values":["checkpoints/dream_shaper_v8.safetensors"]}
        ]}"#;
        assert_eq!(mine_model(json).as_deref(), Some("dream shaper v8"));
    }

    #[test]
    fn multiple_models_are_summarized() {
        let json = r#"{"nodes":[
            {"type":"CheckpointLoaderSimple","widgets_values":["base_model.safetensors"]},
            {"type":"LoraLoader","widgets_values":["detail_lora.safetensors"]},
            {"type":"LoraLoader","widgets_values":["style_lora.safetensors"]},
            {"type":"UpscaleModelLoader","widgets_values":["upscaler.pt"]}
        ]}"#;
        assert_eq!(
            mine_model(json).as_deref(),
            Some("base model + 2 LoRAs + 1 additional model")
        );
    }

    #[test]
    fn controlnet_and_vae_loaders_are_excluded() {
        let json = r#"{"nodes":[
            {"type":"ControlNetLoader","widgets_values":["canny.safetensors"]},
            {"type":"VAELoader","widgets_values":["vae.pt"]}
        ]}"#;
        assert_eq!(mine_model(json), None);
    }
}
