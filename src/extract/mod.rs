//! Generation metadata extraction.
//!
//! Upstream tools do not share a schema, so tool identity is inferred from
//! structural signatures: which text chunks exist and what shape their
//! content has. Parsers are tried in a fixed priority order and the first
//! match wins. ChatGPT runs before ComfyUI/A1111 because its payload also
//! lives in a `prompt` chunk and would otherwise be claimed by the generic
//! parser.

pub mod chatgpt;
pub mod chunks;
pub mod cleaner;
pub mod comfyui;
pub mod workflow;

use serde::{Deserialize, Serialize};

pub use chunks::extract_text_chunks;
pub use cleaner::{clean_model_name, clean_prompt_text};
pub use workflow::{mine_model, mine_prompt};

/// Placeholder written when extraction found nothing; mining jobs may
/// overwrite it, a user edit never matches it.
pub const PROMPT_PLACEHOLDER: &str = "No prompt found";
/// Same, for the model field.
pub const MODEL_PLACEHOLDER: &str = "Unknown model";

/// The tool-agnostic metadata shape every parser produces.
///
/// Fields are never null: absent data is an empty string, so downstream
/// consumers never need to distinguish missing from empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMetadata {
    pub title: String,
    pub prompt: String,
    pub model: String,
    pub tags: String,
    pub notes: String,
}

impl NormalizedMetadata {
    /// True when no parser produced anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.prompt.is_empty()
            && self.model.is_empty()
            && self.tags.is_empty()
            && self.notes.is_empty()
    }
}

/// True when a stored field may be overwritten by automated mining.
///
/// Mining must never clobber a manual edit; only empty fields and the known
/// placeholders written by extraction itself are fair game.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == PROMPT_PLACEHOLDER || trimmed == MODEL_PLACEHOLDER
}

/// Run the full extraction chain over a raw file buffer.
///
/// Non-PNG buffers and PNGs without recognizable metadata yield an empty
/// record; the caller decides whether to seed the title from the filename.
pub fn extract_metadata(data: &[u8], filename: &str) -> NormalizedMetadata {
    let chunks = extract_text_chunks(data);

    if chatgpt::matches(&chunks, filename) {
        tracing::debug!(filename, "extracting as ChatGPT export");
        return chatgpt::parse(&chunks, filename);
    }
    if comfyui::matches(&chunks) {
        tracing::debug!(filename, "extracting as ComfyUI/A1111");
        return comfyui::parse(&chunks);
    }

    tracing::debug!(filename, "no generation metadata recognized");
    NormalizedMetadata::default()
}

#[cfg(test)]
mod tests {
    use super::chunks::tests::png_with_text;
    use super::*;

    #[test]
    fn non_png_yields_empty_metadata() {
        let meta = extract_metadata(b"plain bytes", "photo.jpg");
        assert!(meta.is_empty());
    }

    #[test]
    fn chatgpt_runs_before_comfyui() {
        // A ChatGPT payload also lives under the "prompt" key; the chain must
        // not hand it to the generic parser.
        let png = png_with_text(&[(
            "prompt",
            r#"{"tool":"ChatGPT-4","prompt":"a red fox in the snow"}"#,
        )]);
        let meta = extract_metadata(&png, "image.png");
        assert_eq!(meta.model, "ChatGPT-4");
        assert!(meta.tags.contains("ChatGPT"));
    }

    #[test]
    fn comfyui_workflow_is_extracted() {
        let png = png_with_text(&[(
            "workflow",
            r#"{"nodes":[{"type":"CLIPTextEncode","widgets_values":["a cat sitting on a mat, 4k"]}]}"#,
        )]);
        let meta = extract_metadata(&png, "image.png");
        assert_eq!(meta.prompt, "a cat sitting on a mat, 4k");
        assert!(meta.tags.contains("ComfyUI"));
    }

    #[test]
    fn filename_prefix_triggers_chatgpt_without_chunks() {
        let png = png_with_text(&[]);
        let meta = extract_metadata(&png, "ChatGPT Image May 5.png");
        assert_eq!(meta.tags, "ChatGPT,AI-Generated");
    }

    #[test]
    fn placeholder_guard() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  "));
        assert!(is_placeholder(PROMPT_PLACEHOLDER));
        assert!(is_placeholder(MODEL_PLACEHOLDER));
        assert!(!is_placeholder("a user edited prompt"));
    }
}
