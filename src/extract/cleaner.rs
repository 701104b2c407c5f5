//! Prompt and model-name cleanup.
//!
//! Generation tools leave boilerplate style tags and sampler settings inside
//! prompt text, and model names arrive as checkpoint file paths. These
//! helpers scrub both into something worth displaying.

use lazy_static::lazy_static;
use regex::Regex;

/// Default style tag combination emitted by several ComfyUI workflow packs.
const BOILERPLATE_PREFIX: &str = "masterpiece, best quality";

lazy_static! {
    /// Inline `key: value` noise like `steps: 20,` or `cfg: 7.5`.
    static ref NOISE_TOKEN: Regex = Regex::new(
        r"(?i)\b(weight|strength|scale|ratio|steps|cfg|seed)\s*:\s*-?[0-9]+(\.[0-9]+)?\s*,?"
    )
    .unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Strip generation-tool boilerplate and formatting noise from prompt text.
///
/// Idempotent: the passes repeat until the text stops changing, so removing
/// a noise token that was hiding the boilerplate prefix still converges in
/// one call.
pub fn clean_prompt_text(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let mut next = strip_boilerplate_prefix(out.trim());
        next = NOISE_TOKEN.replace_all(&next, " ").to_string();
        next = WHITESPACE_RUN.replace_all(&next, " ").trim().to_string();
        if next == out {
            return next;
        }
        out = next;
    }
}

/// Remove the known default style prefix, case-insensitively.
fn strip_boilerplate_prefix(text: &str) -> String {
    if let (Some(head), Some(rest)) = (
        text.get(..BOILERPLATE_PREFIX.len()),
        text.get(BOILERPLATE_PREFIX.len()..),
    ) {
        if head.eq_ignore_ascii_case(BOILERPLATE_PREFIX) {
            return rest
                .trim_start_matches(|c: char| c == ',' || c.is_whitespace())
                .to_string();
        }
    }
    text.to_string()
}

/// Turn a checkpoint/LoRA file path into a display name.
///
/// `loras/SDXL/my_lora_v2.safetensors` becomes `my lora v2`.
pub fn clean_model_name(name: &str) -> String {
    let mut out = name.trim();

    for ext in [".safetensors", ".ckpt", ".pt"] {
        if out.len() >= ext.len() && out.is_char_boundary(out.len() - ext.len()) {
            let (stem, tail) = out.split_at(out.len() - ext.len());
            if tail.eq_ignore_ascii_case(ext) {
                out = stem;
                break;
            }
        }
    }

    // Keep only the final path segment.
    if let Some(idx) = out.rfind(['/', '\\']) {
        out = &out[idx + 1..];
    }

    let mut out = out.strip_prefix("SDXL").unwrap_or(out).to_string();
    out = out.replace('_', " ");
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_boilerplate_prefix() {
        assert_eq!(
            clean_prompt_text("masterpiece, best quality, a cat on a mat"),
            "a cat on a mat"
        );
        assert_eq!(
            clean_prompt_text("Masterpiece, Best Quality, a cat"),
            "a cat"
        );
    }

    #[test]
    fn boilerplate_only_reduces_to_empty() {
        assert_eq!(clean_prompt_text("masterpiece, best quality"), "");
        assert_eq!(clean_prompt_text("masterpiece, best quality, "), "");
    }

    #[test]
    fn removes_noise_tokens() {
        assert_eq!(
            clean_prompt_text("a fox, steps: 20, cfg: 7.5, seed: 42 in the snow"),
            "a fox, in the snow"
        );
        assert_eq!(clean_prompt_text("strength:0.8, a boat"), "a boat");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_prompt_text("a   cat\n\n on \t a mat"), "a cat on a mat");
    }

    #[test]
    fn noise_hiding_the_prefix_still_converges() {
        // The leading token masks the boilerplate prefix until it is removed.
        assert_eq!(
            clean_prompt_text("steps: 8, masterpiece, best quality, a heron"),
            "a heron"
        );
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "masterpiece, best quality, a cat, steps: 20",
            "already clean text",
            "masterpiece, best quality",
            "  padded   text  ",
            "steps: 8, masterpiece,   best quality, a heron",
            "",
        ];
        for input in inputs {
            let once = clean_prompt_text(input);
            let twice = clean_prompt_text(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn cleans_model_paths() {
        assert_eq!(clean_model_name("loras/SDXL/my_lora_v2.safetensors"), "my lora v2");
        assert_eq!(clean_model_name("sd_xl_base_1.0.safetensors"), "sd xl base 1.0");
        assert_eq!(clean_model_name("models\\checkpoints\\dream.ckpt"), "dream");
        assert_eq!(clean_model_name("SDXL_turbo.pt"), "turbo");
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(clean_model_name("ChatGPT-4"), "ChatGPT-4");
    }
}
