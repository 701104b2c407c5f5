//! PNG text chunk extraction.
//!
//! Generation tools (ComfyUI, A1111, ChatGPT export) embed their metadata as
//! PNG `tEXt` chunks. This module walks the chunk structure of a raw byte
//! buffer and collects every textual keyword/value pair it can find.

use std::collections::HashMap;

/// PNG file signature.
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Extract all `tEXt` chunks from a PNG byte buffer into a keyword -> value map.
///
/// Returns an empty map if the buffer is not a PNG or carries no text chunks.
/// `zTXt` and `iTXt` chunks (compressed / international text) are not
/// supported and are skipped. A truncated or malformed buffer terminates the
/// walk early and returns whatever was collected up to that point; this is a
/// best-effort scan over possibly-corrupt user files and must never fail.
pub fn extract_text_chunks(data: &[u8]) -> HashMap<String, String> {
    let mut chunks = HashMap::new();

    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return chunks;
    }

    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let length = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let chunk_type = &data[pos + 4..pos + 8];

        let payload_start = pos + 8;
        let payload_end = match payload_start.checked_add(length) {
            Some(end) if end <= data.len() => end,
            // Length field runs past the buffer: stop the walk.
            _ => break,
        };

        if chunk_type == b"tEXt" {
            let payload = &data[payload_start..payload_end];
            if let Some(null_pos) = payload.iter().position(|&b| b == 0) {
                let keyword = String::from_utf8_lossy(&payload[..null_pos]).to_string();
                let value = String::from_utf8_lossy(&payload[null_pos + 1..]).to_string();
                chunks.insert(keyword, value);
            }
        }

        // 4-byte length + 4-byte type + payload + 4-byte CRC (not verified)
        pos = payload_end + 4;
    }

    chunks
}
