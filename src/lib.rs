//! aivault: a single-user local gallery for AI-generated images and videos.
//!
//! Media is stored on the file system and indexed in an embedded SQLite
//! database. On upload, generation metadata (prompts, models, workflows) is
//! extracted from PNG text chunks and normalized across tools; thumbnails
//! are cropped around a user-adjustable focal point. Batch jobs clean prompt
//! text, re-mine workflow graphs, and regenerate thumbnails across the
//! whole collection.
//!
//! There is no web, CLI, or UI surface here; hosts bring their own.

pub mod config;
pub mod export;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod maintenance;
pub mod store;
pub mod thumbs;

pub use config::Config;
pub use extract::{clean_model_name, clean_prompt_text, extract_metadata, NormalizedMetadata};
pub use ingest::{ingest_bytes, ingest_directory, IngestOutcome, IngestReport};
pub use store::{Database, MediaGroup, MediaRecord, MediaType};
pub use thumbs::{ThumbPosition, Thumbnailer};
