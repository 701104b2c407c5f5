//! Collection-wide batch jobs.
//!
//! All batches are sequential with per-item failure isolation: one bad file
//! increments a counter and the loop moves on. The "never overwrite a manual
//! edit" guard for the workflow miners lives here, not in the miners.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::extract::{
    self, clean_prompt_text, extract_text_chunks, is_placeholder, mine_model, mine_prompt,
};
use crate::store::{Database, MediaType};
use crate::thumbs::{ThumbPosition, Thumbnailer};

/// Counters returned by every batch job.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub updated: usize,
    pub errors: usize,
}

/// Run the prompt cleaner over every stored record.
///
/// Writes back only when the cleaned text differs; the cleaner is idempotent
/// so re-running the job is harmless.
pub fn clean_all_prompts(db: &Database) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for record in db.list_media()? {
        report.processed += 1;
        let cleaned = clean_prompt_text(&record.metadata.prompt);
        if cleaned != record.metadata.prompt {
            let mut metadata = record.metadata.clone();
            metadata.prompt = cleaned;
            db.update_metadata(record.id, &metadata)?;
            report.updated += 1;
        }
    }

    tracing::info!(
        processed = report.processed,
        updated = report.updated,
        "prompt cleanup complete"
    );
    Ok(report)
}

/// Re-run workflow mining over every stored file, filling prompt and model
/// fields that are still empty or hold an extraction placeholder.
pub fn remine_metadata(db: &Database) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for record in db.list_media()? {
        report.processed += 1;

        let data = match std::fs::read(&record.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %record.path, error = %e, "cannot read media file");
                report.errors += 1;
                continue;
            }
        };

        let chunks = extract_text_chunks(&data);
        let Some(graph) = chunks.get("workflow").or_else(|| chunks.get("prompt")) else {
            continue;
        };

        let mut metadata = record.metadata.clone();
        let mut changed = false;

        if is_placeholder(&metadata.prompt) {
            if let Some(mined) = mine_prompt(graph) {
                metadata.prompt = mined;
                changed = true;
            }
        }
        if is_placeholder(&metadata.model) {
            if let Some(mined) = mine_model(graph) {
                metadata.model = mined;
                changed = true;
            }
        }

        if changed {
            db.update_metadata(record.id, &metadata)?;
            report.updated += 1;
        }
    }

    tracing::info!(
        processed = report.processed,
        updated = report.updated,
        errors = report.errors,
        "metadata remining complete"
    );
    Ok(report)
}

/// Regenerate every image thumbnail at its stored focal position.
///
/// Decode failures are counted, never propagated; a single corrupt file must
/// not abort the batch.
pub fn regenerate_thumbnails(db: &Database, config: &Config) -> Result<BatchReport> {
    let thumbnailer = Thumbnailer::new(&config.thumbnails);
    let mut report = BatchReport::default();

    for record in db.list_media()? {
        if record.media_type != MediaType::Image {
            continue;
        }
        report.processed += 1;

        let result = std::fs::read(&record.path)
            .map_err(anyhow::Error::from)
            .and_then(|data| {
                thumbnailer
                    .generate(&data, record.thumb_position)
                    .map_err(anyhow::Error::from)
            });

        match result {
            Ok(thumbnail) => {
                db.update_thumbnail(record.id, &thumbnail, record.thumb_position)?;
                report.updated += 1;
            }
            Err(e) => {
                tracing::warn!(path = %record.path, error = %e, "thumbnail regeneration failed");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        updated = report.updated,
        errors = report.errors,
        "thumbnail regeneration complete"
    );
    Ok(report)
}

/// Regenerate one thumbnail at a new focal position.
///
/// Unlike the batch job this propagates decode errors: the user asked for
/// this specific reposition and must see the failure.
pub fn reposition_thumbnail(
    db: &Database,
    config: &Config,
    id: i64,
    pos: ThumbPosition,
) -> Result<()> {
    let record = db
        .get_media(id)?
        .with_context(|| format!("no media record with id {id}"))?;

    let data = std::fs::read(&record.path)
        .with_context(|| format!("reading {}", record.path))?;

    let thumbnailer = Thumbnailer::new(&config.thumbnails);
    let thumbnail = thumbnailer.generate(&data, pos)?;
    db.update_thumbnail(id, &thumbnail, pos)?;
    Ok(())
}

/// Re-extract generation metadata for one record from its stored file,
/// replacing prompt/model/tags/notes but keeping the title.
pub fn reextract_metadata(db: &Database, id: i64) -> Result<bool> {
    let record = db
        .get_media(id)?
        .with_context(|| format!("no media record with id {id}"))?;

    let data = std::fs::read(&record.path)
        .with_context(|| format!("reading {}", record.path))?;

    let mut metadata = extract::extract_metadata(&data, &record.filename);
    if metadata.is_empty() {
        return Ok(false);
    }
    metadata.title = record.metadata.title.clone();
    db.update_metadata(id, &metadata)?;
    Ok(true)
}
