//! Upload pipeline.
//!
//! One ingest is a straight sequence: hash for duplicate detection, save the
//! file into the library, run the metadata extraction chain, generate the
//! default thumbnail, insert the row. Directory ingest is the same loop with
//! per-item failure isolation.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract;
use crate::store::{Database, MediaType, NewMedia};
use crate::thumbs::{ThumbPosition, Thumbnailer};

/// Result of ingesting one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Added(i64),
    /// Content hash already stored; the existing row id.
    Duplicate(i64),
}

/// Counters for a directory ingest.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestReport {
    pub found: usize,
    pub added: usize,
    pub duplicates: usize,
    pub errors: usize,
}

/// Classify a path by extension against the configured media extensions.
pub fn media_type_for(path: &Path, config: &Config) -> Option<MediaType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if config.ingest.image_extensions.iter().any(|e| *e == ext) {
        Some(MediaType::Image)
    } else if config.ingest.video_extensions.iter().any(|e| *e == ext) {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Ingest a single in-memory file.
pub fn ingest_bytes(
    db: &Database,
    config: &Config,
    data: &[u8],
    filename: &str,
    media_type: MediaType,
) -> Result<IngestOutcome> {
    let sha256 = format!("{:x}", Sha256::digest(data));
    if let Some(existing) = db.find_by_sha256(&sha256)? {
        tracing::info!(filename, existing, "skipping duplicate upload");
        return Ok(IngestOutcome::Duplicate(existing));
    }

    let dest = library_path(config, filename, &sha256)?;
    std::fs::write(&dest, data)
        .with_context(|| format!("writing {} to library", dest.display()))?;

    let mut metadata = extract::extract_metadata(data, filename);
    if metadata.title.is_empty() {
        metadata.title = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.to_string());
    }

    let (width, height) = match media_type {
        MediaType::Image => probe_dimensions(data)
            .map(|(w, h)| (Some(w as i64), Some(h as i64)))
            .unwrap_or((None, None)),
        MediaType::Video => (None, None),
    };

    let thumbnail = match media_type {
        MediaType::Image => {
            let thumbnailer = Thumbnailer::new(&config.thumbnails);
            match thumbnailer.generate(data, ThumbPosition::default()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(filename, error = %e, "thumbnail generation failed on upload");
                    None
                }
            }
        }
        MediaType::Video => None,
    };

    let id = db.insert_media(&NewMedia {
        filename,
        media_type,
        path: &dest.to_string_lossy(),
        size_bytes: data.len() as i64,
        sha256: &sha256,
        width,
        height,
        thumbnail: thumbnail.as_deref(),
        thumb_position: ThumbPosition::default(),
        metadata: &metadata,
    })?;

    tracing::info!(filename, id, "media ingested");
    Ok(IngestOutcome::Added(id))
}

/// Ingest every recognized media file under a directory.
///
/// One file's failure never aborts the batch; it is counted and logged.
pub fn ingest_directory(db: &Database, config: &Config, dir: &Path) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable directory entry");
                report.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(media_type) = media_type_for(entry.path(), config) else {
            continue;
        };
        report.found += 1;

        let filename = entry.file_name().to_string_lossy().to_string();
        let result = std::fs::read(entry.path())
            .map_err(anyhow::Error::from)
            .and_then(|data| ingest_bytes(db, config, &data, &filename, media_type));

        match result {
            Ok(IngestOutcome::Added(_)) => report.added += 1,
            Ok(IngestOutcome::Duplicate(_)) => report.duplicates += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "ingest failed");
                report.errors += 1;
            }
        }
    }

    tracing::info!(
        found = report.found,
        added = report.added,
        duplicates = report.duplicates,
        errors = report.errors,
        "directory ingest complete"
    );
    Ok(report)
}

/// Destination path inside the library, bucketed by month, de-collided by
/// content hash prefix.
fn library_path(config: &Config, filename: &str, sha256: &str) -> Result<PathBuf> {
    let bucket = config
        .library_dir
        .join(chrono::Local::now().format("%Y-%m").to_string());
    std::fs::create_dir_all(&bucket)
        .with_context(|| format!("creating library dir {}", bucket.display()))?;

    let mut dest = bucket.join(filename);
    if dest.exists() {
        let prefix = &sha256[..8.min(sha256.len())];
        dest = bucket.join(format!("{prefix}-{filename}"));
    }
    Ok(dest)
}

fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
