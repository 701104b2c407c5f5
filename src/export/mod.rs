//! Gallery backup export and import.
//!
//! The JSON backup is a full snapshot: every record with its metadata and
//! base64-encoded thumbnail. The CSV export is a flat metadata listing for
//! spreadsheets, without binary payloads.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extract::NormalizedMetadata;
use crate::store::{Database, MediaType, NewMedia};
use crate::thumbs::ThumbPosition;

/// Current backup file format version.
const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Backup {
    pub version: u32,
    pub exported_at: String,
    pub media: Vec<BackupMedia>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupMedia {
    pub filename: String,
    pub media_type: MediaType,
    pub path: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub thumb_x: u8,
    pub thumb_y: u8,
    pub thumbnail_base64: Option<String>,
    pub title: String,
    pub prompt: String,
    pub model: String,
    pub tags: String,
    pub notes: String,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Write a full JSON backup of the gallery. Returns the record count.
pub fn export_backup(db: &Database, output_path: &Path) -> Result<usize> {
    let group_names: HashMap<i64, String> = db
        .list_groups()?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();

    let media: Vec<BackupMedia> = db
        .list_media()?
        .into_iter()
        .map(|record| BackupMedia {
            filename: record.filename,
            media_type: record.media_type,
            path: record.path,
            size_bytes: record.size_bytes,
            sha256: record.sha256,
            width: record.width,
            height: record.height,
            thumb_x: record.thumb_position.x,
            thumb_y: record.thumb_position.y,
            thumbnail_base64: record.thumbnail.map(|t| BASE64.encode(t)),
            title: record.metadata.title,
            prompt: record.metadata.prompt,
            model: record.metadata.model,
            tags: record.metadata.tags,
            notes: record.metadata.notes,
            group: record.group_id.and_then(|id| group_names.get(&id).cloned()),
        })
        .collect();

    let backup = Backup {
        version: BACKUP_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        media,
    };

    let count = backup.media.len();
    let json = serde_json::to_string_pretty(&backup)?;
    let mut file = File::create(output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    file.write_all(json.as_bytes())?;

    tracing::info!(count, path = %output_path.display(), "backup exported");
    Ok(count)
}

/// Restore records from a JSON backup.
///
/// Records whose content hash is already present are skipped; groups are
/// recreated by name as needed.
pub fn import_backup(db: &Database, input_path: &Path) -> Result<ImportReport> {
    let content = std::fs::read_to_string(input_path)
        .with_context(|| format!("reading {}", input_path.display()))?;
    let backup: Backup = serde_json::from_str(&content).context("parsing backup file")?;

    let mut group_ids: HashMap<String, i64> = db
        .list_groups()?
        .into_iter()
        .map(|g| (g.name, g.id))
        .collect();

    let mut report = ImportReport::default();
    for item in backup.media {
        if db.find_by_sha256(&item.sha256)?.is_some() {
            report.skipped += 1;
            continue;
        }

        let thumbnail = match &item.thumbnail_base64 {
            Some(encoded) => Some(BASE64.decode(encoded).context("decoding thumbnail")?),
            None => None,
        };

        let metadata = NormalizedMetadata {
            title: item.title,
            prompt: item.prompt,
            model: item.model,
            tags: item.tags,
            notes: item.notes,
        };
        let id = db.insert_media(&NewMedia {
            filename: &item.filename,
            media_type: item.media_type,
            path: &item.path,
            size_bytes: item.size_bytes,
            sha256: &item.sha256,
            width: item.width,
            height: item.height,
            thumbnail: thumbnail.as_deref(),
            thumb_position: ThumbPosition::new(item.thumb_x, item.thumb_y),
            metadata: &metadata,
        })?;

        if let Some(group_name) = item.group {
            let group_id = match group_ids.get(&group_name) {
                Some(id) => *id,
                None => {
                    let created = db.create_group(&group_name)?;
                    group_ids.insert(group_name, created);
                    created
                }
            };
            db.assign_group(id, Some(group_id))?;
        }
        report.imported += 1;
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        "backup imported"
    );
    Ok(report)
}

/// Export a flat CSV listing of all metadata. Returns the record count.
pub fn export_csv(db: &Database, output_path: &Path) -> Result<usize> {
    let records = db.list_media()?;
    let mut wtr = csv::Writer::from_path(output_path)?;

    // Write headers
    wtr.write_record([
        "filename",
        "media_type",
        "path",
        "size_bytes",
        "sha256",
        "width",
        "height",
        "title",
        "prompt",
        "model",
        "tags",
        "notes",
        "created_at",
    ])?;

    for record in &records {
        wtr.write_record([
            record.filename.clone(),
            record.media_type.as_str().to_string(),
            record.path.clone(),
            record.size_bytes.to_string(),
            record.sha256.clone(),
            record.width.map(|v| v.to_string()).unwrap_or_default(),
            record.height.map(|v| v.to_string()).unwrap_or_default(),
            record.metadata.title.clone(),
            record.metadata.prompt.clone(),
            record.metadata.model.clone(),
            record.metadata.tags.clone(),
            record.metadata.notes.clone(),
            record.created_at.clone(),
        ])?;
    }

    wtr.flush()?;
    tracing::info!(count = records.len(), path = %output_path.display(), "csv exported");
    Ok(records.len())
}
