//! SQLite-backed media store.
//!
//! Owns the `MediaRecord` lifecycle; the extraction and thumbnail modules
//! only ever read raw bytes and hand derived fields back here.

mod schema;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::extract::NormalizedMetadata;
use crate::thumbs::ThumbPosition;

pub use schema::{MIGRATIONS, SCHEMA};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "video" => MediaType::Video,
            _ => MediaType::Image,
        }
    }
}

/// A stored media item with its extracted metadata.
#[derive(Debug, Clone)]
pub struct MediaRecord {
    pub id: i64,
    pub filename: String,
    pub media_type: MediaType,
    pub path: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub thumbnail: Option<Vec<u8>>,
    pub thumb_position: ThumbPosition,
    pub metadata: NormalizedMetadata,
    pub group_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for inserting a new media row.
#[derive(Debug)]
pub struct NewMedia<'a> {
    pub filename: &'a str,
    pub media_type: MediaType,
    pub path: &'a str,
    pub size_bytes: i64,
    pub sha256: &'a str,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub thumbnail: Option<&'a [u8]>,
    pub thumb_position: ThumbPosition,
    pub metadata: &'a NormalizedMetadata,
}

#[derive(Debug, Clone)]
pub struct MediaGroup {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

pub struct Database {
    conn: Connection,
}

const MEDIA_COLUMNS: &str = "id, filename, media_type, path, size_bytes, sha256, \
     width, height, thumbnail, thumb_x, thumb_y, \
     title, prompt, model, tags, notes, group_id, created_at, updated_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    // ========================================================================
    // Media operations
    // ========================================================================

    pub fn insert_media(&self, media: &NewMedia) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO media (
                filename, media_type, path, size_bytes, sha256,
                width, height, thumbnail, thumb_x, thumb_y,
                title, prompt, model, tags, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                media.filename,
                media.media_type.as_str(),
                media.path,
                media.size_bytes,
                media.sha256,
                media.width,
                media.height,
                media.thumbnail,
                media.thumb_position.x,
                media.thumb_position.y,
                media.metadata.title,
                media.metadata.prompt,
                media.metadata.model,
                media.metadata.tags,
                media.metadata.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_media(&self, id: i64) -> Result<Option<MediaRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?"),
                [id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Returns the existing row id for a content hash, for duplicate detection.
    pub fn find_by_sha256(&self, sha256: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM media WHERE sha256 = ?", [sha256], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// All media, newest first.
    pub fn list_media(&self) -> Result<Vec<MediaRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media ORDER BY created_at DESC, id DESC"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Substring search over title, prompt, model, tags, and notes.
    pub fn search_media(&self, query: &str) -> Result<Vec<MediaRecord>> {
        // Escape the escape character first, then the LIKE wildcards.
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEDIA_COLUMNS} FROM media
            WHERE title LIKE ?1 ESCAPE '\'
               OR prompt LIKE ?1 ESCAPE '\'
               OR model LIKE ?1 ESCAPE '\'
               OR tags LIKE ?1 ESCAPE '\'
               OR notes LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            "#
        ))?;
        let records = stmt
            .query_map([pattern], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn update_metadata(&self, id: i64, metadata: &NormalizedMetadata) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE media SET
                title = ?, prompt = ?, model = ?, tags = ?, notes = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            rusqlite::params![
                metadata.title,
                metadata.prompt,
                metadata.model,
                metadata.tags,
                metadata.notes,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn update_thumbnail(&self, id: i64, thumbnail: &[u8], pos: ThumbPosition) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE media SET
                thumbnail = ?, thumb_x = ?, thumb_y = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            rusqlite::params![thumbnail, pos.x, pos.y, id],
        )?;
        Ok(())
    }

    pub fn delete_media(&self, id: i64) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM media WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    // ========================================================================
    // Group operations
    // ========================================================================

    pub fn create_group(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO media_groups (name) VALUES (?)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn rename_group(&self, id: i64, name: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE media_groups SET name = ? WHERE id = ?",
            rusqlite::params![name, id],
        )?;
        Ok(())
    }

    /// Delete a group; members are kept and detached.
    pub fn delete_group(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE media SET group_id = NULL WHERE group_id = ?",
            [id],
        )?;
        self.conn
            .execute("DELETE FROM media_groups WHERE id = ?", [id])?;
        Ok(())
    }

    pub fn assign_group(&self, media_id: i64, group_id: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE media SET group_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            rusqlite::params![group_id, media_id],
        )?;
        Ok(())
    }

    pub fn list_groups(&self) -> Result<Vec<MediaGroup>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM media_groups ORDER BY name")?;
        let groups = stmt
            .query_map([], |row| {
                Ok(MediaGroup {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    pub fn group_members(&self, group_id: i64) -> Result<Vec<MediaRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE group_id = ? ORDER BY created_at DESC, id DESC"
        ))?;
        let records = stmt
            .query_map([group_id], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

fn row_to_record(row: &Row) -> rusqlite::Result<MediaRecord> {
    let media_type: String = row.get(2)?;
    let thumb_x: u8 = row.get(9)?;
    let thumb_y: u8 = row.get(10)?;
    Ok(MediaRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        media_type: MediaType::from_str(&media_type),
        path: row.get(3)?,
        size_bytes: row.get(4)?,
        sha256: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        thumbnail: row.get(8)?,
        thumb_position: ThumbPosition::new(thumb_x, thumb_y),
        metadata: NormalizedMetadata {
            title: row.get(11)?,
            prompt: row.get(12)?,
            model: row.get(13)?,
            tags: row.get(14)?,
            notes: row.get(15)?,
        },
        group_id: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}
