pub const SCHEMA: &str = r#"
-- Media table: one row per stored image or video
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    media_type TEXT NOT NULL DEFAULT 'image',  -- 'image' or 'video'
    path TEXT NOT NULL UNIQUE,
    size_bytes INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,

    -- Source dimensions (images only)
    width INTEGER,
    height INTEGER,

    -- Generated thumbnail and the focal position that produced it
    thumbnail BLOB,
    thumb_x INTEGER NOT NULL DEFAULT 50,
    thumb_y INTEGER NOT NULL DEFAULT 25,

    -- Extracted generation metadata; empty string means "none", never NULL
    title TEXT NOT NULL DEFAULT '',
    prompt TEXT NOT NULL DEFAULT '',
    model TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',

    -- Optional grouping
    group_id INTEGER REFERENCES media_groups(id) ON DELETE SET NULL
);

-- Indexes for common queries
CREATE INDEX IF NOT EXISTS idx_media_sha256 ON media(sha256);
CREATE INDEX IF NOT EXISTS idx_media_group ON media(group_id);
CREATE INDEX IF NOT EXISTS idx_media_created_at ON media(created_at);
CREATE INDEX IF NOT EXISTS idx_media_type ON media(media_type);

-- User-defined groups of related media
CREATE TABLE IF NOT EXISTS media_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Migrations for databases created before the current schema.
/// Each statement is run best-effort; failures on already-migrated
/// databases are expected and ignored.
pub const MIGRATIONS: &[&str] = &[
    // Focal thumbnail positions were added after the initial release
    "ALTER TABLE media ADD COLUMN thumb_x INTEGER NOT NULL DEFAULT 50",
    "ALTER TABLE media ADD COLUMN thumb_y INTEGER NOT NULL DEFAULT 25",
    // Grouping support
    "ALTER TABLE media ADD COLUMN group_id INTEGER REFERENCES media_groups(id) ON DELETE SET NULL",
];
