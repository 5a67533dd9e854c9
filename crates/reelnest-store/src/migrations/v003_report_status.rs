//! v003 -- Report moderation state.
//!
//! Adds `reports.status` and relaxes the media foreign key to
//! `ON DELETE SET NULL` so a report outlives the media it got removed.
//! SQLite cannot alter a foreign key in place, so the table is rebuilt.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE reports_v3 (
    id          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    media_id    INTEGER,                    -- FK -> media(id), NULL once removed
    reporter_id TEXT,
    reason      TEXT NOT NULL,
    note        TEXT,
    status      TEXT NOT NULL DEFAULT 'pending',  -- pending | ignored | media removed
    created_at  TEXT NOT NULL,

    FOREIGN KEY (media_id) REFERENCES media(id) ON DELETE SET NULL
);

INSERT INTO reports_v3 (id, media_id, reporter_id, reason, note, created_at)
    SELECT id, media_id, reporter_id, reason, note, created_at FROM reports;

DROP TABLE reports;
ALTER TABLE reports_v3 RENAME TO reports;

CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
