use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Content reports filed against media items
CREATE TABLE IF NOT EXISTS reports (
    id          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    media_id    INTEGER NOT NULL,           -- FK -> media(id)
    reporter_id TEXT,                       -- nullable, anonymous reports allowed
    reason      TEXT NOT NULL,
    note        TEXT,
    created_at  TEXT NOT NULL,              -- ISO-8601

    FOREIGN KEY (media_id) REFERENCES media(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at DESC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
