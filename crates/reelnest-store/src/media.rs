//! Media rows and the comment document they carry.
//!
//! The forest is read and written as a whole: there is no partial update of
//! a single comment. [`Database::update_comment_forest`] wraps the
//! fetch/mutate/write cycle in an immediate transaction so that concurrent
//! writers, even on other connections, cannot overwrite each other.

use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Deserialize;
use serde_json::Value;

use reelnest_shared::comments::normalize_forest;
use reelnest_shared::{CommentNode, MediaId, TreeEdit};

use crate::database::{parse_timestamp, Database};
use crate::error::{not_found, Result};
use crate::models::Media;

impl Database {
    pub fn insert_media(&self, title: &str) -> Result<Media> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO media (title, comments, created_at) VALUES (?1, NULL, ?2)",
            params![title, now.to_rfc3339()],
        )?;
        let id = MediaId(self.conn().last_insert_rowid());

        tracing::debug!(media = %id, "media created");
        Ok(Media {
            id,
            title: title.to_string(),
            comments: Vec::new(),
            created_at: now,
        })
    }

    pub fn get_media(&self, id: MediaId) -> Result<Media> {
        let (title, raw, created_str): (String, Option<String>, String) = self
            .conn()
            .query_row(
                "SELECT title, comments, created_at FROM media WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(not_found)?;

        Ok(Media {
            id,
            title,
            comments: parse_forest(raw.as_deref())?,
            created_at: parse_timestamp(2, &created_str)?,
        })
    }

    /// Delete a media row, dropping its whole comment forest with it.
    pub fn delete_media(&self, id: MediaId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM media WHERE id = ?1", params![id.0])?;
        Ok(affected > 0)
    }

    /// Fetch the normalized comment forest of a media item.
    pub fn load_comment_forest(&self, id: MediaId) -> Result<Vec<CommentNode>> {
        read_forest(self.conn(), id)
    }

    /// Overwrite the stored forest. Prefer [`Database::update_comment_forest`]
    /// for anything derived from the current value.
    pub fn store_comment_forest(&self, id: MediaId, forest: &[CommentNode]) -> Result<()> {
        write_forest(self.conn(), id, forest)
    }

    /// Read the forest, apply `mutate`, and write the result back, all in
    /// one `BEGIN IMMEDIATE` transaction. Nothing is written when the edit
    /// reports `found == false`.
    pub fn update_comment_forest<F>(&mut self, id: MediaId, mutate: F) -> Result<TreeEdit>
    where
        F: FnOnce(&[CommentNode]) -> TreeEdit,
    {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = read_forest(&tx, id)?;
        let edit = mutate(&current);

        if edit.found {
            write_forest(&tx, id, &edit.forest)?;
            tx.commit()?;
        } else {
            tracing::debug!(media = %id, "comment edit matched nothing, skipping write");
        }

        Ok(edit)
    }
}

fn read_forest(conn: &Connection, id: MediaId) -> Result<Vec<CommentNode>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT comments FROM media WHERE id = ?1",
            params![id.0],
            |row| row.get(0),
        )
        .map_err(not_found)?;
    parse_forest(raw.as_deref())
}

fn write_forest(conn: &Connection, id: MediaId, forest: &[CommentNode]) -> Result<()> {
    let doc = serde_json::to_string(forest)?;
    let affected = conn.execute(
        "UPDATE media SET comments = ?1 WHERE id = ?2",
        params![doc, id.0],
    )?;
    if affected == 0 {
        return Err(crate::StoreError::NotFound);
    }
    Ok(())
}

fn parse_forest(raw: Option<&str>) -> Result<Vec<CommentNode>> {
    let value = match raw {
        Some(text) if !text.trim().is_empty() => Some(parse_document(text)?),
        _ => None,
    };
    Ok(normalize_forest(value.as_ref()))
}

// Every reply level nests two JSON levels, so serde_json's default limit of
// 128 would cap threads at 63 replies. Parse without the limit and grow the
// stack on demand instead.
fn parse_document(text: &str) -> Result<Value> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use reelnest_shared::comments::insert_reply;
    use reelnest_shared::CommentId;

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("media.db")).unwrap();
        (dir, db)
    }

    fn comment(id: &str) -> CommentNode {
        CommentNode {
            id: CommentId::from(id),
            username: "ann".to_string(),
            avatar_path: "/avatar-placeholder.png".to_string(),
            text: format!("comment {id}"),
            like_count: 0,
            liked_by: Vec::new(),
            replies: Vec::new(),
        }
    }

    fn set_raw(db: &Database, id: MediaId, raw: Option<&str>) {
        db.conn()
            .execute(
                "UPDATE media SET comments = ?1 WHERE id = ?2",
                params![raw, id.0],
            )
            .unwrap();
    }

    #[test]
    fn new_media_has_empty_forest() {
        let (_dir, db) = open();
        let media = db.insert_media("clip").unwrap();
        assert_eq!(db.get_media(media.id).unwrap(), media);
        assert!(db.load_comment_forest(media.id).unwrap().is_empty());
    }

    #[test]
    fn forest_round_trips() {
        let (_dir, db) = open();
        let media = db.insert_media("clip").unwrap();
        let mut root = comment("a");
        root.replies.push(comment("b"));

        db.store_comment_forest(media.id, &[root.clone()]).unwrap();
        assert_eq!(db.load_comment_forest(media.id).unwrap(), vec![root]);
    }

    #[test]
    fn legacy_documents_are_normalized() {
        let (_dir, db) = open();
        let media = db.insert_media("clip").unwrap();

        set_raw(&db, media.id, Some("null"));
        assert!(db.load_comment_forest(media.id).unwrap().is_empty());

        set_raw(
            &db,
            media.id,
            Some(r#"{"id":"solo","username":"ann","avatar_path":"/a.png","comment":"hi","likes":0,"replies":[]}"#),
        );
        let forest = db.load_comment_forest(media.id).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, CommentId::from("solo"));
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let (_dir, db) = open();
        let media = db.insert_media("clip").unwrap();
        set_raw(&db, media.id, Some("{not json"));
        assert!(matches!(
            db.load_comment_forest(media.id),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn missing_media_is_not_found() {
        let (_dir, mut db) = open();
        assert!(matches!(db.get_media(MediaId(404)), Err(StoreError::NotFound)));
        assert!(matches!(
            db.load_comment_forest(MediaId(404)),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.update_comment_forest(MediaId(404), |f| insert_reply(f, None, comment("x"))),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn unmatched_edit_leaves_document_untouched() {
        let (_dir, mut db) = open();
        let media = db.insert_media("clip").unwrap();
        set_raw(&db, media.id, None);

        let edit = db
            .update_comment_forest(media.id, |f| {
                insert_reply(f, Some(&CommentId::from("ghost")), comment("x"))
            })
            .unwrap();
        assert!(!edit.found);

        let raw: Option<String> = db
            .conn()
            .query_row("SELECT comments FROM media WHERE id = ?1", params![media.id.0], |r| r.get(0))
            .unwrap();
        assert_eq!(raw, None);
    }

    #[test]
    fn delete_media_drops_forest() {
        let (_dir, db) = open();
        let media = db.insert_media("clip").unwrap();
        db.store_comment_forest(media.id, &[comment("a")]).unwrap();

        assert!(db.delete_media(media.id).unwrap());
        assert!(!db.delete_media(media.id).unwrap());
        assert!(matches!(
            db.load_comment_forest(media.id),
            Err(StoreError::NotFound)
        ));
    }
}
