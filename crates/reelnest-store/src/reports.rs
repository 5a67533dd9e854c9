//! Content reports and their moderation.
//!
//! A report starts out `pending`. An admin either ignores it or removes the
//! reported media, which also resolves the report.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use reelnest_shared::{MediaId, UserId};

use crate::database::{parse_timestamp, parse_uuid, Database};
use crate::error::{not_found, Result, StoreError};
use crate::models::{Report, ReportStatus};

const REPORT_COLUMNS: &str = "id, media_id, reporter_id, reason, note, status, created_at";

impl Database {
    /// File a report against a media item. The note is trimmed and an empty
    /// note is stored as NULL. Unknown media gives `NotFound`.
    pub fn insert_report(
        &self,
        media_id: MediaId,
        reporter_id: Option<&UserId>,
        reason: &str,
        note: Option<&str>,
    ) -> Result<Report> {
        // fail with NotFound rather than a foreign key error
        self.conn()
            .query_row("SELECT 1 FROM media WHERE id = ?1", params![media_id.0], |_| Ok(()))
            .map_err(not_found)?;

        let report = Report {
            id: Uuid::new_v4(),
            media_id: Some(media_id),
            reporter_id: reporter_id.cloned(),
            reason: reason.trim().to_string(),
            note: note
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            status: ReportStatus::Pending,
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO reports (id, media_id, reporter_id, reason, note, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.id.to_string(),
                media_id.0,
                report.reporter_id.as_ref().map(UserId::as_str),
                report.reason,
                report.note,
                report.status.as_str(),
                report.created_at.to_rfc3339(),
            ],
        )?;

        tracing::info!(media = %media_id, report = %report.id, "report filed");
        Ok(report)
    }

    pub fn get_report(&self, id: Uuid) -> Result<Report> {
        read_report(self.conn(), id)
    }

    /// Most recent reports first, optionally only those in `status`.
    pub fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Report>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPORT_COLUMNS}
             FROM reports
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY created_at DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(
            params![status.map(ReportStatus::as_str), limit, offset],
            row_to_report,
        )?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?);
        }
        Ok(reports)
    }

    /// Move a report to `status` without touching the media.
    pub fn set_report_status(&self, id: Uuid, status: ReportStatus) -> Result<Report> {
        write_status(self.conn(), id, status)?;
        tracing::info!(report = %id, %status, "report status changed");
        read_report(self.conn(), id)
    }

    /// Delete the reported media (and with it the comment forest) and mark
    /// the report `media removed`. Media that is already gone is not an
    /// error; the report is still resolved.
    pub fn remove_reported_media(&mut self, id: Uuid) -> Result<Report> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let media_id: Option<i64> = tx
            .query_row("SELECT media_id FROM reports WHERE id = ?1", params![id.to_string()], |row| {
                row.get(0)
            })
            .map_err(not_found)?;

        if let Some(media_id) = media_id {
            let deleted = tx.execute("DELETE FROM media WHERE id = ?1", params![media_id])?;
            tracing::info!(report = %id, media = media_id, deleted = deleted > 0, "reported media removed");
        }

        write_status(&tx, id, ReportStatus::MediaRemoved)?;
        let report = read_report(&tx, id)?;
        tx.commit()?;
        Ok(report)
    }
}

fn read_report(conn: &Connection, id: Uuid) -> Result<Report> {
    conn.query_row(
        &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
        params![id.to_string()],
        row_to_report,
    )
    .optional()?
    .ok_or(StoreError::NotFound)
}

fn write_status(conn: &Connection, id: Uuid, status: ReportStatus) -> Result<()> {
    let affected = conn.execute(
        "UPDATE reports SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    let id_str: String = row.get(0)?;
    let media_id: Option<i64> = row.get(1)?;
    let reporter_id: Option<String> = row.get(2)?;
    let reason: String = row.get(3)?;
    let note: Option<String> = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    let status = ReportStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown report status {status_str:?}").into(),
        )
    })?;

    Ok(Report {
        id: parse_uuid(0, &id_str)?,
        media_id: media_id.map(MediaId),
        reporter_id: reporter_id.map(UserId),
        reason,
        note,
        status,
        created_at: parse_timestamp(6, &created_str)?,
    })
}
