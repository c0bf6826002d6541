// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline delivery queue operations.
//!
//! An entry exists only while the referenced message is pending; the unique
//! constraint on `message_id` keeps delivery at-least-once with duplicate
//! suppression while the row lives.

use crosstalk_core::types::{AssistantId, QueueEntry};
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, now_ts, ts_in, Database};
use crate::queries::enum_column;

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        message_id: row.get(1)?,
        target: enum_column(row, 2)?,
        priority: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        next_attempt: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const ENTRY_COLUMNS: &str =
    "id, message_id, target, priority, attempts, max_attempts, next_attempt, created_at";

/// Enqueue a message for later delivery. Returns the queue entry id.
///
/// The first attempt is due immediately.
pub async fn enqueue_message(
    db: &Database,
    message_id: &str,
    target: AssistantId,
    priority: i64,
    max_attempts: i64,
) -> Result<i64, CrosstalkError> {
    let message_id = message_id.to_string();
    let target = target.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_queue (message_id, target, priority, attempts,
                                            max_attempts, next_attempt, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
                params![message_id, target, priority, max_attempts, now_ts(), now_ts()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Due entries for `target`, highest priority first, earliest due first.
///
/// Entries that have exhausted their attempts are never returned; the
/// sweeper removes them.
pub async fn dequeue_messages(
    db: &Database,
    target: AssistantId,
    limit: i64,
) -> Result<Vec<QueueEntry>, CrosstalkError> {
    let target = target.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM message_queue
                 WHERE target = ?1 AND next_attempt <= ?2 AND attempts < max_attempts
                 ORDER BY priority DESC, next_attempt ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![target, now_ts(), limit], entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed delivery attempt and push `next_attempt` out by
/// `delay_seconds`.
pub async fn increment_attempts(
    db: &Database,
    id: i64,
    delay_seconds: i64,
) -> Result<(), CrosstalkError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE message_queue
                 SET attempts = attempts + 1, next_attempt = ?1
                 WHERE id = ?2",
                params![ts_in(delay_seconds), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Drop the entry for a delivered (or vanished) message.
pub async fn remove_from_queue(db: &Database, message_id: &str) -> Result<(), CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM message_queue WHERE message_id = ?1",
                params![message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete entries whose attempts are exhausted. Returns how many were swept.
pub async fn clear_exhausted(db: &Database) -> Result<usize, CrosstalkError> {
    db.connection()
        .call(|conn| {
            let swept = conn.execute(
                "DELETE FROM message_queue WHERE attempts >= max_attempts",
                [],
            )?;
            Ok(swept)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up the entry for one message, if queued.
pub async fn get_queue_entry(
    db: &Database,
    message_id: &str,
) -> Result<Option<QueueEntry>, CrosstalkError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM message_queue WHERE message_id = ?1"
            ))?;
            let result = stmt.query_row(params![message_id], entry_from_row);
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
