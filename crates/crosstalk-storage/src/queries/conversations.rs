// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use crosstalk_core::types::{Conversation, ConversationStatus};
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, now_ts, Database};
use crate::queries::enum_column;

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        project: row.get(2)?,
        status: enum_column(row, 3)?,
        created_by: enum_column(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        summary: row.get(7)?,
        metadata: row.get(8)?,
        closed_at: row.get(9)?,
    })
}

const CONVERSATION_COLUMNS: &str = "id, title, project, status, created_by, created_at, \
                                    updated_at, summary, metadata, closed_at";

/// Insert a new conversation row.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), CrosstalkError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, title, project, status, created_by,
                                            created_at, updated_at, summary, metadata, closed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    c.id,
                    c.title,
                    c.project,
                    c.status.to_string(),
                    c.created_by.to_string(),
                    c.created_at,
                    c.updated_at,
                    c.summary,
                    c.metadata,
                    c.closed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], conversation_from_row);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations in descending `updated_at` order, optionally filtered
/// by status, paged by `limit`/`offset`.
pub async fn list_conversations(
    db: &Database,
    status: Option<ConversationStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Conversation>, CrosstalkError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut conversations = Vec::new();
            match &status {
                Some(status_filter) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE status = ?1
                         ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3"
                    ))?;
                    let rows =
                        stmt.query_map(params![status_filter, limit, offset], conversation_from_row)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         ORDER BY updated_at DESC LIMIT ?1 OFFSET ?2"
                    ))?;
                    let rows = stmt.query_map(params![limit, offset], conversation_from_row)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a conversation to a new status.
///
/// Stamps `closed_at` when entering `completed` or `archived`, stores the
/// summary if one is given, and bumps `updated_at`.
pub async fn update_conversation_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
    summary: Option<String>,
) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    let closes = matches!(
        status,
        ConversationStatus::Completed | ConversationStatus::Archived
    );
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_ts();
            let closed_at: Option<String> = closes.then(|| now.clone());
            conn.execute(
                "UPDATE conversations
                 SET status = ?1,
                     summary = COALESCE(?2, summary),
                     closed_at = COALESCE(?3, closed_at),
                     updated_at = ?4
                 WHERE id = ?5",
                params![status, summary, closed_at, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
