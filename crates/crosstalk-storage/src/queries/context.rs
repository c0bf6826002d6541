// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared context payloads.

use crosstalk_core::types::SharedContext;
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::enum_column;

fn context_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SharedContext> {
    Ok(SharedContext {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        context_type: enum_column(row, 2)?,
        content: row.get(3)?,
        description: row.get(4)?,
        shared_by: enum_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

const CONTEXT_COLUMNS: &str =
    "id, conversation_id, context_type, content, description, shared_by, created_at";

/// Insert a shared context row.
pub async fn create_shared_context(
    db: &Database,
    context: &SharedContext,
) -> Result<(), CrosstalkError> {
    let ctx = context.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO shared_context (id, conversation_id, context_type, content,
                                             description, shared_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    ctx.id,
                    ctx.conversation_id,
                    ctx.context_type.to_string(),
                    ctx.content,
                    ctx.description,
                    ctx.shared_by.to_string(),
                    ctx.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get one shared context payload by id.
pub async fn get_shared_context(
    db: &Database,
    id: &str,
) -> Result<Option<SharedContext>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTEXT_COLUMNS} FROM shared_context WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], context_from_row);
            match result {
                Ok(context) => Ok(Some(context)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List shared context, newest first, optionally scoped to a conversation.
pub async fn list_shared_context(
    db: &Database,
    conversation_id: Option<String>,
    limit: i64,
) -> Result<Vec<SharedContext>, CrosstalkError> {
    db.connection()
        .call(move |conn| {
            let mut contexts = Vec::new();
            match &conversation_id {
                Some(conversation_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONTEXT_COLUMNS} FROM shared_context
                         WHERE conversation_id = ?1
                         ORDER BY created_at DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![conversation_id, limit], context_from_row)?;
                    for row in rows {
                        contexts.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONTEXT_COLUMNS} FROM shared_context
                         ORDER BY created_at DESC LIMIT ?1"
                    ))?;
                    let rows = stmt.query_map(params![limit], context_from_row)?;
                    for row in rows {
                        contexts.push(row?);
                    }
                }
            }
            Ok(contexts)
        })
        .await
        .map_err(map_tr_err)
}
