// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations.
//!
//! Every insert bumps the owning conversation's `updated_at` in the same
//! transaction. Status transitions are monotonic along
//! pending -> delivered -> read -> responded.

use crosstalk_core::types::{Message, MessageSearchHit, MessageStatus};
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, now_ts, Database};
use crate::queries::enum_column;

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender: enum_column(row, 2)?,
        target: enum_column(row, 3)?,
        content: row.get(4)?,
        message_type: enum_column(row, 5)?,
        priority: enum_column(row, 6)?,
        status: enum_column(row, 7)?,
        response_to_id: row.get(8)?,
        created_at: row.get(9)?,
        delivered_at: row.get(10)?,
        read_at: row.get(11)?,
        metadata: row.get(12)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender, target, content, message_type, \
                               priority, status, response_to_id, created_at, delivered_at, \
                               read_at, metadata";

/// Insert a message and bump the conversation's `updated_at` atomically.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), CrosstalkError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender, target, content,
                                       message_type, priority, status, response_to_id,
                                       created_at, delivered_at, read_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    m.id,
                    m.conversation_id,
                    m.sender.to_string(),
                    m.target.to_string(),
                    m.content,
                    m.message_type.to_string(),
                    m.priority.to_string(),
                    m.status.to_string(),
                    m.response_to_id,
                    m.created_at,
                    m.delivered_at,
                    m.read_at,
                    m.metadata,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![now_ts(), m.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], message_from_row);
            match result {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in ascending `created_at` order.
pub async fn get_history(
    db: &Database,
    conversation_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Message>, CrosstalkError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit, offset], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Advance a message's delivery status.
///
/// Transitions only move forward; a lower-ranked status is a no-op. Entering
/// `delivered` or `read` stamps the corresponding timestamp once.
pub async fn update_message_status(
    db: &Database,
    id: &str,
    status: MessageStatus,
) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: MessageStatus = {
                let mut stmt = tx.prepare("SELECT status FROM messages WHERE id = ?1")?;
                stmt.query_row(params![id], |row| enum_column(row, 0))?
            };
            if status.rank() > current.rank() {
                let now = now_ts();
                match status {
                    MessageStatus::Delivered => tx.execute(
                        "UPDATE messages
                         SET status = ?1, delivered_at = COALESCE(delivered_at, ?2)
                         WHERE id = ?3",
                        params![status.to_string(), now, id],
                    )?,
                    MessageStatus::Read => tx.execute(
                        "UPDATE messages
                         SET status = ?1, read_at = COALESCE(read_at, ?2)
                         WHERE id = ?3",
                        params![status.to_string(), now, id],
                    )?,
                    _ => tx.execute(
                        "UPDATE messages SET status = ?1 WHERE id = ?2",
                        params![status.to_string(), id],
                    )?,
                };
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The earliest message answering `id`, if any.
pub async fn get_response_to_message(
    db: &Database,
    id: &str,
) -> Result<Option<Message>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE response_to_id = ?1
                 ORDER BY created_at ASC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![id], message_from_row);
            match result {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Full-text search over message content, best match first.
pub async fn search_messages(
    db: &Database,
    query: &str,
    limit: i64,
) -> Result<Vec<MessageSearchHit>, CrosstalkError> {
    let query = query.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender,
                        snippet(messages_fts, 0, '[', ']', '…', 12) AS snippet,
                        m.created_at
                 FROM messages_fts
                 JOIN messages m ON m.rowid = messages_fts.rowid
                 WHERE messages_fts MATCH ?1
                 ORDER BY bm25(messages_fts) ASC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![query, limit], |row| {
                Ok(MessageSearchHit {
                    message_id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    sender: enum_column(row, 2)?,
                    snippet: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut hits = Vec::new();
            for row in rows {
                hits.push(row?);
            }
            Ok(hits)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::conversations::{create_conversation, get_conversation};
    use crosstalk_core::types::{
        AssistantId, Conversation, ConversationStatus, MessageType, Priority,
    };
    use tempfile::tempdir;

    async fn setup_db_with_conversation() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let conversation = Conversation {
            id: "conv-1".to_string(),
            title: None,
            project: None,
            status: ConversationStatus::Active,
            created_by: AssistantId::Claude,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            summary: None,
            metadata: None,
            closed_at: None,
        };
        create_conversation(&db, &conversation).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, content: &str, created_at: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "conv-1".to_string(),
            sender: AssistantId::Claude,
            target: AssistantId::Codex,
            content: content.to_string(),
            message_type: MessageType::Message,
            priority: Priority::Normal,
            status: MessageStatus::Pending,
            response_to_id: None,
            created_at: created_at.to_string(),
            delivered_at: None,
            read_at: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn insert_bumps_conversation_updated_at() {
        let (db, _dir) = setup_db_with_conversation().await;

        let before = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        insert_message(&db, &make_msg("m1", "hello", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        let after = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert!(after.updated_at > before.updated_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let (db, _dir) = setup_db_with_conversation().await;
        let result = insert_message(&db, &make_msg("m1", "", "2026-01-01T00:00:01.000Z")).await;
        assert!(result.is_err(), "CHECK constraint should reject empty content");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn history_is_ascending_and_paged() {
        let (db, _dir) = setup_db_with_conversation().await;

        for i in 0..5 {
            insert_message(
                &db,
                &make_msg(
                    &format!("m{i}"),
                    &format!("msg {i}"),
                    &format!("2026-01-01T00:00:0{i}.000Z"),
                ),
            )
            .await
            .unwrap();
        }

        let all = get_history(&db, "conv-1", 50, 0).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, "m0");
        assert_eq!(all[4].id, "m4");

        let page = get_history(&db, "conv-1", 2, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "m2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_transitions_are_monotonic_and_stamped() {
        let (db, _dir) = setup_db_with_conversation().await;
        insert_message(&db, &make_msg("m1", "hello", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        update_message_status(&db, "m1", MessageStatus::Delivered)
            .await
            .unwrap();
        let msg = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Delivered);
        let delivered_at = msg.delivered_at.clone().unwrap();

        update_message_status(&db, "m1", MessageStatus::Read)
            .await
            .unwrap();
        let msg = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);
        assert!(msg.read_at.is_some());

        // Going backwards is a no-op; stamps survive.
        update_message_status(&db, "m1", MessageStatus::Pending)
            .await
            .unwrap();
        let msg = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Read);
        assert_eq!(msg.delivered_at.as_deref(), Some(delivered_at.as_str()));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn responded_is_reachable_from_pending() {
        let (db, _dir) = setup_db_with_conversation().await;
        insert_message(&db, &make_msg("m1", "hello", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        update_message_status(&db, "m1", MessageStatus::Responded)
            .await
            .unwrap();
        let msg = get_message(&db, "m1").await.unwrap().unwrap();
        assert_eq!(msg.status, MessageStatus::Responded);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn earliest_response_wins() {
        let (db, _dir) = setup_db_with_conversation().await;
        insert_message(&db, &make_msg("req", "question", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        for (id, ts) in [
            ("resp-late", "2026-01-01T00:00:03.000Z"),
            ("resp-early", "2026-01-01T00:00:02.000Z"),
        ] {
            let mut response = make_msg(id, "answer", ts);
            response.sender = AssistantId::Codex;
            response.target = AssistantId::Claude;
            response.response_to_id = Some("req".to_string());
            insert_message(&db, &response).await.unwrap();
        }

        let found = get_response_to_message(&db, "req").await.unwrap().unwrap();
        assert_eq!(found.id, "resp-early");
        assert!(get_response_to_message(&db, "resp-early")
            .await
            .unwrap()
            .is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn full_text_search_finds_stemmed_matches() {
        let (db, _dir) = setup_db_with_conversation().await;
        insert_message(
            &db,
            &make_msg("m1", "debugging the failing pipeline", "2026-01-01T00:00:01.000Z"),
        )
        .await
        .unwrap();
        insert_message(
            &db,
            &make_msg("m2", "lunch plans for tomorrow", "2026-01-01T00:00:02.000Z"),
        )
        .await
        .unwrap();

        // Porter stemming matches "debug" against "debugging".
        let hits = search_messages(&db, "debug", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m1");
        assert!(hits[0].snippet.contains("debugging"));

        assert!(search_messages(&db, "nonexistent", 10)
            .await
            .unwrap()
            .is_empty());

        db.close().await.unwrap();
    }
}
