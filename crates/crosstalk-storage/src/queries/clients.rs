// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client presence rows. Both rows are seeded by the initial migration;
//! the in-memory registry stays authoritative and these rows mirror it.

use crosstalk_core::types::{AssistantId, Client, ClientStatus};
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, now_ts, Database};
use crate::queries::enum_column;

fn client_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: enum_column(row, 0)?,
        display_name: row.get(1)?,
        status: enum_column(row, 2)?,
        session_id: row.get(3)?,
        last_seen_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Get one client row.
pub async fn get_client(db: &Database, id: AssistantId) -> Result<Option<Client>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, status, session_id, last_seen_at, created_at
                 FROM clients WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], client_from_row);
            match result {
                Ok(client) => Ok(Some(client)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List both client rows in seed order.
pub async fn list_clients(db: &Database) -> Result<Vec<Client>, CrosstalkError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, status, session_id, last_seen_at, created_at
                 FROM clients ORDER BY id",
            )?;
            let rows = stmt.query_map([], client_from_row)?;
            let mut clients = Vec::new();
            for row in rows {
                clients.push(row?);
            }
            Ok(clients)
        })
        .await
        .map_err(map_tr_err)
}

/// Mirror a registry transition into the store, stamping `last_seen_at`.
pub async fn update_client_presence(
    db: &Database,
    id: AssistantId,
    status: ClientStatus,
    session_id: Option<String>,
) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE clients SET status = ?1, session_id = ?2, last_seen_at = ?3
                 WHERE id = ?4",
                params![status, session_id, now_ts(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Crash recovery: mark every client offline and clear stale session mirrors.
pub async fn reset_presence(db: &Database) -> Result<(), CrosstalkError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "UPDATE clients SET status = 'offline', session_id = NULL",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
