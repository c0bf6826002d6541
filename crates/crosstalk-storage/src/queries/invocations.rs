// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subprocess invocation audit records.

use crosstalk_core::types::{Invocation, InvocationStatus};
use crosstalk_core::CrosstalkError;
use rusqlite::params;

use crate::database::{map_tr_err, now_ts, Database};
use crate::queries::enum_column;

fn invocation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invocation> {
    Ok(Invocation {
        id: row.get(0)?,
        target: enum_column(row, 1)?,
        message_id: row.get(2)?,
        invocation_type: enum_column(row, 3)?,
        status: enum_column(row, 4)?,
        command: row.get(5)?,
        stdout: row.get(6)?,
        stderr: row.get(7)?,
        exit_code: row.get(8)?,
        created_at: row.get(9)?,
        started_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

const INVOCATION_COLUMNS: &str = "id, target, message_id, invocation_type, status, command, \
                                  stdout, stderr, exit_code, created_at, started_at, completed_at";

/// Insert a new invocation row (normally in `pending` state).
pub async fn create_invocation(
    db: &Database,
    invocation: &Invocation,
) -> Result<(), CrosstalkError> {
    let inv = invocation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO invocations (id, target, message_id, invocation_type, status,
                                          command, stdout, stderr, exit_code, created_at,
                                          started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    inv.id,
                    inv.target.to_string(),
                    inv.message_id,
                    inv.invocation_type.to_string(),
                    inv.status.to_string(),
                    inv.command,
                    inv.stdout,
                    inv.stderr,
                    inv.exit_code,
                    inv.created_at,
                    inv.started_at,
                    inv.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Flip an invocation to `running` and stamp `started_at`.
pub async fn mark_invocation_running(db: &Database, id: &str) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE invocations SET status = 'running', started_at = ?1 WHERE id = ?2",
                params![now_ts(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Finalise an invocation with its captured output and exit state.
pub async fn finalize_invocation(
    db: &Database,
    id: &str,
    status: InvocationStatus,
    stdout: Option<String>,
    stderr: Option<String>,
    exit_code: Option<i64>,
) -> Result<(), CrosstalkError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE invocations
                 SET status = ?1, stdout = ?2, stderr = ?3, exit_code = ?4, completed_at = ?5
                 WHERE id = ?6",
                params![status, stdout, stderr, exit_code, now_ts(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get one invocation by id.
pub async fn get_invocation(
    db: &Database,
    id: &str,
) -> Result<Option<Invocation>, CrosstalkError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVOCATION_COLUMNS} FROM invocations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], invocation_from_row);
            match result {
                Ok(invocation) => Ok(Some(invocation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
