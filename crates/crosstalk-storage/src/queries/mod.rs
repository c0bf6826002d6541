// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed SQL operations, one module per entity.

pub mod clients;
pub mod context;
pub mod conversations;
pub mod invocations;
pub mod messages;
pub mod queue;

use std::str::FromStr;

/// Read a TEXT column and parse it into a closed enum.
///
/// A value outside the enum means the CHECK constraints and the Rust types
/// have drifted; surface it as a conversion failure rather than panicking.
pub(crate) fn enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
