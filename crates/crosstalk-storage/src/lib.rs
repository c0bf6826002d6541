// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Crosstalk bridge.
//!
//! One database file, WAL journal mode, foreign keys, a 5 second busy
//! timeout, and an FTS5 index over message content maintained by triggers.
//! All access goes through the [`Store`] facade; writes are serialized by
//! tokio-rusqlite's background thread.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use database::{now_ts, ts_in, Database};
pub use store::Store;
