// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Crosstalk bridge.
//!
//! Settings come from compiled defaults, an optional `crosstalk.toml`
//! (local directory or XDG config dir), and the flat environment variables
//! the bridge has always recognised (`PORT`, `DB_PATH`, `KG_URL`,
//! `CODEX_*`).

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_str};
pub use model::CrosstalkConfig;
