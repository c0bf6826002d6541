// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types for the Crosstalk loopback bridge.
//!
//! This crate holds the domain model shared by every other crate: the
//! two-member assistant identity, the persisted row types and their closed
//! enums, the [`CrosstalkError`] error type, and the in-memory
//! [`ClientRegistry`] that answers "is the peer reachable right now".

pub mod error;
pub mod registry;
pub mod types;

pub use error::CrosstalkError;
pub use registry::ClientRegistry;
pub use types::AssistantId;
