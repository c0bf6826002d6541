// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing for the Crosstalk bridge.
//!
//! The [`Dispatcher`] decides how each outgoing message travels: straight
//! delivery when the target is online, the tiered codex invocation ladder
//! when codex is offline, or the durable queue when claude is offline. The
//! [`QueueProcessor`] drains that queue in the background with exponential
//! backoff.

pub mod dispatcher;
pub mod queue;

pub use dispatcher::{DeliveryStatus, DispatchOutcome, Dispatcher, SendOptions};
pub use queue::QueueProcessor;
