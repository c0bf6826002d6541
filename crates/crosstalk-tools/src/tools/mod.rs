// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bridge's tool set.

pub mod conversations;
pub mod identity;
pub mod messaging;
pub mod research;
pub mod review;
pub mod sharing;

use std::sync::Arc;

use crate::tool::ToolRegistry;

/// Register every bridge tool.
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(Arc::new(identity::WhoAmITool));

    registry.register(Arc::new(conversations::CreateConversationTool));
    registry.register(Arc::new(conversations::ListConversationsTool));
    registry.register(Arc::new(conversations::GetConversationTool));
    registry.register(Arc::new(conversations::CloseConversationTool));

    registry.register(Arc::new(messaging::SendMessageTool));
    registry.register(Arc::new(messaging::GetResponseTool));
    registry.register(Arc::new(messaging::GetHistoryTool));
    registry.register(Arc::new(messaging::MarkMessageReadTool));
    registry.register(Arc::new(messaging::SearchMessagesTool));

    registry.register(Arc::new(sharing::ShareContextTool));
    registry.register(Arc::new(sharing::GetSharedContextTool));
    registry.register(Arc::new(sharing::ListSharedContextTool));

    registry.register(Arc::new(research::DelegateResearchTool));
    registry.register(Arc::new(review::RequestReviewTool));
}
