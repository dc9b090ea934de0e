//! Notification message building
//!
//! Each update becomes one text block. Blocks are packed into messages so
//! that no message exceeds the character budget, except when a single block
//! is longer than the budget on its own.

use crate::domain::ApplicationCheckResult;

/// Default budget, leaving headroom under Telegram's 4096 character limit
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 3900;

/// Packs update blocks into bounded messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFormatter {
    /// Maximum characters per message
    pub max_message_length: usize,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(max_message_length: usize) -> Self {
        Self { max_message_length }
    }

    /// Formats one update as a text block
    pub fn format_update(update: &ApplicationCheckResult) -> String {
        let mut block = format!(
            "{} ({})\n  Chart: {}\n  Version: {} -> {}\n",
            update.app_name,
            update.project,
            update.chart_name,
            update.current_version,
            update.latest_version
        );
        if update.constraint_applied.is_restrictive() {
            block.push_str(&format!("  Constraint: {}\n", update.constraint_applied));
        }
        if update.has_update_outside_constraint
            && !update.latest_version_all.is_empty()
            && update.latest_version_all != update.latest_version
        {
            block.push_str(&format!(
                "  Note: {} available outside constraint\n",
                update.latest_version_all
            ));
        }
        block.push_str(&format!("  Repo: {}\n\n", update.repo_url));
        block
    }

    /// Builds the messages for a list of updates
    pub fn build_messages(&self, updates: &[ApplicationCheckResult]) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for update in updates {
            let block = Self::format_update(update);
            let block_len = block.chars().count();

            if current_len > 0 && current_len + block_len > self.max_message_length {
                messages.push(std::mem::take(&mut current));
                current_len = 0;
            }

            current.push_str(&block);
            current_len += block_len;
        }

        if current_len > 0 {
            messages.push(current);
        }
        messages
    }
}
