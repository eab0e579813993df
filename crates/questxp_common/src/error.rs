//! Engine errors
//!
//! Only input and collaborator failures are errors. Business outcomes such as an
//! exhausted pool or a stale ledger are reported through `CompletionOutcome`.

use crate::types::{QuestId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Unknown quest '{quest}' for user {user}")]
    UnknownQuest { user: UserId, quest: QuestId },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
