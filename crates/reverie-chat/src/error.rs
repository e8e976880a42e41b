//! Error types for the conversational interface.

use reverie_core::error::ReverieError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("store error: {0}")]
    Store(String),
}

impl From<ReverieError> for ChatError {
    fn from(err: ReverieError) -> Self {
        ChatError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::Disabled.to_string(), "chat is disabled");
        assert_eq!(
            ChatError::EmptyMessage.to_string(),
            "message cannot be empty"
        );
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::Store("lock poisoned".to_string()).to_string(),
            "store error: lock poisoned"
        );
    }

    #[test]
    fn test_chat_error_from_reverie_error() {
        let err = ReverieError::Store("disk full".to_string());
        let chat_err: ChatError = err.into();
        assert!(matches!(chat_err, ChatError::Store(_)));
        assert!(chat_err.to_string().contains("disk full"));
    }
}
