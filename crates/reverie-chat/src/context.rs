//! Conversation context management.
//!
//! Tracks chat sessions and their bounded rolling windows of recent turns.
//! The window has a fixed capacity; when it is full, the oldest turn is
//! evicted so that prompt assembly always sees the most recent exchanges.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use reverie_core::types::ConversationTurn;

// =============================================================================
// ConversationWindow
// =============================================================================

/// Bounded rolling window of conversation turns, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationWindow {
    /// Create an empty window holding at most `capacity` turns.
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest if the window is full.
    ///
    /// A zero-capacity window keeps no turns at all.
    pub fn push(&mut self, turn: ConversationTurn) {
        if self.capacity == 0 {
            return;
        }
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Iterate over the retained turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// One active conversation with its rolling context window.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub window: ConversationWindow,
}

/// Creates sessions and decides when they expire.
pub struct SessionManager {
    /// Maximum number of recent turns to keep per session.
    pub context_turns: usize,
    /// Session inactivity timeout in minutes.
    pub session_timeout_minutes: u32,
}

impl SessionManager {
    pub fn new(context_turns: usize, session_timeout_minutes: u32) -> Self {
        Self {
            context_turns,
            session_timeout_minutes,
        }
    }

    /// Create a fresh conversation session.
    pub fn create_session(&self) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: Uuid::new_v4(),
            started_at: now,
            last_message_at: now,
            window: ConversationWindow::new(self.context_turns),
        }
    }

    /// Check whether a session has expired based on the configured timeout.
    pub fn is_expired(&self, session: &ChatSession) -> bool {
        let timeout = chrono::Duration::minutes(i64::from(self.session_timeout_minutes));
        Utc::now() - session.last_message_at > timeout
    }

    /// Record activity on a session.
    pub fn touch(&self, session: &mut ChatSession) {
        session.last_message_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_push_and_iterate() {
        let mut window = ConversationWindow::new(3);
        window.push(ConversationTurn::user("one"));
        window.push(ConversationTurn::assistant("two"));

        assert_eq!(window.len(), 2);
        let texts: Vec<&str> = window.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = ConversationWindow::new(2);
        window.push(ConversationTurn::user("one"));
        window.push(ConversationTurn::assistant("two"));
        window.push(ConversationTurn::user("three"));

        assert_eq!(window.len(), 2);
        let texts: Vec<&str> = window.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_window_zero_capacity_keeps_nothing() {
        let mut window = ConversationWindow::new(0);
        window.push(ConversationTurn::user("dropped"));
        assert!(window.is_empty());
    }

    #[test]
    fn test_create_session() {
        let manager = SessionManager::new(5, 30);
        let session = manager.create_session();
        assert_ne!(session.id, Uuid::nil());
        assert!(session.window.is_empty());
        assert_eq!(session.window.capacity(), 5);
    }

    #[test]
    fn test_session_not_expired_when_fresh() {
        let manager = SessionManager::new(5, 30);
        let session = manager.create_session();
        assert!(!manager.is_expired(&session));
    }

    #[test]
    fn test_session_expired_after_timeout() {
        let manager = SessionManager::new(5, 30);
        let mut session = manager.create_session();
        session.last_message_at = Utc::now() - chrono::Duration::minutes(31);
        assert!(manager.is_expired(&session));
    }

    #[test]
    fn test_touch_refreshes_session() {
        let manager = SessionManager::new(5, 30);
        let mut session = manager.create_session();
        session.last_message_at = Utc::now() - chrono::Duration::minutes(31);
        manager.touch(&mut session);
        assert!(!manager.is_expired(&session));
    }
}
