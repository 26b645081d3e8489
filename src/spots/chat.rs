//! Per-view chat session state. A view moves Unjoined -> Joining -> Member
//! and finally Closed; the history it holds stays sorted ascending by
//! (created_at, id) with new arrivals inserted in place, never re-sorted
//! wholesale. Once closed, nothing mutates; late async results are dropped.

use crate::db::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Unjoined,
    Joining,
    Member,
    Closed,
}

#[derive(Debug)]
pub struct ChatSession {
    phase: ChatPhase,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(member: bool) -> Self {
        Self {
            phase: if member { ChatPhase::Member } else { ChatPhase::Unjoined },
            messages: Vec::new(),
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn is_member(&self) -> bool {
        self.phase == ChatPhase::Member
    }

    /// Starts a join attempt. Returns false while one is already in flight
    /// (or the view is a member or closed), so double submissions never reach
    /// the repository.
    pub fn begin_join(&mut self) -> bool {
        if self.phase == ChatPhase::Unjoined {
            self.phase = ChatPhase::Joining;
            true
        } else {
            false
        }
    }

    pub fn finish_join(&mut self, ok: bool) {
        if self.phase == ChatPhase::Joining {
            self.phase = if ok { ChatPhase::Member } else { ChatPhase::Unjoined };
        }
    }

    pub fn close(&mut self) {
        self.phase = ChatPhase::Closed;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Full re-fetch result. Only a member view holds history.
    pub fn replace_messages(&mut self, mut messages: Vec<ChatMessage>) {
        if self.phase != ChatPhase::Member {
            return;
        }
        messages.sort_by(|a, b| (&a.created_at, &a.id).cmp(&(&b.created_at, &b.id)));
        self.messages = messages;
    }

    /// Inserts one newly arrived message at its ordered position. A message
    /// already present (same id) is dropped.
    pub fn append(&mut self, message: ChatMessage) {
        if self.phase != ChatPhase::Member {
            return;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        let key = (message.created_at.clone(), message.id.clone());
        let at = self
            .messages
            .iter()
            .rposition(|m| (&m.created_at, &m.id) <= (&key.0, &key.1))
            .map_or(0, |i| i + 1);
        self.messages.insert(at, message);
    }
}
