//! Shared types for triage-core

use serde::{Deserialize, Serialize};

use crate::providers::ChatMessage;

/// Ordered, append-only sequence of messages exchanged on a ticket
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from a single user message
    pub fn from_user(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<ChatMessage>> for Conversation {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

impl IntoIterator for Conversation {
    type Item = ChatMessage;
    type IntoIter = std::vec::IntoIter<ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_append_only() {
        let mut conv = Conversation::from_user("Where is my package?");
        conv.push(ChatMessage::assistant("Let me check."));
        conv.extend(vec![ChatMessage::user("Order #123")]);
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].text(), "Where is my package?");
        assert_eq!(conv.messages()[2].text(), "Order #123");
    }

    #[test]
    fn test_conversation_serializes_as_list() {
        let conv = Conversation::from_user("hello");
        let json = serde_json::to_value(&conv).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["role"], "user");
        let back: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(back, conv);
    }
}
