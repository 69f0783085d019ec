//! Provider-agnostic types for multi-model LLM support

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition handed to a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Provider-agnostic chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: ChatMessageContent,
}

impl ChatMessage {
    /// Plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    /// Plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Text(text.into()),
        }
    }

    /// Concatenated text of this message, ignoring tool blocks
    pub fn text(&self) -> String {
        match &self.content {
            ChatMessageContent::Text(text) => text.clone(),
            ChatMessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ChatBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Content of a chat message, either plain text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Blocks(Vec<ChatBlock>),
}

/// A single block within a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ChatBlock {
    Text { text: String },
    ToolCall { id: String, name: String, input: Value },
    ToolResult { tool_call_id: String, content: String },
}

/// Provider-agnostic response from an LLM
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub blocks: Vec<ChatResponseBlock>,
    pub stop_reason: StopReason,
    pub usage: ChatUsage,
}

impl ChatResponse {
    /// All text blocks joined by newlines
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ChatResponseBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate over the tool calls in this response
    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.blocks.iter().filter_map(|b| match b {
            ChatResponseBlock::ToolCall { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            }
            _ => None,
        })
    }

    /// Convert the response into an assistant message for the conversation
    pub fn to_assistant_message(&self) -> ChatMessage {
        let blocks = self
            .blocks
            .iter()
            .map(|b| match b {
                ChatResponseBlock::Text { text } => ChatBlock::Text { text: text.clone() },
                ChatResponseBlock::ToolCall { id, name, input } => ChatBlock::ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
            })
            .collect();
        ChatMessage {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Blocks(blocks),
        }
    }
}

/// A block in the response
#[derive(Debug, Clone)]
pub enum ChatResponseBlock {
    Text { text: String },
    ToolCall { id: String, name: String, input: Value },
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Unknown,
}

/// Token usage from a single API call
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Trait that all LLM providers implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "gpt-4o")
    fn model(&self) -> &str;

    /// Send a chat request with optional tools and system prompt
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse>;

    /// Send a chat request that must answer by calling `tool`.
    ///
    /// Providers without a way to force a tool call fall back to offering
    /// it as the only tool.
    async fn chat_with_required_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
        system: &str,
    ) -> Result<ChatResponse> {
        self.chat(messages, std::slice::from_ref(tool), system).await
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

impl StopReason {
    /// Whether the model wants to call tools
    pub fn is_tool_use(&self) -> bool {
        matches!(self, Self::ToolUse)
    }

    /// Whether the model finished its turn
    pub fn is_end_turn(&self) -> bool {
        matches!(self, Self::EndTurn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
        assert_eq!(ChatRole::System.to_string(), "system");
    }

    #[test]
    fn test_stop_reason_predicates() {
        assert!(StopReason::ToolUse.is_tool_use());
        assert!(!StopReason::EndTurn.is_tool_use());
        assert!(StopReason::EndTurn.is_end_turn());
        assert!(!StopReason::ToolUse.is_end_turn());
    }

    #[test]
    fn test_message_text_skips_tool_blocks() {
        let msg = ChatMessage {
            role: ChatRole::Assistant,
            content: ChatMessageContent::Blocks(vec![
                ChatBlock::Text {
                    text: "checking".to_string(),
                },
                ChatBlock::ToolCall {
                    id: "tc_1".to_string(),
                    name: "get_order_info".to_string(),
                    input: serde_json::json!({"order_id": "123"}),
                },
            ]),
        };
        assert_eq!(msg.text(), "checking");
        assert_eq!(ChatMessage::user("hello").text(), "hello");
    }

    #[test]
    fn test_response_to_assistant_message() {
        let resp = ChatResponse {
            blocks: vec![
                ChatResponseBlock::Text {
                    text: "let me look".to_string(),
                },
                ChatResponseBlock::ToolCall {
                    id: "tc_1".to_string(),
                    name: "fetch_order_id".to_string(),
                    input: serde_json::json!({"text": "order #1"}),
                },
            ],
            stop_reason: StopReason::ToolUse,
            usage: ChatUsage::default(),
        };
        assert_eq!(resp.tool_calls().count(), 1);
        let msg = resp.to_assistant_message();
        assert_eq!(msg.role, ChatRole::Assistant);
        match msg.content {
            ChatMessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            _ => panic!("expected blocks"),
        }
    }

    #[test]
    fn test_chat_usage_default() {
        let usage = ChatUsage::default();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
    }
}
