//! Multi-provider LLM abstraction layer
//!
//! Supports OpenAI and any OpenAI-compatible endpoint (Ollama, Groq, ...).
//! Providers implement the [`LlmProvider`] trait and can be composed via
//! [`ModelRouter`] when a caller wants retries or failover.

pub mod openai;
pub mod openai_compat;
pub mod router;
pub mod types;

pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ModelRouter;
pub use types::{
    ChatBlock, ChatMessage, ChatMessageContent, ChatResponse, ChatResponseBlock, ChatRole,
    ChatUsage, LlmProvider, StopReason, ToolDefinition,
};
