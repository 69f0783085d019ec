//! Classification capability: asks an LLM to pick one ticket category
//!
//! The LLM answers through a forced `route_ticket` tool call whose schema
//! mirrors [`RawDecision`]. The label is left as a string here; validation
//! against the fixed set happens in the router.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::category::Category;
use super::error::ClassifierError;
use crate::providers::{ChatMessage, LlmProvider, ToolDefinition};

/// Name of the structured-output tool the model must call
pub const ROUTE_TOOL_NAME: &str = "route_ticket";

/// Unvalidated classification payload as returned by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDecision {
    #[serde(default)]
    pub chain_of_thought: String,
    /// Wire name follows the schema the model is given
    #[serde(default, rename = "router")]
    pub label: Option<String>,
}

impl RawDecision {
    pub fn new(chain_of_thought: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            chain_of_thought: chain_of_thought.into(),
            label: Some(label.into()),
        }
    }
}

/// Anything that can classify a conversation
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        instruction: &str,
        messages: &[ChatMessage],
    ) -> Result<RawDecision, ClassifierError>;
}

/// Classifier backed by an LLM provider
pub struct LlmClassifier {
    provider: Arc<dyn LlmProvider>,
    tool: ToolDefinition,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            tool: route_tool_definition(),
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        instruction: &str,
        messages: &[ChatMessage],
    ) -> Result<RawDecision, ClassifierError> {
        let response = self
            .provider
            .chat_with_required_tool(messages, &self.tool, instruction)
            .await
            .map_err(ClassifierError::Provider)?;

        debug!(
            "Classifier response: provider={}, blocks={}, stop_reason={:?}",
            self.provider.provider_name(),
            response.blocks.len(),
            response.stop_reason
        );

        if let Some((_, _, input)) = response
            .tool_calls()
            .find(|(_, name, _)| *name == ROUTE_TOOL_NAME)
        {
            return decode_decision(input.clone());
        }

        let text = response.text();
        let value = extract_json_object(&text).ok_or_else(|| {
            ClassifierError::Malformed(format!(
                "expected a {} call, got text: {:?}",
                ROUTE_TOOL_NAME,
                truncate(&text, 200)
            ))
        })?;
        decode_decision(value)
    }
}

/// JSON schema of the routing tool: a rationale and a label from the fixed set
pub fn route_tool_definition() -> ToolDefinition {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.handler_name()).collect();
    ToolDefinition {
        name: ROUTE_TOOL_NAME.to_string(),
        description: "Analyze the support ticket and route it to exactly one sub-agent."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "chain_of_thought": {
                    "type": "string",
                    "description": "Reasoning about which agent needs to handle the user query"
                },
                "router": {
                    "type": "string",
                    "enum": labels,
                    "description": "The sub-agent the query is transferred to"
                }
            },
            "required": ["chain_of_thought", "router"],
        }),
    }
}

fn decode_decision(value: Value) -> Result<RawDecision, ClassifierError> {
    if !value.is_object() {
        return Err(ClassifierError::Malformed(format!(
            "routing payload is not an object: {}",
            value
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| ClassifierError::Malformed(format!("routing payload: {}", e)))
}

/// Find the outermost JSON object in free text (models sometimes add preamble)
fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatResponse, ChatResponseBlock, ChatUsage, StopReason};
    use anyhow::{Result, anyhow};
    use std::sync::Mutex;

    /// Provider returning a canned response and recording the system prompt
    struct CannedProvider {
        response: Mutex<Option<Result<ChatResponse>>>,
        seen_system: Mutex<Option<String>>,
    }

    impl CannedProvider {
        fn new(response: Result<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen_system: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn provider_name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-model"
        }
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            tools: &[ToolDefinition],
            system: &str,
        ) -> Result<ChatResponse> {
            assert_eq!(tools.len(), 1);
            assert_eq!(tools[0].name, ROUTE_TOOL_NAME);
            *self.seen_system.lock().unwrap() = Some(system.to_string());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(anyhow!("no canned response left")))
        }
    }

    fn response(blocks: Vec<ChatResponseBlock>) -> ChatResponse {
        ChatResponse {
            blocks,
            stop_reason: StopReason::ToolUse,
            usage: ChatUsage::default(),
        }
    }

    fn tool_call(input: Value) -> ChatResponseBlock {
        ChatResponseBlock::ToolCall {
            id: "call_1".to_string(),
            name: ROUTE_TOOL_NAME.to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn test_classify_reads_tool_call() {
        let provider = CannedProvider::new(Ok(response(vec![tool_call(serde_json::json!({
            "chain_of_thought": "parcel status",
            "router": "delivery_agent"
        }))])));
        let classifier = LlmClassifier::new(provider.clone());
        let decision = classifier
            .classify("route it", &[ChatMessage::user("where is my parcel")])
            .await
            .unwrap();
        assert_eq!(decision, RawDecision::new("parcel status", "delivery_agent"));
        assert_eq!(
            provider.seen_system.lock().unwrap().as_deref(),
            Some("route it")
        );
    }

    #[tokio::test]
    async fn test_classify_falls_back_to_json_text() {
        let provider = CannedProvider::new(Ok(response(vec![ChatResponseBlock::Text {
            text: r#"Sure: {"chain_of_thought": "refund", "router": "transaction_agent"}"#
                .to_string(),
        }])));
        let decision = LlmClassifier::new(provider)
            .classify("route it", &[ChatMessage::user("refund")])
            .await
            .unwrap();
        assert_eq!(decision.label.as_deref(), Some("transaction_agent"));
    }

    #[tokio::test]
    async fn test_classify_missing_label_is_not_malformed() {
        let provider = CannedProvider::new(Ok(response(vec![tool_call(
            serde_json::json!({"chain_of_thought": "unsure"}),
        )])));
        let decision = LlmClassifier::new(provider)
            .classify("route it", &[ChatMessage::user("hmm")])
            .await
            .unwrap();
        assert!(decision.label.is_none());
    }

    #[tokio::test]
    async fn test_classify_unparsed_arguments_are_malformed() {
        let provider = CannedProvider::new(Ok(response(vec![tool_call(serde_json::json!(
            r#"{"router": "delivery_ag"#
        ))])));
        let err = LlmClassifier::new(provider)
            .classify("route it", &[ChatMessage::user("parcel")])
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_classify_plain_text_is_malformed() {
        let provider = CannedProvider::new(Ok(response(vec![ChatResponseBlock::Text {
            text: "delivery".to_string(),
        }])));
        let err = LlmClassifier::new(provider)
            .classify("route it", &[ChatMessage::user("parcel")])
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_classify_provider_error() {
        let provider = CannedProvider::new(Err(anyhow!("connection reset by peer")));
        let err = LlmClassifier::new(provider)
            .classify("route it", &[ChatMessage::user("parcel")])
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Provider(_)));
    }

    #[test]
    fn test_route_tool_schema_enumerates_all_handlers() {
        let tool = route_tool_definition();
        let labels = tool.input_schema["properties"]["router"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(labels.len(), 4);
        assert!(labels.contains(&serde_json::json!("company_info_agent")));
        assert!(labels.contains(&serde_json::json!("transaction_agent")));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(decode_decision(serde_json::json!("delivery")).is_err());
        assert!(decode_decision(serde_json::json!({"router": 7})).is_err());
    }

    #[test]
    fn test_extract_json_object() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("} backwards {").is_none());
        let v = extract_json_object("x {\"a\": 1} y").unwrap();
        assert_eq!(v["a"], 1);
    }
}
