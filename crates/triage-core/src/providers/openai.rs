//! Chat Completions provider for OpenAI and servers that speak its protocol

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::types::{
    ChatBlock, ChatMessage, ChatMessageContent, ChatResponse, ChatResponseBlock, ChatRole,
    ChatUsage, LlmProvider, StopReason, ToolDefinition,
};

const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
            temperature: None,
        }
    }

    /// Sampling temperature sent with every request. The router uses 0.0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPLETIONS_PATH)
    }

    fn build_request<'a>(
        &'a self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
        tool_choice: Option<ToolChoice>,
    ) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: wire_messages(messages, system),
            tools: tools.iter().map(WireTool::from).collect(),
            tool_choice,
        }
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<ChatResponse> {
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            forced = request.tool_choice.is_some(),
            "chat completion request"
        );

        let mut builder = self.client.post(self.endpoint()).json(request);
        // Local servers such as Ollama run without a key
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Chat completion failed with status {}: {}", status, detail);
        }

        let body: CompletionResponse = response
            .json()
            .await
            .context("Failed to decode chat completion response")?;

        body.into_chat_response()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, tools, system, None);
        self.complete(&request).await
    }

    async fn chat_with_required_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
        system: &str,
    ) -> Result<ChatResponse> {
        let request = self.build_request(
            messages,
            std::slice::from_ref(tool),
            system,
            Some(ToolChoice::function(&tool.name)),
        );
        self.complete(&request).await
    }
}

/// Flatten the conversation into the wire layout: a leading system message,
/// assistant tool calls inline, and each tool result as its own `tool` message.
fn wire_messages(messages: &[ChatMessage], system: &str) -> Vec<WireMessage> {
    let mut out = vec![WireMessage::text("system", system)];

    for msg in messages {
        let blocks = match (&msg.role, &msg.content) {
            (ChatRole::System, _) => continue,
            (role, ChatMessageContent::Text(text)) => {
                out.push(WireMessage::text(&role.to_string(), text));
                continue;
            }
            (_, ChatMessageContent::Blocks(blocks)) => blocks,
        };

        let mut text = Vec::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for block in blocks {
            match block {
                ChatBlock::Text { text: t } => text.push(t.as_str()),
                ChatBlock::ToolCall { id, name, input } => calls.push(WireToolCall {
                    id: id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                }),
                ChatBlock::ToolResult {
                    tool_call_id,
                    content,
                } => results.push(WireMessage::tool_result(tool_call_id, content)),
            }
        }

        if msg.role == ChatRole::Assistant {
            out.push(WireMessage {
                role: "assistant".to_string(),
                content: (!text.is_empty()).then(|| text.join("\n")),
                tool_calls: (!calls.is_empty()).then_some(calls),
                tool_call_id: None,
            });
        } else {
            out.extend(results);
            if !text.is_empty() {
                out.push(WireMessage::text("user", &text.join("\n")));
            }
        }
    }

    out
}

fn stop_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

/// Forces the model to answer through one named function
#[derive(Debug, Serialize)]
struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
    function: NamedFunction,
}

impl ToolChoice {
    fn function(name: &str) -> Self {
        Self {
            kind: "function",
            function: NamedFunction {
                name: name.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct NamedFunction {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::text("tool", content)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

/// `arguments` is a JSON document encoded as a string
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for WireTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunctionDef {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.input_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenCounts>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct TokenCounts {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl CompletionResponse {
    fn into_chat_response(self) -> Result<ChatResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Chat completion returned no choices"))?;

        debug!(
            finish_reason = ?choice.finish_reason,
            tool_calls = choice.message.tool_calls.len(),
            "chat completion response"
        );

        let mut blocks: Vec<ChatResponseBlock> = choice
            .message
            .content
            .filter(|text| !text.is_empty())
            .map(|text| ChatResponseBlock::Text { text })
            .into_iter()
            .collect();

        // Unparseable arguments stay a raw string so callers see a malformed payload
        blocks.extend(choice.message.tool_calls.into_iter().map(|call| {
            let WireFunctionCall { name, arguments } = call.function;
            let input = serde_json::from_str(&arguments).unwrap_or(Value::String(arguments));
            ChatResponseBlock::ToolCall {
                id: call.id,
                name,
                input,
            }
        }));

        let usage = self.usage.map_or_else(ChatUsage::default, |u| ChatUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(ChatResponse {
            blocks,
            stop_reason: stop_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }
}
