//! LLM sub-agent: a profile-driven tool-use loop over the routed conversation

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::handler::{HandlerOutcome, TicketHandler};
use super::profile::AgentProfile;
use crate::providers::{
    ChatBlock, ChatMessage, ChatMessageContent, ChatRole, LlmProvider, StopReason, ToolDefinition,
};
use crate::router::RoutingState;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::usage::AccumulatedUsage;

/// Tool output beyond this many bytes is cut before going back to the model
const MAX_TOOL_OUTPUT: usize = 100_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct SubAgent {
    profile: AgentProfile,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    timeout: Duration,
}

impl SubAgent {
    pub fn new(
        profile: AgentProfile,
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            profile,
            provider,
            tools,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overall time limit for one ticket (default 5 minutes)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Registered tools this agent may call
    pub fn allowed_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .list_tools()
            .into_iter()
            .filter(|t| self.profile.is_tool_allowed(&t.name))
            .collect()
    }

    async fn run_tool_loop(&self, state: &RoutingState) -> Result<HandlerOutcome> {
        let tools = self.allowed_tools();
        let mut conversation = state.conversation().clone();
        let mut usage = AccumulatedUsage::new();

        debug!(
            "{} starting with {} messages and {} tools",
            self.profile.id,
            conversation.len(),
            tools.len()
        );

        for iteration in 1..=self.profile.max_iterations {
            debug!("{} iteration {}", self.profile.id, iteration);

            let response = self
                .provider
                .chat(conversation.messages(), &tools, &self.profile.prompt)
                .await?;
            usage.record_response(&response.usage);
            conversation.push(response.to_assistant_message());

            let calls: Vec<_> = response.tool_calls().collect();
            if calls.is_empty() {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!("{} reply was cut at the token limit", self.profile.id);
                }
                let reply = response.text();
                if reply.is_empty() {
                    return Err(anyhow!("No text response from {}", self.profile.id));
                }
                info!(
                    "{} finished after {} iteration(s): {}",
                    self.profile.id, iteration, usage
                );
                return Ok(HandlerOutcome {
                    conversation,
                    reply,
                    usage,
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for (id, name, input) in calls {
                usage.record_tool_call(name);
                let content = self.run_tool(name, input.clone()).await;
                results.push(ChatBlock::ToolResult {
                    tool_call_id: id.to_string(),
                    content,
                });
            }
            conversation.push(ChatMessage {
                role: ChatRole::User,
                content: ChatMessageContent::Blocks(results),
            });
        }

        warn!(
            "{} exceeded maximum iterations ({})",
            self.profile.id, self.profile.max_iterations
        );
        Err(anyhow!(
            "{} exceeded maximum iterations ({})",
            self.profile.id,
            self.profile.max_iterations
        ))
    }

    /// Execute one tool call; failures become text the model can react to
    async fn run_tool(&self, name: &str, input: serde_json::Value) -> String {
        if !self.profile.is_tool_allowed(name) {
            warn!("{} requested disallowed tool {}", self.profile.id, name);
            return format!("Error: tool '{}' is not available to this agent", name);
        }

        info!("{} executing tool: {}", self.profile.id, name);
        let output = match self.tools.execute(name, input).await {
            Ok(output) => output,
            Err(e) => format!("Error: {}", e),
        };
        truncate_output(output)
    }
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_TOOL_OUTPUT {
        let mut cut = MAX_TOOL_OUTPUT;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n[Output truncated]");
    }
    output
}

#[async_trait]
impl TicketHandler for SubAgent {
    fn name(&self) -> &str {
        &self.profile.id
    }

    async fn handle(&self, state: &RoutingState) -> Result<HandlerOutcome> {
        tokio::time::timeout(self.timeout, self.run_tool_loop(state))
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {}s",
                    self.profile.id,
                    self.timeout.as_secs()
                )
            })?
    }
}
