//! Model router with caller-configured retries and failover across providers
//!
//! Nothing in the routing path retries on its own. Wrapping a provider in a
//! [`ModelRouter`] is how a caller opts into a retry policy.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{ChatMessage, ChatResponse, LlmProvider, ToolDefinition};

/// Upper bound on attempts per provider, whatever the config says
pub const MAX_ATTEMPTS_PER_PROVIDER: u32 = 10;
/// Longest single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Routes LLM requests across multiple providers with automatic failover
pub struct ModelRouter {
    /// Providers in failover order (index 0 = primary)
    providers: Vec<Arc<dyn LlmProvider>>,
    /// Maximum attempts per provider before moving to the next
    max_retries_per_provider: u32,
    /// Base delay for exponential backoff
    base_retry_delay: Duration,
}

#[derive(Clone, Copy)]
enum Request<'a> {
    Chat(&'a [ToolDefinition]),
    RequiredTool(&'a ToolDefinition),
}

impl ModelRouter {
    /// Create a router with a single provider: one attempt, no failover
    pub fn single(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            providers: vec![provider],
            max_retries_per_provider: 1,
            base_retry_delay: Duration::from_millis(500),
        }
    }

    /// Create a router with multiple providers in failover order
    pub fn with_failover(providers: Vec<Arc<dyn LlmProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(anyhow!("ModelRouter requires at least one provider"));
        }
        Ok(Self {
            providers,
            max_retries_per_provider: 2,
            base_retry_delay: Duration::from_millis(500),
        })
    }

    /// Set the maximum attempts per provider, clamped to
    /// `1..=MAX_ATTEMPTS_PER_PROVIDER`
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries_per_provider = max_retries.clamp(1, MAX_ATTEMPTS_PER_PROVIDER);
        self
    }

    /// Set the base retry delay for exponential backoff
    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    /// Number of configured providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// `base * 2^attempt`, saturating at [`MAX_BACKOFF`]
    fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_retry_delay.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    async fn dispatch(
        &self,
        messages: &[ChatMessage],
        request: Request<'_>,
        system: &str,
    ) -> Result<ChatResponse> {
        let mut last_error = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            for attempt in 0..self.max_retries_per_provider {
                debug!(
                    "Trying provider {} ({}/{}) attempt {}/{}",
                    provider.provider_name(),
                    provider.model(),
                    idx + 1,
                    attempt + 1,
                    self.max_retries_per_provider,
                );

                let result = match request {
                    Request::Chat(tools) => provider.chat(messages, tools, system).await,
                    Request::RequiredTool(tool) => {
                        provider
                            .chat_with_required_tool(messages, tool, system)
                            .await
                    }
                };

                match result {
                    Ok(response) => {
                        if idx > 0 {
                            info!(
                                "Request succeeded on failover provider {} ({})",
                                provider.provider_name(),
                                provider.model()
                            );
                        }
                        return Ok(response);
                    }
                    Err(e) => {
                        let err_str = e.to_string();
                        let is_retryable = is_retryable_error(&err_str);

                        warn!(
                            "Provider {} ({}) failed (attempt {}, retryable={}): {}",
                            provider.provider_name(),
                            provider.model(),
                            attempt + 1,
                            is_retryable,
                            err_str,
                        );

                        last_error = Some(e);

                        if !is_retryable {
                            break;
                        }

                        if attempt + 1 < self.max_retries_per_provider {
                            let delay = self.backoff_delay(attempt);
                            debug!("Backing off for {:?} before retry", delay);
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }

            if idx + 1 < self.providers.len() {
                info!(
                    "Failing over from {} to {}",
                    provider.provider_name(),
                    self.providers[idx + 1].provider_name()
                );
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All providers failed")))
    }
}

#[async_trait]
impl LlmProvider for ModelRouter {
    /// The primary provider's name
    fn provider_name(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.provider_name())
            .unwrap_or("unknown")
    }

    /// The primary provider's model name
    fn model(&self) -> &str {
        self.providers
            .first()
            .map(|p| p.model())
            .unwrap_or("unknown")
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse> {
        self.dispatch(messages, Request::Chat(tools), system).await
    }

    async fn chat_with_required_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
        system: &str,
    ) -> Result<ChatResponse> {
        self.dispatch(messages, Request::RequiredTool(tool), system)
            .await
    }
}

/// Determine if an error is retryable (rate limit, server error, timeout)
fn is_retryable_error(err: &str) -> bool {
    let retryable_patterns = [
        "429",
        "500",
        "502",
        "503",
        "504",
        "rate limit",
        "rate_limit",
        "overloaded",
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "temporarily unavailable",
    ];
    let lower = err.to_lowercase();
    retryable_patterns.iter().any(|p| lower.contains(p))
}
