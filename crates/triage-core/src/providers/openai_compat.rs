//! Self-hosted or third-party endpoints that accept Chat Completions requests
//! (Ollama, vLLM, Groq, LM Studio and the like)

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use url::Url;

use super::openai::OpenAiProvider;
use super::types::{ChatMessage, ChatResponse, LlmProvider, ToolDefinition};

const DEFAULT_NAME: &str = "openai_compat";

/// Chat Completions client reported under its own provider name so failover
/// logs tell a local model apart from the hosted one
pub struct OpenAiCompatProvider {
    inner: OpenAiProvider,
    name: String,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OpenAiCompatProvider")
            .field(&self.name)
            .field(&self.inner)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Fails when `base_url` is not an absolute http(s) URL. An empty `name`
    /// falls back to `openai_compat`; an empty `api_key` sends no credentials.
    pub fn new(
        name: &str,
        api_key: String,
        model: String,
        base_url: &str,
        max_tokens: u32,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid base_url for provider '{}': {}", name, base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "base_url for provider '{}' must use http or https, got {}",
                name,
                parsed.scheme()
            );
        }

        let name = match name.trim() {
            "" => DEFAULT_NAME.to_string(),
            n => n.to_string(),
        };

        Ok(Self {
            inner: OpenAiProvider::new(api_key, model, base_url.to_string(), max_tokens),
            name,
        })
    }

    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            inner: self.inner.with_temperature(temperature),
            ..self
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        system: &str,
    ) -> Result<ChatResponse> {
        self.inner.chat(messages, tools, system).await
    }

    async fn chat_with_required_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
        system: &str,
    ) -> Result<ChatResponse> {
        self.inner
            .chat_with_required_tool(messages, tool, system)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama(name: &str, base_url: &str) -> Result<OpenAiCompatProvider> {
        OpenAiCompatProvider::new(
            name,
            String::new(),
            "llama3.1".to_string(),
            base_url,
            4096,
        )
    }

    #[test]
    fn test_name_and_model() {
        let p = ollama("ollama", "http://localhost:11434").unwrap();
        assert_eq!(p.provider_name(), "ollama");
        assert_eq!(p.model(), "llama3.1");
    }

    #[test]
    fn test_blank_name_falls_back() {
        let p = ollama("  ", "http://localhost:11434").unwrap();
        assert_eq!(p.provider_name(), "openai_compat");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(ollama("ollama", "localhost:11434/v1").is_err());
        assert!(ollama("ollama", "not a url").is_err());
        assert!(ollama("ollama", "ftp://models.internal").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let p = OpenAiCompatProvider::new(
            "groq",
            "gsk_secret".to_string(),
            "llama3-70b".to_string(),
            "https://api.groq.com/openai",
            4096,
        )
        .unwrap()
        .with_temperature(0.0);
        let debug = format!("{:?}", p);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("groq"));
    }
}
