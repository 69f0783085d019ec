//! Tool registry and executor system

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::providers::ToolDefinition;

pub mod company;
pub mod filesystem;
pub mod ids;
pub mod jira;
pub mod orders;
pub mod records;
pub mod transactions;

pub use jira::JiraClient;
pub use records::RecordStore;

/// Trait for executing tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String>;
    fn list_tools(&self) -> Vec<ToolDefinition>;
}

/// Individual tool handler
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of available tools, iterated in name order
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool handler
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, handler);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String> {
        debug!("Executing tool: {} with input: {:?}", tool_name, input);

        let handler = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow!("Unknown tool: {}", tool_name))?;

        match handler.execute(input).await {
            Ok(result) => {
                debug!("Tool {} succeeded", tool_name);
                Ok(result)
            }
            Err(e) => {
                warn!("Tool {} failed: {}", tool_name, e);
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|handler| handler.definition()).collect()
    }
}

/// Everything the stock tools need to reach their backends
#[derive(Clone, Default)]
pub struct ToolSettings {
    pub records: Arc<RecordStore>,
    pub company_docs_dir: Option<PathBuf>,
    pub search_dirs: Vec<String>,
    pub jira: Option<JiraClient>,
}

/// Build a registry holding every stock tool.
///
/// `update_jira_ticket` is only registered when a Jira client is configured.
pub fn default_registry(settings: ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(orders::FetchOrderIdTool));
    registry.register(Arc::new(orders::GetOrderInfoTool::new(
        settings.records.clone(),
    )));
    registry.register(Arc::new(transactions::FetchTransactionIdTool));
    registry.register(Arc::new(transactions::GetTransactionInfoTool::new(
        settings.records,
    )));
    registry.register(Arc::new(company::FetchCompanyTool::new(
        settings.company_docs_dir,
    )));
    registry.register(Arc::new(filesystem::SearchFilesTool::new(
        settings.search_dirs,
    )));

    if let Some(jira) = settings.jira {
        registry.register(Arc::new(jira::UpdateJiraTicketTool::new(jira)));
    } else {
        debug!("Jira not configured, update_jira_ticket unavailable");
    }

    registry
}

/// Helper function to create a JSON schema for tool input
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Read a required string parameter from tool input
pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}
