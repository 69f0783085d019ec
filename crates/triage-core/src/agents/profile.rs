//! Agent profile: a sub-agent's identity, model, prompt and tool set

use serde::{Deserialize, Serialize};

use crate::prompts::agent_prompt;
use crate::router::Category;

/// Tool-use iterations allowed per ticket unless a profile overrides it
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

/// A sub-agent persona with its own model, system prompt and tool
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature; deterministic answers by default
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub denied_tools: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model: None,
            temperature: 0.0,
            prompt: String::new(),
            tools: Vec::new(),
            denied_tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// The stock profile handling `category`
    pub fn for_category(category: Category) -> Self {
        let tools: &[&str] = match category {
            Category::CompanyInfo => &["fetch_company", "update_jira_ticket"],
            Category::Delivery | Category::Order => {
                &["fetch_order_id", "get_order_info", "update_jira_ticket"]
            }
            Category::Transaction => &[
                "fetch_transaction_id",
                "get_transaction_info",
                "update_jira_ticket",
            ],
        };

        let mut profile = Self::new(category.handler_name(), category.description());
        profile.prompt = agent_prompt(category).to_string();
        profile.tools = tools.iter().map(|t| t.to_string()).collect();
        profile
    }

    /// Check if a tool is allowed for this agent
    pub fn is_tool_allowed(&self, tool_name: &str) -> bool {
        if self.denied_tools.iter().any(|t| t == tool_name) {
            return false;
        }
        if self.tools.is_empty() {
            return true; // empty allowlist = all tools allowed
        }
        self.tools.iter().any(|t| t == tool_name)
    }
}

/// Stock profiles for every category, in routing order
pub fn stock_profiles() -> Vec<AgentProfile> {
    Category::ALL
        .iter()
        .map(|c| AgentProfile::for_category(*c))
        .collect()
}
