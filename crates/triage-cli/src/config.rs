use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use triage_core::Category;
use triage_core::agents::AgentProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub router: RouterConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agents: BTreeMap<Category, AgentOverride>,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub jira: JiraConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Model used for classification; the primary provider's model when unset
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    /// Replaces the stock routing instruction
    #[serde(default)]
    pub instruction_file: Option<String>,
    /// Attempts per provider; 1 means no retry
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            instruction_file: None,
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_retries() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: Option<OpenAiProviderConfig>,
    #[serde(default)]
    pub openai_compat: Option<OpenAiCompatProviderConfig>,
    /// Provider names in failover order; empty means openai, then openai_compat
    #[serde(default)]
    pub failover_order: Vec<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for OpenAiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiCompatProviderConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for OpenAiCompatProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProviderConfig")
            .field("name", &self.name)
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Per-category changes to a stock agent profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOverride {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub prompt_file: Option<String>,
    #[serde(default)]
    pub tools: Option<Vec<String>>,
    #[serde(default)]
    pub denied_tools: Vec<String>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl AgentOverride {
    /// Apply this override on top of `profile`
    pub fn apply(&self, mut profile: AgentProfile) -> Result<AgentProfile> {
        if let Some(model) = &self.model {
            profile.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            profile.temperature = temperature;
        }
        if let Some(file) = &self.prompt_file {
            let path = shellexpand(file);
            profile.prompt = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read agent prompt {}", path.display()))?;
        }
        if let Some(tools) = &self.tools {
            profile.tools = tools.clone();
        }
        profile.denied_tools.extend(self.denied_tools.iter().cloned());
        if let Some(max_iterations) = self.max_iterations {
            profile.max_iterations = max_iterations.max(1);
        }
        Ok(profile)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON file with orders and transactions
    #[serde(default = "default_records_file")]
    pub records_file: String,
    #[serde(default = "default_company_docs_dir")]
    pub company_docs_dir: String,
    /// Directories search_files may look in
    #[serde(default)]
    pub search_dirs: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            records_file: default_records_file(),
            company_docs_dir: default_company_docs_dir(),
            search_dirs: Vec::new(),
        }
    }
}

fn default_records_file() -> String {
    "~/.triage/records.json".to_string()
}
fn default_company_docs_dir() -> String {
    "~/.triage/company".to_string()
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct JiraConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_token: String,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &mask_secret(&self.api_token))
            .finish()
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".triage")
}

impl TriageConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        check_permissions(&path)?;

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `triage init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.warn_hardcoded_secrets(&content);
        Ok(config)
    }

    /// Parse config text after expanding allowlisted environment variables
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        Ok(toml::from_str(&expanded)?)
    }

    /// `raw` is the config text before env expansion
    fn warn_hardcoded_secrets(&self, raw: &str) {
        if let Some(openai) = &self.providers.openai {
            if openai.api_key.starts_with("sk-") && !raw.contains("${OPENAI_API_KEY}") {
                warn!(
                    "OpenAI API key is hardcoded in config file. For security, use environment variables: api_key = \"${{OPENAI_API_KEY}}\""
                );
            }
        }
        if !self.jira.api_token.is_empty() && !raw.contains("${JIRA_API_TOKEN}") {
            warn!(
                "Jira API token is hardcoded in config file. For security, use environment variables: api_token = \"${{JIRA_API_TOKEN}}\""
            );
        }
    }

    /// Stock profile for `category` with any configured override applied
    pub fn agent_profile(&self, category: Category) -> Result<AgentProfile> {
        let profile = AgentProfile::for_category(category);
        match self.agents.get(&category) {
            Some(over) => over.apply(profile),
            None => Ok(profile),
        }
    }

    /// Custom routing instruction, if configured
    pub fn router_instruction(&self) -> Result<Option<String>> {
        self.router
            .instruction_file
            .as_deref()
            .map(|file| {
                let path = shellexpand(file);
                std::fs::read_to_string(&path).with_context(|| {
                    format!("Failed to read router instruction {}", path.display())
                })
            })
            .transpose()
    }
}

/// Refuse config files readable by group or other (they may hold secrets)
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(anyhow::anyhow!(
                "Config file {:?} has overly permissive permissions ({:o}). \
                 It may contain secrets. Fix with: chmod 600 {:?}",
                path,
                mode & 0o777,
                path
            ));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Allowlist of environment variable names that may be expanded in config files.
/// Anything else stays as literal `${VAR}` text.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "CUSTOM_LLM_API_KEY",
    "JIRA_API_TOKEN",
    "JIRA_EMAIL",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = std::env::var(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

/// Expand a leading `~/` to the home directory
pub fn shellexpand(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
[providers.openai]
api_key = "test-key"
"#;

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config = TriageConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.router.max_retries, 1);
        assert_eq!(config.router.temperature, 0.0);
        let openai = config.providers.openai.unwrap();
        assert_eq!(openai.model, "gpt-4o");
        assert_eq!(openai.base_url, "https://api.openai.com");
        assert!(!config.jira.enabled);
        assert_eq!(config.data.records_file, "~/.triage/records.json");
    }

    #[test]
    fn test_default_config_parses() {
        let config = TriageConfig::parse(include_str!("../../../config/default.toml")).unwrap();
        assert!(config.providers.openai.is_some());
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_agent_override() {
        let config = TriageConfig::parse(
            r#"
[providers.openai]
api_key = "k"

[agents.delivery]
model = "gpt-4o-mini"
denied_tools = ["update_jira_ticket"]
max_iterations = 4
"#,
        )
        .unwrap();

        let delivery = config.agent_profile(Category::Delivery).unwrap();
        assert_eq!(delivery.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(delivery.max_iterations, 4);
        assert!(!delivery.is_tool_allowed("update_jira_ticket"));
        assert!(delivery.is_tool_allowed("get_order_info"));

        let order = config.agent_profile(Category::Order).unwrap();
        assert!(order.model.is_none());
    }

    #[test]
    fn test_unknown_agent_category_rejected() {
        let result = TriageConfig::parse(
            r#"
[providers.openai]
api_key = "k"

[agents.billing]
model = "x"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_router_instruction_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("router.md");
        std::fs::write(&path, "Route carefully.").unwrap();

        let mut config = TriageConfig::parse(MINIMAL).unwrap();
        assert!(config.router_instruction().unwrap().is_none());

        config.router.instruction_file = Some(path.to_string_lossy().to_string());
        assert_eq!(
            config.router_instruction().unwrap().as_deref(),
            Some("Route carefully.")
        );
    }

    #[test]
    fn test_expand_env_vars_allowlist() {
        // SAFETY: tests in this module don't read OPENAI_API_KEY concurrently
        unsafe { std::env::set_var("OPENAI_API_KEY", "sk-from-env") };
        let expanded = expand_env_vars("a = \"${OPENAI_API_KEY}\"\nb = \"${AWS_SECRET}\"");
        assert!(expanded.contains("sk-from-env"));
        assert!(expanded.contains("${AWS_SECRET}"));
    }

    #[test]
    fn test_expand_env_vars_unterminated() {
        assert_eq!(expand_env_vars("x = \"${HOME\""), "x = \"${HOME\"");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-...abcd");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let jira = JiraConfig {
            enabled: true,
            base_url: "https://example.atlassian.net".to_string(),
            email: "bot@example.com".to_string(),
            api_token: "very-secret-token".to_string(),
        };
        let debug = format!("{:?}", jira);
        assert!(!debug.contains("very-secret-token"));
    }

    #[cfg(unix)]
    #[test]
    fn test_permissive_config_refused() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = TriageConfig::load(&Some(path.clone())).unwrap_err();
        assert!(err.to_string().contains("overly permissive"));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        assert!(TriageConfig::load(&Some(path)).is_ok());
    }
}
