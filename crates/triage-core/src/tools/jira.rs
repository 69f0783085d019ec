//! Jira Cloud integration: comment on and label support tickets

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{ToolHandler, json_schema, required_str};

/// Minimal Jira REST v2 client (basic auth with an API token)
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .finish()
    }
}

impl JiraClient {
    pub fn new(base_url: &str, email: &str, api_token: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_token: api_token.to_string(),
        }
    }

    fn issue_url(&self, key: &str, suffix: &str) -> Result<Url> {
        validate_issue_key(key)?;
        let base = Url::parse(&format!("{}/", self.base_url))
            .with_context(|| format!("Invalid Jira base URL: {}", self.base_url))?;
        base.join(&format!("rest/api/2/issue/{}{}", key, suffix))
            .context("Failed to build Jira issue URL")
    }

    /// Add a plain-text comment to an issue
    pub async fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        let url = self.issue_url(key, "/comment")?;
        debug!("Jira comment on {}", key);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .context("Failed to send request to Jira")?;
        check_status(response, "comment").await
    }

    /// Add labels to an issue, keeping existing ones
    pub async fn add_labels(&self, key: &str, labels: &[String]) -> Result<()> {
        let url = self.issue_url(key, "")?;
        let ops: Vec<Value> = labels
            .iter()
            .map(|l| serde_json::json!({ "add": l }))
            .collect();
        let response = self
            .client
            .put(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .json(&serde_json::json!({ "update": { "labels": ops } }))
            .send()
            .await
            .context("Failed to send request to Jira")?;
        check_status(response, "label update").await
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow!(
        "Jira {} failed with status {}: {}",
        what,
        status,
        error_text
    ))
}

/// Issue keys look like `SUP-123`: a project key, a dash, a number
fn validate_issue_key(key: &str) -> Result<()> {
    let valid = key.split_once('-').is_some_and(|(project, number)| {
        project.starts_with(|c: char| c.is_ascii_uppercase())
            && project
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && !number.is_empty()
            && number.chars().all(|c| c.is_ascii_digit())
    });
    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid Jira issue key: '{}'", key))
    }
}

/// Record the outcome of a ticket on the matching Jira issue
pub struct UpdateJiraTicketTool {
    jira: JiraClient,
}

impl UpdateJiraTicketTool {
    pub fn new(jira: JiraClient) -> Self {
        Self { jira }
    }
}

#[async_trait]
impl ToolHandler for UpdateJiraTicketTool {
    fn name(&self) -> &str {
        "update_jira_ticket"
    }

    fn description(&self) -> &str {
        "Add a comment (and optionally labels) to a Jira support ticket, e.g. to record how a customer request was resolved."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "ticket_key": {
                    "type": "string",
                    "description": "Jira issue key, e.g. SUP-123"
                },
                "comment": {
                    "type": "string",
                    "description": "Comment text to add"
                },
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional labels to add"
                }
            }),
            vec!["ticket_key", "comment"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let key = required_str(&input, "ticket_key")?.to_ascii_uppercase();
        let comment = required_str(&input, "comment")?;
        let labels: Vec<String> = input
            .get("labels")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|l| l.as_str())
                    .map(|l| l.trim().replace(' ', "_"))
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        validate_issue_key(&key)?;
        self.jira.add_comment(&key, comment).await?;
        if !labels.is_empty() {
            self.jira.add_labels(&key, &labels).await?;
        }

        info!("Updated Jira ticket {} ({} labels)", key, labels.len());
        Ok(format!("Jira ticket {} updated.", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JiraClient {
        JiraClient::new("https://example.atlassian.net/", "bot@example.com", "secret-token")
    }

    #[test]
    fn test_issue_url() {
        let url = client().issue_url("SUP-42", "/comment").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.atlassian.net/rest/api/2/issue/SUP-42/comment"
        );
    }

    #[test]
    fn test_issue_url_with_context_path() {
        let jira = JiraClient::new("https://corp.example.com/jira", "a@b.c", "t");
        let url = jira.issue_url("OPS-1", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://corp.example.com/jira/rest/api/2/issue/OPS-1"
        );
    }

    #[test]
    fn test_validate_issue_key() {
        assert!(validate_issue_key("SUP-123").is_ok());
        assert!(validate_issue_key("A2B-1").is_ok());
        assert!(validate_issue_key("sup-123").is_err());
        assert!(validate_issue_key("SUP123").is_err());
        assert!(validate_issue_key("SUP-").is_err());
        assert!(validate_issue_key("SUP-12/../../admin").is_err());
        assert!(validate_issue_key("-12").is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_key_before_network() {
        let tool = UpdateJiraTicketTool::new(client());
        let err = tool
            .execute(serde_json::json!({"ticket_key": "not a key", "comment": "done"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid Jira issue key"));
    }

    #[tokio::test]
    async fn test_update_requires_comment() {
        let tool = UpdateJiraTicketTool::new(client());
        assert!(
            tool.execute(serde_json::json!({"ticket_key": "SUP-1"}))
                .await
                .is_err()
        );
    }
}
