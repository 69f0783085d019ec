//! Directory search tool restricted to configured directories

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use super::{ToolHandler, json_schema, required_str};

/// Validate that a path is within one of the allowed directories
fn validate_allowed_path(path: &str, allowed_dirs: &[PathBuf]) -> Result<PathBuf> {
    if path.contains("..") {
        return Err(anyhow::anyhow!("Path contains '..' which is not allowed"));
    }

    let expanded = shellexpand(path);
    let canonical = expanded
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", expanded.display()))?;

    for allowed in allowed_dirs {
        let allowed_canonical = allowed.canonicalize().unwrap_or_else(|_| allowed.clone());
        if canonical.starts_with(&allowed_canonical) {
            return Ok(canonical);
        }
    }

    Err(anyhow::anyhow!(
        "Access denied: '{}' is not within allowed directories",
        canonical.display()
    ))
}

fn shellexpand(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}

/// A pattern matches a name by substring, or as a glob when it has wildcards
fn name_matches(pattern: &str, name: &str) -> bool {
    if pattern.contains(['*', '?', '[']) {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(name))
            .unwrap_or(false)
    } else {
        name.contains(pattern)
    }
}

/// Search a directory for entries whose name matches a pattern
pub struct SearchFilesTool {
    allowed_dirs: Vec<PathBuf>,
}

impl SearchFilesTool {
    pub fn new(allowed_dirs: Vec<String>) -> Self {
        Self {
            allowed_dirs: allowed_dirs.iter().map(|d| shellexpand(d)).collect(),
        }
    }
}

#[async_trait]
impl ToolHandler for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search for files in a directory whose name contains a pattern (or matches it as a glob such as '*.pdf'). Only configured directories are searchable."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "directory": {
                    "type": "string",
                    "description": "Directory to search (supports ~/)"
                },
                "pattern": {
                    "type": "string",
                    "description": "Substring or glob pattern to match file names against"
                }
            }),
            vec!["directory", "pattern"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let directory = required_str(&input, "directory")?;
        let pattern = required_str(&input, "pattern")?;

        let validated = validate_allowed_path(directory, &self.allowed_dirs)?;
        debug!(
            "Searching {} for files matching {:?}",
            validated.display(),
            pattern
        );

        let mut names: Vec<String> = std::fs::read_dir(&validated)
            .with_context(|| format!("Failed to read directory: {}", validated.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name_matches(pattern, name))
            .collect();
        names.sort();

        if names.is_empty() {
            return Ok(format!("No files matching '{}'.", pattern));
        }
        Ok(names.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, String) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        std::fs::write(temp.path().join("invoice_123.pdf"), "pdf").unwrap();
        std::fs::write(temp.path().join("invoice_124.pdf"), "pdf").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "notes").unwrap();
        (temp, path)
    }

    #[test]
    fn test_search_files_tool_schema() {
        let tool = SearchFilesTool::new(vec!["~/support".to_string()]);
        assert_eq!(tool.name(), "search_files");
        assert!(!tool.description().is_empty());
        let schema = tool.input_schema();
        assert_eq!(schema["required"], serde_json::json!(["directory", "pattern"]));
    }

    #[tokio::test]
    async fn test_search_substring() {
        let (_temp, path) = fixture();
        let tool = SearchFilesTool::new(vec![path.clone()]);
        let result = tool
            .execute(serde_json::json!({"directory": path, "pattern": "invoice"}))
            .await
            .unwrap();
        assert_eq!(result, "invoice_123.pdf\ninvoice_124.pdf");
    }

    #[tokio::test]
    async fn test_search_glob() {
        let (_temp, path) = fixture();
        let tool = SearchFilesTool::new(vec![path.clone()]);
        let result = tool
            .execute(serde_json::json!({"directory": path, "pattern": "*.txt"}))
            .await
            .unwrap();
        assert_eq!(result, "notes.txt");
    }

    #[tokio::test]
    async fn test_search_no_match() {
        let (_temp, path) = fixture();
        let tool = SearchFilesTool::new(vec![path.clone()]);
        let result = tool
            .execute(serde_json::json!({"directory": path, "pattern": "receipt"}))
            .await
            .unwrap();
        assert_eq!(result, "No files matching 'receipt'.");
    }

    #[tokio::test]
    async fn test_search_denied_outside_allowed() {
        let (_temp, path) = fixture();
        let tool = SearchFilesTool::new(vec![path]);
        let result = tool
            .execute(serde_json::json!({"directory": "/etc", "pattern": "passwd"}))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_path_traversal_blocked() {
        let (_temp, path) = fixture();
        let tool = SearchFilesTool::new(vec![path.clone()]);
        let result = tool
            .execute(serde_json::json!({"directory": format!("{}/../..", path), "pattern": "x"}))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_name_matches() {
        assert!(name_matches("voice", "invoice.pdf"));
        assert!(name_matches("inv*.pdf", "invoice.pdf"));
        assert!(!name_matches("*.txt", "invoice.pdf"));
    }
}
