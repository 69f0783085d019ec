//! Company knowledge lookup over a directory of markdown/text documents

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ToolHandler, json_schema, required_str};

const MAX_RESULTS: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "you", "your", "what", "how", "with", "can", "does", "our",
    "this", "that", "have", "from", "about", "is", "do", "any", "there", "when", "where",
];

/// Keyword retrieval over the company knowledge base
pub struct FetchCompanyTool {
    docs_dir: Option<PathBuf>,
}

impl FetchCompanyTool {
    pub fn new(docs_dir: Option<PathBuf>) -> Self {
        Self { docs_dir }
    }
}

#[async_trait]
impl ToolHandler for FetchCompanyTool {
    fn name(&self) -> &str {
        "fetch_company"
    }

    fn description(&self) -> &str {
        "Search the company knowledge base (policies, contact details, services) and return the most relevant passages."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "query": {
                    "type": "string",
                    "description": "What to look up, e.g. 'refund policy' or 'opening hours'"
                }
            }),
            vec!["query"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let query = required_str(&input, "query")?;
        let Some(dir) = &self.docs_dir else {
            return Ok("The company knowledge base is not configured.".to_string());
        };

        let passages = load_passages(dir)?;
        debug!(
            "Searching {} company passages for {:?}",
            passages.len(),
            query
        );

        let hits = rank(&passages, query);
        if hits.is_empty() {
            return Ok(format!("No company information found for '{}'.", query));
        }

        Ok(hits
            .into_iter()
            .map(|p| format!("[{}]\n{}", p.source, p.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[derive(Debug, Clone)]
struct Passage {
    source: String,
    text: String,
}

fn load_passages(dir: &Path) -> Result<Vec<Passage>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read company docs directory: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("md") | Some("txt")
                )
        })
        .collect();
    entries.sort();

    let mut passages = Vec::new();
    for path in entries {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        passages.extend(
            content
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| Passage {
                    source: source.clone(),
                    text: p.to_string(),
                }),
        );
    }
    Ok(passages)
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Passages sharing the most distinct terms with the query, best first
fn rank<'a>(passages: &'a [Passage], query: &str) -> Vec<&'a Passage> {
    let query_terms = terms(query);
    let mut scored: Vec<(usize, usize, &Passage)> = passages
        .iter()
        .enumerate()
        .map(|(idx, p)| (terms(&p.text).intersection(&query_terms).count(), idx, p))
        .filter(|(score, _, _)| *score > 0)
        .collect();
    // Highest score first, document order breaks ties
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, _, p)| p)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn docs() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("policies.md"),
            "# Policies\n\nRefunds are issued within 14 days for transactions under $500. \
             Larger refunds need manager approval.\n\nReturns are accepted for 30 days.",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("contact.txt"),
            "Support hours: Monday to Friday, 9am to 6pm CET.\n\nEmail support@example.com.",
        )
        .unwrap();
        std::fs::write(temp.path().join("logo.png"), [0u8, 1, 2]).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_fetch_company_finds_policy() {
        let temp = docs();
        let tool = FetchCompanyTool::new(Some(temp.path().to_path_buf()));
        let result = tool
            .execute(serde_json::json!({"query": "refund policy for transactions over $500"}))
            .await
            .unwrap();
        assert!(result.starts_with("[policies.md]"));
        assert!(result.contains("manager approval"));
        assert!(!result.contains("Support hours"));
    }

    #[tokio::test]
    async fn test_fetch_company_no_match() {
        let temp = docs();
        let tool = FetchCompanyTool::new(Some(temp.path().to_path_buf()));
        let result = tool
            .execute(serde_json::json!({"query": "quantum teleportation"}))
            .await
            .unwrap();
        assert!(result.starts_with("No company information"));
    }

    #[tokio::test]
    async fn test_fetch_company_unconfigured() {
        let tool = FetchCompanyTool::new(None);
        let result = tool
            .execute(serde_json::json!({"query": "hours"}))
            .await
            .unwrap();
        assert!(result.contains("not configured"));
    }

    #[test]
    fn test_rank_orders_by_overlap() {
        let passages = vec![
            Passage {
                source: "a".to_string(),
                text: "support email".to_string(),
            },
            Passage {
                source: "b".to_string(),
                text: "support hours email".to_string(),
            },
        ];
        let ranked = rank(&passages, "support hours by email");
        assert_eq!(ranked[0].source, "b");
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_terms_drop_stopwords_and_short_words() {
        let t = terms("What is the refund policy?");
        assert!(t.contains("refund"));
        assert!(t.contains("policy"));
        assert!(!t.contains("what"));
        assert!(!t.contains("is"));
    }
}
