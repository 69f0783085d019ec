//! Transaction lookup tools used by the transaction agent

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::ids::extract_transaction_id;
use super::records::RecordStore;
use super::{ToolHandler, json_schema, required_str};

pub struct FetchTransactionIdTool;

#[async_trait]
impl ToolHandler for FetchTransactionIdTool {
    fn name(&self) -> &str {
        "fetch_transaction_id"
    }

    fn description(&self) -> &str {
        "Extract the transaction id mentioned in a customer message (e.g. 'TXN-123', 'transaction 123')."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "text": {
                    "type": "string",
                    "description": "Customer message to search for a transaction id"
                }
            }),
            vec!["text"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let text = required_str(&input, "text")?;
        Ok(extract_transaction_id(text)
            .unwrap_or_else(|| "No transaction id found in the text.".to_string()))
    }
}

pub struct GetTransactionInfoTool {
    records: Arc<RecordStore>,
}

impl GetTransactionInfoTool {
    pub fn new(records: Arc<RecordStore>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ToolHandler for GetTransactionInfoTool {
    fn name(&self) -> &str {
        "get_transaction_info"
    }

    fn description(&self) -> &str {
        "Get amount, currency, status and refunds of a payment transaction by id."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "transaction_id": {
                    "type": "string",
                    "description": "Transaction id as returned by fetch_transaction_id"
                }
            }),
            vec!["transaction_id"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let transaction_id = required_str(&input, "transaction_id")?;
        debug!("Looking up transaction {}", transaction_id);

        match self.records.transaction(transaction_id) {
            Some(txn) => Ok(serde_json::to_string_pretty(txn)?),
            None => Ok(format!("Transaction {} not found.", transaction_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::records::fixtures::RECORDS_JSON;

    #[tokio::test]
    async fn test_fetch_transaction_id() {
        let result = FetchTransactionIdTool
            .execute(serde_json::json!({"text": "I was charged twice for TXN-000912"}))
            .await
            .unwrap();
        assert_eq!(result, "TXN-000912");

        let result = FetchTransactionIdTool
            .execute(serde_json::json!({"text": "refund policy for transactions over $500?"}))
            .await
            .unwrap();
        assert!(result.starts_with("No transaction id"));
    }

    #[tokio::test]
    async fn test_get_transaction_info() {
        let tool =
            GetTransactionInfoTool::new(Arc::new(RecordStore::from_json(RECORDS_JSON).unwrap()));
        let result = tool
            .execute(serde_json::json!({"transaction_id": "txn-000912"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value["status"], "captured");
        assert_eq!(value["card_last4"], "4242");

        let result = tool
            .execute(serde_json::json!({"transaction_id": "TXN-1"}))
            .await
            .unwrap();
        assert_eq!(result, "Transaction TXN-1 not found.");
    }
}
