//! Order lookup tools used by the delivery and order agents

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::ids::extract_order_id;
use super::records::RecordStore;
use super::{ToolHandler, json_schema, required_str};

/// Extract an order id from customer text
pub struct FetchOrderIdTool;

#[async_trait]
impl ToolHandler for FetchOrderIdTool {
    fn name(&self) -> &str {
        "fetch_order_id"
    }

    fn description(&self) -> &str {
        "Extract the order id mentioned in a customer message (e.g. '#123', 'ORD-123', 'order 123')."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "text": {
                    "type": "string",
                    "description": "Customer message to search for an order id"
                }
            }),
            vec!["text"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let text = required_str(&input, "text")?;
        Ok(match extract_order_id(text) {
            Some(id) => id,
            None => "No order id found in the text.".to_string(),
        })
    }
}

/// Look up an order in the record store
pub struct GetOrderInfoTool {
    records: Arc<RecordStore>,
}

impl GetOrderInfoTool {
    pub fn new(records: Arc<RecordStore>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl ToolHandler for GetOrderInfoTool {
    fn name(&self) -> &str {
        "get_order_info"
    }

    fn description(&self) -> &str {
        "Get the status, items, total and shipment details of an order by id."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "order_id": {
                    "type": "string",
                    "description": "Order id as returned by fetch_order_id"
                }
            }),
            vec!["order_id"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let order_id = required_str(&input, "order_id")?;
        debug!("Looking up order {}", order_id);

        let Some(order) = self.records.order(order_id) else {
            return Ok(format!("Order {} not found.", order_id));
        };

        let mut value = serde_json::to_value(order)?;
        value["total"] = serde_json::json!(order.total());
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::records::fixtures::RECORDS_JSON;

    fn store() -> Arc<RecordStore> {
        Arc::new(RecordStore::from_json(RECORDS_JSON).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_order_id() {
        let result = FetchOrderIdTool
            .execute(serde_json::json!({"text": "Where is my package for order #123?"}))
            .await
            .unwrap();
        assert_eq!(result, "123");

        let result = FetchOrderIdTool
            .execute(serde_json::json!({"text": "where is my stuff"}))
            .await
            .unwrap();
        assert!(result.starts_with("No order id"));
    }

    #[tokio::test]
    async fn test_fetch_order_id_requires_text() {
        assert!(FetchOrderIdTool.execute(serde_json::json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_get_order_info() {
        let tool = GetOrderInfoTool::new(store());
        let result = tool
            .execute(serde_json::json!({"order_id": "123"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value["status"], "shipped");
        assert_eq!(value["shipment"]["carrier"], "DHL");
        assert_eq!(value["total"], 108.0);
    }

    #[tokio::test]
    async fn test_get_order_info_not_found() {
        let tool = GetOrderInfoTool::new(store());
        let result = tool
            .execute(serde_json::json!({"order_id": "777"}))
            .await
            .unwrap();
        assert_eq!(result, "Order 777 not found.");
    }
}
