//! Read-only store of orders and transactions backing the lookup tools

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub carrier: String,
    pub tracking_number: String,
    #[serde(default)]
    pub estimated_delivery: Option<NaiveDate>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipment: Option<Shipment>,
}

impl Order {
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.unit_price * i.quantity as f64)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Authorized,
    Captured,
    Refunded,
    PartiallyRefunded,
    Failed,
    Disputed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    /// Last four digits only
    #[serde(default)]
    pub card_last4: Option<String>,
    #[serde(default)]
    pub refunded_amount: f64,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsFile {
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// Orders and transactions indexed by normalized id
#[derive(Debug, Default)]
pub struct RecordStore {
    orders: HashMap<String, Order>,
    transactions: HashMap<String, Transaction>,
}

impl RecordStore {
    pub fn new(orders: Vec<Order>, transactions: Vec<Transaction>) -> Self {
        Self {
            orders: orders.into_iter().map(|o| (normalize(&o.id), o)).collect(),
            transactions: transactions
                .into_iter()
                .map(|t| (normalize(&t.id), t))
                .collect(),
        }
    }

    /// Load `{"orders": [...], "transactions": [...]}` from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file {}", path.display()))?;
        let store = Self::from_json(&content)
            .with_context(|| format!("Failed to parse records file {}", path.display()))?;
        info!(
            "Loaded {} orders and {} transactions from {}",
            store.orders.len(),
            store.transactions.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: RecordsFile = serde_json::from_str(content)?;
        Ok(Self::new(file.orders, file.transactions))
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(&normalize(id))
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(&normalize(id))
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// `#ord-12 ` and `ORD-12` name the same record
fn normalize(id: &str) -> String {
    id.trim().trim_start_matches('#').to_ascii_uppercase()
}
