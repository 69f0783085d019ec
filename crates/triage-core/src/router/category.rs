//! The closed set of ticket categories

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category a ticket can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Questions about the company: policies, contact details, opening hours
    CompanyInfo,
    /// Shipping status, tracking, delays, lost parcels
    Delivery,
    /// Order contents, changes, cancellations
    Order,
    /// Payments, refunds, charges
    Transaction,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::CompanyInfo,
        Category::Delivery,
        Category::Order,
        Category::Transaction,
    ];

    /// Canonical label, e.g. `delivery`
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompanyInfo => "company_info",
            Self::Delivery => "delivery",
            Self::Order => "order",
            Self::Transaction => "transaction",
        }
    }

    /// Name of the handler that resolves tickets in this category
    pub fn handler_name(&self) -> &'static str {
        match self {
            Self::CompanyInfo => "company_info_agent",
            Self::Delivery => "delivery_agent",
            Self::Order => "order_agent",
            Self::Transaction => "transaction_agent",
        }
    }

    /// One-line description used in the classification schema and prompts
    pub fn description(&self) -> &'static str {
        match self {
            Self::CompanyInfo => {
                "general questions about the company, its policies, terms, contact details or services"
            }
            Self::Delivery => "shipping status, tracking, delivery delays, lost or damaged parcels",
            Self::Order => "order details, changes, cancellations, missing or wrong items",
            Self::Transaction => "payments, charges, refunds, invoices and billing problems",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label is outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized category: {0:?}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    /// Accepts the canonical label or the handler name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| normalized == c.label() || normalized == c.handler_name())
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
