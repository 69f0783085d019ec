//! The handler seam the dispatcher hands routed tickets to

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::router::RoutingState;
use crate::types::Conversation;
use crate::usage::AccumulatedUsage;

/// Result of a handler working a ticket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerOutcome {
    /// The routed conversation extended with the handler's turns
    pub conversation: Conversation,
    /// Final reply for the customer
    pub reply: String,
    pub usage: AccumulatedUsage,
}

/// A downstream handler for one category of tickets
#[async_trait]
pub trait TicketHandler: Send + Sync {
    /// Handler name, e.g. `delivery_agent`
    fn name(&self) -> &str;

    /// Work the ticket. The state is read-only: handlers never change the route.
    async fn handle(&self, state: &RoutingState) -> Result<HandlerOutcome>;
}
